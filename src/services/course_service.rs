use serde_json::Value;

use crate::auth::{require_owner_or_admin, OWNER_FIELD};
use crate::database::models::{bootcamp, course, ValidationMode};
use crate::database::{Document, DocumentStore};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::query::{FindQuery, Predicate};

use super::strip_system_fields;

pub struct CourseService<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> CourseService<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Courses of one bootcamp in storage order
    pub async fn select_for_bootcamp(&self, bootcamp_id: &str) -> Result<Vec<Document>, ApiError> {
        let query = FindQuery::matching(Predicate::eq(course::BOOTCAMP_FIELD, bootcamp_id.into()));
        Ok(self.store.find(course::COLLECTION, &query).await?)
    }

    pub async fn select_404(&self, id: &str) -> Result<Document, ApiError> {
        self.store
            .find_by_id(course::COLLECTION, id)
            .await?
            .ok_or_else(|| ApiError::resource_not_found("Course", id))
    }

    /// Single course with its parent bootcamp summarised
    pub async fn select_populated_404(&self, id: &str) -> Result<Document, ApiError> {
        let mut docs = [self.select_404(id).await?];
        course::BOOTCAMP.resolve(self.store, &mut docs).await?;
        let [doc] = docs;
        Ok(doc)
    }

    pub async fn create_one(&self, bootcamp_id: &str, body: Document, user: &AuthUser) -> Result<Document, ApiError> {
        let parent = self
            .store
            .find_by_id(bootcamp::COLLECTION, bootcamp_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("No bootcamp with the id of {}", bootcamp_id)))?;
        require_owner_or_admin(&parent, user, &format!("add a course to bootcamp {}", bootcamp_id))?;

        let mut doc = strip_system_fields(body, &[course::BOOTCAMP_FIELD]);
        doc.insert(course::BOOTCAMP_FIELD.to_string(), Value::String(bootcamp_id.to_string()));
        doc.insert(OWNER_FIELD.to_string(), Value::String(user.id.clone()));
        course::schema().validate(&doc, ValidationMode::Create)?;
        course::apply_defaults(&mut doc);

        let created = self.store.insert(course::COLLECTION, doc).await?;
        self.refresh_average_cost(bootcamp_id).await?;
        Ok(created)
    }

    pub async fn update_404(&self, id: &str, body: Document, user: &AuthUser) -> Result<Document, ApiError> {
        let existing = self.select_404(id).await?;
        require_owner_or_admin(&existing, user, &format!("update course {}", id))?;

        let patch = strip_system_fields(body, &[course::BOOTCAMP_FIELD]);
        course::schema().validate(&patch, ValidationMode::Update)?;
        let reprice = patch.contains_key("tuition");

        let updated = self
            .store
            .update(course::COLLECTION, id, patch)
            .await?
            .ok_or_else(|| ApiError::resource_not_found("Course", id))?;
        if let (true, Some(parent)) = (reprice, parent_of(&updated)) {
            self.refresh_average_cost(parent).await?;
        }
        Ok(updated)
    }

    pub async fn delete_404(&self, id: &str, user: &AuthUser) -> Result<(), ApiError> {
        let existing = self.select_404(id).await?;
        require_owner_or_admin(&existing, user, &format!("delete course {}", id))?;

        if !self.store.delete(course::COLLECTION, id).await? {
            return Err(ApiError::resource_not_found("Course", id));
        }
        if let Some(parent) = parent_of(&existing) {
            self.refresh_average_cost(parent).await?;
        }
        Ok(())
    }

    /// Recomputes the parent's `averageCost` from its remaining courses
    async fn refresh_average_cost(&self, bootcamp_id: &str) -> Result<(), ApiError> {
        let courses = self.select_for_bootcamp(bootcamp_id).await?;
        let cost = course::average_cost(&courses).unwrap_or(Value::Null);
        tracing::debug!("bootcamp {} average cost now {}", bootcamp_id, cost);

        let mut patch = Document::new();
        patch.insert("averageCost".to_string(), cost);
        self.store.update(bootcamp::COLLECTION, bootcamp_id, patch).await?;
        Ok(())
    }
}

fn parent_of(doc: &Document) -> Option<&str> {
    doc.get(course::BOOTCAMP_FIELD).and_then(Value::as_str)
}
