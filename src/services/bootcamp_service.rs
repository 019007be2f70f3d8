use serde_json::Value;

use crate::auth::{require_owner_or_admin, Role, OWNER_FIELD};
use crate::database::models::{bootcamp, course, ValidationError, ValidationMode};
use crate::database::{Document, DocumentStore};
use crate::error::ApiError;
use crate::geo::Geocoder;
use crate::middleware::AuthUser;
use crate::query::{Predicate, ID_FIELD};

use super::strip_system_fields;

pub struct BootcampService<'a> {
    store: &'a dyn DocumentStore,
    geocoder: &'a dyn Geocoder,
}

impl<'a> BootcampService<'a> {
    pub fn new(store: &'a dyn DocumentStore, geocoder: &'a dyn Geocoder) -> Self {
        Self { store, geocoder }
    }

    pub async fn select_404(&self, id: &str) -> Result<Document, ApiError> {
        self.store
            .find_by_id(bootcamp::COLLECTION, id)
            .await?
            .ok_or_else(|| ApiError::resource_not_found("Bootcamp", id))
    }

    /// Validates, geocodes and stores a new bootcamp owned by `user`
    pub async fn create_one(&self, body: Document, user: &AuthUser) -> Result<Document, ApiError> {
        let mut doc = strip_system_fields(body, bootcamp::DERIVED_FIELDS);
        doc.insert(OWNER_FIELD.to_string(), Value::String(user.id.clone()));
        bootcamp::schema().validate(&doc, ValidationMode::Create)?;

        if user.role != Role::Admin {
            let published = self.store.find_one(bootcamp::COLLECTION, &Predicate::eq(OWNER_FIELD, user.id.clone().into())).await?;
            if published.is_some() {
                return Err(ApiError::bad_request(format!(
                    "The user with ID {} has already published a bootcamp",
                    user.id
                )));
            }
        }

        self.ensure_unique_name(&doc, None).await?;
        self.locate(&mut doc).await?;
        bootcamp::apply_defaults(&mut doc);

        let created = self.store.insert(bootcamp::COLLECTION, doc).await?;
        tracing::info!("bootcamp {:?} created by {}", created.get(ID_FIELD), user.id);
        Ok(created)
    }

    pub async fn update_404(&self, id: &str, body: Document, user: &AuthUser) -> Result<Document, ApiError> {
        let existing = self.select_404(id).await?;
        require_owner_or_admin(&existing, user, "update this bootcamp")?;

        let mut patch = strip_system_fields(body, bootcamp::DERIVED_FIELDS);
        bootcamp::schema().validate(&patch, ValidationMode::Update)?;
        self.ensure_unique_name(&patch, Some(id)).await?;

        if patch.contains_key("address") {
            self.locate(&mut patch).await?;
        }
        if let Some(name) = patch.get("name").and_then(Value::as_str) {
            let slug = bootcamp::slugify(name);
            patch.insert("slug".to_string(), Value::String(slug));
        }

        self.store
            .update(bootcamp::COLLECTION, id, patch)
            .await?
            .ok_or_else(|| ApiError::resource_not_found("Bootcamp", id))
    }

    /// Removes the bootcamp and every course that belongs to it
    pub async fn delete_404(&self, id: &str, user: &AuthUser) -> Result<(), ApiError> {
        let existing = self.select_404(id).await?;
        require_owner_or_admin(&existing, user, "delete this bootcamp")?;

        let removed = self
            .store
            .delete_many(course::COLLECTION, &Predicate::eq(course::BOOTCAMP_FIELD, id.into()))
            .await?;
        tracing::info!("deleting bootcamp {} with {} courses", id, removed);

        if !self.store.delete(bootcamp::COLLECTION, id).await? {
            return Err(ApiError::resource_not_found("Bootcamp", id));
        }
        Ok(())
    }

    async fn ensure_unique_name(&self, doc: &Document, except: Option<&str>) -> Result<(), ApiError> {
        let Some(name) = doc.get("name").filter(|v| v.is_string()) else {
            return Ok(());
        };
        let clash = self.store.find_one(bootcamp::COLLECTION, &Predicate::eq("name", name.clone())).await?;
        match clash {
            Some(other) if other.get(ID_FIELD).and_then(Value::as_str) != except => {
                Err(ApiError::bad_request("Duplicate field value entered"))
            }
            _ => Ok(()),
        }
    }

    /// Resolves `address` into the GeoJSON `location`
    async fn locate(&self, doc: &mut Document) -> Result<(), ApiError> {
        let address = doc.get("address").and_then(Value::as_str).unwrap_or_default().to_string();
        let location = self
            .geocoder
            .geocode(&address)
            .await?
            .ok_or_else(|| ValidationError::single("address", format!("Unable to locate address {}", address)))?;
        doc.insert("location".to_string(), bootcamp::location_value(&location));
        Ok(())
    }
}
