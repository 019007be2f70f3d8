use serde_json::{Map, Value};
use std::collections::HashMap;

use super::error::QueryError;
use super::order::{QueryOrder, QuerySelect};
use super::pagination::{PageWindow, Pagination, DEFAULT_LIMIT};
use super::params::FilterRequest;
use super::types::{ComparisonOp, FieldCondition, FindQuery, Predicate, Projection, SortKey, ID_FIELD};
use crate::config::QueryConfig;
use crate::database::document::{document_id, Document};
use crate::database::models::CollectionSchema;
use crate::database::DocumentStore;

/// A related collection resolved inline into each returned document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Populate {
    /// Documents of `collection` whose `foreign_key` holds the parent's `_id`,
    /// attached as an array under `field`
    Children { field: &'static str, collection: &'static str, foreign_key: &'static str },
    /// The `_id` stored in `field` replaced by the referenced document, reduced to `select`
    Parent { field: &'static str, collection: &'static str, select: &'static [&'static str] },
}

impl Populate {
    pub fn field(&self) -> &'static str {
        match self {
            Populate::Children { field, .. } | Populate::Parent { field, .. } => field,
        }
    }

    /// Resolve the relation for every document in place
    pub async fn resolve(&self, store: &dyn DocumentStore, docs: &mut [Document]) -> Result<(), QueryError> {
        let ids: Vec<Value> = match self {
            Populate::Children { .. } => docs.iter().filter_map(document_id).map(|id| Value::String(id.to_string())).collect(),
            Populate::Parent { field, .. } => docs.iter().filter_map(|d| d.get(*field)).filter(|v| v.is_string()).cloned().collect(),
        };

        match *self {
            Populate::Children { field, collection, foreign_key } => {
                let mut grouped: HashMap<String, Vec<Value>> = HashMap::new();
                if !ids.is_empty() {
                    let query = FindQuery::matching(Predicate::all().and(FieldCondition::new(
                        foreign_key,
                        ComparisonOp::In,
                        Value::Array(ids),
                    )));
                    for child in store.find(collection, &query).await? {
                        if let Some(parent) = child.get(foreign_key).and_then(Value::as_str) {
                            grouped.entry(parent.to_string()).or_default().push(Value::Object(child.clone()));
                        }
                    }
                }
                for doc in docs.iter_mut() {
                    let children = document_id(doc).and_then(|id| grouped.remove(id)).unwrap_or_default();
                    doc.insert(field.to_string(), Value::Array(children));
                }
            }
            Populate::Parent { field, collection, select } => {
                let mut parents: HashMap<String, Value> = HashMap::new();
                if !ids.is_empty() {
                    let query = FindQuery::matching(Predicate::all().and(FieldCondition::new(
                        ID_FIELD,
                        ComparisonOp::In,
                        Value::Array(ids),
                    )));
                    for parent in store.find(collection, &query).await? {
                        let mut summary = Map::new();
                        for key in std::iter::once(ID_FIELD).chain(select.iter().copied()) {
                            if let Some(v) = parent.get(key) {
                                summary.insert(key.to_string(), v.clone());
                            }
                        }
                        if let Some(id) = document_id(&parent) {
                            parents.insert(id.to_string(), Value::Object(summary));
                        }
                    }
                }
                for doc in docs.iter_mut() {
                    if let Some(Value::String(id)) = doc.get(field) {
                        let resolved = parents.get(id).cloned().unwrap_or(Value::Null);
                        doc.insert(field.to_string(), resolved);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Fully-specified, executable description of one list request.
/// Built per request and never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub predicate: Predicate,
    pub projection: Projection,
    pub sort: Vec<SortKey>,
    pub window: PageWindow,
}

#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub items: Vec<Document>,
    pub total: u64,
    pub pagination: Pagination,
}

pub struct QueryBuilder<'a> {
    schema: &'a CollectionSchema,
    populate: Option<Populate>,
    default_limit: u64,
    max_limit: Option<u64>,
    count_unfiltered: bool,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(schema: &'a CollectionSchema) -> Self {
        Self { schema, populate: None, default_limit: DEFAULT_LIMIT, max_limit: None, count_unfiltered: false }
    }

    pub fn configure(mut self, config: &QueryConfig) -> Self {
        self.default_limit = config.default_limit;
        self.max_limit = config.max_limit;
        self.count_unfiltered = config.count_unfiltered;
        self
    }

    pub fn populate(mut self, populate: Populate) -> Self {
        self.populate = Some(populate);
        self
    }

    pub fn build(&self, request: &FilterRequest) -> Result<QueryPlan, QueryError> {
        let control = request.control();
        let plan = QueryPlan {
            predicate: Predicate::from_request(request, self.schema)?,
            projection: QuerySelect::parse(control.select.as_deref())?,
            sort: QueryOrder::parse(control.sort.as_deref()),
            window: PageWindow::parse(
                control.page.as_deref(),
                control.limit.as_deref(),
                self.default_limit,
                self.max_limit,
            ),
        };
        tracing::debug!(
            collection = self.schema.collection,
            conditions = plan.predicate.conditions.len(),
            sort = %QueryOrder::generate(&plan.sort),
            page = plan.window.page,
            limit = plan.window.limit,
            "built query plan"
        );
        Ok(plan)
    }

    /// Count and page fetch run concurrently; pagination links come from the count
    pub async fn execute(&self, plan: &QueryPlan, store: &dyn DocumentStore) -> Result<QueryOutcome, QueryError> {
        let collection = self.schema.collection;
        let count_predicate = if self.count_unfiltered { Predicate::all() } else { plan.predicate.clone() };
        let find = FindQuery {
            predicate: plan.predicate.clone(),
            sort: plan.sort.clone(),
            skip: plan.window.start_index(),
            limit: Some(plan.window.limit),
        };

        let (total, mut items) = tokio::try_join!(store.count(collection, &count_predicate), store.find(collection, &find))?;

        if let Some(populate) = self.populate.filter(|p| plan.projection.returns(p.field())) {
            populate.resolve(store, &mut items).await?;
        }

        let items = items.into_iter().map(|doc| project(doc, &plan.projection)).collect();
        Ok(QueryOutcome { items, total, pagination: plan.window.paginate(total) })
    }

    pub async fn build_and_execute(
        &self,
        request: &FilterRequest,
        store: &dyn DocumentStore,
    ) -> Result<QueryOutcome, QueryError> {
        let plan = self.build(request)?;
        self.execute(&plan, store).await
    }
}

/// Apply a projection. Dotted paths select or drop keys inside nested objects.
pub fn project(doc: Document, projection: &Projection) -> Document {
    match projection {
        Projection::All => doc,
        Projection::Include(fields) => include_paths(doc, &fields.iter().map(String::as_str).collect::<Vec<_>>()),
        Projection::Exclude(fields) => exclude_paths(doc, &fields.iter().map(String::as_str).collect::<Vec<_>>()),
    }
}

/// The remainders of `paths` that point inside `key`
fn nested_paths<'p>(paths: &[&'p str], key: &str) -> Vec<&'p str> {
    paths.iter().filter_map(|&p| p.strip_prefix(key).and_then(|rest| rest.strip_prefix('.'))).collect()
}

fn include_paths(doc: Document, paths: &[&str]) -> Document {
    doc.into_iter()
        .filter_map(|(key, value)| {
            if paths.iter().any(|p| *p == key) {
                return Some((key, value));
            }
            let nested = nested_paths(paths, &key);
            match value {
                Value::Object(inner) if !nested.is_empty() => {
                    Some((key, Value::Object(include_paths(inner, &nested))))
                }
                _ => None,
            }
        })
        .collect()
}

fn exclude_paths(doc: Document, paths: &[&str]) -> Document {
    doc.into_iter()
        .filter_map(|(key, value)| {
            if paths.iter().any(|p| *p == key) {
                return None;
            }
            let nested = nested_paths(paths, &key);
            match value {
                Value::Object(inner) if !nested.is_empty() => {
                    Some((key, Value::Object(exclude_paths(inner, &nested))))
                }
                other => Some((key, other)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{bootcamp, course};
    use crate::database::MemoryStore;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let rows = [
            ("b1", "Devworks", 9000, "2024-01-01"),
            ("b2", "ModernTech", 12000, "2024-01-02"),
            ("b3", "Codemasters", 8000, "2024-01-03"),
            ("b4", "Devcentral", 10000, "2024-01-04"),
            ("b5", "Uplift", 15000, "2024-01-05"),
        ];
        for (id, name, cost, day) in rows {
            store
                .insert(
                    bootcamp::COLLECTION,
                    doc(json!({ "_id": id, "name": name, "averageCost": cost, "createdAt": format!("{}T00:00:00.000Z", day) })),
                )
                .await
                .unwrap();
        }
        store.insert(course::COLLECTION, doc(json!({ "_id": "c1", "title": "Front End", "bootcamp": "b1" }))).await.unwrap();
        store.insert(course::COLLECTION, doc(json!({ "_id": "c2", "title": "Full Stack", "bootcamp": "b1" }))).await.unwrap();
        store.insert(course::COLLECTION, doc(json!({ "_id": "c3", "title": "Data", "bootcamp": "b3" }))).await.unwrap();
        store
    }

    fn bootcamps() -> QueryBuilder<'static> {
        QueryBuilder::new(bootcamp::schema()).populate(Populate::Children {
            field: "courses",
            collection: course::COLLECTION,
            foreign_key: course::BOOTCAMP_FIELD,
        })
    }

    fn names(items: &[Document]) -> Vec<&str> {
        items.iter().map(|d| d["name"].as_str().unwrap()).collect()
    }

    #[test]
    fn builds_defaults() {
        let plan = bootcamps().build(&FilterRequest::default()).unwrap();
        assert!(plan.predicate.is_empty());
        assert_eq!(plan.projection, Projection::All);
        assert_eq!(plan.sort, vec![SortKey::desc("createdAt")]);
        assert_eq!(plan.window, PageWindow { page: 1, limit: 25 });
    }

    #[test]
    fn honours_configured_limits() {
        let config = QueryConfig { default_limit: 10, max_limit: Some(20), count_unfiltered: false };
        let builder = QueryBuilder::new(bootcamp::schema()).configure(&config);
        assert_eq!(builder.build(&FilterRequest::default()).unwrap().window.limit, 10);
        assert_eq!(builder.build(&FilterRequest::parse("limit=50")).unwrap().window.limit, 20);
    }

    #[tokio::test]
    async fn default_sort_is_newest_first_with_courses_populated() {
        let store = seeded().await;
        let outcome = bootcamps().build_and_execute(&FilterRequest::default(), &store).await.unwrap();
        assert_eq!(names(&outcome.items), vec!["Uplift", "Devcentral", "Codemasters", "ModernTech", "Devworks"]);
        assert_eq!(outcome.total, 5);
        assert_eq!(outcome.pagination, Pagination::default());

        let devworks = &outcome.items[4];
        let titles: Vec<&str> =
            devworks["courses"].as_array().unwrap().iter().map(|c| c["title"].as_str().unwrap()).collect();
        assert_eq!(titles, vec!["Front End", "Full Stack"]);
        assert_eq!(outcome.items[0]["courses"], json!([]));
    }

    #[tokio::test]
    async fn filtered_second_page_counts_matching_documents() {
        let store = seeded().await;
        let request = FilterRequest::parse("averageCost[lte]=10000&page=2&limit=2");
        let outcome = bootcamps().build_and_execute(&request, &store).await.unwrap();

        assert_eq!(outcome.total, 3);
        assert_eq!(names(&outcome.items), vec!["Devworks"]);
        assert_eq!(outcome.pagination.prev, Some(super::super::PageRef { page: 1, limit: 2 }));
        assert_eq!(outcome.pagination.next, None);
    }

    #[tokio::test]
    async fn unfiltered_count_mode_uses_whole_collection() {
        let store = seeded().await;
        let config = QueryConfig { default_limit: 25, max_limit: None, count_unfiltered: true };
        let request = FilterRequest::parse("averageCost[lte]=10000&page=2&limit=2");
        let outcome = bootcamps().configure(&config).build_and_execute(&request, &store).await.unwrap();
        assert_eq!(outcome.total, 5);
        assert!(outcome.pagination.next.is_some());
    }

    #[tokio::test]
    async fn select_restricts_fields_and_skips_population() {
        let store = seeded().await;
        let request = FilterRequest::parse("select=name,averageCost&sort=averageCost");
        let outcome = bootcamps().build_and_execute(&request, &store).await.unwrap();
        for item in &outcome.items {
            let mut keys: Vec<&str> = item.keys().map(String::as_str).collect();
            keys.sort_unstable();
            assert_eq!(keys, vec!["_id", "averageCost", "name"]);
        }
        assert_eq!(outcome.items[0]["name"], json!("Codemasters"));
    }

    #[tokio::test]
    async fn select_can_request_population() {
        let store = seeded().await;
        let request = FilterRequest::parse("select=name,courses&name=Codemasters");
        let outcome = bootcamps().build_and_execute(&request, &store).await.unwrap();
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0]["courses"][0]["_id"], json!("c3"));
    }

    #[tokio::test]
    async fn parent_population_summarises_reference() {
        let store = seeded().await;
        let builder = QueryBuilder::new(course::schema()).populate(Populate::Parent {
            field: "bootcamp",
            collection: bootcamp::COLLECTION,
            select: &["name"],
        });
        let outcome = builder.build_and_execute(&FilterRequest::parse("sort=title"), &store).await.unwrap();
        assert_eq!(outcome.items[0]["bootcamp"], json!({ "_id": "b3", "name": "Codemasters" }));
    }

    #[tokio::test]
    async fn malformed_filters_fail_before_touching_the_store() {
        let store = seeded().await;
        let err = bootcamps()
            .build_and_execute(&FilterRequest::parse("averageCost[between]=1"), &store)
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedOperator { .. }));
    }

    #[test]
    fn dotted_select_keeps_nested_fields() {
        let bootcamp = doc(json!({
            "_id": "b1",
            "name": "Devworks",
            "location": { "state": "MA", "city": "Boston", "coordinates": [-71.1, 42.3] },
        }));

        let only_state = QuerySelect::parse(Some("location.state")).unwrap();
        assert!(only_state.returns("location"));
        assert!(!only_state.returns("loc"));
        assert_eq!(
            Value::Object(project(bootcamp.clone(), &only_state)),
            json!({ "_id": "b1", "location": { "state": "MA" } })
        );

        let without_coordinates = QuerySelect::parse(Some("-location.coordinates,-name")).unwrap();
        assert!(without_coordinates.returns("location"));
        assert_eq!(
            Value::Object(project(bootcamp, &without_coordinates)),
            json!({ "_id": "b1", "location": { "state": "MA", "city": "Boston" } })
        );
    }
}
