use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::document::Document;
use super::models::schema::format_timestamp;
use crate::geo::SphericalCap;
use crate::query::{FindQuery, Predicate, CREATED_AT_FIELD, ID_FIELD};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Document storage capability shared by every request handler.
///
/// Implementations must make `update` atomic per document; nothing else in
/// the service coordinates concurrent writers.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn count(&self, collection: &str, predicate: &Predicate) -> Result<u64, StoreError>;

    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError>;

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    async fn find_one(&self, collection: &str, predicate: &Predicate) -> Result<Option<Document>, StoreError> {
        let query = FindQuery { predicate: predicate.clone(), limit: Some(1), ..Default::default() };
        Ok(self.find(collection, &query).await?.into_iter().next())
    }

    /// Stores a new document, assigning `_id` and `createdAt` when absent
    async fn insert(&self, collection: &str, doc: Document) -> Result<Document, StoreError>;

    /// Shallow-merges `patch` into the document and returns the new version
    async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<Option<Document>, StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    async fn delete_many(&self, collection: &str, predicate: &Predicate) -> Result<u64, StoreError>;

    /// Documents whose `[lng, lat]` pair at `field` lies inside `cap`
    async fn find_within(&self, collection: &str, field: &str, cap: &SphericalCap) -> Result<Vec<Document>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;

    async fn close(&self);
}

pub(crate) fn prepare_insert(mut doc: Document) -> Result<(String, Document), StoreError> {
    let id = match doc.get(ID_FIELD) {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        None | Some(Value::Null) => Uuid::new_v4().to_string(),
        Some(other) => return Err(StoreError::InvalidDocument(format!("_id must be a string, got {}", other))),
    };
    doc.insert(ID_FIELD.to_string(), Value::String(id.clone()));
    if !doc.contains_key(CREATED_AT_FIELD) {
        doc.insert(CREATED_AT_FIELD.to_string(), Value::String(format_timestamp(Utc::now())));
    }
    Ok((id, doc))
}

/// The identifier is immutable once stored
pub(crate) fn prepare_patch(mut patch: Document) -> Document {
    patch.remove(ID_FIELD);
    patch
}
