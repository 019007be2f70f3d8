use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::document::{compare_values, document_id, lookup, Document};
use super::store::{prepare_insert, prepare_patch, DocumentStore, StoreError};
use crate::geo::SphericalCap;
use crate::query::{FindQuery, Predicate, SortDirection, SortKey};

/// In-process document store. Collections keep insertion order, which also
/// breaks ties between equal sort keys in the primary key's direction.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_documents(docs: Vec<Document>, keys: &[SortKey]) -> Vec<Document> {
    let mut indexed: Vec<(usize, Document)> = docs.into_iter().enumerate().collect();
    let tie_break = SortKey::tie_break(keys);
    indexed.sort_by(|(ia, a), (ib, b)| {
        for key in keys {
            let ord = compare_values(lookup(a, &key.field), lookup(b, &key.field));
            let ord = match key.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        match tie_break {
            SortDirection::Asc => ia.cmp(ib),
            SortDirection::Desc => ib.cmp(ia),
        }
    });
    indexed.into_iter().map(|(_, doc)| doc).collect()
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn count(&self, collection: &str, predicate: &Predicate) -> Result<u64, StoreError> {
        let collections = self.collections.read().await;
        let count = collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| predicate.matches(d)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        let matched: Vec<Document> = {
            let collections = self.collections.read().await;
            collections
                .get(collection)
                .map(|docs| docs.iter().filter(|d| query.predicate.matches(d)).cloned().collect())
                .unwrap_or_default()
        };

        let matched = sort_documents(matched, &query.sort);

        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        let take = query.limit.and_then(|l| usize::try_from(l).ok()).unwrap_or(usize::MAX);
        Ok(matched.into_iter().skip(skip).take(take).collect())
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| document_id(d) == Some(id)))
            .cloned())
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<Document, StoreError> {
        let (id, doc) = prepare_insert(doc)?;
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|d| document_id(d) == Some(id.as_str())) {
            return Err(StoreError::InvalidDocument(format!("duplicate _id {}", id)));
        }
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<Option<Document>, StoreError> {
        let patch = prepare_patch(patch);
        let mut collections = self.collections.write().await;
        let Some(doc) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| document_id(d) == Some(id)))
        else {
            return Ok(None);
        };
        for (key, value) in patch {
            doc.insert(key, value);
        }
        Ok(Some(doc.clone()))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| document_id(d) != Some(id));
        Ok(docs.len() < before)
    }

    async fn delete_many(&self, collection: &str, predicate: &Predicate) -> Result<u64, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !predicate.matches(d));
        Ok((before - docs.len()) as u64)
    }

    async fn find_within(&self, collection: &str, field: &str, cap: &SphericalCap) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let found = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| {
                        let coords = lookup(d, field).and_then(|v| v.as_array());
                        match coords.map(|c| c.as_slice()) {
                            Some([lng, lat, ..]) => match (lng.as_f64(), lat.as_f64()) {
                                (Some(lng), Some(lat)) => cap.contains(lng, lat),
                                _ => false,
                            },
                            _ => false,
                        }
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(found)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn close(&self) {
        tracing::info!("Closed in-memory document store");
    }
}
