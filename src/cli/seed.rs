use anyhow::{bail, Context};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;

use crate::database::models::{bootcamp, course};
use crate::database::{Document, DocumentStore};
use crate::geo::Geocoder;
use crate::query::{FindQuery, Predicate};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub bootcamps: usize,
    pub courses: usize,
}

fn read_documents(path: &Path) -> anyhow::Result<Vec<Document>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let values: Vec<Value> = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| match v {
            Value::Object(doc) => Ok(doc),
            other => bail!("{} entry {} is not an object: {}", path.display(), i, other),
        })
        .collect()
}

/// Imports fixtures as-is, keeping supplied `_id`s and owners. Bootcamps
/// without a `location` are geocoded from their address.
pub async fn seed(
    store: &dyn DocumentStore,
    geocoder: &dyn Geocoder,
    bootcamps: &Path,
    courses: Option<&Path>,
) -> anyhow::Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    for mut doc in read_documents(bootcamps)? {
        if !doc.contains_key("location") {
            if let Some(address) = doc.get("address").and_then(Value::as_str).map(str::to_string) {
                match geocoder.geocode(&address).await? {
                    Some(loc) => {
                        doc.insert("location".to_string(), bootcamp::location_value(&loc));
                    }
                    None => tracing::warn!("no location found for '{}'", address),
                }
            }
        }
        bootcamp::apply_defaults(&mut doc);
        store.insert(bootcamp::COLLECTION, doc).await?;
        summary.bootcamps += 1;
    }

    if let Some(path) = courses {
        let mut parents = BTreeSet::new();
        for mut doc in read_documents(path)? {
            if let Some(parent) = doc.get(course::BOOTCAMP_FIELD).and_then(Value::as_str) {
                parents.insert(parent.to_string());
            }
            course::apply_defaults(&mut doc);
            store.insert(course::COLLECTION, doc).await?;
            summary.courses += 1;
        }

        for parent in parents {
            let query = FindQuery::matching(Predicate::eq(course::BOOTCAMP_FIELD, parent.clone().into()));
            let children = store.find(course::COLLECTION, &query).await?;
            if let Some(cost) = course::average_cost(&children) {
                let mut patch = Document::new();
                patch.insert("averageCost".to_string(), cost);
                store.update(bootcamp::COLLECTION, &parent, patch).await?;
            }
        }
    }

    tracing::info!("seeded {} bootcamps and {} courses", summary.bootcamps, summary.courses);
    Ok(summary)
}

pub async fn purge(store: &dyn DocumentStore) -> anyhow::Result<u64> {
    let courses = store.delete_many(course::COLLECTION, &Predicate::all()).await?;
    let bootcamps = store.delete_many(bootcamp::COLLECTION, &Predicate::all()).await?;
    tracing::info!("purged {} bootcamps and {} courses", bootcamps, courses);
    Ok(bootcamps + courses)
}
