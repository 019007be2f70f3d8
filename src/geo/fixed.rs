use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

use super::{GeoLocation, GeocodeError, Geocoder};

/// Lookup-table geocoder for development and tests.
/// Keys are matched case-insensitively after trimming.
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    entries: HashMap<String, GeoLocation>,
}

impl StaticGeocoder {
    pub fn new<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, GeoLocation)>,
        K: AsRef<str>,
    {
        Self { entries: entries.into_iter().map(|(k, v)| (normalize(k.as_ref()), v)).collect() }
    }

    /// Load a JSON object mapping query strings to locations
    pub fn from_file(path: &Path) -> Result<Self, GeocodeError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| GeocodeError::Fixtures(format!("{}: {}", path.display(), e)))?;
        let entries: HashMap<String, GeoLocation> =
            serde_json::from_str(&text).map_err(|e| GeocodeError::Fixtures(e.to_string()))?;
        tracing::info!("Loaded {} geocoder fixtures from {}", entries.len(), path.display());
        Ok(Self::new(entries))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize(query: &str) -> String {
    query.trim().to_lowercase()
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<GeoLocation>, GeocodeError> {
        Ok(self.entries.get(&normalize(query)).cloned())
    }
}
