use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{GeoLocation, GeocodeError, Geocoder};

pub const DEFAULT_BASE_URL: &str = "https://www.mapquestapi.com/geocoding/v1/address";

/// MapQuest geocoding API client
pub struct MapQuestGeocoder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl MapQuestGeocoder {
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Result<Self, GeocodeError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(GeocodeError::NotConfigured("GEOCODER_API_KEY"));
        }
        let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self { client, base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()), api_key })
    }
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    info: Info,
    #[serde(default)]
    results: Vec<ResultSet>,
}

#[derive(Debug, Default, Deserialize)]
struct Info {
    #[serde(default)]
    statuscode: i64,
    #[serde(default)]
    messages: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    #[serde(default)]
    locations: Vec<Location>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Location {
    lat_lng: LatLng,
    #[serde(default)]
    street: Option<String>,
    #[serde(default)]
    admin_area5: Option<String>,
    #[serde(default)]
    admin_area3: Option<String>,
    #[serde(default)]
    admin_area1: Option<String>,
    #[serde(default)]
    postal_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

fn non_empty(s: &Option<String>) -> Option<String> {
    s.as_ref().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl From<&Location> for GeoLocation {
    fn from(loc: &Location) -> Self {
        let street = non_empty(&loc.street);
        let city = non_empty(&loc.admin_area5);
        let state = non_empty(&loc.admin_area3);
        let zipcode = non_empty(&loc.postal_code);
        let country = non_empty(&loc.admin_area1);

        let state_zip = [state.clone(), zipcode.clone()].into_iter().flatten().collect::<Vec<_>>().join(" ");
        let formatted: Vec<String> = [street.clone(), city.clone(), Some(state_zip).filter(|s| !s.is_empty()), country.clone()]
            .into_iter()
            .flatten()
            .collect();

        GeoLocation {
            latitude: loc.lat_lng.lat,
            longitude: loc.lat_lng.lng,
            formatted_address: (!formatted.is_empty()).then(|| formatted.join(", ")),
            street,
            city,
            state,
            zipcode,
            country,
        }
    }
}

fn first_location(response: Response) -> Result<Option<GeoLocation>, GeocodeError> {
    if response.info.statuscode != 0 {
        return Err(GeocodeError::Upstream(format!(
            "{} {}",
            response.info.statuscode,
            response.info.messages.join("; ")
        )));
    }
    Ok(response
        .results
        .iter()
        .flat_map(|r| r.locations.iter())
        .next()
        .map(GeoLocation::from))
}

#[async_trait]
impl Geocoder for MapQuestGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<GeoLocation>, GeocodeError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("key", self.api_key.as_str()), ("location", query)])
            .send()
            .await?
            .error_for_status()?
            .json::<Response>()
            .await?;
        tracing::debug!("geocoded '{}' ({} result sets)", query, response.results.len());
        first_location(response)
    }
}
