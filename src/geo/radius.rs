use thiserror::Error;

use super::{GeocodeError, Geocoder, SphericalCap};
use crate::database::{Document, DocumentStore, StoreError};

/// Field holding each document's `[lng, lat]` pair
pub const COORDINATES_FIELD: &str = "location.coordinates";

#[derive(Debug, Error)]
pub enum RadiusError {
    #[error("No location found for {0}")]
    NoLocation(String),

    #[error("Invalid distance '{0}': expected a non-negative number of miles")]
    InvalidDistance(String),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub fn parse_distance(raw: &str) -> Result<f64, RadiusError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| RadiusError::InvalidDistance(raw.to_string()))
}

/// Every document of `collection` within `distance_miles` of `postal_code`.
/// Unpaginated and in storage order.
pub async fn find_within_radius(
    store: &dyn DocumentStore,
    geocoder: &dyn Geocoder,
    collection: &str,
    postal_code: &str,
    distance_miles: f64,
) -> Result<Vec<Document>, RadiusError> {
    let location = geocoder
        .geocode(postal_code)
        .await?
        .ok_or_else(|| RadiusError::NoLocation(postal_code.to_string()))?;

    let cap = SphericalCap::from_miles(location.latitude, location.longitude, distance_miles);
    tracing::debug!(
        "radius search around ({}, {}) with {} radians",
        cap.center_lng,
        cap.center_lat,
        cap.radius_radians
    );

    Ok(store.find_within(collection, COORDINATES_FIELD, &cap).await?)
}
