pub mod fixed;
pub mod mapquest;
pub mod radius;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use fixed::StaticGeocoder;
pub use mapquest::MapQuestGeocoder;
pub use radius::{find_within_radius, RadiusError};

/// Earth's mean radius in miles
pub const EARTH_RADIUS_MILES: f64 = 3963.0;

/// A resolved coordinate with whatever address parts the provider reported
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub formatted_address: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Geocoder is not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Geocoder request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Geocoder returned status {0}")]
    Upstream(String),

    #[error("Invalid geocoder fixtures: {0}")]
    Fixtures(String),
}

/// Address/postal code lookup capability
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` when the provider has no match for `query`
    async fn geocode(&self, query: &str) -> Result<Option<GeoLocation>, GeocodeError>;
}

/// All points within an angular radius of a centre on the sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalCap {
    pub center_lat: f64,
    pub center_lng: f64,
    pub radius_radians: f64,
}

impl SphericalCap {
    pub fn from_miles(center_lat: f64, center_lng: f64, distance_miles: f64) -> Self {
        Self { center_lat, center_lng, radius_radians: distance_miles / EARTH_RADIUS_MILES }
    }

    /// Haversine central angle between the centre and `(lng, lat)`
    pub fn central_angle(&self, lng: f64, lat: f64) -> f64 {
        let (phi1, phi2) = (self.center_lat.to_radians(), lat.to_radians());
        let d_phi = phi2 - phi1;
        let d_lambda = (lng - self.center_lng).to_radians();
        let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        2.0 * a.sqrt().min(1.0).asin()
    }

    pub fn contains(&self, lng: f64, lat: f64) -> bool {
        self.central_angle(lng, lat) <= self.radius_radians
    }
}
