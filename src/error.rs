// HTTP API Error Types
use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Map, Value};

use crate::database::models::ValidationError;
use crate::database::StoreError;
use crate::geo::{GeocodeError, RadiusError};
use crate::query::QueryError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        fields: Vec<(String, String)>,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway (geocoder failures)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::InternalServerError(msg)
            | ApiError::BadGateway(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "success": false,
            "error": self.message(),
        });
        if let ApiError::ValidationError { fields, .. } = self {
            let map: Map<String, Value> =
                fields.iter().map(|(field, msg)| (field.clone(), Value::String(msg.clone()))).collect();
            body["fields"] = Value::Object(map);
        }
        body
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    /// `"<Resource> not found with id of <id>"`
    pub fn resource_not_found(resource: &str, id: &str) -> Self {
        ApiError::NotFound(format!("{} not found with id of {}", resource, id))
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::BadGateway(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::ValidationError { message: err.to_string(), fields: err.fields }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Connection(msg) => {
                tracing::error!("Store connection error: {}", msg);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            StoreError::Sqlx(sqlx::Error::PoolTimedOut) | StoreError::Sqlx(sqlx::Error::PoolClosed) => {
                tracing::error!("Store pool unavailable");
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            StoreError::InvalidDocument(msg) => ApiError::bad_request(msg),
            other => {
                // Don't expose internal store errors to clients
                tracing::error!("Store error: {}", other);
                ApiError::internal_server_error("Server Error")
            }
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Store(store) => store.into(),
            other => ApiError::bad_request(other.to_string()),
        }
    }
}

impl From<GeocodeError> for ApiError {
    fn from(err: GeocodeError) -> Self {
        tracing::error!("Geocoder error: {}", err);
        match err {
            GeocodeError::NotConfigured(_) | GeocodeError::Fixtures(_) => {
                ApiError::service_unavailable("Geocoding is not available")
            }
            GeocodeError::Http(_) | GeocodeError::Upstream(_) => ApiError::bad_gateway("Geocoding request failed"),
        }
    }
}

impl From<RadiusError> for ApiError {
    fn from(err: RadiusError) -> Self {
        match err {
            RadiusError::NoLocation(_) => ApiError::not_found(err.to_string()),
            RadiusError::InvalidDistance(_) => ApiError::bad_request(err.to_string()),
            RadiusError::Geocode(e) => e.into(),
            RadiusError::Store(e) => e.into(),
        }
    }
}

// Extractor rejections keep axum's message but use the error envelope
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_carry_field_map() {
        let err: ApiError = ValidationError {
            fields: vec![
                ("name".to_string(), "Please add a name".to_string()),
                ("address".to_string(), "Please add an address".to_string()),
            ],
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_json(),
            json!({
                "success": false,
                "error": "Please add a name, Please add an address",
                "fields": { "name": "Please add a name", "address": "Please add an address" }
            })
        );
    }

    #[test]
    fn query_errors_are_bad_requests() {
        let err: ApiError =
            QueryError::UnsupportedOperator { field: "averageCost".to_string(), operator: "ne".to_string() }.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_json().get("fields").is_none());
    }

    #[test]
    fn internal_store_errors_are_not_exposed() {
        let err: ApiError = StoreError::Query("syntax error at or near".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Server Error");
    }

    #[test]
    fn unknown_postal_code_is_not_found() {
        let err: ApiError = RadiusError::NoLocation("00000".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
