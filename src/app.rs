use axum::{
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use std::any::Any;
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::database::DocumentStore;
use crate::error::ApiError;
use crate::geo::Geocoder;
use crate::handlers::{bootcamps, courses, public};
use crate::middleware::jwt_auth_middleware;

/// Shared handles injected into every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub geocoder: Arc<dyn Geocoder>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, geocoder: Arc<dyn Geocoder>, config: AppConfig) -> Self {
        Self { store, geocoder, config: Arc::new(config) }
    }
}

pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(read_routes())
        // Publisher/admin writes
        .merge(write_routes(state.clone()))
        .fallback(public::not_found);

    if state.config.security.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }
    if state.config.security.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.layer(CatchPanicLayer::custom(panic_response)).with_state(state)
}

/// A panicking handler is logged and answered with a 500 envelope
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("handler panicked: {}", detail);
    ApiError::internal_server_error("Server Error").into_response()
}

fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/bootcamps", get(bootcamps::list))
        .route("/api/v1/bootcamps/:id", get(bootcamps::get))
        .route("/api/v1/bootcamps/radius/:zipcode/:distance", get(bootcamps::radius))
        .route("/api/v1/bootcamps/:id/courses", get(courses::list_for_bootcamp))
        .route("/api/v1/courses", get(courses::list))
        .route("/api/v1/courses/:id", get(courses::get))
}

fn write_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/bootcamps", post(bootcamps::post))
        .route("/api/v1/bootcamps/:id", put(bootcamps::put).delete(bootcamps::delete))
        .route("/api/v1/bootcamps/:id/courses", post(courses::post))
        .route("/api/v1/courses/:id", put(courses::put).delete(courses::delete))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Claims, Role};
    use crate::database::MemoryStore;
    use crate::geo::StaticGeocoder;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn router() -> Router {
        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            Arc::new(StaticGeocoder::default()),
            AppConfig::development(),
        );
        app(state)
    }

    fn token(role: Role) -> String {
        let claims = Claims { id: "u1".to_string(), role, exp: chrono::Utc::now().timestamp() + 600, iat: 0 };
        let secret = AppConfig::development().security.jwt_secret;
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn post_bootcamp(auth: Option<String>) -> Request<Body> {
        let mut builder = Request::post("/api/v1/bootcamps").header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = auth {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(json!({ "name": "Devworks" }).to_string())).unwrap()
    }

    #[tokio::test]
    async fn empty_listing_envelope() {
        let (status, body) = send(Request::get("/api/v1/bootcamps").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "count": 0, "pagination": {}, "data": [] }));
    }

    #[tokio::test]
    async fn writes_require_a_token() {
        let (status, body) = send(post_bootcamp(None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], json!(false));
    }

    #[tokio::test]
    async fn writes_require_publisher_or_admin() {
        let (status, body) = send(post_bootcamp(Some(token(Role::User)))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], json!("User role user is not authorized to access this route"));
    }

    #[tokio::test]
    async fn invalid_bodies_report_fields() {
        let (status, body) = send(post_bootcamp(Some(token(Role::Publisher)))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["fields"]["description"], json!("Please add a description"));
    }

    #[tokio::test]
    async fn unknown_operator_is_bad_request() {
        let request = Request::get("/api/v1/bootcamps?averageCost%5Bne%5D=5").body(Body::empty()).unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
    }

    #[tokio::test]
    async fn missing_bootcamp_is_not_found() {
        let (status, body) = send(Request::get("/api/v1/bootcamps/nope").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], json!("Bootcamp not found with id of nope"));
    }

    #[tokio::test]
    async fn malformed_json_uses_error_envelope() {
        let request = Request::post("/api/v1/bootcamps")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", token(Role::Publisher)))
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
        assert!(body["error"].as_str().unwrap().contains("JSON"), "unexpected error {}", body);
    }

    #[tokio::test]
    async fn unknown_routes_use_error_envelope() {
        let (status, body) = send(Request::get("/api/v2/nothing").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "success": false, "error": "Route /api/v2/nothing not found" }));
    }

    #[tokio::test]
    async fn panics_become_server_errors() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "success": false, "error": "Server Error" }));
    }
}
