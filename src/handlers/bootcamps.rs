use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Extension, Path, RawQuery, State};
use axum::Json;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::bootcamp;
use crate::database::Document;
use crate::geo::{find_within_radius, radius::parse_distance};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::query::{FilterRequest, QueryBuilder};
use crate::services::BootcampService;

use super::require_writer;

/// GET /api/v1/bootcamps - filtered, sorted, paginated listing with courses
pub async fn list(State(state): State<AppState>, RawQuery(query): RawQuery) -> ApiResult<Vec<Document>> {
    let request = FilterRequest::parse(query.as_deref().unwrap_or_default());
    let outcome = QueryBuilder::new(bootcamp::schema())
        .configure(&state.config.query)
        .populate(bootcamp::COURSES)
        .build_and_execute(&request, state.store.as_ref())
        .await?;

    Ok(ApiResponse::list(outcome.items).with_pagination(outcome.pagination))
}

/// GET /api/v1/bootcamps/:id
pub async fn get(State(state): State<AppState>, path: Result<Path<String>, PathRejection>) -> ApiResult<Document> {
    let Path(id) = path?;
    let service = BootcampService::new(state.store.as_ref(), state.geocoder.as_ref());
    Ok(ApiResponse::success(service.select_404(&id).await?))
}

/// POST /api/v1/bootcamps
pub async fn post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Result<Json<Document>, JsonRejection>,
) -> ApiResult<Document> {
    require_writer(&user)?;
    let Json(body) = body?;
    let service = BootcampService::new(state.store.as_ref(), state.geocoder.as_ref());
    Ok(ApiResponse::created(service.create_one(body, &user).await?))
}

/// PUT /api/v1/bootcamps/:id
pub async fn put(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    Extension(user): Extension<AuthUser>,
    body: Result<Json<Document>, JsonRejection>,
) -> ApiResult<Document> {
    require_writer(&user)?;
    let (Path(id), Json(body)) = (path?, body?);
    let service = BootcampService::new(state.store.as_ref(), state.geocoder.as_ref());
    Ok(ApiResponse::success(service.update_404(&id, body, &user).await?))
}

/// DELETE /api/v1/bootcamps/:id - also removes the bootcamp's courses
pub async fn delete(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Value> {
    require_writer(&user)?;
    let Path(id) = path?;
    let service = BootcampService::new(state.store.as_ref(), state.geocoder.as_ref());
    service.delete_404(&id, &user).await?;
    Ok(ApiResponse::success(json!({})))
}

/// GET /api/v1/bootcamps/radius/:zipcode/:distance - unpaginated, distance in miles
pub async fn radius(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> ApiResult<Vec<Document>> {
    let Path((zipcode, distance)) = path?;
    let miles = parse_distance(&distance)?;
    let bootcamps = find_within_radius(
        state.store.as_ref(),
        state.geocoder.as_ref(),
        bootcamp::COLLECTION,
        &zipcode,
        miles,
    )
    .await?;
    Ok(ApiResponse::list(bootcamps))
}
