use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Extension, Path, RawQuery, State};
use axum::Json;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::course;
use crate::database::Document;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::query::{FilterRequest, QueryBuilder};
use crate::services::CourseService;

use super::require_writer;

/// GET /api/v1/courses - query-builder listing with the parent bootcamp summarised
pub async fn list(State(state): State<AppState>, RawQuery(query): RawQuery) -> ApiResult<Vec<Document>> {
    let request = FilterRequest::parse(query.as_deref().unwrap_or_default());
    let outcome = QueryBuilder::new(course::schema())
        .configure(&state.config.query)
        .populate(course::BOOTCAMP)
        .build_and_execute(&request, state.store.as_ref())
        .await?;

    Ok(ApiResponse::list(outcome.items).with_pagination(outcome.pagination))
}

/// GET /api/v1/bootcamps/:bootcampId/courses
pub async fn list_for_bootcamp(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Vec<Document>> {
    let Path(bootcamp_id) = path?;
    let courses = CourseService::new(state.store.as_ref()).select_for_bootcamp(&bootcamp_id).await?;
    Ok(ApiResponse::list(courses))
}

/// GET /api/v1/courses/:id
pub async fn get(State(state): State<AppState>, path: Result<Path<String>, PathRejection>) -> ApiResult<Document> {
    let Path(id) = path?;
    let course = CourseService::new(state.store.as_ref()).select_populated_404(&id).await?;
    Ok(ApiResponse::success(course))
}

/// POST /api/v1/bootcamps/:bootcampId/courses
pub async fn post(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    Extension(user): Extension<AuthUser>,
    body: Result<Json<Document>, JsonRejection>,
) -> ApiResult<Document> {
    require_writer(&user)?;
    let (Path(bootcamp_id), Json(body)) = (path?, body?);
    let created = CourseService::new(state.store.as_ref()).create_one(&bootcamp_id, body, &user).await?;
    Ok(ApiResponse::created(created))
}

/// PUT /api/v1/courses/:id
pub async fn put(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    Extension(user): Extension<AuthUser>,
    body: Result<Json<Document>, JsonRejection>,
) -> ApiResult<Document> {
    require_writer(&user)?;
    let (Path(id), Json(body)) = (path?, body?);
    let updated = CourseService::new(state.store.as_ref()).update_404(&id, body, &user).await?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/v1/courses/:id
pub async fn delete(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Value> {
    require_writer(&user)?;
    let Path(id) = path?;
    CourseService::new(state.store.as_ref()).delete_404(&id, &user).await?;
    Ok(ApiResponse::success(json!({})))
}
