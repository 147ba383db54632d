use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use serde_json::{Value, json};
use sqlx::types::Uuid;
use tracing::info;

use crate::app_state::AppState;
use crate::db::{
    AccessLevel, EnrollmentRepository, NewResource, Resource, ResourceRepository,
    UpdateResource, UpdateResourceStatus,
};
use crate::error::{AppError, AppResult};
use crate::middleware::{
    CurrentUser, MaybeUser, RateLimitBucket, RateLimited, ResourcePostBudget, client_key,
};
use crate::modules::courses::handlers::{load_owned_course, load_visible_course};
use crate::validation::{FieldError, ValidatedJson};

/// Resolves a resource and checks that the caller owns its course.
async fn load_owned_resource(
    state: &AppState,
    resource_id: Uuid,
    user: &CurrentUser,
) -> AppResult<Resource> {
    let resource = ResourceRepository::get_resource_by_id(&state.db, resource_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Resource not found".to_string()))?;
    load_owned_course(state, resource.course_id, user).await?;
    Ok(resource)
}

pub async fn list_resources(
    State(state): State<AppState>,
    viewer: MaybeUser,
    headers: HeaderMap,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<Vec<Resource>>> {
    state
        .rate_limiter
        .check(RateLimitBucket::ResourceGet, &client_key(&headers, viewer.0.as_ref()))?;

    let course = load_visible_course(&state, course_id, viewer.id()).await?;
    let granted = match viewer.id() {
        Some(id) if course.is_owned_by(id) => AccessLevel::Instructor,
        Some(id) => {
            if EnrollmentRepository::is_enrolled(&state.db, course_id, id).await? {
                AccessLevel::Enrolled
            } else {
                AccessLevel::Public
            }
        }
        None => AccessLevel::Public,
    };

    let resources = ResourceRepository::list_visible_resources(&state.db, course_id, granted).await?;
    Ok(Json(resources))
}

pub async fn attach_resource(
    State(state): State<AppState>,
    user: CurrentUser,
    _: RateLimited<ResourcePostBudget>,
    Path(course_id): Path<Uuid>,
    ValidatedJson(input): ValidatedJson<NewResource>,
) -> AppResult<(StatusCode, Json<Resource>)> {
    load_owned_course(&state, course_id, &user).await?;
    let resource =
        ResourceRepository::create_resource(&state.db, Resource::new(input, course_id, user.id))
            .await?;
    info!(resource_id = %resource.id, course_id = %course_id, "Resource attached");
    Ok((StatusCode::CREATED, Json(resource)))
}

pub async fn update_resource(
    State(state): State<AppState>,
    user: CurrentUser,
    _: RateLimited<ResourcePostBudget>,
    Path(resource_id): Path<Uuid>,
    ValidatedJson(update): ValidatedJson<UpdateResource>,
) -> AppResult<Json<Resource>> {
    let mut resource = load_owned_resource(&state, resource_id, &user).await?;
    resource.apply(update);
    let resource = ResourceRepository::update_resource(&state.db, resource).await?;
    Ok(Json(resource))
}

pub async fn set_resource_status(
    State(state): State<AppState>,
    user: CurrentUser,
    _: RateLimited<ResourcePostBudget>,
    Path(resource_id): Path<Uuid>,
    ValidatedJson(UpdateResourceStatus { status }): ValidatedJson<UpdateResourceStatus>,
) -> AppResult<Json<Resource>> {
    let mut resource = load_owned_resource(&state, resource_id, &user).await?;
    if !resource.status.can_transition_to(status) {
        return Err(AppError::Validation(vec![FieldError {
            field: "status".to_string(),
            message: format!(
                "Cannot move a resource from {:?} to {:?}",
                resource.status, status
            )
            .to_lowercase(),
        }]));
    }

    let previous = resource.status;
    resource.status = status;
    resource.updated_at = time::OffsetDateTime::now_utc();
    let resource = ResourceRepository::update_resource(&state.db, resource).await?;
    info!(resource_id = %resource.id, from = ?previous, to = ?resource.status, "Resource status changed");
    Ok(Json(resource))
}

pub async fn delete_resource(
    State(state): State<AppState>,
    user: CurrentUser,
    _: RateLimited<ResourcePostBudget>,
    Path(resource_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    load_owned_resource(&state, resource_id, &user).await?;
    ResourceRepository::delete_resource(&state.db, resource_id).await?;
    info!(resource_id = %resource_id, "Resource deleted");
    Ok(Json(json!({ "message": "Resource deleted" })))
}
