use axum::{
    Json,
    extract::{Multipart, State},
    http::HeaderMap,
};
use serde_json::{Value, json};
use tracing::info;

use crate::app_state::AppState;
use crate::db::{Profile, ProfilePatch, ProfileRepository};
use crate::error::{AppError, AppResult};
use crate::middleware::{CurrentUser, ProfilePatchBudget, RateLimitBucket, RateLimited, client_key};
use crate::modules::uploads::{IMAGE_TYPES, UploadPolicy, read_file_field};
use crate::validation::ValidatedJson;

pub async fn get_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
) -> AppResult<Json<Profile>> {
    state
        .rate_limiter
        .check(RateLimitBucket::ProfileGet, &client_key(&headers, Some(&user)))?;

    let profile = ProfileRepository::get_or_create_profile(&state.db, user.id).await?;
    Ok(Json(profile))
}

/// Upsert of the allow-listed fields; anything else in the body was already
/// dropped by `ProfilePatch` deserialization.
pub async fn patch_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    _: RateLimited<ProfilePatchBudget>,
    ValidatedJson(patch): ValidatedJson<ProfilePatch>,
) -> AppResult<Json<Profile>> {
    let mut profile = ProfileRepository::get_or_create_profile(&state.db, user.id).await?;
    profile.apply(patch);
    let profile = ProfileRepository::save_profile(&state.db, profile).await?;
    info!(user_id = %user.id, "Profile updated");
    Ok(Json(profile))
}

pub async fn delete_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    state
        .rate_limiter
        .check(RateLimitBucket::ProfileDelete, &client_key(&headers, Some(&user)))?;

    if !ProfileRepository::delete_profile(&state.db, user.id).await? {
        return Err(AppError::NotFound("Profile not found".to_string()));
    }
    info!(user_id = %user.id, "Profile deleted");
    Ok(Json(json!({ "message": "Profile deleted" })))
}

pub async fn upload_avatar(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> AppResult<Json<Profile>> {
    state
        .rate_limiter
        .check(RateLimitBucket::ProfilePatch, &client_key(&headers, Some(&user)))?;

    let policy = UploadPolicy {
        allowed_types: IMAGE_TYPES,
        max_bytes: state.env.uploads.max_image_bytes,
    };
    let image = read_file_field(&mut multipart, policy).await?;
    let stored = state.uploads.save(image).await?;

    let mut profile = ProfileRepository::get_or_create_profile(&state.db, user.id).await?;
    profile.apply(ProfilePatch {
        image_url: Some(stored.url),
        ..ProfilePatch::default()
    });
    let profile = ProfileRepository::save_profile(&state.db, profile).await?;
    info!(user_id = %user.id, "Avatar updated");
    Ok(Json(profile))
}
