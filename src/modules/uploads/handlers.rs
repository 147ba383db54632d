use axum::{
    Json,
    extract::{Multipart, State},
    http::HeaderMap,
};

use super::{MEDIA_TYPES, StoredFile, UploadPolicy, read_file_field};
use crate::app_state::AppState;
use crate::error::AppResult;
use crate::middleware::{CurrentUser, RateLimitBucket, client_key};

pub async fn upload_file(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> AppResult<Json<StoredFile>> {
    state
        .rate_limiter
        .check(RateLimitBucket::Upload, &client_key(&headers, Some(&user)))?;

    let policy = UploadPolicy {
        allowed_types: MEDIA_TYPES,
        max_bytes: state.env.uploads.max_media_bytes,
    };
    let file = read_file_field(&mut multipart, policy).await?;
    let stored = state.uploads.save(file).await?;
    tracing::info!(user_id = %user.id, url = %stored.url, "Media uploaded");
    Ok(Json(stored))
}
