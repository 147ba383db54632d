use axum::{Router, extract::DefaultBodyLimit, routing::post};

use super::handlers::upload_file;
use crate::app_state::AppState;

/// Headroom for multipart boundaries and part headers on top of the file limit.
pub(crate) const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn upload_routes(max_media_bytes: usize) -> Router<AppState> {
    Router::new().route(
        "/upload",
        post(upload_file).layer(DefaultBodyLimit::max(max_media_bytes + MULTIPART_OVERHEAD)),
    )
}
