use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use super::handlers::{delete_profile, get_profile, patch_profile, upload_avatar};
use crate::app_state::AppState;
use crate::modules::uploads::routes::MULTIPART_OVERHEAD;

pub fn profile_routes(max_image_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(get_profile).patch(patch_profile).delete(delete_profile))
        .route(
            "/avatar",
            post(upload_avatar).layer(DefaultBodyLimit::max(max_image_bytes + MULTIPART_OVERHEAD)),
        )
}
