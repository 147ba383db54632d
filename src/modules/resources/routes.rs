use axum::{
    Router,
    routing::patch,
};

use super::handlers::{delete_resource, set_resource_status, update_resource};
use crate::app_state::AppState;

/// Per-resource routes. Listing and attaching live under `/courses/{id}/resources`.
pub fn resource_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", patch(update_resource).delete(delete_resource))
        .route("/{id}/status", patch(set_resource_status))
}
