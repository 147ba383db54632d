use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
    routing::get,
};
use serde_json::{Value, json};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::{
    app_state::AppState,
    middleware::observability_middleware,
    modules::{
        auth::routes::auth_routes, courses::routes::course_routes,
        profile::routes::profile_routes, resources::routes::resource_routes,
        uploads::routes::upload_routes,
    },
};

pub fn create_router(state: AppState) -> Router {
    let max_image_bytes = state.env.uploads.max_image_bytes;
    let max_media_bytes = state.env.uploads.max_media_bytes;
    let upload_dir = state.uploads.dir().to_path_buf();

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/", get(hello))
        .route("/health", get(health_check))
        .nest("/auth", auth_routes())
        .nest("/courses", course_routes())
        .nest("/resources", resource_routes())
        .nest("/profile", profile_routes(max_image_bytes))
        .merge(upload_routes(max_media_bytes))
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .layer(middleware::from_fn(observability_middleware))
        .layer(cors)
        .with_state(state)
}

async fn hello(State(state): State<AppState>) -> String {
    format!("{} says hello!\n", state.env.app.name)
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let db_status = match state.db.ping().await {
        Ok(()) => "healthy",
        Err(e) => {
            tracing::info!("Database health check failed: {}", e);
            "unhealthy"
        }
    };

    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();

    Json(json!({
        "status": "ok",
        "timestamp": timestamp,
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "database": db_status,
            "telemetry": {
                "otlp_export": crate::telemetry::otlp_export_active()
            }
        }
    }))
}
