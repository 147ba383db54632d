use axum::{
    Router,
    routing::{get, post},
};

use super::handlers::{
    create_course, delete_course, enroll, get_course, list_courses, unenroll, update_course,
};
use crate::app_state::AppState;
use crate::modules::resources::handlers::{attach_resource, list_resources};

pub fn course_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_courses).post(create_course))
        .route("/{id}", get(get_course).put(update_course).delete(delete_course))
        .route("/{id}/enroll", post(enroll).delete(unenroll))
        .route("/{id}/resources", get(list_resources).post(attach_resource))
}
