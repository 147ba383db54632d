use axum::{
    Router,
    routing::{get, post},
};

use super::handlers::{current_user, login, logout, register};
use crate::app_state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(current_user))
}
