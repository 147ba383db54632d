use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use serde_json::{Value, json};
use sqlx::types::Uuid;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};

use super::password::{generate_session_token, hash_password, off_executor, verify_password};
use crate::app_state::AppState;
use crate::db::{DatabaseError, NewUser, Session, User, UserLogin, UserRepository, UserRole};
use crate::error::{AppError, AppResult};
use crate::middleware::{AuthBudget, CurrentUser, RateLimited};
use crate::validation::ValidatedJson;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub user: User,
}

pub async fn register(
    State(state): State<AppState>,
    _: RateLimited<AuthBudget>,
    ValidatedJson(input): ValidatedJson<NewUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    let role = input.role.unwrap_or_default();
    if role == UserRole::Admin {
        return Err(AppError::BadRequest(
            "The admin role cannot be self-assigned".to_string(),
        ));
    }

    let password = input.password;
    let password_hash = off_executor(move || hash_password(&password)).await?;

    let now = OffsetDateTime::now_utc();
    let user = User {
        id: Uuid::now_v7(),
        email: input.email.trim().to_string(),
        name: input.name.trim().to_string(),
        password_hash,
        role,
        created_at: now,
        updated_at: now,
    };

    let user = UserRepository::create_user(&state.db, user)
        .await
        .map_err(|e| match e {
            DatabaseError::Duplicate => {
                AppError::Conflict("An account with this email already exists".to_string())
            }
            other => other.into(),
        })?;

    info!(user_id = %user.id, role = ?user.role, "User registered");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    _: RateLimited<AuthBudget>,
    ValidatedJson(credentials): ValidatedJson<UserLogin>,
) -> AppResult<Json<LoginResponse>> {
    let invalid = || AppError::Authentication("Invalid email or password".to_string());

    let user = UserRepository::get_user_by_email(&state.db, &credentials.email)
        .await?
        .ok_or_else(invalid)?;
    let password = credentials.password;
    let stored_hash = user.password_hash.clone();
    if !off_executor(move || verify_password(&password, &stored_hash)).await? {
        warn!(user_id = %user.id, "Failed login attempt");
        return Err(invalid());
    }

    let now = OffsetDateTime::now_utc();
    let purged = UserRepository::delete_expired_sessions(&state.db, now).await?;
    if purged > 0 {
        debug!(purged, "Removed expired sessions");
    }

    let session = UserRepository::create_session(
        &state.db,
        Session {
            token: generate_session_token(),
            user_id: user.id,
            expires_at: now + Duration::hours(state.env.auth.session_ttl_hours),
            created_at: now,
        },
    )
    .await?;

    info!(user_id = %user.id, "User logged in");
    Ok(Json(LoginResponse {
        token: session.token,
        expires_at: session.expires_at,
        user,
    }))
}

pub async fn logout(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<Value>> {
    UserRepository::delete_session(&state.db, &user.token).await?;
    info!(user_id = %user.id, "User logged out");
    Ok(Json(json!({ "message": "Logged out" })))
}

pub async fn current_user(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<User>> {
    let user = UserRepository::get_user_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}
