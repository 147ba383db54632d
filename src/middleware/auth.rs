use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use sqlx::types::Uuid;
use time::OffsetDateTime;

use crate::app_state::AppState;
use crate::db::{UserRepository, UserRole};
use crate::error::AppError;

/// The signed-in caller, resolved from an `Authorization: Bearer` session token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub role: UserRole,
    pub token: String,
}

/// Like `CurrentUser`, but anonymous callers are allowed through as `None`.
/// A token that is present but unknown or expired is still rejected.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

impl MaybeUser {
    pub fn id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|user| user.id)
    }
}

fn bearer_token(parts: &Parts) -> Result<Option<String>, AppError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::Authentication("Malformed authorization header".to_string()))?;
    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Authentication("Expected a bearer token".to_string()))?;
    Ok(Some(token.to_string()))
}

async fn resolve(parts: &mut Parts, state: &AppState) -> Result<Option<CurrentUser>, AppError> {
    if let Some(user) = parts.extensions.get::<CurrentUser>() {
        return Ok(Some(user.clone()));
    }
    let Some(token) = bearer_token(parts)? else {
        return Ok(None);
    };

    let session = UserRepository::get_session(&state.db, &token)
        .await?
        .ok_or_else(|| AppError::Authentication("Unknown session".to_string()))?;
    if session.is_expired(OffsetDateTime::now_utc()) {
        return Err(AppError::Authentication("Session expired".to_string()));
    }
    let user = UserRepository::get_user_by_id(&state.db, session.user_id)
        .await?
        .ok_or_else(|| AppError::Authentication("Unknown user".to_string()))?;

    let current = CurrentUser {
        id: user.id,
        role: user.role,
        token,
    };
    parts.extensions.insert(current.clone());
    Ok(Some(current))
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve(parts, state)
            .await?
            .ok_or_else(|| AppError::Authentication("Missing bearer token".to_string()))
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(resolve(parts, state).await?))
    }
}
