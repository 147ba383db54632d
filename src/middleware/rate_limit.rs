use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};

use crate::app_state::AppState;
use crate::config::RateLimitConfig;
use crate::error::AppError;
use crate::middleware::auth::{CurrentUser, MaybeUser};

/// Per-endpoint budgets, counted per client within one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitBucket {
    Auth,
    CoursePost,
    ResourceGet,
    ResourcePost,
    ProfileGet,
    ProfilePatch,
    ProfileDelete,
    Upload,
}

impl RateLimitBucket {
    pub fn limit(self) -> u32 {
        match self {
            RateLimitBucket::Auth => 20,
            RateLimitBucket::CoursePost => 10,
            RateLimitBucket::ResourceGet => 60,
            RateLimitBucket::ResourcePost => 10,
            RateLimitBucket::ProfileGet => 20,
            RateLimitBucket::ProfilePatch => 10,
            RateLimitBucket::ProfileDelete => 5,
            RateLimitBucket::Upload => 10,
        }
    }
}

struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window request counter.
pub struct RateLimiter {
    enabled: bool,
    window: Duration,
    windows: Mutex<HashMap<(RateLimitBucket, String), Window>>,
}

/// Stale windows are swept once the map grows past this many entries.
const SWEEP_THRESHOLD: usize = 10_000;

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            enabled: config.enabled,
            window: Duration::from_secs(config.window_secs),
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, bucket: RateLimitBucket, client: &str) -> Result<(), AppError> {
        self.check_at(bucket, client, Instant::now())
    }

    fn check_at(&self, bucket: RateLimitBucket, client: &str, now: Instant) -> Result<(), AppError> {
        if !self.enabled {
            return Ok(());
        }
        let mut windows = self
            .windows
            .lock()
            .map_err(|_| AppError::InternalServerError("rate limiter lock poisoned".to_string()))?;

        if windows.len() > SWEEP_THRESHOLD {
            let window = self.window;
            windows.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = windows
            .entry((bucket, client.to_string()))
            .or_insert(Window { started: now, count: 0 });
        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }
        if entry.count >= bucket.limit() {
            let remaining = self.window.saturating_sub(now.duration_since(entry.started));
            tracing::warn!(?bucket, client, "Rate limit exceeded");
            return Err(AppError::RateLimited {
                retry_after_secs: remaining.as_secs().max(1),
            });
        }
        entry.count += 1;
        Ok(())
    }
}

/// Signed-in callers are keyed by user id, everyone else by forwarded address.
pub fn client_key(headers: &HeaderMap, user: Option<&CurrentUser>) -> String {
    if let Some(user) = user {
        return format!("user:{}", user.id);
    }
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| format!("ip:{}", ip.trim()))
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Type-level handle on a bucket, for use with [`RateLimited`].
pub trait Budget: Send + Sync + 'static {
    const BUCKET: RateLimitBucket;
}

pub struct AuthBudget;
pub struct CoursePostBudget;
pub struct ResourcePostBudget;
pub struct ProfilePatchBudget;

impl Budget for AuthBudget {
    const BUCKET: RateLimitBucket = RateLimitBucket::Auth;
}

impl Budget for CoursePostBudget {
    const BUCKET: RateLimitBucket = RateLimitBucket::CoursePost;
}

impl Budget for ResourcePostBudget {
    const BUCKET: RateLimitBucket = RateLimitBucket::ResourcePost;
}

impl Budget for ProfilePatchBudget {
    const BUCKET: RateLimitBucket = RateLimitBucket::ProfilePatch;
}

/// Counts the request against `B` from the request head alone. Listed ahead of
/// a body extractor, so malformed or invalid bodies still use up the budget.
pub struct RateLimited<B>(PhantomData<B>);

impl<B: Budget> FromRequestParts<AppState> for RateLimited<B> {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Sign-in endpoints are keyed by address even when a token is sent.
        let user = if B::BUCKET == RateLimitBucket::Auth {
            None
        } else {
            MaybeUser::from_request_parts(parts, state).await?.0
        };
        state
            .rate_limiter
            .check(B::BUCKET, &client_key(&parts.headers, user.as_ref()))?;
        Ok(RateLimited(PhantomData))
    }
}
