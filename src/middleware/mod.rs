pub mod auth;
pub mod rate_limit;
pub mod tracing;

pub use auth::{CurrentUser, MaybeUser};
pub use rate_limit::{
    AuthBudget, CoursePostBudget, ProfilePatchBudget, RateLimitBucket, RateLimited, RateLimiter,
    ResourcePostBudget, client_key,
};
pub use self::tracing::observability_middleware;
