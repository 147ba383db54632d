use std::sync::Arc;

use crate::config::Config;
use crate::db::Database;
use crate::middleware::RateLimiter;
use crate::modules::uploads::UploadStore;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub env: Arc<Config>,
    pub rate_limiter: Arc<RateLimiter>,
    pub uploads: UploadStore,
}

impl AppState {
    pub fn new(db: Database, env: Config) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(&env.rate_limit));
        let uploads = UploadStore::new(env.uploads.dir.clone());
        Self {
            db,
            env: Arc::new(env),
            rate_limiter,
            uploads,
        }
    }
}
