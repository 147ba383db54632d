use std::collections::HashMap;

use sqlx::types::Uuid;
use tokio::sync::RwLock;

use super::models::{Course, Enrollment, Profile, Resource, Session, User};

/// In-process document store, one map per collection.
///
/// When several collections are locked together they are taken in field
/// declaration order.
#[derive(Default)]
pub struct MemoryStore {
    pub(crate) users: RwLock<HashMap<Uuid, User>>,
    pub(crate) sessions: RwLock<HashMap<String, Session>>,
    pub(crate) courses: RwLock<HashMap<Uuid, Course>>,
    pub(crate) enrollments: RwLock<HashMap<(Uuid, Uuid), Enrollment>>,
    pub(crate) resources: RwLock<HashMap<Uuid, Resource>>,
    pub(crate) profiles: RwLock<HashMap<Uuid, Profile>>,
}
