use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: Uuid,
    pub course_id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub enrolled_at: OffsetDateTime,
}

impl Enrollment {
    pub fn new(course_id: Uuid, user_id: Uuid) -> Self {
        Enrollment {
            id: Uuid::now_v7(),
            course_id,
            user_id,
            enrolled_at: OffsetDateTime::now_utc(),
        }
    }
}
