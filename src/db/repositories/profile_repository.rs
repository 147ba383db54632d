use sqlx::types::{Json, Uuid};
use time::OffsetDateTime;

use crate::db::models::{Education, Experience, Profile, Skill};
use crate::db::{Database, DatabaseError};

#[derive(sqlx::FromRow)]
struct ProfileRow {
    user_id: Uuid,
    image_url: Option<String>,
    education: Json<Vec<Education>>,
    experience: Json<Vec<Experience>>,
    skills: Json<Vec<Skill>>,
    last_updated: OffsetDateTime,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            user_id: row.user_id,
            image_url: row.image_url,
            education: row.education.0,
            experience: row.experience.0,
            skills: row.skills.0,
            last_updated: row.last_updated,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct ProfileRepository;

impl ProfileRepository {
    /// Returns the user's profile, creating an empty one on first access.
    pub async fn get_or_create_profile(db: &Database, user_id: Uuid) -> Result<Profile, DatabaseError> {
        match db {
            Database::Postgres(pool) => {
                let empty = Profile::empty(user_id);
                sqlx::query(
                    r#"
                    INSERT INTO profiles (user_id, education, experience, skills, last_updated, created_at, updated_at)
                    VALUES ($1, '[]'::jsonb, '[]'::jsonb, '[]'::jsonb, $2, $2, $2)
                    ON CONFLICT (user_id) DO NOTHING
                    "#,
                )
                .bind(user_id)
                .bind(empty.created_at)
                .execute(pool)
                .await?;
                let row = sqlx::query_as::<_, ProfileRow>(
                    r#"
                    SELECT user_id, image_url, education, experience, skills, last_updated, created_at, updated_at
                    FROM profiles
                    WHERE user_id = $1
                    "#,
                )
                .bind(user_id)
                .fetch_one(pool)
                .await?;
                Ok(row.into())
            }
            Database::Memory(store) => Ok(store
                .profiles
                .write()
                .await
                .entry(user_id)
                .or_insert_with(|| Profile::empty(user_id))
                .clone()),
        }
    }

    /// Upserts the whole profile document.
    pub async fn save_profile(db: &Database, profile: Profile) -> Result<Profile, DatabaseError> {
        match db {
            Database::Postgres(pool) => {
                let row = sqlx::query_as::<_, ProfileRow>(
                    r#"
                    INSERT INTO profiles (user_id, image_url, education, experience, skills, last_updated, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    ON CONFLICT (user_id) DO UPDATE
                    SET
                        image_url = EXCLUDED.image_url,
                        education = EXCLUDED.education,
                        experience = EXCLUDED.experience,
                        skills = EXCLUDED.skills,
                        last_updated = EXCLUDED.last_updated,
                        updated_at = EXCLUDED.updated_at
                    RETURNING user_id, image_url, education, experience, skills, last_updated, created_at, updated_at
                    "#,
                )
                .bind(profile.user_id)
                .bind(&profile.image_url)
                .bind(Json(&profile.education))
                .bind(Json(&profile.experience))
                .bind(Json(&profile.skills))
                .bind(profile.last_updated)
                .bind(profile.created_at)
                .bind(profile.updated_at)
                .fetch_one(pool)
                .await?;
                Ok(row.into())
            }
            Database::Memory(store) => {
                store
                    .profiles
                    .write()
                    .await
                    .insert(profile.user_id, profile.clone());
                Ok(profile)
            }
        }
    }

    /// Returns whether a profile existed.
    pub async fn delete_profile(db: &Database, user_id: Uuid) -> Result<bool, DatabaseError> {
        match db {
            Database::Postgres(pool) => {
                let result = sqlx::query("DELETE FROM profiles WHERE user_id = $1")
                    .bind(user_id)
                    .execute(pool)
                    .await?;
                Ok(result.rows_affected() > 0)
            }
            Database::Memory(store) => Ok(store.profiles.write().await.remove(&user_id).is_some()),
        }
    }
}
