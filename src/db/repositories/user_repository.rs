use sqlx::types::Uuid;
use time::OffsetDateTime;

use crate::db::models::{Session, User};
use crate::db::{Database, DatabaseError};

pub struct UserRepository;

impl UserRepository {
    /// Emails are stored lowercase; a second account for the same address is
    /// a `Duplicate`.
    pub async fn create_user(db: &Database, mut user: User) -> Result<User, DatabaseError> {
        user.email = user.email.to_lowercase();
        match db {
            Database::Postgres(pool) => {
                let user = sqlx::query_as::<_, User>(
                    r#"
                    INSERT INTO users (id, email, name, password_hash, role, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    RETURNING id, email, name, password_hash, role, created_at, updated_at
                    "#,
                )
                .bind(user.id)
                .bind(&user.email)
                .bind(&user.name)
                .bind(&user.password_hash)
                .bind(user.role)
                .bind(user.created_at)
                .bind(user.updated_at)
                .fetch_one(pool)
                .await?;
                Ok(user)
            }
            Database::Memory(store) => {
                let mut users = store.users.write().await;
                if users.values().any(|u| u.email == user.email) {
                    return Err(DatabaseError::Duplicate);
                }
                users.insert(user.id, user.clone());
                Ok(user)
            }
        }
    }

    pub async fn get_user_by_id(db: &Database, user_id: Uuid) -> Result<Option<User>, DatabaseError> {
        match db {
            Database::Postgres(pool) => Ok(sqlx::query_as::<_, User>(
                r#"
                SELECT id, email, name, password_hash, role, created_at, updated_at
                FROM users
                WHERE id = $1
                "#,
            )
            .bind(user_id)
            .fetch_optional(pool)
            .await?),
            Database::Memory(store) => Ok(store.users.read().await.get(&user_id).cloned()),
        }
    }

    pub async fn get_user_by_email(db: &Database, email: &str) -> Result<Option<User>, DatabaseError> {
        let email = email.to_lowercase();
        match db {
            Database::Postgres(pool) => Ok(sqlx::query_as::<_, User>(
                r#"
                SELECT id, email, name, password_hash, role, created_at, updated_at
                FROM users
                WHERE email = $1
                "#,
            )
            .bind(&email)
            .fetch_optional(pool)
            .await?),
            Database::Memory(store) => Ok(store
                .users
                .read()
                .await
                .values()
                .find(|u| u.email == email)
                .cloned()),
        }
    }

    // Session specific functions
    pub async fn create_session(db: &Database, session: Session) -> Result<Session, DatabaseError> {
        match db {
            Database::Postgres(pool) => Ok(sqlx::query_as::<_, Session>(
                r#"
                INSERT INTO sessions (token, user_id, expires_at, created_at)
                VALUES ($1, $2, $3, $4)
                RETURNING token, user_id, expires_at, created_at
                "#,
            )
            .bind(&session.token)
            .bind(session.user_id)
            .bind(session.expires_at)
            .bind(session.created_at)
            .fetch_one(pool)
            .await?),
            Database::Memory(store) => {
                store
                    .sessions
                    .write()
                    .await
                    .insert(session.token.clone(), session.clone());
                Ok(session)
            }
        }
    }

    pub async fn get_session(db: &Database, token: &str) -> Result<Option<Session>, DatabaseError> {
        match db {
            Database::Postgres(pool) => Ok(sqlx::query_as::<_, Session>(
                r#"
                SELECT token, user_id, expires_at, created_at
                FROM sessions
                WHERE token = $1
                "#,
            )
            .bind(token)
            .fetch_optional(pool)
            .await?),
            Database::Memory(store) => Ok(store.sessions.read().await.get(token).cloned()),
        }
    }

    pub async fn delete_session(db: &Database, token: &str) -> Result<(), DatabaseError> {
        match db {
            Database::Postgres(pool) => {
                sqlx::query("DELETE FROM sessions WHERE token = $1")
                    .bind(token)
                    .execute(pool)
                    .await?;
            }
            Database::Memory(store) => {
                store.sessions.write().await.remove(token);
            }
        }
        Ok(())
    }

    pub async fn delete_expired_sessions(db: &Database, now: OffsetDateTime) -> Result<u64, DatabaseError> {
        match db {
            Database::Postgres(pool) => {
                let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
                    .bind(now)
                    .execute(pool)
                    .await?;
                Ok(result.rows_affected())
            }
            Database::Memory(store) => {
                let mut sessions = store.sessions.write().await;
                let before = sessions.len();
                sessions.retain(|_, s| !s.is_expired(now));
                Ok((before - sessions.len()) as u64)
            }
        }
    }
}
