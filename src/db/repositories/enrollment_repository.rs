use sqlx::types::Uuid;

use crate::db::models::Enrollment;
use crate::db::{Database, DatabaseError};

pub struct EnrollmentRepository;

impl EnrollmentRepository {
    /// Records the enrollment and bumps the course's `enrollment_count` in
    /// one write. A second enrollment for the same pair is a `Duplicate`.
    pub async fn enroll(db: &Database, enrollment: Enrollment) -> Result<Enrollment, DatabaseError> {
        match db {
            Database::Postgres(pool) => {
                let mut tx = pool.begin().await?;
                let enrollment = sqlx::query_as::<_, Enrollment>(
                    r#"
                    INSERT INTO enrollments (id, course_id, user_id, enrolled_at)
                    VALUES ($1, $2, $3, $4)
                    RETURNING id, course_id, user_id, enrolled_at
                    "#,
                )
                .bind(enrollment.id)
                .bind(enrollment.course_id)
                .bind(enrollment.user_id)
                .bind(enrollment.enrolled_at)
                .fetch_one(&mut *tx)
                .await?;
                sqlx::query(
                    "UPDATE courses SET enrollment_count = enrollment_count + 1 WHERE id = $1",
                )
                .bind(enrollment.course_id)
                .execute(&mut *tx)
                .await?;
                tx.commit()
                    .await
                    .map_err(|e| DatabaseError::TransactionError(e.to_string()))?;
                Ok(enrollment)
            }
            Database::Memory(store) => {
                let mut courses = store.courses.write().await;
                let mut enrollments = store.enrollments.write().await;
                let course = courses
                    .get_mut(&enrollment.course_id)
                    .ok_or(DatabaseError::NotFound)?;
                let key = (enrollment.course_id, enrollment.user_id);
                if enrollments.contains_key(&key) {
                    return Err(DatabaseError::Duplicate);
                }
                enrollments.insert(key, enrollment.clone());
                course.enrollment_count += 1;
                Ok(enrollment)
            }
        }
    }

    pub async fn unenroll(db: &Database, course_id: Uuid, user_id: Uuid) -> Result<(), DatabaseError> {
        match db {
            Database::Postgres(pool) => {
                let mut tx = pool.begin().await?;
                let deleted = sqlx::query("DELETE FROM enrollments WHERE course_id = $1 AND user_id = $2")
                    .bind(course_id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
                if deleted.rows_affected() == 0 {
                    tx.rollback().await?;
                    return Err(DatabaseError::NotFound);
                }
                sqlx::query(
                    "UPDATE courses SET enrollment_count = GREATEST(enrollment_count - 1, 0) WHERE id = $1",
                )
                .bind(course_id)
                .execute(&mut *tx)
                .await?;
                tx.commit()
                    .await
                    .map_err(|e| DatabaseError::TransactionError(e.to_string()))?;
                Ok(())
            }
            Database::Memory(store) => {
                let mut courses = store.courses.write().await;
                let mut enrollments = store.enrollments.write().await;
                enrollments
                    .remove(&(course_id, user_id))
                    .ok_or(DatabaseError::NotFound)?;
                if let Some(course) = courses.get_mut(&course_id) {
                    course.enrollment_count = (course.enrollment_count - 1).max(0);
                }
                Ok(())
            }
        }
    }

    pub async fn is_enrolled(db: &Database, course_id: Uuid, user_id: Uuid) -> Result<bool, DatabaseError> {
        match db {
            Database::Postgres(pool) => {
                let exists: bool = sqlx::query_scalar(
                    "SELECT EXISTS (SELECT 1 FROM enrollments WHERE course_id = $1 AND user_id = $2)",
                )
                .bind(course_id)
                .bind(user_id)
                .fetch_one(pool)
                .await?;
                Ok(exists)
            }
            Database::Memory(store) => Ok(store
                .enrollments
                .read()
                .await
                .contains_key(&(course_id, user_id))),
        }
    }
}
