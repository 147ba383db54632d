use sqlx::types::{Json, Uuid};
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::db::models::{ContentBlock, Course, CourseFilter, CourseLevel, PageRequest};
use crate::db::{Database, DatabaseError};

#[derive(sqlx::FromRow)]
struct CourseRow {
    id: Uuid,
    title: String,
    description: String,
    instructor_id: Uuid,
    category: Option<String>,
    level: Option<CourseLevel>,
    content: Json<Vec<ContentBlock>>,
    thumbnail: Option<String>,
    price: f64,
    published: bool,
    enrollment_count: i64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<CourseRow> for Course {
    fn from(row: CourseRow) -> Self {
        Course {
            id: row.id,
            title: row.title,
            description: row.description,
            instructor_id: row.instructor_id,
            category: row.category,
            level: row.level,
            content: row.content.0,
            thumbnail: row.thumbnail,
            price: row.price,
            published: row.published,
            enrollment_count: row.enrollment_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COURSE_COLUMNS: &str = "id, title, description, instructor_id, category, level, content, \
     thumbnail, price, published, enrollment_count, created_at, updated_at";

/// Escape LIKE metacharacters so search text is matched literally.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &CourseFilter) {
    qb.push(" WHERE (published = TRUE");
    if let Some(viewer) = filter.viewer {
        qb.push(" OR instructor_id = ").push_bind(viewer);
    }
    qb.push(")");
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        qb.push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category) = &filter.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(level) = filter.level {
        qb.push(" AND level = ").push_bind(level);
    }
    if let Some(instructor_id) = filter.instructor_id {
        qb.push(" AND instructor_id = ").push_bind(instructor_id);
    }
    if let Some(published) = filter.published {
        qb.push(" AND published = ").push_bind(published);
    }
}

pub struct CourseRepository;

impl CourseRepository {
    /// Every write renumbers content blocks before it reaches the store.
    pub async fn create_course(db: &Database, mut course: Course) -> Result<Course, DatabaseError> {
        course.normalize_content_order();
        match db {
            Database::Postgres(pool) => {
                let row = sqlx::query_as::<_, CourseRow>(
                    r#"
                    INSERT INTO courses (id, title, description, instructor_id, category, level, content,
                        thumbnail, price, published, enrollment_count, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                    RETURNING id, title, description, instructor_id, category, level, content,
                        thumbnail, price, published, enrollment_count, created_at, updated_at
                    "#,
                )
                .bind(course.id)
                .bind(&course.title)
                .bind(&course.description)
                .bind(course.instructor_id)
                .bind(&course.category)
                .bind(course.level)
                .bind(Json(&course.content))
                .bind(&course.thumbnail)
                .bind(course.price)
                .bind(course.published)
                .bind(course.enrollment_count)
                .bind(course.created_at)
                .bind(course.updated_at)
                .fetch_one(pool)
                .await?;
                Ok(row.into())
            }
            Database::Memory(store) => {
                store.courses.write().await.insert(course.id, course.clone());
                Ok(course)
            }
        }
    }

    pub async fn get_course_by_id(db: &Database, course_id: Uuid) -> Result<Option<Course>, DatabaseError> {
        match db {
            Database::Postgres(pool) => {
                let row = sqlx::query_as::<_, CourseRow>(
                    r#"
                    SELECT id, title, description, instructor_id, category, level, content,
                        thumbnail, price, published, enrollment_count, created_at, updated_at
                    FROM courses
                    WHERE id = $1
                    "#,
                )
                .bind(course_id)
                .fetch_optional(pool)
                .await?;
                Ok(row.map(Course::from))
            }
            Database::Memory(store) => Ok(store.courses.read().await.get(&course_id).cloned()),
        }
    }

    /// Replaces the stored document. `enrollment_count` is owned by the
    /// enrollment writes and is not overwritten here.
    pub async fn update_course(db: &Database, mut course: Course) -> Result<Course, DatabaseError> {
        course.normalize_content_order();
        match db {
            Database::Postgres(pool) => {
                let row = sqlx::query_as::<_, CourseRow>(
                    r#"
                    UPDATE courses
                    SET
                        title = $2,
                        description = $3,
                        category = $4,
                        level = $5,
                        content = $6,
                        thumbnail = $7,
                        price = $8,
                        published = $9,
                        updated_at = $10
                    WHERE id = $1
                    RETURNING id, title, description, instructor_id, category, level, content,
                        thumbnail, price, published, enrollment_count, created_at, updated_at
                    "#,
                )
                .bind(course.id)
                .bind(&course.title)
                .bind(&course.description)
                .bind(&course.category)
                .bind(course.level)
                .bind(Json(&course.content))
                .bind(&course.thumbnail)
                .bind(course.price)
                .bind(course.published)
                .bind(course.updated_at)
                .fetch_optional(pool)
                .await?;
                row.map(Course::from).ok_or(DatabaseError::NotFound)
            }
            Database::Memory(store) => {
                let mut courses = store.courses.write().await;
                let stored = courses.get_mut(&course.id).ok_or(DatabaseError::NotFound)?;
                course.enrollment_count = stored.enrollment_count;
                *stored = course.clone();
                Ok(course)
            }
        }
    }

    /// Deletes the course together with its resources and enrollments.
    pub async fn delete_course(db: &Database, course_id: Uuid) -> Result<(), DatabaseError> {
        match db {
            Database::Postgres(pool) => {
                let mut tx = pool.begin().await?;
                sqlx::query("DELETE FROM resources WHERE course_id = $1")
                    .bind(course_id)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query("DELETE FROM enrollments WHERE course_id = $1")
                    .bind(course_id)
                    .execute(&mut *tx)
                    .await?;
                let deleted = sqlx::query("DELETE FROM courses WHERE id = $1")
                    .bind(course_id)
                    .execute(&mut *tx)
                    .await?;
                if deleted.rows_affected() == 0 {
                    tx.rollback().await?;
                    return Err(DatabaseError::NotFound);
                }
                tx.commit()
                    .await
                    .map_err(|e| DatabaseError::TransactionError(e.to_string()))?;
                Ok(())
            }
            Database::Memory(store) => {
                let mut courses = store.courses.write().await;
                let mut enrollments = store.enrollments.write().await;
                let mut resources = store.resources.write().await;
                courses.remove(&course_id).ok_or(DatabaseError::NotFound)?;
                enrollments.retain(|(course, _), _| *course != course_id);
                resources.retain(|_, r| r.course_id != course_id);
                Ok(())
            }
        }
    }

    /// Filtered page plus the total size of the filtered set, newest first.
    pub async fn list_courses(
        db: &Database,
        filter: &CourseFilter,
        page: PageRequest,
    ) -> Result<(Vec<Course>, u64), DatabaseError> {
        match db {
            Database::Postgres(pool) => {
                let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM courses");
                push_filter(&mut count, filter);
                let total: i64 = count.build_query_scalar::<i64>().fetch_one(pool).await?;

                let mut select = QueryBuilder::<Postgres>::new("SELECT ");
                select.push(COURSE_COLUMNS).push(" FROM courses");
                push_filter(&mut select, filter);
                select
                    .push(" ORDER BY created_at DESC LIMIT ")
                    .push_bind(i64::from(page.limit))
                    .push(" OFFSET ")
                    .push_bind(page.offset() as i64);
                let rows: Vec<CourseRow> = select.build_query_as::<CourseRow>().fetch_all(pool).await?;

                Ok((rows.into_iter().map(Course::from).collect(), total.max(0) as u64))
            }
            Database::Memory(store) => {
                let courses = store.courses.read().await;
                let mut matching: Vec<&Course> =
                    courses.values().filter(|c| filter.matches(c)).collect();
                matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
                let total = matching.len() as u64;
                let items = matching
                    .into_iter()
                    .skip(page.offset() as usize)
                    .take(page.limit as usize)
                    .cloned()
                    .collect();
                Ok((items, total))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{ContentBlockInput, ContentType, NewCourse};

    fn course(owner: Uuid, title: &str, published: bool) -> Course {
        Course::new(
            NewCourse {
                title: title.to_string(),
                description: "A course description".to_string(),
                category: Some("Programming".to_string()),
                level: None,
                content: vec![],
                thumbnail: None,
                price: 0.0,
                published,
            },
            owner,
        )
    }

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[tokio::test]
    async fn stored_content_is_renumbered() {
        let db = Database::in_memory();
        let mut draft = course(Uuid::now_v7(), "Rust", false);
        draft.content = vec![
            ContentBlockInput {
                title: "one".to_string(),
                kind: ContentType::Video,
                content: "v".to_string(),
                order: None,
            }
            .into(),
            ContentBlockInput {
                title: "two".to_string(),
                kind: ContentType::Quiz,
                content: "q".to_string(),
                order: None,
            }
            .into(),
        ];
        draft.content[0].order = 5;
        draft.content[1].order = 5;
        let saved = CourseRepository::create_course(&db, draft).await.unwrap();
        assert_eq!(saved.content[0].order, 0);
        assert_eq!(saved.content[1].order, 1);
    }

    #[tokio::test]
    async fn listing_hides_foreign_drafts() {
        let db = Database::in_memory();
        let owner = Uuid::now_v7();
        CourseRepository::create_course(&db, course(owner, "Published", true))
            .await
            .unwrap();
        CourseRepository::create_course(&db, course(owner, "Draft", false))
            .await
            .unwrap();

        let page = PageRequest { page: 1, limit: 10 };
        let (items, total) = CourseRepository::list_courses(&db, &CourseFilter::default(), page)
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].title, "Published");

        let owner_view = CourseFilter {
            viewer: Some(owner),
            ..Default::default()
        };
        let (_, total) = CourseRepository::list_courses(&db, &owner_view, page).await.unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn update_of_missing_course_is_not_found() {
        let db = Database::in_memory();
        let err = CourseRepository::update_course(&db, course(Uuid::now_v7(), "Ghost", true))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound));
    }
}
