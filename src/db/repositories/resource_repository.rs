use sqlx::types::{Json, Uuid};
use time::OffsetDateTime;

use crate::db::models::{
    AccessLevel, Resource, ResourceMetadata, ResourceStatus, ResourceType,
};
use crate::db::{Database, DatabaseError};

#[derive(sqlx::FromRow)]
struct ResourceRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    kind: ResourceType,
    url: String,
    file_size: Option<i64>,
    mime_type: Option<String>,
    course_id: Uuid,
    uploaded_by: Uuid,
    status: ResourceStatus,
    access_level: AccessLevel,
    metadata: Json<ResourceMetadata>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ResourceRow> for Resource {
    fn from(row: ResourceRow) -> Self {
        Resource {
            id: row.id,
            title: row.title,
            description: row.description,
            kind: row.kind,
            url: row.url,
            file_size: row.file_size,
            mime_type: row.mime_type,
            course_id: row.course_id,
            uploaded_by: row.uploaded_by,
            status: row.status,
            access_level: row.access_level,
            metadata: row.metadata.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct ResourceRepository;

impl ResourceRepository {
    /// Inserts a resource. Fails with `NotFound` when the course is gone, so a
    /// stored resource always points at an existing course.
    pub async fn create_resource(db: &Database, resource: Resource) -> Result<Resource, DatabaseError> {
        match db {
            Database::Postgres(pool) => {
                let row = sqlx::query_as::<_, ResourceRow>(
                    r#"
                    INSERT INTO resources (id, title, description, kind, url, file_size, mime_type, course_id,
                        uploaded_by, status, access_level, metadata, created_at, updated_at)
                    SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14
                    WHERE EXISTS (SELECT 1 FROM courses WHERE id = $8)
                    RETURNING id, title, description, kind, url, file_size, mime_type, course_id,
                        uploaded_by, status, access_level, metadata, created_at, updated_at
                    "#,
                )
                .bind(resource.id)
                .bind(&resource.title)
                .bind(&resource.description)
                .bind(resource.kind)
                .bind(&resource.url)
                .bind(resource.file_size)
                .bind(&resource.mime_type)
                .bind(resource.course_id)
                .bind(resource.uploaded_by)
                .bind(resource.status)
                .bind(resource.access_level)
                .bind(Json(&resource.metadata))
                .bind(resource.created_at)
                .bind(resource.updated_at)
                .fetch_optional(pool)
                .await?;
                row.map(Resource::from).ok_or(DatabaseError::NotFound)
            }
            Database::Memory(store) => {
                let courses = store.courses.read().await;
                if !courses.contains_key(&resource.course_id) {
                    return Err(DatabaseError::NotFound);
                }
                store
                    .resources
                    .write()
                    .await
                    .insert(resource.id, resource.clone());
                Ok(resource)
            }
        }
    }

    pub async fn get_resource_by_id(
        db: &Database,
        resource_id: Uuid,
    ) -> Result<Option<Resource>, DatabaseError> {
        match db {
            Database::Postgres(pool) => {
                let row = sqlx::query_as::<_, ResourceRow>(
                    r#"
                    SELECT id, title, description, kind, url, file_size, mime_type, course_id,
                        uploaded_by, status, access_level, metadata, created_at, updated_at
                    FROM resources
                    WHERE id = $1
                    "#,
                )
                .bind(resource_id)
                .fetch_optional(pool)
                .await?;
                Ok(row.map(Resource::from))
            }
            Database::Memory(store) => Ok(store.resources.read().await.get(&resource_id).cloned()),
        }
    }

    pub async fn update_resource(db: &Database, resource: Resource) -> Result<Resource, DatabaseError> {
        match db {
            Database::Postgres(pool) => {
                let row = sqlx::query_as::<_, ResourceRow>(
                    r#"
                    UPDATE resources
                    SET
                        title = $2,
                        description = $3,
                        status = $4,
                        access_level = $5,
                        metadata = $6,
                        updated_at = $7
                    WHERE id = $1
                    RETURNING id, title, description, kind, url, file_size, mime_type, course_id,
                        uploaded_by, status, access_level, metadata, created_at, updated_at
                    "#,
                )
                .bind(resource.id)
                .bind(&resource.title)
                .bind(&resource.description)
                .bind(resource.status)
                .bind(resource.access_level)
                .bind(Json(&resource.metadata))
                .bind(resource.updated_at)
                .fetch_optional(pool)
                .await?;
                row.map(Resource::from).ok_or(DatabaseError::NotFound)
            }
            Database::Memory(store) => {
                let mut resources = store.resources.write().await;
                let stored = resources
                    .get_mut(&resource.id)
                    .ok_or(DatabaseError::NotFound)?;
                *stored = resource.clone();
                Ok(resource)
            }
        }
    }

    pub async fn delete_resource(db: &Database, resource_id: Uuid) -> Result<(), DatabaseError> {
        match db {
            Database::Postgres(pool) => {
                let result = sqlx::query("DELETE FROM resources WHERE id = $1")
                    .bind(resource_id)
                    .execute(pool)
                    .await?;
                if result.rows_affected() == 0 {
                    return Err(DatabaseError::NotFound);
                }
                Ok(())
            }
            Database::Memory(store) => store
                .resources
                .write()
                .await
                .remove(&resource_id)
                .map(|_| ())
                .ok_or(DatabaseError::NotFound),
        }
    }

    /// Non-archived resources of a course at or below `granted`, newest first.
    pub async fn list_visible_resources(
        db: &Database,
        course_id: Uuid,
        granted: AccessLevel,
    ) -> Result<Vec<Resource>, DatabaseError> {
        match db {
            Database::Postgres(pool) => {
                let rows = sqlx::query_as::<_, ResourceRow>(
                    r#"
                    SELECT id, title, description, kind, url, file_size, mime_type, course_id,
                        uploaded_by, status, access_level, metadata, created_at, updated_at
                    FROM resources
                    WHERE course_id = $1
                      AND status <> 'archived'
                      AND access_level <= $2
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(course_id)
                .bind(granted)
                .fetch_all(pool)
                .await?;
                Ok(rows.into_iter().map(Resource::from).collect())
            }
            Database::Memory(store) => {
                let resources = store.resources.read().await;
                let mut visible: Vec<Resource> = resources
                    .values()
                    .filter(|r| r.course_id == course_id && r.is_listed_for(granted))
                    .cloned()
                    .collect();
                visible.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
                Ok(visible)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Course, NewCourse, NewResource};
    use crate::db::repositories::CourseRepository;

    fn new_resource(title: &str, access_level: AccessLevel) -> NewResource {
        NewResource {
            title: title.to_string(),
            description: None,
            kind: ResourceType::Document,
            url: "/uploads/file.pdf".to_string(),
            file_size: Some(42),
            mime_type: Some("application/pdf".to_string()),
            access_level,
            metadata: None,
        }
    }

    async fn seeded_course(db: &Database) -> Course {
        let course = Course::new(
            NewCourse {
                title: "Rust".to_string(),
                description: "Systems programming".to_string(),
                category: None,
                level: None,
                content: vec![],
                thumbnail: None,
                price: 0.0,
                published: true,
            },
            Uuid::now_v7(),
        );
        CourseRepository::create_course(db, course).await.unwrap()
    }

    #[tokio::test]
    async fn attach_requires_existing_course() {
        let db = Database::in_memory();
        let orphan = Resource::new(new_resource("x", AccessLevel::Public), Uuid::now_v7(), Uuid::now_v7());
        let err = ResourceRepository::create_resource(&db, orphan).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound));
    }

    #[tokio::test]
    async fn listing_is_gated_by_access_level() {
        let db = Database::in_memory();
        let course = seeded_course(&db).await;
        for (title, level) in [
            ("public", AccessLevel::Public),
            ("enrolled", AccessLevel::Enrolled),
            ("instructor", AccessLevel::Instructor),
        ] {
            let resource = Resource::new(new_resource(title, level), course.id, course.instructor_id);
            ResourceRepository::create_resource(&db, resource).await.unwrap();
        }

        for (granted, expected) in [
            (AccessLevel::Public, 1),
            (AccessLevel::Enrolled, 2),
            (AccessLevel::Instructor, 3),
        ] {
            let visible = ResourceRepository::list_visible_resources(&db, course.id, granted)
                .await
                .unwrap();
            assert_eq!(visible.len(), expected, "granted {granted:?}");
        }
    }

    #[tokio::test]
    async fn course_delete_cascades_to_resources() {
        let db = Database::in_memory();
        let course = seeded_course(&db).await;
        let resource = Resource::new(new_resource("x", AccessLevel::Public), course.id, course.instructor_id);
        let resource = ResourceRepository::create_resource(&db, resource).await.unwrap();

        CourseRepository::delete_course(&db, course.id).await.unwrap();
        assert!(
            ResourceRepository::get_resource_by_id(&db, resource.id)
                .await
                .unwrap()
                .is_none()
        );
    }
}
