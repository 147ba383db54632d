//! Repository checks against a real Postgres. Run with
//! `DATABASE_URL=postgres://... cargo test --test postgres_repositories -- --ignored`.

use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use coursehub_backend::db::{
    AccessLevel, Course, CourseFilter, CourseRepository, Database, Enrollment,
    EnrollmentRepository, NewCourse, NewResource, PageRequest, Resource, ResourceRepository,
    ResourceStatus, ResourceType, User, UserRepository, UserRole,
};

async fn instructor(db: &Database) -> Uuid {
    let now = OffsetDateTime::now_utc();
    let user = User {
        id: Uuid::now_v7(),
        email: format!("{}@example.com", Uuid::now_v7()),
        name: "Instructor".to_string(),
        password_hash: "$argon2id$unused".to_string(),
        role: UserRole::Instructor,
        created_at: now,
        updated_at: now,
    };
    UserRepository::create_user(db, user).await.unwrap().id
}

async fn course(db: &Database, owner: Uuid, title: &str) -> Course {
    let course = Course::new(
        NewCourse {
            title: title.to_string(),
            description: "A course stored in Postgres".to_string(),
            category: None,
            level: None,
            content: vec![],
            thumbnail: None,
            price: 0.0,
            published: true,
        },
        owner,
    );
    CourseRepository::create_course(db, course).await.unwrap()
}

fn resource(title: &str, access_level: AccessLevel) -> NewResource {
    NewResource {
        title: title.to_string(),
        description: None,
        kind: ResourceType::Link,
        url: "https://example.com/a".to_string(),
        file_size: None,
        mime_type: None,
        access_level,
        metadata: None,
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn access_levels_filter_by_enum_order(pool: PgPool) {
    let db = Database::Postgres(pool);
    let owner = instructor(&db).await;
    let course = course(&db, owner, "Lattice").await;
    for (title, level) in [
        ("open", AccessLevel::Public),
        ("members", AccessLevel::Enrolled),
        ("staff", AccessLevel::Instructor),
    ] {
        ResourceRepository::create_resource(&db, Resource::new(resource(title, level), course.id, owner))
            .await
            .unwrap();
    }

    let course_id = course.id;
    let count = |granted: AccessLevel| {
        let db = db.clone();
        async move {
            ResourceRepository::list_visible_resources(&db, course_id, granted)
                .await
                .unwrap()
                .len()
        }
    };
    assert_eq!(count(AccessLevel::Public).await, 1);
    assert_eq!(count(AccessLevel::Enrolled).await, 2);
    assert_eq!(count(AccessLevel::Instructor).await, 3);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn archived_resources_are_not_listed(pool: PgPool) {
    let db = Database::Postgres(pool);
    let owner = instructor(&db).await;
    let course = course(&db, owner, "Archive").await;
    let mut stored = ResourceRepository::create_resource(
        &db,
        Resource::new(resource("old", AccessLevel::Public), course.id, owner),
    )
    .await
    .unwrap();
    stored.status = ResourceStatus::Archived;
    ResourceRepository::update_resource(&db, stored).await.unwrap();

    let listed = ResourceRepository::list_visible_resources(&db, course.id, AccessLevel::Instructor)
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn search_treats_like_wildcards_literally(pool: PgPool) {
    let db = Database::Postgres(pool);
    let owner = instructor(&db).await;
    course(&db, owner, "50% off Rust").await;
    course(&db, owner, "500 Rust exercises").await;

    let filter = CourseFilter {
        search: Some("50%".to_string()),
        ..Default::default()
    };
    let (courses, total) = CourseRepository::list_courses(&db, &filter, PageRequest { page: 1, limit: 10 })
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(courses[0].title, "50% off Rust");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn deleting_a_course_cascades(pool: PgPool) {
    let db = Database::Postgres(pool);
    let owner = instructor(&db).await;
    let student = instructor(&db).await;
    let course = course(&db, owner, "Cascade").await;
    let attached = ResourceRepository::create_resource(
        &db,
        Resource::new(resource("notes", AccessLevel::Public), course.id, owner),
    )
    .await
    .unwrap();
    EnrollmentRepository::enroll(&db, Enrollment::new(course.id, student))
        .await
        .unwrap();

    CourseRepository::delete_course(&db, course.id).await.unwrap();

    assert!(CourseRepository::get_course_by_id(&db, course.id).await.unwrap().is_none());
    assert!(ResourceRepository::get_resource_by_id(&db, attached.id).await.unwrap().is_none());
    assert!(!EnrollmentRepository::is_enrolled(&db, course.id, student).await.unwrap());
}
