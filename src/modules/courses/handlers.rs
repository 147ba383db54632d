use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::types::Uuid;
use tracing::info;

use crate::app_state::AppState;
use crate::db::{
    Course, CourseFilter, CourseLevel, CourseRepository, DatabaseError, Enrollment,
    EnrollmentRepository, NewCourse, PageRequest, Pagination, UpdateCourse,
};
use crate::error::{AppError, AppResult};
use crate::middleware::{CoursePostBudget, CurrentUser, MaybeUser, RateLimited};
use crate::validation::{FieldError, ValidatedJson};

#[derive(Debug, Default, Deserialize)]
pub struct CourseQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub level: Option<CourseLevel>,
    pub instructor: Option<Uuid>,
    pub published: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CourseList {
    pub courses: Vec<Course>,
    pub pagination: Pagination,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Loads a course the caller is allowed to see. Unpublished courses of other
/// instructors are reported as missing.
pub(crate) async fn load_visible_course(
    state: &AppState,
    course_id: Uuid,
    viewer: Option<Uuid>,
) -> AppResult<Course> {
    CourseRepository::get_course_by_id(&state.db, course_id)
        .await?
        .filter(|course| course.is_visible_to(viewer))
        .ok_or_else(|| AppError::NotFound("Course not found".to_string()))
}

/// Like `load_visible_course`, then requires the caller to own it.
pub(crate) async fn load_owned_course(
    state: &AppState,
    course_id: Uuid,
    user: &CurrentUser,
) -> AppResult<Course> {
    let course = load_visible_course(state, course_id, Some(user.id)).await?;
    if !course.is_owned_by(user.id) {
        return Err(AppError::Authorization(
            "Only the course instructor can modify this course".to_string(),
        ));
    }
    Ok(course)
}

pub async fn list_courses(
    State(state): State<AppState>,
    viewer: MaybeUser,
    query: Result<Query<CourseQuery>, QueryRejection>,
) -> AppResult<Json<CourseList>> {
    let Query(query) = query.map_err(|rejection| {
        AppError::Validation(vec![FieldError {
            field: "query".to_string(),
            message: rejection.body_text(),
        }])
    })?;

    let catalog = &state.env.catalog;
    let page = PageRequest::new(
        query.page,
        query.limit,
        catalog.default_page_size,
        catalog.max_page_size,
    );
    let filter = CourseFilter {
        search: non_empty(query.search),
        category: non_empty(query.category),
        level: query.level,
        instructor_id: query.instructor,
        published: query.published,
        viewer: viewer.id(),
    };

    let (courses, total) = CourseRepository::list_courses(&state.db, &filter, page).await?;
    Ok(Json(CourseList {
        courses,
        pagination: Pagination::new(total, page),
    }))
}

pub async fn create_course(
    State(state): State<AppState>,
    user: CurrentUser,
    _: RateLimited<CoursePostBudget>,
    ValidatedJson(input): ValidatedJson<NewCourse>,
) -> AppResult<(StatusCode, Json<Course>)> {
    if !user.role.can_author_courses() {
        return Err(AppError::Authorization(
            "Only instructors can create courses".to_string(),
        ));
    }

    let course = CourseRepository::create_course(&state.db, Course::new(input, user.id)).await?;
    info!(course_id = %course.id, instructor_id = %user.id, "Course created");
    Ok((StatusCode::CREATED, Json(course)))
}

pub async fn get_course(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<Course>> {
    let course = load_visible_course(&state, course_id, viewer.id()).await?;
    Ok(Json(course))
}

pub async fn update_course(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(course_id): Path<Uuid>,
    ValidatedJson(update): ValidatedJson<UpdateCourse>,
) -> AppResult<Json<Course>> {
    let mut course = load_owned_course(&state, course_id, &user).await?;
    course.apply(update);
    let course = CourseRepository::update_course(&state.db, course).await?;
    info!(course_id = %course.id, published = course.published, "Course updated");
    Ok(Json(course))
}

pub async fn delete_course(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    load_owned_course(&state, course_id, &user).await?;
    CourseRepository::delete_course(&state.db, course_id).await?;
    info!(course_id = %course_id, "Course deleted with its resources and enrollments");
    Ok(Json(json!({ "message": "Course deleted" })))
}

pub async fn enroll(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(course_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<Enrollment>)> {
    let course = load_visible_course(&state, course_id, Some(user.id)).await?;
    if course.is_owned_by(user.id) {
        return Err(AppError::BadRequest(
            "Instructors cannot enroll in their own course".to_string(),
        ));
    }

    let enrollment = EnrollmentRepository::enroll(&state.db, Enrollment::new(course_id, user.id))
        .await
        .map_err(|e| match e {
            DatabaseError::Duplicate => {
                AppError::Conflict("Already enrolled in this course".to_string())
            }
            other => other.into(),
        })?;
    info!(course_id = %course_id, user_id = %user.id, "Student enrolled");
    Ok((StatusCode::CREATED, Json(enrollment)))
}

pub async fn unenroll(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    load_visible_course(&state, course_id, Some(user.id)).await?;
    EnrollmentRepository::unenroll(&state.db, course_id, user.id)
        .await
        .map_err(|e| match e {
            DatabaseError::NotFound => {
                AppError::NotFound("Not enrolled in this course".to_string())
            }
            other => other.into(),
        })?;
    info!(course_id = %course_id, user_id = %user.id, "Student left course");
    Ok(Json(json!({ "message": "Enrollment removed" })))
}
