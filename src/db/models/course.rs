use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;
use validator::Validate;

use crate::validation::{course_description, course_title, not_blank};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Video,
    Quiz,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "course_level", rename_all = "snake_case")]
#[serde(rename_all = "lowercase")]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ContentType,
    pub content: String,
    pub order: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(rename = "instructor")]
    pub instructor_id: Uuid,
    pub category: Option<String>,
    pub level: Option<CourseLevel>,
    pub content: Vec<ContentBlock>,
    pub thumbnail: Option<String>,
    pub price: f64,
    pub published: bool,
    pub enrollment_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Course {
    pub fn new(input: NewCourse, instructor_id: Uuid) -> Self {
        let now = OffsetDateTime::now_utc();
        let mut course = Course {
            id: Uuid::now_v7(),
            title: input.title.trim().to_string(),
            description: input.description.trim().to_string(),
            instructor_id,
            category: input.category.map(|c| c.trim().to_string()),
            level: input.level,
            content: input.content.into_iter().map(ContentBlock::from).collect(),
            thumbnail: input.thumbnail,
            price: input.price,
            published: input.published,
            enrollment_count: 0,
            created_at: now,
            updated_at: now,
        };
        course.normalize_content_order();
        course
    }

    /// Rewrites every block's `order` to its position in `content`.
    ///
    /// Client-supplied order values are never trusted; duplicates and gaps
    /// collapse to array position.
    pub fn normalize_content_order(&mut self) {
        for (index, block) in self.content.iter_mut().enumerate() {
            block.order = index as u32;
        }
    }

    pub fn apply(&mut self, update: UpdateCourse) {
        if let Some(title) = update.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = update.description {
            self.description = description.trim().to_string();
        }
        if let Some(category) = update.category {
            self.category = Some(category.trim().to_string());
        }
        if let Some(level) = update.level {
            self.level = Some(level);
        }
        if let Some(content) = update.content {
            self.content = content.into_iter().map(ContentBlock::from).collect();
        }
        if let Some(thumbnail) = update.thumbnail {
            self.thumbnail = Some(thumbnail);
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(published) = update.published {
            self.published = published;
        }
        self.updated_at = OffsetDateTime::now_utc();
        self.normalize_content_order();
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.instructor_id == user_id
    }

    /// Unpublished courses exist only for their owner.
    pub fn is_visible_to(&self, viewer: Option<Uuid>) -> bool {
        self.published || viewer.is_some_and(|id| self.is_owned_by(id))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContentBlockInput {
    #[validate(
        length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"),
        custom(function = "not_blank")
    )]
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ContentType,
    #[validate(custom(function = "not_blank"))]
    pub content: String,
    /// Accepted for compatibility, replaced by the block's position.
    #[allow(unused)]
    pub order: Option<i64>,
}

impl From<ContentBlockInput> for ContentBlock {
    fn from(input: ContentBlockInput) -> Self {
        ContentBlock {
            title: input.title.trim().to_string(),
            kind: input.kind,
            content: input.content,
            order: 0,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewCourse {
    #[validate(custom(function = "course_title"))]
    pub title: String,
    #[validate(custom(function = "course_description"))]
    pub description: String,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    pub level: Option<CourseLevel>,
    #[serde(default)]
    #[validate(nested)]
    pub content: Vec<ContentBlockInput>,
    #[validate(url(message = "Thumbnail must be a valid URL"))]
    pub thumbnail: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: f64,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCourse {
    #[validate(custom(function = "course_title"))]
    pub title: Option<String>,
    #[validate(custom(function = "course_description"))]
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    pub level: Option<CourseLevel>,
    #[validate(nested)]
    pub content: Option<Vec<ContentBlockInput>>,
    #[validate(url(message = "Thumbnail must be a valid URL"))]
    pub thumbnail: Option<String>,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,
    pub published: Option<bool>,
}

/// Catalog query after parsing. `viewer` is the signed-in caller, if any.
#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub level: Option<CourseLevel>,
    pub instructor_id: Option<Uuid>,
    pub published: Option<bool>,
    pub viewer: Option<Uuid>,
}

impl CourseFilter {
    pub fn matches(&self, course: &Course) -> bool {
        if !course.is_visible_to(self.viewer) {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !course.title.to_lowercase().contains(&needle)
                && !course.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if course.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if self.level.is_some() && course.level != self.level {
            return false;
        }
        if let Some(instructor_id) = self.instructor_id {
            if course.instructor_id != instructor_id {
                return false;
            }
        }
        if let Some(published) = self.published {
            if course.published != published {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>, default_limit: u32, max_limit: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, max_limit),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub pages: u64,
    pub has_more: bool,
}

impl Pagination {
    pub fn new(total: u64, request: PageRequest) -> Self {
        let pages = total.div_ceil(u64::from(request.limit));
        Self {
            total,
            page: request.page,
            pages,
            has_more: u64::from(request.page) < pages,
        }
    }
}
