use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;
use validator::Validate;

use crate::validation::{media_url, resource_title};

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "resource_type", rename_all = "snake_case")]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Document,
    Video,
    Image,
    Link,
    Other,
}

/// Visibility tier. Ordered so that a higher tier sees everything below it:
/// `Public < Enrolled < Instructor`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, sqlx::Type, Serialize, Deserialize,
)]
#[sqlx(type_name = "access_level", rename_all = "snake_case")]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Public,
    #[default]
    Enrolled,
    Instructor,
}

impl AccessLevel {
    /// Whether a requester holding `granted` may see a resource at this level.
    pub fn is_visible_at(self, granted: AccessLevel) -> bool {
        self <= granted
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, sqlx::Type, Serialize, Deserialize,
)]
#[sqlx(type_name = "resource_status", rename_all = "snake_case")]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    #[default]
    Processing,
    Active,
    Archived,
}

impl ResourceStatus {
    /// Forward-only: processing -> active -> archived, or processing -> archived.
    pub fn can_transition_to(self, next: ResourceStatus) -> bool {
        next > self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct Dimensions {
    #[validate(range(min = 0))]
    pub width: Option<i64>,
    #[validate(range(min = 0))]
    pub height: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ResourceMetadata {
    #[validate(range(min = 0.0))]
    pub duration: Option<f64>,
    #[validate(nested)]
    pub dimensions: Option<Dimensions>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub url: String,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub course_id: Uuid,
    pub uploaded_by: Uuid,
    pub status: ResourceStatus,
    pub access_level: AccessLevel,
    pub metadata: ResourceMetadata,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Resource {
    pub fn new(input: NewResource, course_id: Uuid, uploaded_by: Uuid) -> Self {
        let now = OffsetDateTime::now_utc();
        Resource {
            id: Uuid::now_v7(),
            title: input.title.trim().to_string(),
            description: input.description,
            kind: input.kind,
            url: input.url,
            file_size: input.file_size,
            mime_type: input.mime_type,
            course_id,
            uploaded_by,
            status: ResourceStatus::Processing,
            access_level: input.access_level,
            metadata: input.metadata.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: UpdateResource) {
        if let Some(title) = update.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(access_level) = update.access_level {
            self.access_level = access_level;
        }
        if let Some(metadata) = update.metadata {
            self.metadata = metadata;
        }
        self.updated_at = OffsetDateTime::now_utc();
    }

    pub fn is_listed_for(&self, granted: AccessLevel) -> bool {
        self.status != ResourceStatus::Archived && self.access_level.is_visible_at(granted)
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewResource {
    #[validate(custom(function = "resource_title"))]
    pub title: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: ResourceType,
    #[validate(custom(function = "media_url"))]
    pub url: String,
    #[validate(range(min = 0))]
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    #[serde(default)]
    pub access_level: AccessLevel,
    #[validate(nested)]
    pub metadata: Option<ResourceMetadata>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResource {
    #[validate(custom(function = "resource_title"))]
    pub title: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub access_level: Option<AccessLevel>,
    #[validate(nested)]
    pub metadata: Option<ResourceMetadata>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateResourceStatus {
    pub status: ResourceStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_lattice_is_monotonic() {
        use AccessLevel::*;
        for level in [Public, Enrolled, Instructor] {
            assert!(level.is_visible_at(Instructor));
        }
        assert!(Public.is_visible_at(Enrolled));
        assert!(Enrolled.is_visible_at(Enrolled));
        assert!(!Instructor.is_visible_at(Enrolled));
        assert!(Public.is_visible_at(Public));
        assert!(!Enrolled.is_visible_at(Public));
    }

    #[test]
    fn status_moves_forward_only() {
        use ResourceStatus::*;
        assert!(Processing.can_transition_to(Active));
        assert!(Processing.can_transition_to(Archived));
        assert!(Active.can_transition_to(Archived));
        assert!(!Active.can_transition_to(Processing));
        assert!(!Archived.can_transition_to(Active));
        assert!(!Active.can_transition_to(Active));
    }

    #[test]
    fn archived_resources_are_never_listed() {
        let input = NewResource {
            title: "Slides".to_string(),
            description: None,
            kind: ResourceType::Document,
            url: "/uploads/slides.pdf".to_string(),
            file_size: None,
            mime_type: None,
            access_level: AccessLevel::Public,
            metadata: None,
        };
        let mut resource = Resource::new(input, Uuid::now_v7(), Uuid::now_v7());
        assert!(resource.is_listed_for(AccessLevel::Public));
        resource.status = ResourceStatus::Archived;
        assert!(!resource.is_listed_for(AccessLevel::Instructor));
    }

    #[test]
    fn access_level_defaults_to_enrolled() {
        let input: NewResource = serde_json::from_value(serde_json::json!({
            "title": "Notes",
            "type": "document",
            "url": "https://example.com/notes.pdf"
        }))
        .unwrap();
        assert_eq!(input.access_level, AccessLevel::Enrolled);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn blank_titles_are_rejected() {
        let input: NewResource = serde_json::from_value(serde_json::json!({
            "title": "   ",
            "type": "link",
            "url": "https://example.com"
        }))
        .unwrap();
        assert!(input.validate().unwrap_err().errors().contains_key("title"));
    }

    #[test]
    fn rejects_relative_url_outside_uploads() {
        let input: NewResource = serde_json::from_value(serde_json::json!({
            "title": "Notes",
            "type": "link",
            "url": "../etc/passwd"
        }))
        .unwrap();
        assert!(input.validate().unwrap_err().errors().contains_key("url"));
    }
}
