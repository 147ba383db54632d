use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;
use validator::Validate;

use crate::validation::{media_url, not_blank};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Proficiency {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    #[validate(custom(function = "not_blank", message = "Institution is required"))]
    pub institution: String,
    #[validate(custom(function = "not_blank", message = "Degree is required"))]
    pub degree: String,
    #[validate(custom(function = "not_blank", message = "Field of study is required"))]
    pub field: String,
    #[validate(custom(function = "not_blank", message = "Start date is required"))]
    pub start_date: String,
    pub end_date: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    #[validate(custom(function = "not_blank", message = "Company is required"))]
    pub company: String,
    #[validate(custom(function = "not_blank", message = "Position is required"))]
    pub position: String,
    pub location: Option<String>,
    #[validate(custom(function = "not_blank", message = "Start date is required"))]
    pub start_date: String,
    pub end_date: Option<String>,
    #[serde(default)]
    pub current: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Skill {
    #[validate(custom(function = "not_blank", message = "Skill name is required"))]
    pub name: String,
    #[validate(custom(function = "not_blank", message = "Skill category is required"))]
    pub category: String,
    pub proficiency: Proficiency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: Uuid,
    pub image_url: Option<String>,
    pub education: Vec<Education>,
    pub experience: Vec<Experience>,
    pub skills: Vec<Skill>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
    #[serde(skip_serializing, default = "OffsetDateTime::now_utc")]
    pub created_at: OffsetDateTime,
    #[serde(skip_serializing, default = "OffsetDateTime::now_utc")]
    pub updated_at: OffsetDateTime,
}

impl Profile {
    pub fn empty(user_id: Uuid) -> Self {
        let now = OffsetDateTime::now_utc();
        Profile {
            user_id,
            image_url: None,
            education: Vec::new(),
            experience: Vec::new(),
            skills: Vec::new(),
            last_updated: now,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: ProfilePatch) {
        if let Some(image_url) = patch.image_url {
            self.image_url = Some(image_url);
        }
        if let Some(education) = patch.education {
            self.education = education;
        }
        if let Some(experience) = patch.experience {
            self.experience = experience;
        }
        if let Some(skills) = patch.skills {
            self.skills = skills;
        }
        let now = OffsetDateTime::now_utc();
        self.last_updated = now;
        self.updated_at = now;
    }
}

/// The only profile fields a client may change. Anything else in the request
/// body is dropped during deserialization.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(alias = "avatar")]
    #[validate(custom(function = "media_url"))]
    pub image_url: Option<String>,
    #[validate(nested)]
    pub education: Option<Vec<Education>>,
    #[validate(nested)]
    pub experience: Option<Vec<Experience>>,
    #[validate(nested)]
    pub skills: Option<Vec<Skill>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_fields_are_ignored() {
        let patch: ProfilePatch = serde_json::from_value(json!({
            "foo": 1,
            "userId": "00000000-0000-0000-0000-000000000000",
            "skills": [{"name": "Go", "category": "Languages", "proficiency": "Expert"}]
        }))
        .unwrap();
        assert!(patch.validate().is_ok());
        assert_eq!(patch.skills.as_ref().map(Vec::len), Some(1));
        assert!(patch.image_url.is_none());
    }

    #[test]
    fn avatar_alias_sets_image_url() {
        let patch: ProfilePatch =
            serde_json::from_value(json!({"avatar": "/uploads/me.png"})).unwrap();
        assert_eq!(patch.image_url.as_deref(), Some("/uploads/me.png"));
    }

    #[test]
    fn invalid_proficiency_fails_whole_patch() {
        let result = serde_json::from_value::<ProfilePatch>(json!({
            "imageUrl": "/uploads/me.png",
            "skills": [{"name": "Go", "category": "Languages", "proficiency": "Guru"}]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn blank_entry_fields_are_rejected() {
        let patch: ProfilePatch = serde_json::from_value(json!({
            "education": [{"institution": "", "degree": "BSc", "field": "CS", "startDate": "2019"}],
            "experience": [{"company": "Acme", "position": " ", "startDate": "2020"}]
        }))
        .unwrap();
        let errors = patch.validate().unwrap_err();
        assert!(errors.errors().contains_key("education"));
        assert!(errors.errors().contains_key("experience"));
    }

    #[test]
    fn apply_only_touches_present_fields() {
        let mut profile = Profile::empty(Uuid::now_v7());
        profile.image_url = Some("/uploads/old.png".to_string());
        profile.apply(ProfilePatch {
            skills: Some(vec![Skill {
                name: "Rust".to_string(),
                category: "Languages".to_string(),
                proficiency: Proficiency::Advanced,
            }]),
            ..Default::default()
        });
        assert_eq!(profile.image_url.as_deref(), Some("/uploads/old.png"));
        assert_eq!(profile.skills.len(), 1);
    }

    #[test]
    fn timestamps_are_not_serialized() {
        let value = serde_json::to_value(Profile::empty(Uuid::now_v7())).unwrap();
        assert!(value.get("createdAt").is_none());
        assert!(value.get("lastUpdated").is_some());
    }
}
