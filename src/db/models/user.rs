use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;
use validator::{Validate, ValidateEmail, ValidationError, ValidationErrors};

use crate::validation::{password_strength, user_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Student,
    Instructor,
    Admin,
}

impl UserRole {
    pub fn can_author_courses(self) -> bool {
        matches!(self, UserRole::Instructor | UserRole::Admin)
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: SecretString,
    pub role: Option<UserRole>,
}

// Written by hand: the derive cannot attach a `SecretString` to its error params.
impl Validate for NewUser {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = user_name(&self.name) {
            errors.add("name", e);
        }
        if !self.email.validate_email() {
            errors.add(
                "email",
                ValidationError::new("email").with_message("Email address is invalid".into()),
            );
        }
        if let Err(e) = password_strength(&self.password) {
            errors.add("password", e);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UserLogin {
    #[validate(email)]
    pub email: String,
    pub password: SecretString,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

impl Session {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User {
            id: Uuid::now_v7(),
            email: "a@example.com".to_string(),
            name: "A".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: UserRole::Student,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        };
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("passwordHash").is_none());
        assert_eq!(value["role"], "student");
    }

    #[test]
    fn weak_passwords_are_rejected() {
        let input: NewUser = serde_json::from_value(json!({
            "name": "A",
            "email": "a@example.com",
            "password": "alllowercase1"
        }))
        .unwrap();
        assert!(input.validate().unwrap_err().errors().contains_key("password"));

        let input: NewUser = serde_json::from_value(json!({
            "name": "A",
            "email": "a@example.com",
            "password": "Str0ngPass"
        }))
        .unwrap();
        assert!(input.validate().is_ok());
    }

    #[test]
    fn register_input_reports_every_bad_field() {
        let input: NewUser = serde_json::from_value(json!({
            "name": "   ",
            "email": "not-an-email",
            "password": "short"
        }))
        .unwrap();
        let errors = input.validate().unwrap_err();
        let fields = errors.errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn only_instructors_and_admins_author() {
        assert!(!UserRole::Student.can_author_courses());
        assert!(UserRole::Instructor.can_author_courses());
        assert!(UserRole::Admin.can_author_courses());
    }
}
