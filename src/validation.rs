//! Boundary validation: custom field rules and the `ValidatedJson` extractor.

use std::borrow::Cow;

use axum::{
    Json,
    extract::{FromRequest, Request},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, de::DeserializeOwned};
use validator::{Validate, ValidateUrl, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::error::AppError;

/// Public prefix under which uploaded files are served.
pub const UPLOADS_PREFIX: &str = "/uploads/";

fn error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error("blank", "Must not be empty"));
    }
    Ok(())
}

/// Length check on the value as it will be stored, i.e. after trimming.
fn trimmed_length(
    value: &str,
    min: usize,
    max: usize,
    message: &'static str,
) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(error("length", message));
    }
    Ok(())
}

pub fn course_title(value: &str) -> Result<(), ValidationError> {
    trimmed_length(value, 3, 200, "Title must be between 3 and 200 characters")
}

pub fn course_description(value: &str) -> Result<(), ValidationError> {
    trimmed_length(value, 10, 5000, "Description must be between 10 and 5000 characters")
}

pub fn resource_title(value: &str) -> Result<(), ValidationError> {
    trimmed_length(value, 1, 100, "Title must be between 1 and 100 characters")
}

pub fn user_name(value: &str) -> Result<(), ValidationError> {
    trimmed_length(value, 1, 100, "Name must be between 1 and 100 characters")
}

/// Absolute URL, or a path to a file this service stored.
pub fn media_url(value: &str) -> Result<(), ValidationError> {
    if value.validate_url() {
        return Ok(());
    }
    let is_upload_path = value
        .strip_prefix(UPLOADS_PREFIX)
        .is_some_and(|name| !name.is_empty() && !name.contains("..") && !name.contains('/'));
    if is_upload_path {
        return Ok(());
    }
    Err(error("url", "Must be an absolute URL or an uploaded file path"))
}

pub fn password_strength(password: &SecretString) -> Result<(), ValidationError> {
    let password = password.expose_secret();
    if password.chars().count() < 8 {
        return Err(error("password_length", "Password must be at least 8 characters long"));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(error(
            "password_uppercase",
            "Password must contain at least one uppercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(error(
            "password_lowercase",
            "Password must contain at least one lowercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(error("password_digit", "Password must contain at least one number"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Flattens nested validator output into `content[1].title` style paths.
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    collect(None, errors, &mut out);
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

fn collect(prefix: Option<&str>, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{field}"),
            None => field.to_string(),
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                out.extend(list.iter().map(|err| FieldError {
                    field: path.clone(),
                    message: err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", err.code)),
                }));
            }
            ValidationErrorsKind::Struct(inner) => collect(Some(&path), inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect(Some(&format!("{path}[{index}]")), inner, out);
                }
            }
        }
    }
}

/// JSON body extractor that runs `validator` rules after deserialization, so
/// handlers only ever see already-validated input.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            AppError::Validation(vec![FieldError {
                field: "body".to_string(),
                message: rejection.body_text(),
            }])
        })?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}
