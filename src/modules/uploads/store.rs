use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Multipart, multipart::MultipartError};
use axum::http::StatusCode;
use serde::Serialize;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::validation::UPLOADS_PREFIX;

pub const MEDIA_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "application/pdf",
    "video/mp4",
    "video/quicktime",
];

pub const IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

const MAX_NAME_LEN: usize = 100;

/// What a given endpoint accepts.
#[derive(Debug, Clone, Copy)]
pub struct UploadPolicy {
    pub allowed_types: &'static [&'static str],
    pub max_bytes: usize,
}

impl UploadPolicy {
    fn allows(&self, mime_type: &str) -> bool {
        self.allowed_types.contains(&mime_type)
    }
}

#[derive(Debug)]
pub struct IncomingFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub url: String,
    pub size: usize,
    pub mime_type: String,
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Upload exceeds the request size limit".to_string())
    } else {
        AppError::BadRequest(err.body_text())
    }
}

/// Pulls the `file` field out of a multipart body, enforcing `policy` while
/// streaming so oversized uploads are dropped before they are fully buffered.
pub async fn read_file_field(multipart: &mut Multipart, policy: UploadPolicy) -> AppResult<IncomingFile> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let mime_type = field.content_type().unwrap_or_default().to_string();
        if !policy.allows(&mime_type) {
            return Err(AppError::BadRequest(format!("Invalid file type: {mime_type}")));
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            if bytes.len() + chunk.len() > policy.max_bytes {
                return Err(AppError::PayloadTooLarge(format!(
                    "File exceeds the {} byte limit",
                    policy.max_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok(IncomingFile {
            file_name,
            mime_type,
            bytes,
        });
    }
    Err(AppError::BadRequest("No file uploaded".to_string()))
}

/// Keeps ASCII letters, digits, `.`, `-` and `_`; everything else becomes `_`.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let mut cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", ".");
    }
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        return "file".to_string();
    }
    cleaned.chars().take(MAX_NAME_LEN).collect()
}

/// Local-disk file store backing the `/uploads` static route.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn save(&self, file: IncomingFile) -> AppResult<StoredFile> {
        fs::create_dir_all(&self.dir).await?;

        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();
        let name = format!("{millis}-{}", sanitize_file_name(&file.file_name));
        let path = self.dir.join(&name);
        fs::write(&path, &file.bytes).await?;

        debug!(path = %path.display(), "Wrote upload to disk");
        info!(name = %name, size = file.bytes.len(), mime_type = %file.mime_type, "File stored");

        Ok(StoredFile {
            url: format!("{UPLOADS_PREFIX}{name}"),
            size: file.bytes.len(),
            mime_type: file.mime_type,
        })
    }
}
