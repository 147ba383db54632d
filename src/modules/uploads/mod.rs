pub mod handlers;
pub mod routes;
mod store;

pub use store::{IMAGE_TYPES, MEDIA_TYPES, IncomingFile, StoredFile, UploadPolicy, UploadStore, read_file_field};
