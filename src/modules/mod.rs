pub mod auth;
pub mod courses;
pub mod profile;
pub mod resources;
pub mod uploads;
