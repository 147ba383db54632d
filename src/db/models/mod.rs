mod course;
mod enrollment;
mod profile;
mod resource;
mod user;

pub use course::*;
pub use enrollment::*;
pub use profile::*;
pub use resource::*;
pub use user::*;
