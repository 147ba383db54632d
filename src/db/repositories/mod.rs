mod course_repository;
mod enrollment_repository;
mod profile_repository;
mod resource_repository;
mod user_repository;

pub use course_repository::CourseRepository;
pub use enrollment_repository::EnrollmentRepository;
pub use profile_repository::ProfileRepository;
pub use resource_repository::ResourceRepository;
pub use user_repository::UserRepository;
