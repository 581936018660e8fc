//! Redis layout.
//!
//! - `courses`, `modules`, `lessons`, `sessions`: hashes of ID (or token) to JSON
//! - `module_lessons:{module}`: set of lesson IDs
//! - `enrollments:{user}:{course}`: hash of enrollment ID to JSON

pub const COURSES: &str = "courses";
pub const MODULES: &str = "modules";
pub const LESSONS: &str = "lessons";
pub const SESSIONS: &str = "sessions";

pub fn module_lessons(module_id: &str) -> String {
    format!("module_lessons:{module_id}")
}

pub fn enrollments(user_id: &str, course_id: &str) -> String {
    format!("enrollments:{user_id}:{course_id}")
}
