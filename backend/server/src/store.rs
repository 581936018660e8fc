//! # Stores
//!
//! Read seams the access evaluator depends on. Implemented by
//! [`crate::database::RedisStore`] in production and [`crate::memory::InMemoryStore`]
//! for tests and local runs.
//!
//! Enrollment reads are trusted internal reads. They are never filtered by who is asking,
//! that is the caller's job.
use async_trait::async_trait;
use catalog::models::{Enrollment, EnrollmentStatus, PopulatedLesson, PopulatedModule, User};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Malformed record: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Equality filters, all of which must match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentFilter {
    pub user_id: String,
    pub course_id: String,
    pub status: EnrollmentStatus,
}

impl EnrollmentFilter {
    pub fn active(user_id: &str, course_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            course_id: course_id.to_string(),
            status: EnrollmentStatus::Active,
        }
    }

    pub fn matches(&self, enrollment: &Enrollment) -> bool {
        enrollment.user == self.user_id
            && enrollment.course == self.course_id
            && enrollment.status == self.status
    }
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Lesson with module and course resolved, `None` if the lesson does not exist.
    async fn find_lesson(&self, lesson_id: &str) -> StoreResult<Option<PopulatedLesson>>;

    /// `None` if the module does not exist.
    async fn find_module(&self, module_id: &str) -> StoreResult<Option<PopulatedModule>>;

    /// Lessons of a module ordered by `order`, then ID.
    async fn lessons_in_module(&self, module_id: &str) -> StoreResult<Vec<PopulatedLesson>>;
}

#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// Every enrollment matching the filter, in no particular order.
    async fn find_enrollments(&self, filter: &EnrollmentFilter) -> StoreResult<Vec<Enrollment>>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn user_for_token(&self, token: &str) -> StoreResult<Option<User>>;
}

/// Drops lessons that no longer point at `module_id`, then orders by `order` and ID.
///
/// A module's lesson index can lag behind a lesson that moved, the lesson record wins.
pub(crate) fn module_listing(
    lessons: impl IntoIterator<Item = PopulatedLesson>,
    module_id: &str,
) -> Vec<PopulatedLesson> {
    let mut lessons: Vec<PopulatedLesson> = lessons
        .into_iter()
        .filter(|populated| populated.lesson.module == module_id)
        .collect();

    lessons.sort_by(|a, b| {
        a.lesson
            .order
            .cmp(&b.lesson.order)
            .then_with(|| a.lesson.id.cmp(&b.lesson.id))
    });

    lessons
}
