//! # Lesson Access
//!
//! Decides whether a user may view a lesson right now.
//!
//! ## Order of checks
//!
//! 1. No authenticated user: [`AccessError::Unauthorized`], before any read
//! 2. Lesson lookup: [`AccessError::NotFound`] if it does not exist
//! 3. Admins are always granted, enrollments are never read for them
//! 4. Drip policy of the lesson
//!
//! ## Drip policies
//!
//! - `immediate`: granted
//! - `specificDate`: granted once `availableOn <= now`, a missing date never releases
//! - `daysAfterEnrollment`: granted once `enrolledAt + dripDelayDays <= now`, needs an
//!   active enrollment in the lesson's course
//! - anything else, including no policy at all: denied
//!
//! A denial is a normal [`AccessDecision`], never an error. Only the faults in
//! [`AccessError`] abort an evaluation, so a store outage can not present as "locked".
//!
//! Nothing is cached. Enrollment status and release dates may change between requests.
use std::sync::Arc;

use catalog::models::{DripType, Lesson, PopulatedLesson, User};
use chrono::{DateTime, Days, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::store::{ContentStore, EnrollmentFilter, EnrollmentStore, StoreError};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

#[derive(Error, Debug)]
pub enum AccessError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Lesson {lesson_id} is misconfigured: {detail}")]
    DataIntegrity { lesson_id: String, detail: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    NoActiveEnrollment,
    NotYetAvailable,
    UnknownPolicy,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Denial {
    pub reason: DenialReason,
    pub available_at: Option<DateTime<Utc>>,
}

impl Denial {
    fn new(reason: DenialReason) -> Self {
        Self {
            reason,
            available_at: None,
        }
    }

    fn until(available_at: DateTime<Utc>) -> Self {
        Self {
            reason: DenialReason::NotYetAvailable,
            available_at: Some(available_at),
        }
    }

    /// Whole days left until release, rounded up. `None` when no release time is known.
    pub fn days_until(&self, now: DateTime<Utc>) -> Option<i64> {
        self.available_at.map(|available_at| {
            let seconds = (available_at - now).num_seconds().max(0);
            (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AccessDecision {
    Granted(PopulatedLesson),
    Denied(Denial),
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Granted(_))
    }
}

/// Lock state of one lesson, without its content.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LessonStatus {
    pub id: String,
    pub title: String,
    pub order: u32,
    pub granted: bool,
    pub reason: Option<DenialReason>,
    pub available_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct LessonAccess {
    content: Arc<dyn ContentStore>,
    enrollments: Arc<dyn EnrollmentStore>,
}

impl LessonAccess {
    pub fn new(content: Arc<dyn ContentStore>, enrollments: Arc<dyn EnrollmentStore>) -> Self {
        Self {
            content,
            enrollments,
        }
    }

    pub async fn evaluate(
        &self,
        user: Option<&User>,
        lesson_id: &str,
    ) -> Result<AccessDecision, AccessError> {
        self.evaluate_at(user, lesson_id, Utc::now()).await
    }

    pub async fn evaluate_at(
        &self,
        user: Option<&User>,
        lesson_id: &str,
        now: DateTime<Utc>,
    ) -> Result<AccessDecision, AccessError> {
        let user = user.ok_or(AccessError::Unauthorized)?;

        let lesson = self
            .content
            .find_lesson(lesson_id)
            .await?
            .ok_or_else(|| AccessError::NotFound {
                kind: "Lesson",
                id: lesson_id.to_string(),
            })?;

        match self.check(user, &lesson, now).await? {
            None => Ok(AccessDecision::Granted(lesson)),
            Some(denial) => Ok(AccessDecision::Denied(denial)),
        }
    }

    pub async fn module_overview(
        &self,
        user: Option<&User>,
        module_id: &str,
    ) -> Result<Vec<LessonStatus>, AccessError> {
        self.module_overview_at(user, module_id, Utc::now()).await
    }

    /// Every lesson of a module with its lock state, evaluated one by one.
    pub async fn module_overview_at(
        &self,
        user: Option<&User>,
        module_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<LessonStatus>, AccessError> {
        let user = user.ok_or(AccessError::Unauthorized)?;

        if self.content.find_module(module_id).await?.is_none() {
            return Err(AccessError::NotFound {
                kind: "Module",
                id: module_id.to_string(),
            });
        }

        let mut statuses = Vec::new();
        for lesson in self.content.lessons_in_module(module_id).await? {
            let denial = self.check(user, &lesson, now).await?;
            let Lesson { id, title, order, .. } = lesson.lesson;

            statuses.push(LessonStatus {
                id,
                title,
                order,
                granted: denial.is_none(),
                reason: denial.as_ref().map(|denial| denial.reason),
                available_at: denial.and_then(|denial| denial.available_at),
            });
        }

        Ok(statuses)
    }

    /// `None` means granted.
    async fn check(
        &self,
        user: &User,
        lesson: &PopulatedLesson,
        now: DateTime<Utc>,
    ) -> Result<Option<Denial>, AccessError> {
        if user.is_admin() {
            debug!(user_id = %user.id, lesson_id = %lesson.lesson.id, "Admin bypass");
            return Ok(None);
        }

        let denial = match &lesson.lesson.drip_type {
            DripType::Immediate => None,
            DripType::SpecificDate => release_on(lesson.lesson.available_on, now),
            DripType::DaysAfterEnrollment => {
                self.release_after_enrollment(user, lesson, now).await?
            }
            DripType::Unrecognized(_) | DripType::Unset => {
                Some(Denial::new(DenialReason::UnknownPolicy))
            }
        };

        if let Some(denial) = &denial {
            info!(
                user_id = %user.id,
                lesson_id = %lesson.lesson.id,
                reason = ?denial.reason,
                available_at = ?denial.available_at,
                "Lesson locked"
            );
        }

        Ok(denial)
    }

    async fn release_after_enrollment(
        &self,
        user: &User,
        lesson: &PopulatedLesson,
        now: DateTime<Utc>,
    ) -> Result<Option<Denial>, AccessError> {
        let lesson_id = &lesson.lesson.id;

        let Some(course_id) = lesson.course_id() else {
            warn!(lesson_id = %lesson_id, "Lesson has no resolvable module or course");

            return Err(AccessError::DataIntegrity {
                lesson_id: lesson_id.clone(),
                detail: "module or course reference does not resolve".to_string(),
            });
        };

        let enrollments = self
            .enrollments
            .find_enrollments(&EnrollmentFilter::active(&user.id, course_id))
            .await?;

        // re-enrolling restarts the schedule
        let Some(enrollment) = enrollments
            .into_iter()
            .max_by(|a, b| a.enrolled_at.cmp(&b.enrolled_at).then_with(|| a.id.cmp(&b.id)))
        else {
            return Ok(Some(Denial::new(DenialReason::NoActiveEnrollment)));
        };

        let delay = lesson.lesson.drip_delay_days.unwrap_or(0);
        let available_at = enrollment
            .enrolled_at
            .checked_add_days(Days::new(u64::from(delay)))
            .ok_or_else(|| AccessError::DataIntegrity {
                lesson_id: lesson_id.clone(),
                detail: format!("drip delay of {delay} days is out of range"),
            })?;

        Ok(release_on(Some(available_at), now))
    }
}

/// Release instant is inclusive. No instant means never released.
fn release_on(available_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<Denial> {
    match available_at {
        Some(available_at) if available_at <= now => None,
        Some(available_at) => Some(Denial::until(available_at)),
        None => Some(Denial::new(DenialReason::NotYetAvailable)),
    }
}
