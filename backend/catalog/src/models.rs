use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Course {
    pub id: String,
    pub title: String,
}

/// Stored module, `course` is the course ID.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Module {
    pub id: String,
    pub title: String,
    pub course: String,
}

/// Release policy of a lesson.
///
/// Stored as an open string. Anything outside the three known policies ends up in
/// [`DripType::Unrecognized`] or [`DripType::Unset`], both of which deny access.
/// A value that is not a string at all is kept as its JSON text.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(from = "Option<Value>", into = "Option<String>")]
pub enum DripType {
    Immediate,
    SpecificDate,
    DaysAfterEnrollment,
    Unrecognized(String),
    #[default]
    Unset,
}

impl From<&str> for DripType {
    fn from(value: &str) -> Self {
        match value {
            "immediate" => DripType::Immediate,
            "specificDate" => DripType::SpecificDate,
            "daysAfterEnrollment" => DripType::DaysAfterEnrollment,
            other => DripType::Unrecognized(other.to_string()),
        }
    }
}

impl From<Option<Value>> for DripType {
    fn from(value: Option<Value>) -> Self {
        match value {
            None | Some(Value::Null) => DripType::Unset,
            Some(Value::String(name)) => DripType::from(name.as_str()),
            Some(other) => DripType::Unrecognized(other.to_string()),
        }
    }
}

impl From<DripType> for Option<String> {
    fn from(value: DripType) -> Self {
        match value {
            DripType::Immediate => Some("immediate".to_string()),
            DripType::SpecificDate => Some("specificDate".to_string()),
            DripType::DaysAfterEnrollment => Some("daysAfterEnrollment".to_string()),
            DripType::Unrecognized(other) => Some(other),
            DripType::Unset => None,
        }
    }
}

/// Stored lesson, `module` is the module ID.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub module: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub drip_type: DripType,
    #[serde(default)]
    pub available_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub drip_delay_days: Option<u32>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PopulatedModule {
    pub id: String,
    pub title: String,
    pub course: Option<Course>,
}

/// Lesson with its module and course resolved.
///
/// A dangling reference shows up as `None` at the level where resolution stopped.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PopulatedLesson {
    pub lesson: Lesson,
    pub module: Option<PopulatedModule>,
}

impl PopulatedLesson {
    pub fn course_id(&self) -> Option<&str> {
        self.module
            .as_ref()
            .and_then(|module| module.course.as_ref())
            .map(|course| course.id.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Cancelled,
    Expired,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: String,
    pub user: String,
    pub course: String,
    pub status: EnrollmentStatus,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Seed fixture, one file holding everything the server reads.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Catalog {
    pub courses: Vec<Course>,
    pub modules: Vec<Module>,
    pub lessons: Vec<Lesson>,
    pub enrollments: Vec<Enrollment>,
    pub sessions: Vec<Session>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn lesson_with(drip: Value) -> Lesson {
        let mut raw = json!({ "id": "l1", "title": "Intro", "module": "m1" });
        if !drip.is_null() {
            raw["dripType"] = drip;
        }

        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_known_drip_types() {
        assert_eq!(lesson_with(json!("immediate")).drip_type, DripType::Immediate);
        assert_eq!(lesson_with(json!("specificDate")).drip_type, DripType::SpecificDate);
        assert_eq!(
            lesson_with(json!("daysAfterEnrollment")).drip_type,
            DripType::DaysAfterEnrollment
        );
    }

    #[test]
    fn test_missing_and_null_drip_type() {
        assert_eq!(lesson_with(Value::Null).drip_type, DripType::Unset);

        let lesson: Lesson = serde_json::from_value(
            json!({ "id": "l1", "title": "Intro", "module": "m1", "dripType": null }),
        )
        .unwrap();
        assert_eq!(lesson.drip_type, DripType::Unset);
    }

    #[test]
    fn test_unrecognized_drip_type_is_kept() {
        assert_eq!(
            lesson_with(json!("afterQuizPassed")).drip_type,
            DripType::Unrecognized("afterQuizPassed".to_string())
        );
        // policy names are case sensitive
        assert_eq!(
            lesson_with(json!("Immediate")).drip_type,
            DripType::Unrecognized("Immediate".to_string())
        );
    }

    #[test]
    fn test_non_string_drip_type_is_unrecognized() {
        assert_eq!(
            lesson_with(json!(5)).drip_type,
            DripType::Unrecognized("5".to_string())
        );
        assert_eq!(
            lesson_with(json!({ "kind": "immediate" })).drip_type,
            DripType::Unrecognized(r#"{"kind":"immediate"}"#.to_string())
        );
        assert_eq!(
            lesson_with(json!(["immediate"])).drip_type,
            DripType::Unrecognized(r#"["immediate"]"#.to_string())
        );
    }

    #[test]
    fn test_drip_type_serializes_back_to_string() {
        let lesson = lesson_with(json!("daysAfterEnrollment"));
        let value = serde_json::to_value(&lesson).unwrap();

        assert_eq!(value["dripType"], json!("daysAfterEnrollment"));
        assert_eq!(value["dripDelayDays"], Value::Null);
    }

    #[test]
    fn test_course_id_requires_full_chain() {
        let lesson = lesson_with(json!("immediate"));
        let mut populated = PopulatedLesson {
            lesson,
            module: None,
        };
        assert_eq!(populated.course_id(), None);

        populated.module = Some(PopulatedModule {
            id: "m1".to_string(),
            title: "Basics".to_string(),
            course: None,
        });
        assert_eq!(populated.course_id(), None);

        populated.module.as_mut().unwrap().course = Some(Course {
            id: "c1".to_string(),
            title: "Flow".to_string(),
        });
        assert_eq!(populated.course_id(), Some("c1"));
    }

    #[test]
    fn test_enrollment_status_parsing() {
        let enrollment: Enrollment = serde_json::from_value(json!({
            "id": "e1",
            "user": "u1",
            "course": "c1",
            "status": "cancelled",
            "enrolledAt": "2025-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(enrollment.status, EnrollmentStatus::Cancelled);
    }

    #[test]
    fn test_empty_catalog() {
        let catalog: Catalog = serde_json::from_str("{}").unwrap();
        assert!(catalog.lessons.is_empty());
        assert!(catalog.sessions.is_empty());
    }
}
