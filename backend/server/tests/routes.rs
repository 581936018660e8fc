use std::{io::Write, sync::Arc};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header::AUTHORIZATION},
};
use catalog::models::{
    Course, DripType, Enrollment, EnrollmentStatus, Lesson, Module, Role, User,
};
use chrono::{Duration, TimeZone, Utc};
use serde_json::{Value, json};
use server::{
    config::Config,
    memory::InMemoryStore,
    router,
    state::{State, StateError},
};
use tempfile::NamedTempFile;
use tower::ServiceExt;

const STUDENT: &str = "student-token";
const ADMIN: &str = "admin-token";

fn lesson(id: &str, order: u32, drip_type: DripType) -> Lesson {
    Lesson {
        id: id.to_string(),
        title: format!("Lesson {id}"),
        module: "m1".to_string(),
        order,
        content: json!({ "body": format!("content of {id}") }),
        drip_type,
        available_on: None,
        drip_delay_days: None,
    }
}

fn app() -> Router {
    let store = InMemoryStore::new();

    store.insert_course(Course {
        id: "c1".to_string(),
        title: "Flow".to_string(),
    });
    store.insert_module(Module {
        id: "m1".to_string(),
        title: "Basics".to_string(),
        course: "c1".to_string(),
    });

    store.insert_lesson(lesson("open", 0, DripType::Immediate));
    store.insert_lesson(Lesson {
        available_on: Some(Utc.with_ymd_and_hms(2999, 1, 1, 0, 0, 0).unwrap()),
        ..lesson("future", 1, DripType::SpecificDate)
    });
    store.insert_lesson(Lesson {
        drip_delay_days: Some(3),
        ..lesson("weekly", 2, DripType::DaysAfterEnrollment)
    });
    store.insert_lesson(lesson("draft", 3, DripType::Unset));
    store.insert_lesson(Lesson {
        module: "deleted".to_string(),
        ..lesson("orphan", 0, DripType::DaysAfterEnrollment)
    });

    store.insert_enrollment(Enrollment {
        id: "e1".to_string(),
        user: "u1".to_string(),
        course: "c1".to_string(),
        status: EnrollmentStatus::Active,
        enrolled_at: Utc::now() - Duration::days(1),
    });

    store.insert_session(
        STUDENT,
        User {
            id: "u1".to_string(),
            role: Role::User,
        },
    );
    store.insert_session(
        ADMIN,
        User {
            id: "root".to_string(),
            role: Role::Admin,
        },
    );

    router(State::with_store(config(), Arc::new(store)))
}

fn config() -> Config {
    Config {
        port: 0,
        redis_url: String::new(),
        catalog_path: None,
    }
}

async fn get(uri: &str, token: Option<&str>) -> (StatusCode, Vec<u8>) {
    send(app(), uri, token).await
}

async fn send(app: Router, uri: &str, token: Option<&str>) -> (StatusCode, Vec<u8>) {
    let mut request = Request::builder().uri(uri);
    if let Some(token) = token {
        request = request.header(AUTHORIZATION, format!("Bearer {token}"));
    }

    let response = app
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    (status, body.to_vec())
}

async fn get_json(uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    let (status, body) = get(uri, token).await;

    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_granted_lesson_returns_content() {
    let (status, body) = get_json("/lessons/open", Some(STUDENT)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lesson"]["content"]["body"], "content of open");
    assert_eq!(body["module"]["course"]["id"], "c1");
}

#[tokio::test]
async fn test_locked_lesson_has_no_content() {
    let (status, body) = get_json("/lessons/future", Some(STUDENT)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["reason"], "not_yet_available");
    assert_eq!(body["availableAt"], "2999-01-01T00:00:00Z");
    assert!(body.get("lesson").is_none());
}

#[tokio::test]
async fn test_enrollment_drip_reports_days_left() {
    let (status, body) = get_json("/lessons/weekly", Some(STUDENT)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["reason"], "not_yet_available");
    assert_eq!(body["daysUntilAvailable"], 2);
}

#[tokio::test]
async fn test_unknown_policy_is_locked() {
    let (status, body) = get_json("/lessons/draft", Some(STUDENT)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["reason"], "unknown_policy");
    assert_eq!(body["availableAt"], Value::Null);
}

#[tokio::test]
async fn test_admin_sees_everything() {
    for uri in ["/lessons/future", "/lessons/weekly", "/lessons/draft", "/lessons/orphan"] {
        let (status, _) = get(uri, Some(ADMIN)).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn test_missing_or_unknown_session() {
    let (status, _) = get("/lessons/open", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get("/lessons/open", Some("forged")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_lesson() {
    let (status, body) = get("/lessons/nope", Some(STUDENT)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, b"Lesson nope not found");
}

#[tokio::test]
async fn test_broken_content_is_a_server_error() {
    let (status, body) = get("/lessons/orphan", Some(STUDENT)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, b"Internal error");
}

#[tokio::test]
async fn test_module_overview() {
    let (status, body) = get_json("/modules/m1/lessons", Some(STUDENT)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body.as_array()
            .unwrap()
            .iter()
            .map(|lesson| (lesson["id"].as_str().unwrap(), lesson["granted"].as_bool().unwrap()))
            .collect::<Vec<_>>(),
        [("open", true), ("future", false), ("weekly", false), ("draft", false)]
    );
    assert!(body[0].get("content").is_none());
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get("/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn test_serves_catalog_file_from_memory() {
    let mut fixture = NamedTempFile::new().unwrap();
    fixture
        .write_all(
            json!({
                "courses": [{ "id": "c1", "title": "Flow" }],
                "modules": [{ "id": "m1", "title": "Basics", "course": "c1" }],
                "lessons": [
                    { "id": "intro", "title": "Intro", "module": "m1", "dripType": "immediate" },
                    { "id": "later", "title": "Later", "module": "m1", "order": 1, "dripType": "daysAfterEnrollment", "dripDelayDays": 30 }
                ],
                "enrollments": [{
                    "id": "e1",
                    "user": "u1",
                    "course": "c1",
                    "status": "active",
                    "enrolledAt": Utc::now().to_rfc3339()
                }],
                "sessions": [{ "token": STUDENT, "user": { "id": "u1", "role": "user" } }]
            })
            .to_string()
            .as_bytes(),
        )
        .unwrap();

    let state = State::new(Config {
        catalog_path: Some(fixture.path().to_path_buf()),
        ..config()
    })
    .await
    .unwrap();
    let app = router(state);

    let (status, _) = send(app.clone(), "/lessons/intro", Some(STUDENT)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(app, "/lessons/later", Some(STUDENT)).await;
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["daysUntilAvailable"], 30);
}

#[tokio::test]
async fn test_unreadable_catalog_file_fails_start_up() {
    let fixture = NamedTempFile::new().unwrap();
    let path = fixture.path().to_path_buf();
    drop(fixture);

    let result = State::new(Config {
        catalog_path: Some(path),
        ..config()
    })
    .await;

    assert!(matches!(result, Err(StateError::Catalog(_))));
}
