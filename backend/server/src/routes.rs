use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    access::{AccessDecision, DenialReason, LessonStatus},
    error::AppError,
    state::State,
    user::CurrentUser,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Locked {
    pub reason: DenialReason,
    pub available_at: Option<DateTime<Utc>>,
    pub days_until_available: Option<i64>,
}

pub async fn lesson_handler(
    AxumState(state): AxumState<Arc<State>>,
    Path(lesson_id): Path<String>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, AppError> {
    let now = Utc::now();
    let decision = state
        .access
        .evaluate_at(user.as_ref(), &lesson_id, now)
        .await?;

    let response = match decision {
        AccessDecision::Granted(lesson) => (StatusCode::OK, Json(lesson)).into_response(),
        AccessDecision::Denied(denial) => {
            let locked = Locked {
                reason: denial.reason,
                available_at: denial.available_at,
                days_until_available: denial.days_until(now),
            };

            (StatusCode::FORBIDDEN, Json(locked)).into_response()
        }
    };

    Ok(response)
}

pub async fn module_lessons_handler(
    AxumState(state): AxumState<Arc<State>>,
    Path(module_id): Path<String>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<LessonStatus>>, AppError> {
    let statuses = state
        .access
        .module_overview(user.as_ref(), &module_id)
        .await?;

    Ok(Json(statuses))
}

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
