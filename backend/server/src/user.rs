//! # Caller Identity
//!
//! Requests carry `Authorization: Bearer <token>`. The token is looked up in the
//! [`SessionStore`](crate::store::SessionStore) on every request.
//!
//! A missing, malformed or unknown token is not rejected here. It yields an anonymous
//! caller and the access evaluator answers with 401, so the check order stays in one place.
use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use catalog::models::User;

use crate::{error::AppError, state::State};

pub struct CurrentUser(pub Option<User>);

impl FromRequestParts<Arc<State>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<State>,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(CurrentUser(None));
        };

        let user = state.sessions.user_for_token(token).await?;

        Ok(CurrentUser(user))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
