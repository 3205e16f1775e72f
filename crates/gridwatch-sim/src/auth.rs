//! Operator bearer-token middleware
//!
//! Tokens are compared against the configured value. Missing or malformed
//! headers answer 401, a well-formed but wrong token answers 403, both with
//! a `{detail}` body.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::ErrorDetail;
use crate::state::AppState;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    #[error("Missing Authorization header")]
    Missing,
    #[error("Invalid Authorization format, use: Bearer <token>")]
    Malformed,
    #[error("Invalid token")]
    Forbidden,
}

impl AuthRejection {
    fn status(&self) -> StatusCode {
        match self {
            AuthRejection::Missing | AuthRejection::Malformed => StatusCode::UNAUTHORIZED,
            AuthRejection::Forbidden => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorDetail::new(self.to_string()))).into_response()
    }
}

/// Extract the token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthRejection> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthRejection::Missing)?
        .to_str()
        .map_err(|_| AuthRejection::Malformed)?;
    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AuthRejection::Malformed),
    }
}

pub fn check_operator(headers: &HeaderMap, expected: &str) -> Result<(), AuthRejection> {
    if bearer_token(headers)? == expected {
        Ok(())
    } else {
        Err(AuthRejection::Forbidden)
    }
}

/// Reject requests without the operator token
pub async fn require_operator(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if let Err(rejection) = check_operator(request.headers(), &state.config.auth.api_token) {
        match rejection {
            AuthRejection::Forbidden => warn!(path = %request.uri().path(), "Invalid operator token"),
            _ => debug!(path = %request.uri().path(), error = %rejection, "Unauthenticated request"),
        }
        return rejection.into_response();
    }
    next.run(request).await
}
