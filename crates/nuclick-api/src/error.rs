//! Error types for the province API.
//!
//! [`ApiError`] unifies all failure modes into a single enum that can be
//! converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. Storage
//! details never reach the client: they are logged and replaced by a
//! generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use nuclick_core::{RoundError, StoreError};

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request was malformed (bad body, bad identifier, bad query).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The requested province does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A storage call did not finish before the request deadline.
    #[error("request timed out")]
    Timeout,

    /// The request conflicts with the game calendar.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The endpoint is turned off by configuration.
    #[error("disabled: {0}")]
    Disabled(String),

    /// Any other failure. The message is logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(e) => Self::BadRequest(e.to_string()),
            StoreError::NotFound(id) => Self::NotFound(format!("province {id}")),
            StoreError::Timeout(_) => Self::Timeout,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<RoundError> for ApiError {
    fn from(err: RoundError) -> Self {
        match err {
            RoundError::EmptyCollection { .. } => Self::NotFound("no provinces to rank".into()),
            RoundError::NotStarted { starts_at, .. } => {
                Self::Conflict(format!("game has not started; it starts at {starts_at}"))
            }
            RoundError::Store { source, .. } => source.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Timeout => (StatusCode::GATEWAY_TIMEOUT, "request timed out".to_owned()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::Disabled(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use nuclick_types::{ProvinceId, ValidationError};

    use super::*;

    #[test]
    fn store_errors_map_to_statuses() {
        let cases = [
            (StoreError::Validation(ValidationError::MissingId), StatusCode::BAD_REQUEST),
            (StoreError::NotFound(ProvinceId::new()), StatusCode::NOT_FOUND),
            (StoreError::Timeout(5000), StatusCode::GATEWAY_TIMEOUT),
            (StoreError::Storage("pool closed".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn empty_round_is_not_found() {
        let err = ApiError::from(RoundError::EmptyCollection { round: 3 });
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn round_before_start_is_conflict() {
        let starts_at = chrono::Utc::now();
        let err = ApiError::from(RoundError::NotStarted {
            starts_at,
            fired_at: starts_at,
        });
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }
}
