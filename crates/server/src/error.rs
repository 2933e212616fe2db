use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use strum_macros::Display;
use thiserror::Error;
use tracing::error;

use crate::models::rating::Stars;

#[derive(Clone, Debug, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Entity {
    Resource,
    User,
    Manifest,
    Task,
    SourceFile,
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("bad auth or refresh credentials")]
    BadCredentials,
    #[error("{entity} `{id}` doesn't exist")]
    NotFound { entity: Entity, id: String },
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("conflicting update: {0}")]
    Conflict(#[from] ConflictError),
    #[error("upstream service failed: {0}")]
    Transient(String),
    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

impl RequestError {
    pub fn not_found(entity: Entity, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Http(_))
    }
}

#[derive(Clone, Debug, Error)]
pub enum ValidationError {
    #[error("input value is invalid: `{value}`, reason: {reason}")]
    InvalidInput { value: String, reason: String },
    #[error(
        "rating value {0} is out of range, expected {min}..={max}",
        min = Stars::MIN,
        max = Stars::MAX
    )]
    InvalidRatingValue(i64),
    #[error("unknown resource type `{0}`, expected one of: task, pipeline")]
    InvalidResourceType(String),
    #[error("github pointer is malformed, `{field}` cannot be empty")]
    MalformedGithubPointer { field: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConflictError {
    #[error("resource is already rated by this user, revise the existing rating instead")]
    AlreadyRated,
    #[error("supplied previous rating {supplied} is stale, the rating has changed since it was read")]
    StaleRating {
        supplied: Stars,
        current: Option<Stars>,
    },
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            e @ Self::NotFound { .. } => (StatusCode::NOT_FOUND, e.to_string()),
            Self::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            Self::Conflict(e) => (StatusCode::CONFLICT, e.to_string()),
            e @ Self::BadCredentials => (StatusCode::UNAUTHORIZED, e.to_string()),
            e if e.is_transient() => {
                error!("upstream failure while serving user request: {e}");
                (StatusCode::BAD_GATEWAY, "Upstream service unavailable".into())
            }
            Self::Sqlx(sqlx::Error::RowNotFound) => (StatusCode::NOT_FOUND, "not found".into()),
            e => {
                error!("received internal error for user request: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong".into(),
                )
            }
        };
        let error = json!({ "error": error }).to_string();
        (status, error).into_response()
    }
}

#[derive(Clone, Debug)]
pub enum SessionError {
    BadToken,
    TokenExpired,
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            Self::BadToken => (StatusCode::BAD_REQUEST, "Missing or bad token in request"),
            Self::TokenExpired => (StatusCode::UNAUTHORIZED, "Token has expired"),
        };
        let error = json!({ "error": error }).to_string();
        (status, error).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_to_statuses() {
        let cases = [
            (RequestError::Transient("github returned 503".into()), StatusCode::BAD_GATEWAY),
            (RequestError::not_found(Entity::Resource, 3), StatusCode::NOT_FOUND),
            (ConflictError::AlreadyRated.into(), StatusCode::CONFLICT),
            (
                ValidationError::InvalidRatingValue(9).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                RequestError::Sqlx(sqlx::Error::PoolClosed),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
