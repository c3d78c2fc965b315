use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};

use findit_core::{SessionError, ValidationError};
use findit_types::ErrorResponse;

use crate::auth::AuthError;
use crate::session_manager::SessionManagerError;

/// Anything a route handler can fail with, mapped onto a status and a JSON body
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Session(#[from] SessionManagerError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(error) => match error {
                AuthError::Validation(_) => StatusCode::BAD_REQUEST,
                AuthError::EmailInUse => StatusCode::CONFLICT,
                AuthError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
                AuthError::InvalidCredentials
                | AuthError::MissingToken
                | AuthError::InvalidToken
                | AuthError::TokenExpired
                | AuthError::TokenRevoked => StatusCode::UNAUTHORIZED,
            },
            ApiError::Session(error) => match error {
                SessionManagerError::NotFound => StatusCode::NOT_FOUND,
                SessionManagerError::Forbidden => StatusCode::FORBIDDEN,
                SessionManagerError::EmptyImage => StatusCode::BAD_REQUEST,
                SessionManagerError::NotAwaitingSubmission { .. }
                | SessionManagerError::Session(SessionError::InvalidPhase { .. })
                | SessionManagerError::Session(SessionError::WrongMode { .. }) => {
                    StatusCode::CONFLICT
                }
                SessionManagerError::UploadFailed => StatusCode::BAD_GATEWAY,
            },
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the player. Backend details stay in the logs.
    pub fn message(&self) -> String {
        match self {
            ApiError::Auth(AuthError::Backend(_)) => "Failed to reach the account service".to_string(),
            other => other.to_string(),
        }
    }

    pub fn into_reply(self) -> WithStatus<Json> {
        warp::reply::with_status(
            warp::reply::json(&ErrorResponse::new(self.message())),
            self.status(),
        )
    }
}
