use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::{membership::MembershipError, store::StoreError};

mod schema;

pub type AppResult<T, E = AppError> = std::result::Result<T, E>;

/// A common error type that can be used throughout the API.
///
/// Can be returned in a `Result` from an API handler function.
///
/// Client errors carry their message to the caller in the JSON body. Unexpected
/// errors are logged and answered with a generic message.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } => Self::NotFound(e.to_string()),
            StoreError::Conflict(message) => Self::Conflict(message),
            other => Self::UnexpectedError(other.into()),
        }
    }
}

impl From<MembershipError> for AppError {
    fn from(e: MembershipError) -> Self {
        match e {
            MembershipError::SubscriptionNotFound(_) => Self::NotFound(e.to_string()),
            MembershipError::UnsubscribedBeforeSubscribed { .. } => {
                Self::ValidationError(e.to_string())
            }
            MembershipError::Subscription(inner) => Self::Conflict(inner.to_string()),
            MembershipError::Store(inner) => inner.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            Self::ValidationError(s) | Self::NotFound(s) | Self::Conflict(s) => {
                tracing::warn!(status = status.as_u16(), "{}", s);
                s
            }
            Self::UnexpectedError(ref e) => {
                tracing::error!("{:?}", e);
                "Unexpected error".to_owned()
            }
        };

        (
            status,
            Json(schema::Error {
                code: status.as_u16(),
                message,
            }),
        )
            .into_response()
    }
}
