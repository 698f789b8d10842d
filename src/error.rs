use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::{identity::ProviderError, repository::RepoError, storage::StorageError};

/// ErrorBody
///
/// The JSON shape of every error response: `{ "error": "<message>" }`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// ApiError
///
/// Application-wide error type returned by handlers and extractors.
/// The `Display` text is what the client sees, so variants wrapping internal
/// failures carry no detail; the detail is logged where the error is converted.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Authentication required")]
    Unauthorized,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Admin access required")]
    AdminRequired,
    #[error("Super admin access required")]
    SuperAdminRequired,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("Identity provider unavailable")]
    BadGateway,
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::AdminRequired | ApiError::SuperAdminRequired => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BadGateway => StatusCode::BAD_GATEWAY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict => ApiError::Conflict("Resource already exists".to_string()),
            RepoError::MissingReference => ApiError::NotFound("Referenced resource"),
            RepoError::Db(e) => {
                tracing::error!(error = ?e, "database error");
                ApiError::Internal
            }
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Rejected(_) => {
                ApiError::bad_request("Request rejected by identity provider")
            }
            ProviderError::Unavailable(reason) => {
                tracing::error!(%reason, "identity provider unavailable");
                ApiError::BadGateway
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        tracing::error!(error = %e, "object storage error");
        ApiError::Internal
    }
}
