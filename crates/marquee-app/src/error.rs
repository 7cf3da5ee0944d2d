use axum::response::{IntoResponse, Response};
use http::{HeaderMap, Method, StatusCode};
use marquee_types::ValidationErrors;
use serde::Serialize;
use tracing::error;

use crate::{
    decode::DecodeError,
    envelope::{write_json, Envelope},
    fault::server_error_response,
};

pub type Error = anyhow::Error;
pub type Result<T, E = Error> = std::result::Result<T, E>;
pub type ApiResult<T> = std::result::Result<T, ApiError>;

pub const NOT_FOUND_MESSAGE: &str = "the requested resource could not be found";
pub const SERVER_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(#[from] DecodeError),
    #[error("failed validation: {0}")]
    FailedValidation(#[from] ValidationErrors),
    #[error("the requested resource could not be found")]
    NotFound,
    #[error("the {0} method is not supported for this resource")]
    MethodNotAllowed(Method),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<marquee_dal::Error> for ApiError {
    fn from(value: marquee_dal::Error) -> Self {
        match value {
            marquee_dal::Error::RecordNotFound(_) => ApiError::NotFound,
            other => ApiError::Internal(other.into()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        ApiError::Internal(value.into())
    }
}

/// `{"error": message}` response with given status.
pub fn error_response(status: StatusCode, message: impl Serialize) -> Response {
    match Envelope::single("error", message)
        .and_then(|data| write_json(&data, status, HeaderMap::new()))
    {
        Ok(response) => response,
        Err(e) => {
            error!("Cannot write error response: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::FailedValidation(errors) => {
                error_response(StatusCode::UNPROCESSABLE_ENTITY, errors)
            }
            ApiError::NotFound => error_response(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE),
            e @ ApiError::MethodNotAllowed(_) => {
                error_response(StatusCode::METHOD_NOT_ALLOWED, e.to_string())
            }
            ApiError::Internal(e) => server_error_response(format!("{e:#}")),
        }
    }
}
