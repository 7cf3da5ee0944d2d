use axum::extract::{FromRequestParts, Path};
use http::{request::Parts, Method};

use crate::error::{ApiError, ApiResult};

pub mod health;
pub mod movie;
pub mod paging;

/// Record id from the `{id}` path segment.
///
/// Anything else than a positive integer is reported as not found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordId(pub i64);

impl<S> FromRequestParts<S> for RecordId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::NotFound)?;
        read_id_param(&raw).map(RecordId)
    }
}

pub fn read_id_param(raw: &str) -> ApiResult<i64> {
    match raw.parse::<i64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(ApiError::NotFound),
    }
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

pub async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method)
}
