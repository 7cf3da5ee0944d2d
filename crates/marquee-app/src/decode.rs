use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{error::Category, Value};
use serde_path_to_error::Segment;

use crate::{error::ApiError, state::AppState};

pub const DEFAULT_MAX_BODY_BYTES: usize = 1_048_576;

/// Why a request body could not be turned into the requested input.
///
/// Messages are returned to the client as they are, offsets are byte offsets into the body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("body must not be larger than {limit} bytes")]
    TooLarge { limit: usize },
    #[error("body contains badly-formed JSON (at character {offset})")]
    Syntax { offset: usize },
    #[error("body contains badly-formed JSON")]
    Truncated,
    #[error("body contains incorrect JSON type for field {field:?}")]
    IncorrectType { field: String },
    #[error("body contains incorrect JSON type (at character {offset})")]
    IncorrectTypeAt { offset: usize },
    #[error("body must not be empty")]
    Empty,
    #[error("body contains unknown key {key:?}")]
    UnknownKey { key: String },
    #[error("body must contain only a single JSON value")]
    MultipleValues,
    #[error("{0}")]
    Other(String),
}

/// Destination of strict decoding.
pub trait StrictInput: DeserializeOwned {
    /// Top level keys accepted in the payload, any other key is rejected.
    const FIELDS: &'static [&'static str];
}

/// Decodes exactly one JSON value from `body`.
///
/// # Panics
///
/// If `T` declares no fields, which is a defect of the destination type, not of the input.
pub fn read_json<T: StrictInput>(body: &[u8], limit: usize) -> Result<T, DecodeError> {
    assert!(
        !T::FIELDS.is_empty(),
        "decode destination {} accepts no fields",
        std::any::type_name::<T>()
    );

    if body.len() > limit {
        return Err(DecodeError::TooLarge { limit });
    }
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(DecodeError::Empty);
    }

    let mut values = serde_json::Deserializer::from_slice(body).into_iter::<Value>();
    let value = match values.next() {
        None => return Err(DecodeError::Empty),
        Some(Err(e)) => return Err(parse_error(body, &e)),
        Some(Ok(value)) => value,
    };
    let first = &body[..values.byte_offset()];

    if let Value::Object(map) = &value {
        if let Some(key) = map.keys().find(|k| !T::FIELDS.contains(&k.as_str())) {
            return Err(DecodeError::UnknownKey { key: key.clone() });
        }
    }

    // null leaves every field at its default
    let source: &[u8] = if value.is_null() { b"{}" } else { first };
    let mut deserializer = serde_json::Deserializer::from_slice(source);
    let decoded = serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        let field = match e.path().iter().next() {
            Some(Segment::Map { key }) => Some(key.clone()),
            _ => None,
        };
        let e = e.into_inner();
        match (e.classify(), field) {
            (Category::Data, Some(field)) => DecodeError::IncorrectType { field },
            _ => parse_error(source, &e),
        }
    })?;

    if values.next().is_some() {
        return Err(DecodeError::MultipleValues);
    }
    Ok(decoded)
}

fn parse_error(body: &[u8], e: &serde_json::Error) -> DecodeError {
    match e.classify() {
        Category::Eof => DecodeError::Truncated,
        Category::Syntax => DecodeError::Syntax {
            offset: byte_offset(body, e.line(), e.column()),
        },
        Category::Data => DecodeError::IncorrectTypeAt {
            offset: byte_offset(body, e.line(), e.column()),
        },
        Category::Io => DecodeError::Other(e.to_string()),
    }
}

fn byte_offset(body: &[u8], line: usize, column: usize) -> usize {
    let preceding: usize = body
        .split(|b| *b == b'\n')
        .take(line.saturating_sub(1))
        .map(|l| l.len() + 1)
        .sum();
    preceding + column
}

/// Like `axum::Json`, but decoded with [`read_json`] under the configured body limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictJson<T>(pub T);

impl<T> FromRequest<AppState> for StrictJson<T>
where
    T: StrictInput + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let limit = state.config().max_body_bytes;
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| {
                if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    DecodeError::TooLarge { limit }
                } else {
                    DecodeError::Other(rejection.body_text())
                }
            })?;
        Ok(StrictJson(read_json(&body, limit)?))
    }
}
