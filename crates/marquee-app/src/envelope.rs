use axum::{body::Body, response::Response};
use http::{header, HeaderMap, HeaderValue, StatusCode};
use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Map, Value};

/// Top level JSON object of every response, e.g. `{"movie": {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Envelope(Map<String, Value>);

impl Envelope {
    pub fn new() -> Self {
        Envelope(Map::new())
    }

    pub fn single(key: impl Into<String>, value: impl Serialize) -> Result<Self, serde_json::Error> {
        Envelope::new().with(key, value)
    }

    pub fn with(
        mut self,
        key: impl Into<String>,
        value: impl Serialize,
    ) -> Result<Self, serde_json::Error> {
        self.0.insert(key.into(), serde_json::to_value(value)?);
        Ok(self)
    }
}

fn to_pretty_json(value: &impl Serialize) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::with_capacity(256);
    let mut ser =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"\t"));
    value.serialize(&mut ser)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Renders `data` as tab indented JSON followed by a newline.
///
/// `headers` are added to the response, content type is always `application/json`.
/// Nothing is written if serialization fails.
pub fn write_json(
    data: &Envelope,
    status: StatusCode,
    headers: HeaderMap,
) -> Result<Response, serde_json::Error> {
    let body = to_pretty_json(data)?;
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    let response_headers = response.headers_mut();
    response_headers.extend(headers);
    response_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Ok(response)
}
