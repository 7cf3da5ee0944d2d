use axum::{extract::State, response::Response};
use http::{HeaderMap, StatusCode};
use serde::Serialize;

use crate::{
    envelope::{write_json, Envelope},
    error::ApiResult,
    state::AppState,
};

#[derive(Debug, Serialize)]
struct SystemInfo<'a> {
    environment: &'a str,
    version: &'a str,
}

pub async fn healthcheck(State(state): State<AppState>) -> ApiResult<Response> {
    let config = state.config();
    let data = Envelope::single("status", "available")?.with(
        "system_info",
        SystemInfo {
            environment: &config.environment,
            version: &config.version,
        },
    )?;
    Ok(write_json(&data, StatusCode::OK, HeaderMap::new())?)
}
