use std::any::Any;

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    Router,
};
use http::{header, HeaderValue, StatusCode};
use tower_http::catch_panic::CatchPanicLayer;
use tracing::error;

use crate::error::{error_response, SERVER_ERROR_MESSAGE};

/// Detail of a server side failure, attached to the response and logged by [`log_server_faults`].
///
/// Never sent to the client.
#[derive(Debug, Clone)]
pub struct ServerFault(pub String);

pub fn server_error_response(detail: impl Into<String>) -> Response {
    let mut response = error_response(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_MESSAGE);
    response.extensions_mut().insert(ServerFault(detail.into()));
    response
}

pub async fn log_server_faults(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let mut response = next.run(req).await;
    if let Some(ServerFault(detail)) = response.extensions_mut().remove::<ServerFault>() {
        error!(%method, %uri, "{detail}");
    }
    response
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    let mut response = server_error_response(format!("panic: {detail}"));
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}

/// Handler panics become 500 responses closing the connection, fault details are logged.
pub fn with_fault_handling<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(log_server_faults))
}
