//! Error pages: 404 fallback, 413 rewrite, and panics turned into a 500.

use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::any::Any;
use std::sync::Arc;
use tracing::error;

use crate::state::AppState;
use crate::templates::ErrorTemplate;

pub const MIB: usize = 1024 * 1024;

pub fn too_large_message(max_body_bytes: usize) -> String {
    format!("File too large. Maximum size is {}MB.", max_body_bytes / MIB)
}

/// Fallback for unknown routes.
pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, ErrorTemplate::new("Page not found")).into_response()
}

/// Replace any non-JSON 413 (body limit layer, multipart limit) with the
/// error page.
pub async fn render_too_large(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if response.status() != StatusCode::PAYLOAD_TOO_LARGE || is_json(&response) {
        return response;
    }

    let message = too_large_message(state.service.config().server.max_body_bytes);
    (StatusCode::PAYLOAD_TOO_LARGE, ErrorTemplate::new(message)).into_response()
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

/// `CatchPanicLayer` handler.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Handler panicked: {}", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorTemplate::new("Internal server error"),
    )
        .into_response()
}
