//! Download routes - result page and binary transfer.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::Response,
};
use std::sync::Arc;

use crate::helpers::{PageResult, ResultExt};
use crate::session::MergeSession;
use crate::state::AppState;
use crate::templates::DownloadTemplate;

/// Result page. Metadata is filled in only when `filename` is this
/// session's last merge; any other name still renders, marked unknown.
pub async fn download_page(session: MergeSession, Path(filename): Path<String>) -> DownloadTemplate {
    let merge_state = session.state().await;
    let result = merge_state
        .as_ref()
        .and_then(|s| s.merge_result_for(&filename));
    DownloadTemplate::new(session.take_flashes().await, filename, result)
}

/// Stream a merged PDF as an attachment, 404 if it does not exist.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> PageResult<Response> {
    let path = state.service.store().existing_output(&filename)?;
    let data = tokio::fs::read(&path).await.or_internal_error()?;

    let content_type = mime_guess::from_path(&path)
        .first_raw()
        .unwrap_or("application/pdf");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&filename),
        )
        .body(Body::from(data))
        .or_internal_error()
}

/// `attachment` header value; non-ASCII names get an RFC 5987 `filename*`
/// next to an ASCII fallback.
fn content_disposition(filename: &str) -> String {
    if filename.is_ascii() {
        return format!("attachment; filename=\"{filename}\"");
    }
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    )
}
