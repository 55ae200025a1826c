//! Upload routes - multipart ingest into a fresh upload directory.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{Multipart, multipart::MultipartError};
use bytes::Bytes;
use pdf_merger_core::{IncomingFile, MergeOrder, UploadOutcome};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::helpers::{ErrorKind, PageError, PageResult};
use crate::session::{FlashLevel, MergeSession};
use crate::state::AppState;

/// Fields of the upload form.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub files: Vec<IncomingFile>,
    pub merge_order: Option<String>,
    pub output_name: Option<String>,
}

impl UploadForm {
    /// Read every part of the body. File parts come from `files`; parts with
    /// no filename (an empty file input) are ignored.
    pub async fn read(mut multipart: Multipart) -> PageResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            match field.name().unwrap_or("") {
                "files" => {
                    let filename = field.file_name().unwrap_or("").to_string();
                    let data = field.bytes().await.map_err(multipart_error)?;
                    if !filename.is_empty() {
                        form.files.push(incoming(filename, data));
                    }
                }
                "merge_order" => {
                    form.merge_order = Some(field.text().await.map_err(multipart_error)?);
                }
                "output_name" => {
                    form.output_name = Some(field.text().await.map_err(multipart_error)?);
                }
                _ => {}
            }
        }

        Ok(form)
    }

    pub fn order(&self) -> MergeOrder {
        MergeOrder::from_form(self.merge_order.as_deref())
    }
}

fn incoming(filename: String, data: Bytes) -> IncomingFile {
    IncomingFile::new(filename, data.to_vec())
}

/// Body-limit failures keep their 413 so the error page middleware sees them.
fn multipart_error(e: MultipartError) -> PageError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        PageError::new(ErrorKind::TooLarge, e.body_text())
    } else {
        PageError::validation(e.body_text())
    }
}

/// Ingest an upload batch through the service.
async fn ingest(state: &Arc<AppState>, form: UploadForm) -> PageResult<UploadOutcome> {
    let order = form.order();
    let UploadForm {
        files, output_name, ..
    } = form;
    state
        .blocking(move |service| service.upload(files, order, output_name.as_deref()))
        .await
}

/// Upload PDF files - redirects to the merge page (POST-Redirect-GET pattern).
pub async fn upload(
    State(state): State<Arc<AppState>>,
    session: MergeSession,
    multipart: Multipart,
) -> Response {
    match handle_upload(&state, &session, multipart).await {
        Ok(response) => response,
        Err(e) if e.kind == ErrorKind::TooLarge => e.into_response(),
        Err(e) => e.flash_redirect(&session, "/").await,
    }
}

async fn handle_upload(
    state: &Arc<AppState>,
    session: &MergeSession,
    multipart: Multipart,
) -> PageResult<Response> {
    let form = UploadForm::read(multipart).await?;
    if form.files.is_empty() {
        return Err(PageError::validation("No files selected"));
    }

    let outcome = ingest(state, form).await.map_err(|e| {
        if e.kind == ErrorKind::Validation {
            e.with_message("No valid PDF files uploaded. Please select PDF files only.")
        } else {
            e
        }
    })?;

    session.set_state(&outcome.state).await?;

    for rejected in &outcome.rejected {
        session
            .flash(
                FlashLevel::Warning,
                format!("Skipped {}: {}", rejected.filename, rejected.reason),
            )
            .await;
    }
    session
        .flash(
            FlashLevel::Success,
            format!("{} PDF files uploaded successfully!", outcome.state.files.len()),
        )
        .await;

    info!(
        "Session tracks upload {} ({} files, {} pages)",
        outcome.state.upload_id,
        outcome.state.files.len(),
        outcome.state.total_pages()
    );

    Ok(Redirect::to("/merge").into_response())
}

/// JSON upload. Creates an upload directory but leaves the cookie session alone.
pub async fn api_upload(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let form = match UploadForm::read(multipart).await {
        Ok(form) => form,
        Err(e) => return e.into_json(),
    };
    if form.files.is_empty() {
        return PageError::validation("No files provided").into_json();
    }

    match ingest(&state, form).await {
        Ok(outcome) => {
            let files: Vec<_> = outcome
                .state
                .files
                .iter()
                .map(|f| json!({ "name": f.name, "pages": f.pages, "size": f.size }))
                .collect();
            let rejected: Vec<_> = outcome
                .rejected
                .iter()
                .map(|r| json!({ "name": r.filename, "reason": r.reason }))
                .collect();

            Json(json!({
                "status": "success",
                "session_id": outcome.state.upload_id,
                "files": files,
                "rejected": rejected,
            }))
            .into_response()
        }
        Err(e) => e.into_json(),
    }
}
