//! Merge routes - ordering page, reorder, merge (HTML and JSON).

use axum::{
    Form, Json,
    extract::{
        Path, State,
        rejection::{FormRejection, JsonRejection},
    },
    response::{IntoResponse, Redirect, Response},
};
use pdf_merger_core::SessionState;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::helpers::{OptionExt, PageError, PageResult, ResultExt};
use crate::session::{FlashLevel, MergeSession};
use crate::state::AppState;
use crate::templates::MergeTemplate;

const NO_FILES: &str = "No files uploaded. Please upload files first.";

/// Body of `POST /reorder`.
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    #[serde(default)]
    pub order: Vec<String>,
}

/// Form of `POST /process`.
#[derive(Debug, Default, Deserialize)]
pub struct ProcessForm {
    #[serde(default)]
    pub output_filename: Option<String>,
}

/// Body of `POST /api/merge`.
#[derive(Debug, Default, Deserialize)]
pub struct ApiMergeRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub output_filename: Option<String>,
}

/// The session's merge record, rebuilt from its upload directory when the
/// record is gone but the upload id survived.
async fn current_state(state: &Arc<AppState>, session: &MergeSession) -> PageResult<SessionState> {
    if let Some(merge_state) = session.state().await {
        return Ok(merge_state);
    }

    let upload_id = session.upload_id().await.or_missing_session(NO_FILES)?;
    let order = session.order().await;
    let recovered = state
        .blocking(move |service| service.recover(&upload_id, order))
        .await
        .map_err(|e| e.with_message(NO_FILES))?;

    session.set_state(&recovered).await?;
    info!("Rebuilt session state for upload {}", recovered.upload_id);
    Ok(recovered)
}

/// Ordering and merge page.
pub async fn merge_page(State(state): State<Arc<AppState>>, session: MergeSession) -> Response {
    let merge_state = match current_state(&state, &session).await {
        Ok(merge_state) => merge_state,
        Err(e) => return e.flash_redirect(&session, "/").await,
    };

    MergeTemplate {
        flashes: session.take_flashes().await,
        file_count: merge_state.files.len(),
        total_pages: merge_state.total_pages(),
        order: merge_state.order.as_str(),
        output_name: merge_state.output_name,
        upload_id: merge_state.upload_id,
        files: merge_state.files,
    }
    .into_response()
}

/// Rewrite the session's file list to the requested order.
///
/// Unknown names are skipped and unmentioned files dropped; the message
/// reports both counts.
pub async fn reorder(
    session: MergeSession,
    body: Result<Json<ReorderRequest>, JsonRejection>,
) -> Response {
    match handle_reorder(&session, body).await {
        Ok(message) => Json(json!({ "status": "success", "message": message })).into_response(),
        Err(e) => e.into_json(),
    }
}

async fn handle_reorder(
    session: &MergeSession,
    body: Result<Json<ReorderRequest>, JsonRejection>,
) -> PageResult<String> {
    let Json(request) = body.or_bad_request()?;
    let mut merge_state = session
        .state()
        .await
        .or_missing_session("No files in session")?;

    let report = merge_state.reorder(&request.order);
    session.set_state(&merge_state).await?;

    info!(
        "Reordered upload {}: {} kept, {} dropped, {} unknown",
        merge_state.upload_id,
        report.kept,
        report.dropped.len(),
        report.unknown.len()
    );
    Ok(report.message())
}

/// Run the merge and redirect to the download page.
pub async fn process(
    State(state): State<Arc<AppState>>,
    session: MergeSession,
    form: Result<Form<ProcessForm>, FormRejection>,
) -> Response {
    let Some(mut merge_state) = session.state().await else {
        return PageError::missing_session("No files to merge")
            .flash_redirect(&session, "/")
            .await;
    };
    let form = match form.or_bad_request() {
        Ok(Form(form)) => form,
        Err(e) => return e.flash_redirect(&session, "/merge").await,
    };

    let requested = form.output_filename;
    let merged = state
        .blocking(move |service| {
            let warnings = service.merge_session(&mut merge_state, requested.as_deref())?;
            Ok((merge_state, warnings))
        })
        .await;

    let (merge_state, warnings) = match merged {
        Ok(merged) => merged,
        Err(e) => return e.flash_redirect(&session, "/merge").await,
    };

    if let Err(e) = session.set_state(&merge_state).await {
        return e.flash_redirect(&session, "/merge").await;
    }
    for warning in &warnings {
        session.flash(FlashLevel::Warning, warning.to_string()).await;
    }
    session
        .flash(FlashLevel::Success, "PDFs merged successfully!")
        .await;

    let filename = merge_state
        .last_merge
        .as_ref()
        .map(|m| m.filename.clone())
        .unwrap_or_default();
    Redirect::to(&format!("/download/{}", urlencoding::encode(&filename))).into_response()
}

/// Merge the PDFs of an upload directory directly, bypassing the cookie session.
pub async fn api_merge(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ApiMergeRequest>, JsonRejection>,
) -> Response {
    match handle_api_merge(&state, body).await {
        Ok(response) => response,
        Err(e) => e.into_json(),
    }
}

async fn handle_api_merge(
    state: &Arc<AppState>,
    body: Result<Json<ApiMergeRequest>, JsonRejection>,
) -> PageResult<Response> {
    let Json(request) = body.or_bad_request()?;
    let session_id = request
        .session_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| PageError::validation("No session ID provided"))?;
    let requested = request.output_filename;

    let outcome = state
        .blocking(move |service| service.merge_directory(&session_id, requested.as_deref()))
        .await?;

    let warnings: Vec<String> = outcome.warnings.iter().map(ToString::to_string).collect();
    let filename = outcome.result.filename;

    Ok(Json(json!({
        "status": "success",
        "download_url": format!("/download_file/{}", urlencoding::encode(&filename)),
        "filename": filename,
        "pages": outcome.result.pages,
        "warnings": warnings,
    }))
    .into_response())
}

/// Merges run inside the request, so every task is already complete.
pub async fn api_status(Path(_task_id): Path<String>) -> Json<serde_json::Value> {
    Json(json!({ "status": "completed", "progress": 100 }))
}
