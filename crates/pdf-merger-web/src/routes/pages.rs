//! Page routes - upload form, history, session housekeeping, diagnostics.

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use super::errors::MIB;
use crate::helpers::PageError;
use crate::session::{FlashLevel, MergeSession};
use crate::state::AppState;
use crate::templates::{DebugTemplate, HistoryTemplate, IndexTemplate};

/// Upload form.
pub async fn index(State(state): State<Arc<AppState>>, session: MergeSession) -> IndexTemplate {
    IndexTemplate {
        flashes: session.take_flashes().await,
        max_upload_mb: u64::try_from(state.service.config().server.max_body_bytes / MIB)
            .unwrap_or(u64::MAX),
    }
}

/// Past merges, newest first.
pub async fn history(State(state): State<Arc<AppState>>, session: MergeSession) -> HistoryTemplate {
    HistoryTemplate {
        flashes: session.take_flashes().await,
        entries: state.service.history().newest_first(),
    }
}

pub async fn clear_history(State(state): State<Arc<AppState>>, session: MergeSession) -> Response {
    if let Err(e) = state.service.history().clear() {
        return PageError::from(e).flash_redirect(&session, "/history").await;
    }
    info!("Merge history cleared");
    session
        .flash(FlashLevel::Success, "History cleared successfully!")
        .await;
    Redirect::to("/history").into_response()
}

/// Forget this browser's session. Stored files stay until cleanup.
pub async fn clear_session(session: MergeSession) -> Response {
    session.clear().await;
    session.flash(FlashLevel::Info, "Session cleared").await;
    Redirect::to("/").into_response()
}

/// Session and storage state as pretty-printed JSON.
pub async fn debug(State(state): State<Arc<AppState>>, session: MergeSession) -> Response {
    let merge_state = session.state().await;
    let listings = match state
        .blocking(|service| Ok(service.store().list_sessions()))
        .await
    {
        Ok(listings) => listings,
        Err(e) => return e.into_json(),
    };
    let store = state.service.store();

    let dump = json!({
        "session_keys": session.keys().await,
        "upload_id": session.upload_id().await,
        "uploaded_files_count": merge_state.as_ref().map_or(0, |s| s.files.len()),
        "merged_file": merge_state.as_ref().and_then(|s| s.last_merge.as_ref()),
        "uploads_dir_exists": store.upload_dir().is_dir(),
        "output_dir_exists": store.output_dir().is_dir(),
        "session_folders": listings,
    });

    DebugTemplate {
        flashes: Vec::new(),
        dump: serde_json::to_string_pretty(&dump).unwrap_or_default(),
    }
    .into_response()
}
