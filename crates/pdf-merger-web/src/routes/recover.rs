//! Recovery routes - rebuild a session from its upload directory.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::helpers::{ErrorKind, PageError};
use crate::session::{FlashLevel, MergeSession};
use crate::state::AppState;
use crate::templates::RecoveryTemplate;

#[derive(Debug, Default, Deserialize)]
pub struct RecoverQuery {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Recovery form.
pub async fn recovery_page(session: MergeSession) -> RecoveryTemplate {
    RecoveryTemplate {
        flashes: session.take_flashes().await,
        upload_id: session.upload_id().await,
    }
}

/// Form target: forwards to `/recover/{session_id}`.
pub async fn recover_query(session: MergeSession, Query(query): Query<RecoverQuery>) -> Response {
    match query.session_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => {
            Redirect::to(&format!("/recover/{}", urlencoding::encode(id))).into_response()
        }
        _ => {
            PageError::validation("Please enter a session id")
                .flash_redirect(&session, "/recovery")
                .await
        }
    }
}

/// Replace the session's state with a scan of `uploads/<session_id>`.
pub async fn recover(
    State(state): State<Arc<AppState>>,
    session: MergeSession,
    Path(session_id): Path<String>,
) -> Response {
    let order = session.order().await;
    let recovered = state
        .blocking(move |service| service.recover(&session_id, order))
        .await;

    let merge_state = match recovered {
        Ok(merge_state) => merge_state,
        Err(e) if e.kind == ErrorKind::Validation => {
            return e
                .with_message("No valid files found in session")
                .flash_redirect(&session, "/")
                .await;
        }
        Err(e) => return e.flash_redirect(&session, "/").await,
    };

    if let Err(e) = session.set_state(&merge_state).await {
        return e.flash_redirect(&session, "/").await;
    }

    info!(
        "Recovered upload {} with {} files",
        merge_state.upload_id,
        merge_state.files.len()
    );
    session
        .flash(
            FlashLevel::Success,
            format!("Recovered session with {} files", merge_state.files.len()),
        )
        .await;
    Redirect::to("/merge").into_response()
}
