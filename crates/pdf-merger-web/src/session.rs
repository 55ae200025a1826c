//! Cookie-keyed session record and flash messages.
//!
//! The browser holds only the `tower-sessions` cookie; the [`SessionState`]
//! lives in the server-side session store. The upload id is also kept under
//! its own key so `/merge` can rebuild the file list from storage when the
//! state itself is gone.

use axum::{extract::FromRequestParts, http::request::Parts};
use pdf_merger_core::{MergeOrder, SessionState};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{debug, warn};

use crate::helpers::{PageResult, ResultExt};

const STATE_KEY: &str = "merge_state";
const UPLOAD_ID_KEY: &str = "upload_id";
const ORDER_KEY: &str = "merge_order";
const FLASH_KEY: &str = "_flashes";

const KNOWN_KEYS: [&str; 4] = [STATE_KEY, UPLOAD_ID_KEY, ORDER_KEY, FLASH_KEY];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl FlashLevel {
    /// CSS modifier used by the templates.
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "danger",
        }
    }
}

/// One-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

/// Typed access to one browser session.
#[derive(Debug, Clone)]
pub struct MergeSession {
    session: Session,
}

impl<S> FromRequestParts<S> for MergeSession
where
    S: Send + Sync,
{
    type Rejection = <Session as FromRequestParts<S>>::Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        Ok(Self { session })
    }
}

impl MergeSession {
    /// The merge record, if any. An unreadable record counts as absent.
    pub async fn state(&self) -> Option<SessionState> {
        match self.session.get::<SessionState>(STATE_KEY).await {
            Ok(state) => state,
            Err(e) => {
                warn!("Discarding unreadable session state: {}", e);
                None
            }
        }
    }

    /// Store the merge record and the upload id it points at.
    pub async fn set_state(&self, state: &SessionState) -> PageResult<()> {
        self.session
            .insert(STATE_KEY, state)
            .await
            .or_internal_error()?;
        self.session
            .insert(UPLOAD_ID_KEY, &state.upload_id)
            .await
            .or_internal_error()?;
        self.session
            .insert(ORDER_KEY, state.order)
            .await
            .or_internal_error()?;
        debug!("Session now tracks upload {}", state.upload_id);
        Ok(())
    }

    pub async fn upload_id(&self) -> Option<String> {
        self.session.get(UPLOAD_ID_KEY).await.ok().flatten()
    }

    /// Order mode chosen at upload time; by name if never chosen.
    pub async fn order(&self) -> MergeOrder {
        self.session
            .get(ORDER_KEY)
            .await
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    /// Drop every key of this session.
    pub async fn clear(&self) {
        self.session.clear().await;
    }

    /// Queue a message for the next rendered page. Failures are only logged.
    pub async fn flash(&self, level: FlashLevel, message: impl Into<String>) {
        let mut flashes: Vec<Flash> = self
            .session
            .get(FLASH_KEY)
            .await
            .ok()
            .flatten()
            .unwrap_or_default();
        flashes.push(Flash {
            level,
            message: message.into(),
        });
        if let Err(e) = self.session.insert(FLASH_KEY, flashes).await {
            warn!("Failed to store flash message: {}", e);
        }
    }

    /// Pending messages, removing them from the session.
    pub async fn take_flashes(&self) -> Vec<Flash> {
        self.session
            .remove::<Vec<Flash>>(FLASH_KEY)
            .await
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    /// Which of the known keys currently hold a value (diagnostics).
    pub async fn keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        for key in KNOWN_KEYS {
            if matches!(self.session.get_value(key).await, Ok(Some(_))) {
                keys.push(key);
            }
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_level_serde() {
        let flash = Flash {
            level: FlashLevel::Warning,
            message: "careful".to_string(),
        };
        let json = serde_json::to_value(&flash).unwrap_or_default();
        assert_eq!(json["level"], "warning");
        assert_eq!(FlashLevel::Error.css_class(), "danger");
    }
}
