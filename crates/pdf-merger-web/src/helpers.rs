//! Helper types and traits for cleaner route handlers.
//!
//! Handlers return [`PageResult`]; the error carries an [`ErrorKind`] and a
//! user-facing message, and each route family maps it to a response at the
//! boundary:
//!
//! - HTML routes: a flash message plus a redirect ([`PageError::flash_redirect`])
//! - JSON routes: `{"status": "error", "message": ...}` ([`PageError::into_json`])
//! - Binary routes: status code with a plain-text body (`IntoResponse`)

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use pdf_merger_core::Error;
use serde_json::json;
use tracing::{error, warn};

use crate::session::{FlashLevel, MergeSession};

/// What went wrong, independent of how it is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input: wrong extension, unreadable PDF, nothing usable uploaded
    Validation,
    /// No session state to act on
    MissingSession,
    /// The merge produced no pages
    MergeFailed,
    NotFound,
    TooLarge,
    Internal,
}

impl ErrorKind {
    pub const fn status(self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::MissingSession | Self::NotFound => StatusCode::NOT_FOUND,
            Self::MergeFailed => StatusCode::UNPROCESSABLE_ENTITY,
            Self::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Typed handler failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct PageError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Standard result type for route handlers.
pub type PageResult<T> = Result<T, PageError>;

impl PageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn missing_session(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingSession, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Same kind, different wording for the client.
    #[must_use]
    pub fn with_message(self, message: impl Into<String>) -> Self {
        Self::new(self.kind, message)
    }

    /// Flash the message as an error and redirect to `to`.
    pub async fn flash_redirect(self, session: &MergeSession, to: &str) -> Response {
        warn!("{:?}: {}", self.kind, self.message);
        session.flash(FlashLevel::Error, self.message).await;
        Redirect::to(to).into_response()
    }

    /// `{"status": "error", "message": ...}` with the kind's status code.
    pub fn into_json(self) -> Response {
        warn!("{:?}: {}", self.kind, self.message);
        (
            self.kind.status(),
            Json(json!({ "status": "error", "message": self.message })),
        )
            .into_response()
    }
}

impl From<Error> for PageError {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidExtension(_)
            | Error::InvalidFilename(_)
            | Error::PdfOpen(_)
            | Error::EmptyDocument(_) => Self::validation(e.to_string()),
            Error::NoValidFiles => Self::validation("No valid PDF files found"),
            Error::NoValidPages => {
                Self::new(ErrorKind::MergeFailed, "No valid pages found to merge")
            }
            Error::SessionNotFound(_) => Self::missing_session("Session not found"),
            Error::OutputNotFound(name) => Self::not_found(format!("File not found: {name}")),
            other => {
                error!("Internal error: {}", other);
                Self::internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        (self.kind.status(), self.message).into_response()
    }
}

/// Extension trait for converting `Option<T>` to `PageResult<T>`.
pub trait OptionExt<T> {
    /// Returns the contained value or a missing-session error.
    fn or_missing_session(self, msg: &str) -> PageResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_missing_session(self, msg: &str) -> PageResult<T> {
        self.ok_or_else(|| PageError::missing_session(msg))
    }
}

/// Extension trait for converting foreign `Result<T, E>` to `PageResult<T>`.
pub trait ResultExt<T, E: std::fmt::Display> {
    /// Converts the error to an internal error.
    fn or_internal_error(self) -> PageResult<T>;

    /// Converts the error to a validation error.
    fn or_bad_request(self) -> PageResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T, E> for Result<T, E> {
    fn or_internal_error(self) -> PageResult<T> {
        self.map_err(|e| {
            error!("Internal error: {}", e);
            PageError::internal(e.to_string())
        })
    }

    fn or_bad_request(self) -> PageResult<T> {
        self.map_err(|e| PageError::validation(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_kinds() {
        assert_eq!(PageError::from(Error::NoValidFiles).kind, ErrorKind::Validation);
        assert_eq!(PageError::from(Error::NoValidPages).kind, ErrorKind::MergeFailed);
        assert_eq!(
            PageError::from(Error::SessionNotFound("x".into())).kind,
            ErrorKind::MissingSession
        );
        assert_eq!(
            PageError::from(Error::OutputNotFound("x.pdf".into())).message,
            "File not found: x.pdf"
        );
        assert_eq!(
            PageError::from(Error::HistoryStore("disk".into())).kind,
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_kind_status() {
        assert_eq!(ErrorKind::MergeFailed.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ErrorKind::TooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_option_ext() {
        let err = None::<u8>.or_missing_session("No files in session").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingSession);
        assert_eq!(err.message, "No files in session");
    }
}
