//! Askama templates for the HTML pages.
//!
//! ## Template Structure
//!
//! - `base.html` - Common layout with CSS/JS and the flash message list
//! - `index.html` - Upload form
//! - `merge.html` - File list with drag-to-reorder and the merge form
//! - `download.html` - Result metadata and download link
//! - `history.html`, `recovery.html`, `error.html`, `debug.html`
//!
//! Every page extends `base.html`, so every template carries `flashes`.

use askama::Template;
use askama_web::WebTemplate;
use pdf_merger_core::{HistoryEntry, MergeResult, UploadedFile};

use crate::session::Flash;

/// Placeholder for metadata of a merge this session did not produce.
const UNKNOWN: &str = "Unknown";

/// Upload form.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub flashes: Vec<Flash>,
    pub max_upload_mb: u64,
}

/// Ordering and merge page for the current session.
#[derive(Template, WebTemplate)]
#[template(path = "merge.html")]
pub struct MergeTemplate {
    pub flashes: Vec<Flash>,
    pub files: Vec<UploadedFile>,
    pub file_count: usize,
    pub total_pages: usize,
    /// Form value of the order mode the list was built with
    pub order: &'static str,
    pub output_name: String,
    pub upload_id: String,
}

/// Merge result page.
///
/// `pages` and `size` are display strings so a filename this session did not
/// merge still renders, with both fields unknown.
#[derive(Template, WebTemplate)]
#[template(path = "download.html")]
pub struct DownloadTemplate {
    pub flashes: Vec<Flash>,
    pub filename: String,
    pub download_url: String,
    pub pages: String,
    pub size: String,
}

impl DownloadTemplate {
    pub fn new(flashes: Vec<Flash>, filename: String, result: Option<&MergeResult>) -> Self {
        let download_url = format!("/download_file/{}", urlencoding::encode(&filename));
        let (pages, size) = result.map_or_else(
            || (UNKNOWN.to_string(), UNKNOWN.to_string()),
            |r| (r.pages.to_string(), r.size_label()),
        );
        Self {
            flashes,
            filename,
            download_url,
            pages,
            size,
        }
    }

    pub fn is_known(&self) -> bool {
        self.pages != UNKNOWN
    }
}

/// Past merges, newest first.
#[derive(Template, WebTemplate)]
#[template(path = "history.html")]
pub struct HistoryTemplate {
    pub flashes: Vec<Flash>,
    pub entries: Vec<HistoryEntry>,
}

/// Recovery form.
#[derive(Template, WebTemplate)]
#[template(path = "recovery.html")]
pub struct RecoveryTemplate {
    pub flashes: Vec<Flash>,
    /// Upload id still remembered by this browser session
    pub upload_id: Option<String>,
}

/// Error page (404, 413, 500).
#[derive(Template, WebTemplate)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub flashes: Vec<Flash>,
    pub error: String,
}

impl ErrorTemplate {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            flashes: Vec::new(),
            error: error.into(),
        }
    }
}

/// Diagnostic dump, pretty-printed JSON inside `<pre>`.
#[derive(Template, WebTemplate)]
#[template(path = "debug.html")]
pub struct DebugTemplate {
    pub flashes: Vec<Flash>,
    pub dump: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_download_known_and_unknown() {
        let unknown = DownloadTemplate::new(Vec::new(), "other.pdf".into(), None);
        assert_eq!(unknown.pages, "Unknown");
        assert_eq!(unknown.size, "Unknown");
        assert!(!unknown.is_known());

        let result = MergeResult {
            filename: "my file.pdf".into(),
            path: PathBuf::from("output/my file.pdf"),
            pages: 5,
            size: 2048,
        };
        let known = DownloadTemplate::new(Vec::new(), "my file.pdf".into(), Some(&result));
        assert_eq!(known.pages, "5");
        assert_eq!(known.size, "2.0 KB");
        assert_eq!(known.download_url, "/download_file/my%20file.pdf");
    }

    #[test]
    fn test_error_page_escapes() {
        let html = ErrorTemplate::new("<script>").render().unwrap_or_default();
        assert!(html.contains("&lt;script&gt;"));
    }
}
