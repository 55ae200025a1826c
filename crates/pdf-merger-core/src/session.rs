//! Per-client merge session state.
//!
//! A [`SessionState`] is the record one browser session carries between
//! requests: the upload id naming its storage directory, the ordered list of
//! accepted files, the chosen order mode and the most recent merge result.
//! It is serialisable so the web layer can keep it in a cookie-keyed store.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::util::format_size;

/// A validated upload. Immutable once created; `pages` is always > 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    pub path: PathBuf,
    pub pages: usize,
    pub size: u64,
}

impl UploadedFile {
    pub fn size_label(&self) -> String {
        format_size(self.size)
    }
}

/// How a freshly built file list is ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeOrder {
    /// Ascending by filename
    #[default]
    #[serde(rename = "filename")]
    ByName,
    /// As submitted
    #[serde(rename = "upload_order")]
    UploadSequence,
}

impl MergeOrder {
    /// Parse the upload form value; unknown values fall back to by-name.
    pub fn from_form(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("upload_order") => Self::UploadSequence,
            _ => Self::ByName,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ByName => "filename",
            Self::UploadSequence => "upload_order",
        }
    }

    /// Apply this order to a file list in place.
    pub fn apply(self, files: &mut [UploadedFile]) {
        if self == Self::ByName {
            files.sort_by(|a, b| a.name.cmp(&b.name));
        }
    }
}

/// Outcome of a successful merge. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResult {
    pub filename: String,
    pub path: PathBuf,
    pub pages: usize,
    pub size: u64,
}

impl MergeResult {
    pub fn size_label(&self) -> String {
        format_size(self.size)
    }
}

/// What a reorder request kept, dropped and could not match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReorderReport {
    pub kept: usize,
    /// Files in the old list that the request did not mention
    pub dropped: Vec<String>,
    /// Requested names with no matching file
    pub unknown: Vec<String>,
}

impl ReorderReport {
    /// Short message for the client.
    pub fn message(&self) -> String {
        let mut message = String::from("Files reordered");
        if !self.dropped.is_empty() {
            message.push_str(&format!(", {} dropped", self.dropped.len()));
        }
        if !self.unknown.is_empty() {
            message.push_str(&format!(", {} unknown", self.unknown.len()));
        }
        message
    }
}

/// Session record kept across requests for one browser session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Names the upload directory holding `files`
    pub upload_id: String,
    pub files: Vec<UploadedFile>,
    pub order: MergeOrder,
    /// Output name chosen on the upload form
    pub output_name: String,
    pub last_merge: Option<MergeResult>,
}

impl SessionState {
    /// Build a session from freshly accepted files, applying `order`.
    pub fn new(
        upload_id: impl Into<String>,
        mut files: Vec<UploadedFile>,
        order: MergeOrder,
        output_name: impl Into<String>,
    ) -> Self {
        order.apply(&mut files);
        Self {
            upload_id: upload_id.into(),
            files,
            order,
            output_name: output_name.into(),
            last_merge: None,
        }
    }

    pub fn total_pages(&self) -> usize {
        self.files.iter().map(|f| f.pages).sum()
    }

    /// Rewrite the file list to follow `names`.
    ///
    /// Each requested name takes the first not-yet-used file with that name.
    /// Unknown names are skipped and files not named are dropped; both are
    /// reported. No filesystem change.
    pub fn reorder<S: AsRef<str>>(&mut self, names: &[S]) -> ReorderReport {
        let mut used = vec![false; self.files.len()];
        let mut reordered = Vec::with_capacity(names.len());
        let mut unknown = Vec::new();

        for name in names {
            let name = name.as_ref();
            let found = self
                .files
                .iter()
                .enumerate()
                .find(|(i, f)| !used[*i] && f.name == name)
                .map(|(i, _)| i);

            match found {
                Some(i) => {
                    used[i] = true;
                    reordered.push(self.files[i].clone());
                }
                None => unknown.push(name.to_string()),
            }
        }

        let dropped = self
            .files
            .iter()
            .zip(&used)
            .filter(|(_, used)| !**used)
            .map(|(f, _)| f.name.clone())
            .collect();

        self.files = reordered;

        ReorderReport {
            kept: self.files.len(),
            dropped,
            unknown,
        }
    }

    /// Last merge result if it produced `filename`.
    pub fn merge_result_for(&self, filename: &str) -> Option<&MergeResult> {
        self.last_merge.as_ref().filter(|m| m.filename == filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, pages: usize) -> UploadedFile {
        UploadedFile {
            name: name.to_string(),
            path: PathBuf::from(format!("uploads/x/{name}")),
            pages,
            size: 1024,
        }
    }

    fn names(state: &SessionState) -> Vec<&str> {
        state.files.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_by_name_sorts() {
        let state = SessionState::new(
            "x",
            vec![file("c.pdf", 1), file("a.pdf", 2), file("b.pdf", 3)],
            MergeOrder::ByName,
            "merged.pdf",
        );
        assert_eq!(names(&state), ["a.pdf", "b.pdf", "c.pdf"]);
        assert_eq!(state.total_pages(), 6);
    }

    #[test]
    fn test_upload_sequence_keeps_order() {
        let state = SessionState::new(
            "x",
            vec![file("c.pdf", 1), file("a.pdf", 2)],
            MergeOrder::UploadSequence,
            "merged.pdf",
        );
        assert_eq!(names(&state), ["c.pdf", "a.pdf"]);
    }

    #[test]
    fn test_order_from_form() {
        assert_eq!(MergeOrder::from_form(Some("upload_order")), MergeOrder::UploadSequence);
        assert_eq!(MergeOrder::from_form(Some("filename")), MergeOrder::ByName);
        assert_eq!(MergeOrder::from_form(Some("bogus")), MergeOrder::ByName);
        assert_eq!(MergeOrder::from_form(None), MergeOrder::ByName);
    }

    #[test]
    fn test_reorder_permutation() {
        let mut state = SessionState::new(
            "x",
            vec![file("a.pdf", 1), file("b.pdf", 1), file("c.pdf", 1)],
            MergeOrder::ByName,
            "merged.pdf",
        );
        let report = state.reorder(&["c.pdf", "a.pdf", "b.pdf"]);
        assert_eq!(names(&state), ["c.pdf", "a.pdf", "b.pdf"]);
        assert_eq!(report.kept, 3);
        assert!(report.dropped.is_empty());
        assert!(report.unknown.is_empty());
        assert_eq!(report.message(), "Files reordered");
    }

    #[test]
    fn test_reorder_drops_omitted_and_skips_unknown() {
        let mut state = SessionState::new(
            "x",
            vec![file("a.pdf", 1), file("b.pdf", 1), file("c.pdf", 1)],
            MergeOrder::ByName,
            "merged.pdf",
        );
        let report = state.reorder(&["b.pdf", "zzz.pdf", "a.pdf"]);
        assert_eq!(names(&state), ["b.pdf", "a.pdf"]);
        assert_eq!(report.dropped, vec!["c.pdf".to_string()]);
        assert_eq!(report.unknown, vec!["zzz.pdf".to_string()]);
        assert_eq!(report.message(), "Files reordered, 1 dropped, 1 unknown");
    }

    #[test]
    fn test_reorder_repeated_name_used_once() {
        let mut state = SessionState::new(
            "x",
            vec![file("a.pdf", 1), file("b.pdf", 1)],
            MergeOrder::ByName,
            "merged.pdf",
        );
        let report = state.reorder(&["a.pdf", "a.pdf", "b.pdf"]);
        assert_eq!(names(&state), ["a.pdf", "b.pdf"]);
        assert_eq!(report.unknown, vec!["a.pdf".to_string()]);
    }

    #[test]
    fn test_merge_result_lookup() {
        let mut state = SessionState::new("x", vec![file("a.pdf", 1)], MergeOrder::ByName, "m.pdf");
        assert!(state.merge_result_for("m.pdf").is_none());

        state.last_merge = Some(MergeResult {
            filename: "m.pdf".to_string(),
            path: PathBuf::from("output/m.pdf"),
            pages: 1,
            size: 10,
        });
        assert_eq!(state.merge_result_for("m.pdf").map(|m| m.pages), Some(1));
        assert!(state.merge_result_for("other.pdf").is_none());
    }

    #[test]
    fn test_serde_order_names() {
        let json = serde_json::to_string(&MergeOrder::UploadSequence).unwrap_or_default();
        assert_eq!(json, "\"upload_order\"");
    }
}
