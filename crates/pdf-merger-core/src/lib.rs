//! PDF Merger Core Library
//!
//! This library provides the core functionality behind the PDF merger:
//! - Upload validation and on-disk staging ([`FileStore`])
//! - Per-session file lists, ordering and reordering ([`SessionState`])
//! - Page concatenation with skip-and-continue on unreadable inputs
//! - Merge history (in memory or sled-backed)
//! - Age-based cleanup of the storage directories

pub mod cleanup;
pub mod config;
pub mod error;
pub mod history;
pub mod pdf;
pub mod service;
pub mod session;
pub mod store;
pub mod util;

pub use cleanup::{CleanupReport, cleanup_old_files};
pub use config::{
    AppConfig, CleanupConfig, HistoryConfig, MergeConfig, ServerConfig, StorageConfig,
    DEFAULT_MAX_BODY_BYTES, DEFAULT_OUTPUT_NAME, DEFAULT_PROCESS_OUTPUT_NAME,
};
pub use error::{Error, Result};
pub use history::{HistoryEntry, HistoryLog, HistoryStore, MemoryHistory, SledHistory};
pub use pdf::{
    MergeInput, MergeOptions, MergeOutcome, MergeWarning, PdfInfo, PdfMerger, ProgressFn,
    merge_to_file,
};
pub use service::{MergerService, UploadOutcome};
pub use session::{MergeOrder, MergeResult, ReorderReport, SessionState, UploadedFile};
pub use store::{FileStore, IncomingFile, IngestReport, Rejection, SessionListing, output_filename};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.merge.default_output_name, DEFAULT_OUTPUT_NAME);
        assert_eq!(config.merge.process_output_name, DEFAULT_PROCESS_OUTPUT_NAME);
        assert!(config.merge.skip_unreadable);
    }
}
