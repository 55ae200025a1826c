//! The upload → order → merge flow over one [`FileStore`] and one
//! [`HistoryLog`].
//!
//! All methods do blocking file I/O and PDF parsing; async callers should
//! run them on a blocking thread.

use tracing::info;

use crate::config::AppConfig;
use crate::error::Result;
use crate::history::{HistoryEntry, HistoryLog};
use crate::pdf::{MergeInput, MergeOptions, MergeOutcome, MergeWarning, merge_to_file};
use crate::session::{MergeOrder, SessionState, UploadedFile};
use crate::store::{FileStore, IncomingFile, Rejection, output_filename};

/// A new session built from an upload batch.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub state: SessionState,
    pub rejected: Vec<Rejection>,
}

pub struct MergerService {
    config: AppConfig,
    store: FileStore,
    history: HistoryLog,
}

impl MergerService {
    /// Open storage and history from configuration.
    pub fn new(config: AppConfig) -> Result<Self> {
        let store = FileStore::open(&config.storage)?;
        let history = HistoryLog::new(&config.history)?;
        Ok(Self::with_parts(config, store, history))
    }

    pub const fn with_parts(config: AppConfig, store: FileStore, history: HistoryLog) -> Self {
        Self {
            config,
            store,
            history,
        }
    }

    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    pub const fn store(&self) -> &FileStore {
        &self.store
    }

    pub const fn history(&self) -> &HistoryLog {
        &self.history
    }

    const fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            skip_unreadable: self.config.merge.skip_unreadable,
        }
    }

    /// Ingest a batch into a fresh upload directory and build its session.
    ///
    /// Fails with `NoValidFiles` when nothing survives validation; the
    /// caller's existing session is then left as it was.
    pub fn upload(
        &self,
        files: Vec<IncomingFile>,
        order: MergeOrder,
        output_name: Option<&str>,
    ) -> Result<UploadOutcome> {
        let upload_id = FileStore::new_upload_id();
        let report = self.store.ingest(&upload_id, files)?;

        let output_name = output_filename(output_name, &self.config.merge.default_output_name);
        let state = SessionState::new(upload_id, report.accepted, order, output_name);

        Ok(UploadOutcome {
            state,
            rejected: report.rejected,
        })
    }

    /// Rebuild a session from its upload directory.
    pub fn recover(&self, upload_id: &str, order: MergeOrder) -> Result<SessionState> {
        let files = self.store.scan_session(upload_id)?;
        info!("Recovered session {} with {} files", upload_id, files.len());
        Ok(SessionState::new(
            upload_id,
            files,
            order,
            self.config.merge.default_output_name.clone(),
        ))
    }

    /// Merge a session's files in list order.
    ///
    /// On success the result is stored as the session's last merge and a
    /// history entry is appended. Returns the inputs that were skipped.
    pub fn merge_session(
        &self,
        state: &mut SessionState,
        requested_name: Option<&str>,
    ) -> Result<Vec<MergeWarning>> {
        let default = if state.output_name.is_empty() {
            self.config.merge.process_output_name.as_str()
        } else {
            state.output_name.as_str()
        };
        let filename = output_filename(requested_name, default);
        let outcome = self.merge_files(&state.files, &filename)?;

        state.last_merge = Some(outcome.result);
        Ok(outcome.warnings)
    }

    /// Merge the `.pdf` files of an upload directory in name order,
    /// bypassing any session record.
    pub fn merge_directory(
        &self,
        upload_id: &str,
        requested_name: Option<&str>,
    ) -> Result<MergeOutcome> {
        let files = self.store.scan_session(upload_id)?;
        let filename = output_filename(requested_name, &self.config.merge.default_output_name);
        self.merge_files(&files, &filename)
    }

    fn merge_files(&self, files: &[UploadedFile], filename: &str) -> Result<MergeOutcome> {
        let output_path = self.store.output_path(filename)?;
        let inputs: Vec<MergeInput> = files
            .iter()
            .map(|f| MergeInput::new(f.name.clone(), f.path.clone()))
            .collect();

        let outcome = merge_to_file(&inputs, &output_path, self.merge_options(), None)?;

        self.history.record(HistoryEntry::now(
            outcome.result.filename.clone(),
            files.len(),
            outcome.result.pages,
        ));
        Ok(outcome)
    }
}
