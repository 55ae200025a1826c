use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use pdf_merger_core::{AppConfig, MergerService};
use tracing::error;

use crate::helpers::{PageError, PageResult};
use crate::session_store::MokaSessionStore;

/// Global application state
pub struct AppState {
    /// Storage, merge engine and history log
    pub service: MergerService,
    /// Directory served under `/static`
    pub static_dir: PathBuf,
    /// Server-side session records
    pub sessions: MokaSessionStore,
}

impl AppState {
    pub fn new(config: AppConfig, static_dir: PathBuf) -> Result<Self> {
        let service =
            MergerService::new(config).context("Failed to open storage or merge history")?;
        Ok(Self::with_service(service, static_dir))
    }

    pub fn with_service(service: MergerService, static_dir: PathBuf) -> Self {
        let server = &service.config().server;
        let sessions = MokaSessionStore::new(server.max_sessions, server.session_idle());
        Self {
            service,
            static_dir,
            sessions,
        }
    }

    /// Run blocking service work (file I/O, PDF parsing) off the async runtime.
    ///
    /// The closure gets the service through a cloned `Arc`, so nothing
    /// borrowed from the request outlives the await.
    pub async fn blocking<F, R>(self: &Arc<Self>, f: F) -> PageResult<R>
    where
        F: FnOnce(&MergerService) -> pdf_merger_core::Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let state = Arc::clone(self);
        tokio::task::spawn_blocking(move || f(&state.service))
            .await
            .map_err(|e| {
                error!("Blocking task panicked: {}", e);
                PageError::internal("Internal server error")
            })?
            .map_err(PageError::from)
    }
}
