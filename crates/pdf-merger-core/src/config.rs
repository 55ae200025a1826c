use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default output name offered on the upload form and used by the JSON API.
pub const DEFAULT_OUTPUT_NAME: &str = "merged.pdf";
/// Output name used by the merge form when no name is submitted.
pub const DEFAULT_PROCESS_OUTPUT_NAME: &str = "merged_document.pdf";
/// Request body cap (50 MB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum accepted request body size in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Mark the session cookie `Secure` (requires HTTPS)
    #[serde(default)]
    pub secure_cookies: bool,

    /// Sessions idle this long are forgotten
    #[serde(default = "default_session_idle_minutes")]
    pub session_idle_minutes: u64,

    /// Upper bound on sessions held in memory
    #[serde(default = "default_max_sessions")]
    pub max_sessions: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    5000
}

const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

const fn default_session_idle_minutes() -> u64 {
    24 * 60
}

const fn default_max_sessions() -> u64 {
    10_000
}

/// Longest accepted session idle timeout (one year).
const MAX_SESSION_IDLE_MINUTES: u64 = 365 * 24 * 60;

impl ServerConfig {
    pub const fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_minutes.saturating_mul(60))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
            secure_cookies: false,
            session_idle_minutes: default_session_idle_minutes(),
            max_sessions: default_max_sessions(),
        }
    }
}

/// Storage directories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Holds one subdirectory of uploaded PDFs per upload id
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Holds merged outputs (flat)
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            output_dir: default_output_dir(),
        }
    }
}

/// Merge behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    #[serde(default = "default_output_name")]
    pub default_output_name: String,

    #[serde(default = "default_process_output_name")]
    pub process_output_name: String,

    /// Skip inputs that fail to parse instead of aborting the merge
    #[serde(default = "default_true")]
    pub skip_unreadable: bool,
}

fn default_output_name() -> String {
    DEFAULT_OUTPUT_NAME.to_string()
}

fn default_process_output_name() -> String {
    DEFAULT_PROCESS_OUTPUT_NAME.to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            default_output_name: default_output_name(),
            process_output_name: default_process_output_name(),
            skip_unreadable: true,
        }
    }
}

/// Age thresholds for the cleanup maintenance task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    #[serde(default = "default_upload_max_age_hours")]
    pub upload_max_age_hours: u64,

    #[serde(default = "default_output_max_age_hours")]
    pub output_max_age_hours: u64,
}

const fn default_upload_max_age_hours() -> u64 {
    24
}

const fn default_output_max_age_hours() -> u64 {
    48
}

impl CleanupConfig {
    pub const fn upload_max_age(&self) -> Duration {
        Duration::from_secs(self.upload_max_age_hours.saturating_mul(3600))
    }

    pub const fn output_max_age(&self) -> Duration {
        Duration::from_secs(self.output_max_age_hours.saturating_mul(3600))
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            upload_max_age_hours: default_upload_max_age_hours(),
            output_max_age_hours: default_output_max_age_hours(),
        }
    }
}

/// Merge history settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of retained entries (oldest dropped first)
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,

    /// Persist history in a sled table at this path (memory only if unset)
    pub persist_path: Option<PathBuf>,
}

const fn default_history_capacity() -> usize {
    500
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_history_capacity(),
            persist_path: None,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub merge: MergeConfig,

    #[serde(default)]
    pub cleanup: CleanupConfig,

    #[serde(default)]
    pub history: HistoryConfig,
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations, layered lowest to highest priority:
    /// `~/.config/pdf-merger/config.toml`, `./config.toml`, then
    /// `PDF_MERGER__SECTION__FIELD` environment variables.
    ///
    /// Falls back to defaults (with a warning) if the layers don't parse.
    pub fn load() -> Self {
        match Self::load_layered(Path::new("config.toml")) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }

    fn load_layered(local: &Path) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("pdf-merger").join("config.toml");
            if user_config.exists() {
                tracing::debug!("Loading config from {}", user_config.display());
            }
            builder = builder.add_source(config::File::from(user_config).required(false));
        }

        if local.exists() {
            tracing::debug!("Loading config from {}", local.display());
        }

        let config: Self = builder
            .add_source(config::File::from(local).required(false))
            .add_source(
                config::Environment::with_prefix("PDF_MERGER")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| Error::ConfigLoad(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.server.max_body_bytes == 0 {
            return Err(Error::ConfigInvalid {
                field: "server.max_body_bytes".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.server.session_idle_minutes == 0
            || self.server.session_idle_minutes > MAX_SESSION_IDLE_MINUTES
        {
            return Err(Error::ConfigInvalid {
                field: "server.session_idle_minutes".to_string(),
                reason: format!("must be between 1 and {MAX_SESSION_IDLE_MINUTES}"),
            });
        }
        if self.server.max_sessions == 0 {
            return Err(Error::ConfigInvalid {
                field: "server.max_sessions".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.history.capacity == 0 {
            return Err(Error::ConfigInvalid {
                field: "history.capacity".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.storage.upload_dir == self.storage.output_dir {
            return Err(Error::ConfigInvalid {
                field: "storage.output_dir".to_string(),
                reason: "must differ from storage.upload_dir".to_string(),
            });
        }
        Ok(())
    }
}
