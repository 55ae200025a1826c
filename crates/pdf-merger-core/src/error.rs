use thiserror::Error;

/// Unified error type for pdf-merger-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - PDF operations (opening, probing, saving)
/// - Upload and merge validation
/// - File store lookups (sessions, outputs)
/// - History persistence
/// - Configuration operations (loading, validation)
/// - General I/O operations
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // PDF Errors
    // ==========================================================================
    /// Failed to open or parse a PDF file
    #[error("failed to open PDF: {0}")]
    PdfOpen(String),

    /// The document parsed but contains no pages
    #[error("PDF has no pages: {0}")]
    EmptyDocument(String),

    /// Failed to save a PDF
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    // ==========================================================================
    // Upload / Merge Errors
    // ==========================================================================
    /// Uploaded filename does not carry a `.pdf` extension
    #[error("not a PDF file: {0}")]
    InvalidExtension(String),

    /// Name is not a safe basename (output and download lookups)
    #[error("invalid filename: {0:?}")]
    InvalidFilename(String),

    /// Every file of an upload batch (or a directory scan) was rejected
    #[error("no valid PDF files")]
    NoValidFiles,

    /// A merge produced zero pages
    #[error("no valid pages found to merge")]
    NoValidPages,

    // ==========================================================================
    // Store Errors
    // ==========================================================================
    /// Upload directory for a session id does not exist
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Merged output file does not exist
    #[error("file not found: {0}")]
    OutputNotFound(String),

    // ==========================================================================
    // History Errors
    // ==========================================================================
    /// Failed to read or write the persisted history table
    #[error("history store error: {0}")]
    HistoryStore(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sled::Error> for Error {
    fn from(e: sled::Error) -> Self {
        Self::HistoryStore(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
