//! On-disk staging for uploads and merge outputs.
//!
//! ## Layout
//!
//! ```text
//! <upload_dir>/<upload id>/<sanitised name>.pdf   one directory per upload batch
//! <output_dir>/<output name>.pdf                  flat
//! ```
//!
//! Upload ids are UUIDs; anything else is treated as an unknown session so a
//! path segment from a URL can never escape the upload directory. Likewise
//! output names must already be in sanitised form.
//!
//! [`FileStore::scan_session`] rebuilds a file list from a directory. It is
//! the fallback used when a client still knows its upload id but its session
//! record is gone; the session record stays the primary source of truth.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::pdf::{page_count, probe_file};
use crate::session::UploadedFile;
use crate::util::{has_pdf_extension, sanitize_filename};

/// A file received from a client, before validation.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub filename: String,
    pub data: Vec<u8>,
}

impl IncomingFile {
    pub fn new(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }
}

/// A file refused during ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub filename: String,
    pub reason: String,
}

/// Result of ingesting one upload batch. `accepted` is never empty.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub upload_id: String,
    pub accepted: Vec<UploadedFile>,
    pub rejected: Vec<Rejection>,
}

/// `.pdf` files found in one upload directory (diagnostics).
#[derive(Debug, Clone, Serialize)]
pub struct SessionListing {
    pub id: String,
    pub files: Vec<String>,
    pub file_count: usize,
}

/// Filesystem-backed store for uploads and outputs.
#[derive(Debug, Clone)]
pub struct FileStore {
    upload_dir: PathBuf,
    output_dir: PathBuf,
}

impl FileStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            upload_dir: config.upload_dir.clone(),
            output_dir: config.output_dir.clone(),
        }
    }

    /// Create the store and both top-level directories.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let store = Self::new(config);
        store.ensure_dirs()?;
        Ok(store)
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.upload_dir)?;
        std::fs::create_dir_all(&self.output_dir)?;
        debug!(
            "Storage ready: uploads={} outputs={}",
            self.upload_dir.display(),
            self.output_dir.display()
        );
        Ok(())
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Fresh identifier for an upload batch.
    pub fn new_upload_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Directory of an upload id. The id must be a UUID.
    pub fn session_dir(&self, upload_id: &str) -> Result<PathBuf> {
        let id = Uuid::parse_str(upload_id)
            .map_err(|_| Error::SessionNotFound(upload_id.to_string()))?;
        Ok(self.upload_dir.join(id.to_string()))
    }

    /// Validate and persist an upload batch under `upload_id`.
    ///
    /// Files without a `.pdf` extension or that don't parse to at least one
    /// page are rejected and never written. A file whose stem sanitises to
    /// nothing is stored as `file-<position>.pdf`. A name repeated within the
    /// batch replaces the earlier file. If nothing
    /// is accepted the (empty) directory is removed and
    /// [`Error::NoValidFiles`] returned.
    pub fn ingest(&self, upload_id: &str, files: Vec<IncomingFile>) -> Result<IngestReport> {
        let dir = self.session_dir(upload_id)?;
        std::fs::create_dir_all(&dir)?;

        let mut accepted: Vec<UploadedFile> = Vec::new();
        let mut rejected = Vec::new();

        for (position, file) in files.into_iter().enumerate() {
            match Self::validate(&file, position + 1) {
                Ok((name, pages)) => {
                    let path = dir.join(&name);
                    std::fs::write(&path, &file.data)?;
                    debug!("Saved {} ({} pages, {} bytes)", path.display(), pages, file.data.len());

                    let entry = UploadedFile {
                        name,
                        path,
                        pages,
                        size: file.data.len() as u64,
                    };
                    match accepted.iter_mut().find(|f| f.name == entry.name) {
                        Some(existing) => *existing = entry,
                        None => accepted.push(entry),
                    }
                }
                Err(e) => {
                    warn!("Skipped upload {:?}: {}", file.filename, e);
                    rejected.push(Rejection {
                        filename: file.filename,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if accepted.is_empty() {
            if let Err(e) = std::fs::remove_dir(&dir) {
                debug!("Could not remove {}: {}", dir.display(), e);
            }
            return Err(Error::NoValidFiles);
        }

        info!(
            "Upload {}: {} accepted, {} rejected",
            upload_id,
            accepted.len(),
            rejected.len()
        );

        Ok(IngestReport {
            upload_id: upload_id.to_string(),
            accepted,
            rejected,
        })
    }

    fn validate(file: &IncomingFile, position: usize) -> Result<(String, usize)> {
        if !has_pdf_extension(&file.filename) {
            return Err(Error::InvalidExtension(file.filename.clone()));
        }
        let mut name = sanitize_filename(&file.filename);
        if !has_pdf_extension(&name) {
            name = format!("file-{position}.pdf");
        }
        let pages = page_count(&file.data, &name)?;
        Ok((name, pages))
    }

    /// Rebuild a file list from an upload directory.
    ///
    /// Considers files ending in `.pdf` (any case), sorted by name; unreadable or
    /// zero-page files are left out.
    pub fn scan_session(&self, upload_id: &str) -> Result<Vec<UploadedFile>> {
        let dir = self.session_dir(upload_id)?;
        if !dir.is_dir() {
            return Err(Error::SessionNotFound(upload_id.to_string()));
        }

        let mut files = Vec::new();
        for name in pdf_names(&dir)? {
            let path = dir.join(&name);
            match probe_file(&path) {
                Ok(info) => files.push(UploadedFile {
                    name,
                    path,
                    pages: info.pages,
                    size: info.size,
                }),
                Err(e) => warn!("Ignoring {} during scan: {}", path.display(), e),
            }
        }

        if files.is_empty() {
            return Err(Error::NoValidFiles);
        }

        debug!("Scanned {}: {} files", dir.display(), files.len());
        Ok(files)
    }

    /// Path for a new output. `name` must already be a sanitised `.pdf` name.
    pub fn output_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || sanitize_filename(name) != name {
            return Err(Error::InvalidFilename(name.to_string()));
        }
        Ok(self.output_dir.join(name))
    }

    /// Path of an existing output.
    pub fn existing_output(&self, name: &str) -> Result<PathBuf> {
        let path = self
            .output_path(name)
            .map_err(|_| Error::OutputNotFound(name.to_string()))?;
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::OutputNotFound(name.to_string()))
        }
    }

    /// Every upload directory with the `.pdf` files it holds.
    pub fn list_sessions(&self) -> Vec<SessionListing> {
        let Ok(entries) = std::fs::read_dir(&self.upload_dir) else {
            return Vec::new();
        };

        let mut listings: Vec<SessionListing> = entries
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.path().is_dir())
            .map(|entry| {
                let files = pdf_names(&entry.path()).unwrap_or_default();
                SessionListing {
                    id: entry.file_name().to_string_lossy().into_owned(),
                    file_count: files.len(),
                    files,
                }
            })
            .collect();
        listings.sort_by(|a, b| a.id.cmp(&b.id));
        listings
    }
}

/// Sorted names of regular files in `dir` ending in `.pdf` (any case).
fn pdf_names(dir: &Path) -> Result<Vec<String>> {
    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| has_pdf_extension(name))
        .collect();
    names.sort();
    Ok(names)
}

/// Choose an output filename: the sanitised request, or `default` when the
/// request is missing or sanitises to nothing, with `.pdf` appended if absent.
pub fn output_filename(requested: Option<&str>, default: &str) -> String {
    let chosen = requested
        .map(sanitize_filename)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| sanitize_filename(default));
    crate::util::ensure_pdf_extension(&chosen)
}
