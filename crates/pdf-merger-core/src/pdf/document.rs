use std::path::Path;

use lopdf::Document;

use crate::error::{Error, Result};

/// Page count and on-disk size of a probed PDF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfInfo {
    pub pages: usize,
    pub size: u64,
}

/// Parse a PDF leniently from memory.
///
/// lopdf has no strict mode: whatever it manages to load counts as readable,
/// and page counting happens separately. Load failures are reported as
/// [`Error::PdfOpen`].
pub fn load_lenient(bytes: &[u8], label: &str) -> Result<Document> {
    Document::load_mem(bytes).map_err(|e| Error::PdfOpen(format!("{label}: {e}")))
}

/// Count pages of an in-memory PDF, rejecting zero-page documents.
pub fn page_count(bytes: &[u8], label: &str) -> Result<usize> {
    let pages = load_lenient(bytes, label)?.get_pages().len();
    if pages == 0 {
        return Err(Error::EmptyDocument(label.to_string()));
    }
    Ok(pages)
}

/// Probe a stored PDF: page count (> 0) and file size.
pub fn probe_file(path: &Path) -> Result<PdfInfo> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::PdfOpen(format!("Failed to read file {}: {}", path.display(), e)))?;
    let pages = page_count(&bytes, &path.display().to_string())?;

    Ok(PdfInfo {
        pages,
        size: bytes.len() as u64,
    })
}
