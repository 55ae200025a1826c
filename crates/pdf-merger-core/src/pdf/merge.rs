//! Page concatenation.
//!
//! Inputs are opened one at a time, renumbered past the objects already
//! collected, and their pages appended (in each document's own page order)
//! under a freshly built page tree. Catalog, page-tree and outline objects of
//! the inputs are discarded; everything else they reference is carried over.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::pdf::document::load_lenient;
use crate::session::MergeResult;

/// Page attributes a page may inherit from its page-tree ancestors.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic `Parent` chains in damaged files.
const MAX_TREE_DEPTH: usize = 64;

/// One input of a merge.
#[derive(Debug, Clone)]
pub struct MergeInput {
    pub name: String,
    pub path: PathBuf,
}

impl MergeInput {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Merge policy
#[derive(Debug, Clone, Copy)]
pub struct MergeOptions {
    /// Skip inputs that fail to load instead of failing the whole merge
    pub skip_unreadable: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            skip_unreadable: true,
        }
    }
}

/// An input left out of the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeWarning {
    pub file: String,
    pub reason: String,
}

impl std::fmt::Display for MergeWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error processing {}: {}", self.file, self.reason)
    }
}

/// Successful merge: the written result plus every skipped input.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub result: MergeResult,
    pub warnings: Vec<MergeWarning>,
}

/// Progress callback: `(inputs processed, total inputs)`.
pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize) + Send + Sync);

/// Accumulates pages from several documents into one.
pub struct PdfMerger {
    options: MergeOptions,
    objects: BTreeMap<ObjectId, Object>,
    pages: Vec<(ObjectId, Dictionary)>,
    next_id: u32,
    warnings: Vec<MergeWarning>,
}

impl PdfMerger {
    pub const fn new(options: MergeOptions) -> Self {
        Self {
            options,
            objects: BTreeMap::new(),
            pages: Vec::new(),
            next_id: 1,
            warnings: Vec::new(),
        }
    }

    /// Pages accumulated so far
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn warnings(&self) -> &[MergeWarning] {
        &self.warnings
    }

    /// Append every page of `bytes`. Returns the number of pages added.
    ///
    /// With `skip_unreadable`, a document that fails to load (or has no
    /// pages) is recorded as a warning and contributes nothing.
    pub fn append_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<usize> {
        match load_lenient(bytes, name) {
            Ok(doc) => self.append_document(name, doc),
            Err(e) => self.skip(name, e),
        }
    }

    /// Append every page of the file at `path`.
    pub fn append_file(&mut self, name: &str, path: &Path) -> Result<usize> {
        match std::fs::read(path) {
            Ok(bytes) => self.append_bytes(name, &bytes),
            Err(e) => self.skip(name, Error::PdfOpen(format!("Failed to read file: {e}"))),
        }
    }

    fn skip(&mut self, name: &str, error: Error) -> Result<usize> {
        if !self.options.skip_unreadable {
            return Err(error);
        }
        warn!("Skipping {}: {}", name, error);
        self.warnings.push(MergeWarning {
            file: name.to_string(),
            reason: error.to_string(),
        });
        Ok(0)
    }

    fn append_document(&mut self, name: &str, mut doc: Document) -> Result<usize> {
        if doc.get_pages().is_empty() {
            return self.skip(name, Error::EmptyDocument(name.to_string()));
        }

        doc.renumber_objects_with(self.next_id);
        self.next_id = doc.max_id + 1;

        // BTreeMap keyed by page number: values come out in page order
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

        let mut added = 0;
        for page_id in page_ids {
            match inherited_page_dict(&doc, page_id) {
                Some(dict) => {
                    self.pages.push((page_id, dict));
                    added += 1;
                }
                None => debug!("{}: page object {:?} is not a dictionary", name, page_id),
            }
        }

        for (object_id, object) in doc.objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
                _ => {
                    self.objects.insert(object_id, object);
                }
            }
        }

        debug!("{}: {} pages added", name, added);
        Ok(added)
    }

    /// Build the output document. Fails with [`Error::NoValidPages`] if
    /// nothing was appended.
    pub fn finish(self) -> Result<(Document, Vec<MergeWarning>)> {
        if self.pages.is_empty() {
            return Err(Error::NoValidPages);
        }

        let mut document = Document::with_version("1.5");
        document.objects = self.objects;
        document.max_id = self.next_id.saturating_sub(1);

        let pages_id = document.new_object_id();

        let mut kids = Vec::with_capacity(self.pages.len());
        for (page_id, mut dict) in self.pages {
            dict.set("Parent", Object::Reference(pages_id));
            document.objects.insert(page_id, Object::Dictionary(dict));
            kids.push(Object::Reference(page_id));
        }

        let count = i64::try_from(kids.len()).unwrap_or(i64::MAX);
        let pages_dict = Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count)),
        ]);
        document.objects.insert(pages_id, Object::Dictionary(pages_dict));

        let catalog_id = document.new_object_id();
        let catalog_dict = Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]);
        document.objects.insert(catalog_id, Object::Dictionary(catalog_dict));
        document.trailer.set("Root", Object::Reference(catalog_id));

        document.renumber_objects();
        document.compress();

        Ok((document, self.warnings))
    }
}

/// Clone a page dictionary, filling in inheritable attributes from its
/// ancestors so the page survives losing its original page tree.
fn inherited_page_dict(doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
    let mut dict = doc.get_dictionary(page_id).ok()?.clone();

    let mut parent = dict.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    while let Some(parent_id) = parent {
        if depth >= MAX_TREE_DEPTH {
            break;
        }
        let Ok(node) = doc.get_dictionary(parent_id) else {
            break;
        };
        for key in INHERITABLE {
            if !dict.has(key)
                && let Ok(value) = node.get(key)
            {
                dict.set(key.to_vec(), value.clone());
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }

    Some(dict)
}

/// Serialise a document to bytes.
pub fn save_to_bytes(document: &mut Document) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    document
        .save_to(&mut output)
        .map_err(|e| Error::PdfSave(format!("Failed to save merged PDF: {e}")))?;
    Ok(output)
}

/// Merge `inputs` in order and write the result to `output_path`.
///
/// Nothing is written when no input contributes a page.
pub fn merge_to_file(
    inputs: &[MergeInput],
    output_path: &Path,
    options: MergeOptions,
    progress: Option<ProgressFn<'_>>,
) -> Result<MergeOutcome> {
    let mut merger = PdfMerger::new(options);
    let total = inputs.len();

    for (i, input) in inputs.iter().enumerate() {
        debug!("Processing file: {}", input.name);
        merger.append_file(&input.name, &input.path)?;
        if let Some(callback) = progress {
            callback(i + 1, total);
        }
    }

    let pages = merger.page_count();
    let (mut document, warnings) = merger.finish()?;
    let bytes = save_to_bytes(&mut document)?;

    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output_path, &bytes)?;

    let filename = output_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    info!(
        "Merged {} files into {} ({} pages, {} skipped)",
        total,
        output_path.display(),
        pages,
        warnings.len()
    );

    Ok(MergeOutcome {
        result: MergeResult {
            filename,
            path: output_path.to_path_buf(),
            pages,
            size: bytes.len() as u64,
        },
        warnings,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pdf::testing::{inherited_attrs_pdf, markers, pdf_bytes, zero_page_pdf};

    fn finish_to_doc(merger: PdfMerger) -> Document {
        let (mut document, _) = merger.finish().unwrap();
        let bytes = save_to_bytes(&mut document).unwrap();
        Document::load_mem(&bytes).unwrap()
    }

    #[test]
    fn test_pages_concatenated_in_order() {
        let mut merger = PdfMerger::new(MergeOptions::default());
        assert_eq!(merger.append_bytes("a.pdf", &pdf_bytes("a", 2)).unwrap(), 2);
        assert_eq!(merger.append_bytes("b.pdf", &pdf_bytes("b", 3)).unwrap(), 3);
        assert_eq!(merger.page_count(), 5);

        let doc = finish_to_doc(merger);
        assert_eq!(markers(&doc), ["a-1", "a-2", "b-1", "b-2", "b-3"]);
    }

    #[test]
    fn test_unreadable_input_skipped_with_warning() {
        let mut merger = PdfMerger::new(MergeOptions::default());
        merger.append_bytes("a.pdf", &pdf_bytes("a", 1)).unwrap();
        assert_eq!(merger.append_bytes("bad.pdf", b"%PDF-1.4 garbage").unwrap(), 0);
        merger.append_bytes("c.pdf", &pdf_bytes("c", 1)).unwrap();

        assert_eq!(merger.warnings().len(), 1);
        assert_eq!(merger.warnings()[0].file, "bad.pdf");

        let doc = finish_to_doc(merger);
        assert_eq!(markers(&doc), ["a-1", "c-1"]);
    }

    #[test]
    fn test_strict_mode_fails_on_unreadable() {
        let mut merger = PdfMerger::new(MergeOptions {
            skip_unreadable: false,
        });
        let err = merger.append_bytes("bad.pdf", b"nope").unwrap_err();
        assert!(matches!(err, Error::PdfOpen(_)));
    }

    #[test]
    fn test_no_pages_is_an_error() {
        let mut merger = PdfMerger::new(MergeOptions::default());
        merger.append_bytes("bad.pdf", b"nope").unwrap();
        merger.append_bytes("empty.pdf", &zero_page_pdf()).unwrap();
        assert_eq!(merger.warnings().len(), 2);
        assert!(matches!(merger.finish(), Err(Error::NoValidPages)));
    }

    #[test]
    fn test_inherited_attributes_copied() {
        let mut merger = PdfMerger::new(MergeOptions::default());
        merger.append_bytes("inherit.pdf", &inherited_attrs_pdf()).unwrap();
        merger.append_bytes("a.pdf", &pdf_bytes("a", 1)).unwrap();
        let doc = finish_to_doc(merger);

        let first = *doc.get_pages().get(&1).unwrap();
        let page = doc.get_dictionary(first).unwrap();
        let media_box = page.get(b"MediaBox").and_then(Object::as_array).unwrap();
        assert_eq!(media_box[3].as_i64().unwrap(), 300);
        assert!(page.has(b"Resources"));
    }

    #[test]
    fn test_merge_to_file_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("b.pdf");
        std::fs::write(&a, pdf_bytes("a", 2)).unwrap();
        std::fs::write(&b, pdf_bytes("b", 3)).unwrap();
        let out = dir.path().join("out").join("merged.pdf");

        let calls = std::sync::Mutex::new(Vec::new());
        let progress: ProgressFn<'_> = &|done, total| calls.lock().unwrap().push((done, total));
        let outcome = merge_to_file(
            &[MergeInput::new("a.pdf", &a), MergeInput::new("b.pdf", &b)],
            &out,
            MergeOptions::default(),
            Some(progress),
        )
        .unwrap();

        assert_eq!(outcome.result.filename, "merged.pdf");
        assert_eq!(outcome.result.pages, 5);
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.result.size, std::fs::metadata(&out).unwrap().len());
        assert_eq!(*calls.lock().unwrap(), vec![(1, 2), (2, 2)]);
    }

    #[test]
    fn test_merge_to_file_writes_nothing_without_pages() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.pdf");
        std::fs::write(&bad, b"not a pdf").unwrap();
        let out = dir.path().join("merged.pdf");

        let err = merge_to_file(
            &[MergeInput::new("bad.pdf", &bad)],
            &out,
            MergeOptions::default(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::NoValidPages));
        assert!(!out.exists());
    }
}
