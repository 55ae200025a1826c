mod document;
pub mod merge;

#[cfg(test)]
pub(crate) mod testing;

pub use document::{PdfInfo, load_lenient, page_count, probe_file};
pub use merge::{
    MergeInput, MergeOptions, MergeOutcome, MergeWarning, PdfMerger, ProgressFn, merge_to_file,
};
