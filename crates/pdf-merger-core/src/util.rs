//! Utility functions shared across the crate.

use std::path::{Path, PathBuf};

/// Get the user's config directory following XDG conventions.
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

/// Whether a client-supplied filename ends in `.pdf` (case-insensitive).
pub fn has_pdf_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Append `.pdf` to a name that does not already end in it.
pub fn ensure_pdf_extension(name: &str) -> String {
    if has_pdf_extension(name) {
        name.to_string()
    } else {
        format!("{name}.pdf")
    }
}

/// Reduce a client-supplied filename to a safe basename.
///
/// Path separators become spaces, whitespace runs collapse to a single `_`,
/// and only alphanumerics (any script) plus `.`, `-` and `_` survive. Leading and
/// trailing dots/underscores are trimmed so the result can never be `..` or a
/// hidden file. May return an empty string.
pub fn sanitize_filename(name: &str) -> String {
    let spaced: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");

    let kept: String = joined
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Human-readable size in kilobytes, e.g. `12.3 KB`.
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}
