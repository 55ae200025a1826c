//! Age-based cleanup of the storage directories.
//!
//! Not run by the server; an external scheduler invokes it (see the
//! `pdf-merge cleanup` command).

use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::Result;

/// What one cleanup pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed_files: usize,
    pub removed_dirs: usize,
    pub errors: usize,
}

impl std::ops::AddAssign for CleanupReport {
    fn add_assign(&mut self, other: Self) {
        self.removed_files += other.removed_files;
        self.removed_dirs += other.removed_dirs;
        self.errors += other.errors;
    }
}

/// Remove files under `dir` last modified more than `max_age` ago, then any
/// directories left empty. `dir` itself is never removed; a missing `dir` is
/// an empty report. With `dry_run` nothing is deleted but the counts are
/// what would have been removed.
pub fn cleanup_old_files(dir: &Path, max_age: Duration, dry_run: bool) -> Result<CleanupReport> {
    let mut report = CleanupReport::default();
    if !dir.exists() {
        debug!("{} does not exist, nothing to clean", dir.display());
        return Ok(report);
    }

    let cutoff = SystemTime::now()
        .checked_sub(max_age)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    // Children before parents, so emptied directories are seen after their files
    for entry in WalkDir::new(dir).min_depth(1).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Error walking {}: {}", dir.display(), e);
                report.errors += 1;
                continue;
            }
        };
        let path = entry.path();

        if entry.file_type().is_dir() {
            let is_empty = std::fs::read_dir(path).is_ok_and(|mut it| it.next().is_none());
            if !is_empty {
                continue;
            }
            if !dry_run && let Err(e) = std::fs::remove_dir(path) {
                debug!("Could not remove directory {}: {}", path.display(), e);
                continue;
            }
            info!("Removed empty directory: {}", path.display());
            report.removed_dirs += 1;
            continue;
        }

        let modified = match entry.metadata().map(|m| m.modified()) {
            Ok(Ok(modified)) => modified,
            Ok(Err(e)) => {
                warn!("Error reading mtime of {}: {}", path.display(), e);
                report.errors += 1;
                continue;
            }
            Err(e) => {
                warn!("Error reading metadata of {}: {}", path.display(), e);
                report.errors += 1;
                continue;
            }
        };

        if modified >= cutoff {
            continue;
        }

        if !dry_run && let Err(e) = std::fs::remove_file(path) {
            warn!("Error removing {}: {}", path.display(), e);
            report.errors += 1;
            continue;
        }
        info!("Removed: {}", path.display());
        report.removed_files += 1;
    }

    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_dir_is_empty_report() {
        let report =
            cleanup_old_files(Path::new("/nonexistent/uploads"), Duration::ZERO, false).unwrap();
        assert_eq!(report, CleanupReport::default());
    }

    #[test]
    fn test_removes_old_files_and_empty_dirs() {
        let root = tempfile::tempdir().unwrap();
        let session = root.path().join("session-a");
        std::fs::create_dir_all(&session).unwrap();
        std::fs::write(session.join("a.pdf"), b"a").unwrap();
        std::fs::write(root.path().join("merged.pdf"), b"m").unwrap();

        // Everything is older than a zero threshold
        std::thread::sleep(Duration::from_millis(20));
        let report = cleanup_old_files(root.path(), Duration::ZERO, false).unwrap();

        assert_eq!(report.removed_files, 2);
        assert_eq!(report.removed_dirs, 1);
        assert_eq!(report.errors, 0);
        assert!(root.path().exists());
        assert!(!session.exists());
    }

    #[test]
    fn test_keeps_recent_files() {
        let root = tempfile::tempdir().unwrap();
        let session = root.path().join("session-a");
        std::fs::create_dir_all(&session).unwrap();
        std::fs::write(session.join("a.pdf"), b"a").unwrap();

        let report = cleanup_old_files(root.path(), Duration::from_secs(3600), false).unwrap();
        assert_eq!(report, CleanupReport::default());
        assert!(session.join("a.pdf").exists());
    }

    #[test]
    fn test_dry_run_deletes_nothing() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("merged.pdf"), b"m").unwrap();

        std::thread::sleep(Duration::from_millis(20));
        let report = cleanup_old_files(root.path(), Duration::ZERO, true).unwrap();
        assert_eq!(report.removed_files, 1);
        assert!(root.path().join("merged.pdf").exists());
    }
}
