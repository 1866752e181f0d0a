//! Seeding a fresh install from the local server cache.

use crate::error::{Result as RuntimeResult, RuntimeError};

use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub directories: u64,
    pub files_copied: u64,
    pub files_skipped: u64,
}

/// Recursively copy `source` into `dest`.
///
/// With `smart` set, files whose destination already matches in size and is
/// not older than the source are skipped. `on_directory` is called with the
/// running directory count each time a directory is entered.
pub fn copy_directory(
    source: &Path,
    dest: &Path,
    smart: bool,
    cancel: &CancellationToken,
    on_directory: &(dyn Fn(u64) + Send + Sync),
) -> RuntimeResult<CopyStats> {
    let mut stats = CopyStats::default();
    fs::create_dir_all(dest)?;

    for entry in WalkDir::new(source).min_depth(1) {
        if cancel.is_cancelled() {
            return Err(RuntimeError::cancelled());
        }

        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| RuntimeError::from(io::Error::other(e)))?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
            stats.directories += 1;
            on_directory(stats.directories);
        } else if entry.file_type().is_file() {
            if smart && !needs_copy(entry.path(), &target)? {
                stats.files_skipped += 1;
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            stats.files_copied += 1;
        }
    }

    debug!(
        "Copied {} -> {}: {stats:?}",
        source.display(),
        dest.display()
    );
    Ok(stats)
}

fn needs_copy(source: &Path, target: &Path) -> RuntimeResult<bool> {
    let target_meta = match fs::metadata(target) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(e.into()),
    };
    let source_meta = fs::metadata(source)?;

    if source_meta.len() != target_meta.len() {
        return Ok(true);
    }

    Ok(target_meta.modified()? < source_meta.modified()?)
}

/// Whether any regular file under `dir` was modified after `since`.
///
/// Unreadable entries are skipped.
pub fn has_files_modified_since(dir: &Path, since: SystemTime) -> bool {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .filter_map(|meta| meta.modified().ok())
        .any(|modified| modified > since)
}
