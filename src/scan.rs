//! Directory scanning utilities for discovering media files.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::error::Error;

const DEFAULT_EXTS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Options controlling directory scanning.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional maximum recursion depth. `None` or `Some(0)` means unlimited.
    pub max_depth: Option<usize>,
    /// Optional override for allowed extensions (lowercase, without dot).
    pub exts: Option<Vec<&'static str>>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            max_depth: None,
            exts: None,
        }
    }
}

/// Return `true` if `path` has an allowed media extension.
#[must_use]
pub fn is_supported_media(path: &Path, exts: Option<&[&str]>) -> bool {
    let exts = exts.unwrap_or(DEFAULT_EXTS);
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| *e == ext)
        })
}

/// Scan `root` for media using the provided options. Results are sorted so a
/// playlist built from them is stable across runs.
///
/// # Errors
/// Returns [`Error::BadDir`] if `root` is missing or not a directory and
/// [`Error::EmptyScan`] if nothing playable was found.
pub fn scan_media(root: &Path, opts: &ScanOptions) -> Result<Vec<PathBuf>, Error> {
    if !root.is_dir() {
        return Err(Error::BadDir(root.to_string_lossy().into_owned()));
    }

    let mut wd = WalkDir::new(root);
    if !opts.recursive {
        wd = wd.max_depth(1);
    } else if let Some(d) = opts.max_depth
        && d > 0
    {
        wd = wd.max_depth(d);
    }

    let mut out: Vec<PathBuf> = wd
        .into_iter()
        // Skip hidden dot-directories *below* the root only.
        .filter_entry(|e| !should_skip_dir(e))
        .flatten()
        .filter(|entry| {
            entry.file_type().is_file() && is_supported_media(entry.path(), opts.exts.as_deref())
        })
        .map(|entry| entry.into_path())
        .collect();

    if out.is_empty() {
        return Err(Error::EmptyScan(root.to_string_lossy().into_owned()));
    }
    out.sort();
    Ok(out)
}

fn should_skip_dir(entry: &DirEntry) -> bool {
    // Never skip the root; tempfile roots can be dot-dirs.
    if entry.depth() == 0 {
        return false;
    }
    if !entry.file_type().is_dir() {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|n| n.starts_with('.'))
}
