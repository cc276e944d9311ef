//! Path normalization utilities.

use std::path::{Component, Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`). Paths that
/// do not exist are made absolute against the current directory and cleaned
/// lexically, so two spellings of one missing file still compare equal.
///
/// # Example
/// ```ignore
/// use crate::utils::path::normalize_path;
/// let abs = normalize_path(Path::new("./src/fonts/../fonts/a.woff"));
/// ```
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        };
        clean(&absolute)
    })
}

/// Fold `.` and `..` without touching the filesystem.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Path as a `/`-separated string, for URLs and output file names.
pub fn slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
