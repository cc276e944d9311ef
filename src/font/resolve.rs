//! Font path resolution.
//!
//! # Conventions
//!
//! - `/fonts/a.woff` (leading slash) is relative to the static directory.
//! - `./fonts/a.woff`, `fonts/a.woff` are relative to the context directory:
//!   the project root for declarations, the referencing file's directory for
//!   references found in source text.
//! - References go through the host's module resolver first (aliases,
//!   root-relative lookups). When the host finds nothing, the reference is
//!   treated as static-dir relative.

use std::path::{Path, PathBuf};

use super::FontError;
use crate::utils::path::normalize_path;

/// Host module resolution, used for references found in source text.
pub trait ModuleResolver: Send + Sync {
    /// Resolve `specifier` as imported from `importer`, or `None`.
    fn resolve(&self, specifier: &str, importer: &Path) -> Option<PathBuf>;
}

/// A resolver that never resolves anything; every reference falls back to
/// the static directory.
pub struct NoResolver;

impl ModuleResolver for NoResolver {
    fn resolve(&self, _: &str, _: &Path) -> Option<PathBuf> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub path: PathBuf,
    pub under_static_dir: bool,
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    static_dir: PathBuf,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>, static_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            static_dir: static_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn static_dir(&self) -> &Path {
        &self.static_dir
    }

    /// Resolve `declared` against `context_dir`, honoring the static-root
    /// marker.
    pub fn resolve(&self, declared: &str, context_dir: &Path) -> Result<ResolvedPath, FontError> {
        let declared = declared.trim();
        if declared.is_empty() || declared == "/" {
            return Err(FontError::Configuration(format!(
                "font path `{declared}` does not name a file"
            )));
        }

        Ok(match declared.strip_prefix('/') {
            Some(rest) => ResolvedPath {
                path: normalize_path(&self.static_dir.join(rest)),
                under_static_dir: true,
            },
            None => ResolvedPath {
                path: normalize_path(&context_dir.join(declared)),
                under_static_dir: false,
            },
        })
    }

    /// Resolve a top-level declaration (context = project root).
    pub fn resolve_declaration(&self, declared: &str) -> Result<ResolvedPath, FontError> {
        self.resolve(declared, &self.root)
    }

    /// Resolve a URL found in source text.
    ///
    /// Returns `None` for remote and inline URLs, which can never be local
    /// fonts.
    pub fn resolve_reference(
        &self,
        reference: &str,
        importer: &Path,
        host: &dyn ModuleResolver,
    ) -> Option<ResolvedPath> {
        let reference = strip_query(reference.trim());
        if reference.is_empty() || is_external(reference) {
            return None;
        }

        if let Some(path) = host.resolve(reference, importer) {
            // Aliases may resolve to root-relative paths
            let path = if path.is_absolute() {
                path
            } else {
                self.root.join(path)
            };
            let path = normalize_path(&path);
            let under_static_dir = path.starts_with(&self.static_dir);
            return Some(ResolvedPath {
                path,
                under_static_dir,
            });
        }

        Some(ResolvedPath {
            path: normalize_path(&self.static_dir.join(reference.trim_start_matches('/'))),
            under_static_dir: true,
        })
    }
}

/// `a.woff?v=2#iefix` -> `a.woff`
fn strip_query(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

fn is_external(url: &str) -> bool {
    url.starts_with("//")
        || url.starts_with("data:")
        || url.contains("://")
}
