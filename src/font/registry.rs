//! The font asset registry.
//!
//! Holds one [`FontAsset`] per resolved path and answers the question the
//! build pipeline cannot: which emitted output is which declared font. The
//! bundler renames outputs by content hash and keeps no back-reference, so
//! matching goes by identity:
//!
//! 1. the output's base name (hash suffix and extension stripped) must equal
//!    the record's name, and its extension the record's output format,
//! 2. the output's bytes must have the record's fingerprint.
//!
//! Several declarations may share a file name (same font, different glyph
//! sets in different directories); the fingerprint tells them apart. Among
//! records that still tie, the one that emitted this exact file goes first,
//! then declaration order. A record left over is reported as ambiguous.

use parking_lot::{Mutex, RwLock};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{
    AssetMeta, FontAsset, FontDeclaration, FontError, FontFormat, Fingerprint, Lifecycle,
    OutputHandle, PathResolver,
};
use crate::log;

/// Outcome of [`FontRegistry::register_declarations`].
#[derive(Debug, Default)]
pub struct Registration {
    /// Newly created records, all `Pending`, in declaration order.
    pub candidates: Vec<Arc<FontAsset>>,
    /// Declarations skipped because they could not be resolved or read.
    pub errors: Vec<FontError>,
    /// Declarations that resolved to an already declared path.
    pub duplicates: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FontRegistry {
    assets: RwLock<Vec<Arc<FontAsset>>>,
    /// Serializes whole match attempts (scan + attach).
    matching: Mutex<()>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve, fingerprint and record every declaration.
    ///
    /// Missing files are reported and skipped; they never abort.
    pub fn register_declarations(
        &self,
        declarations: &[FontDeclaration],
        resolver: &PathResolver,
        default_format: Option<FontFormat>,
    ) -> Registration {
        let mut registration = Registration::default();

        for decl in declarations {
            let resolved = match resolver.resolve_declaration(&decl.path) {
                Ok(resolved) => resolved,
                Err(err) => {
                    log!("warning"; "{}", err);
                    registration.errors.push(err);
                    continue;
                }
            };

            let Some(fingerprint) = Fingerprint::of_file(&resolved.path) else {
                let err = FontError::AssetNotFound(resolved.path);
                log!("error"; "{}", err);
                registration.errors.push(err);
                continue;
            };

            let meta = AssetMeta {
                origin: decl.path.clone(),
                text: decl.required_text(),
                format: decl.output_format(default_format, &resolved.path),
                under_static_dir: resolved.under_static_dir,
                fingerprint,
                size: fs::metadata(&resolved.path).map(|m| m.len()).unwrap_or(0),
            };

            let (asset, created) = self.discover_inner(resolved.path, meta);
            if created {
                registration.candidates.push(asset);
            } else {
                registration.duplicates.push(decl.path.clone());
            }
        }

        registration
    }

    /// Get or create the record for `path`.
    ///
    /// Idempotent: an existing record is returned unchanged and `meta` is
    /// ignored.
    pub fn discover(&self, path: PathBuf, meta: AssetMeta) -> Arc<FontAsset> {
        self.discover_inner(path, meta).0
    }

    fn discover_inner(&self, path: PathBuf, meta: AssetMeta) -> (Arc<FontAsset>, bool) {
        let mut assets = self.assets.write();
        if let Some(existing) = assets.iter().find(|a| a.path() == path) {
            return (Arc::clone(existing), false);
        }
        let asset = Arc::new(FontAsset::new(path, meta));
        assets.push(Arc::clone(&asset));
        (asset, true)
    }

    /// Look up a record by resolved path.
    pub fn get(&self, path: &Path) -> Option<Arc<FontAsset>> {
        self.assets.read().iter().find(|a| a.path() == path).cloned()
    }

    /// All records with the given fingerprint, declaration order.
    pub fn find_by_fingerprint(&self, fingerprint: Fingerprint) -> Vec<Arc<FontAsset>> {
        self.assets
            .read()
            .iter()
            .filter(|a| a.fingerprint() == fingerprint)
            .cloned()
            .collect()
    }

    /// Snapshot of all records, declaration order.
    pub fn assets(&self) -> Vec<Arc<FontAsset>> {
        self.assets.read().clone()
    }

    pub fn len(&self) -> usize {
        self.assets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.read().is_empty()
    }

    /// Find the pending record an emitted output was produced from, and
    /// attach the output to it (`Pending -> Matched`).
    ///
    /// Static-dir records are never candidates. An output already attached
    /// to a record is never matched again.
    pub fn match_output(&self, output: &OutputHandle) -> Option<Arc<FontAsset>> {
        let base = output_base_name(output.file_name())?;
        let format = FontFormat::from_path(Path::new(output.file_name()))?;
        let fingerprint = output.with_source(Fingerprint::of);

        let _serial = self.matching.lock();
        let assets = self.assets.read();

        let already_linked = assets
            .iter()
            .any(|a| a.lock().output().is_some_and(|o| o.same_output(output)));
        if already_linked {
            return None;
        }

        let mut candidates: Vec<_> = assets
            .iter()
            .filter(|a| !a.under_static_dir() && a.name() == base && a.format() == format)
            .filter(|a| a.fingerprint() == fingerprint)
            .collect();
        // stable: declaration order among the rest
        candidates.sort_by_key(|a| a.lock().emitted() != Some(output.file_name()));

        for asset in candidates {
            let mut guard = asset.lock();
            if guard.lifecycle() == Lifecycle::Pending && guard.attach_output(output.clone()).is_ok() {
                guard.mark_referenced();
                return Some(Arc::clone(asset));
            }
        }
        None
    }

    /// Referenced records left pending while an identical twin (same name,
    /// format and content) was matched.
    pub fn unmatched_duplicates(&self) -> Vec<FontError> {
        let assets = self.assets.read();
        assets
            .iter()
            .filter(|a| !a.under_static_dir())
            .filter(|a| {
                let guard = a.lock();
                guard.is_referenced() && guard.lifecycle() == Lifecycle::Pending
            })
            .filter(|a| {
                assets.iter().any(|other| {
                    !Arc::ptr_eq(a, other)
                        && other.name() == a.name()
                        && other.format() == a.format()
                        && other.fingerprint() == a.fingerprint()
                        && other.lock().lifecycle() != Lifecycle::Pending
                })
            })
            .map(|a| FontError::AmbiguousMatch {
                name: a.origin().to_string(),
            })
            .collect()
    }
}

/// `assets/biantaoti-9ebb4143.woff` -> `biantaoti`
///
/// Strips the directory, everything from the first dot, and an 8-hex-char
/// hash suffix when present.
pub fn output_base_name(file_name: &str) -> Option<&str> {
    let file = file_name.rsplit(['/', '\\']).next()?;
    let stem = file.split('.').next()?;
    if stem.is_empty() {
        return None;
    }
    match stem.rsplit_once('-') {
        Some((name, hash))
            if !name.is_empty() && hash.len() == 8 && hash.bytes().all(|b| b.is_ascii_hexdigit()) =>
        {
            Some(name)
        }
        _ => Some(stem),
    }
}
