//! Runtime font asset records and their lifecycle.
//!
//! ```text
//! Pending ──match──▶ Matched ──compress──▶ Compressed
//! ```
//!
//! The transition is monotonic. Static-dir assets never leave `Pending`
//! through this path: they are compressed by the finalize step, which
//! records `finalized` instead.

use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::path::{Path, PathBuf};

use super::{FontError, FontFormat, Fingerprint, OutputHandle};

/// Lifecycle of a font asset within one build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Lifecycle {
    #[default]
    Pending,
    Matched,
    Compressed,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Matched => "matched",
            Self::Compressed => "compressed",
        })
    }
}

/// Declaration data a record is created from.
#[derive(Debug, Clone)]
pub struct AssetMeta {
    /// Path as written in the configuration.
    pub origin: String,
    /// Characters the subset must keep.
    pub text: String,
    pub format: FontFormat,
    pub under_static_dir: bool,
    /// Digest of the original bytes.
    pub fingerprint: Fingerprint,
    /// Byte length of the original file.
    pub size: u64,
}

/// One declared font, resolved to an absolute path.
#[derive(Debug)]
pub struct FontAsset {
    path: PathBuf,
    name: String,
    ext: String,
    meta: AssetMeta,
    state: Mutex<AssetState>,
}

/// Mutable part of a record, only reachable through [`AssetGuard`].
#[derive(Debug, Default)]
struct AssetState {
    lifecycle: Lifecycle,
    referenced: bool,
    output: Option<OutputHandle>,
    emitted: Option<String>,
    scratch: Option<PathBuf>,
    actual_format: Option<FontFormat>,
    compressed_size: Option<usize>,
    failure: Option<FontError>,
    finalized: bool,
}

impl FontAsset {
    pub fn new(path: PathBuf, meta: AssetMeta) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        // `Caveat[wght].ttf` -> `Caveat[wght]`, `a.min.woff` -> `a`
        let name = file_name.split('.').next().unwrap_or_default().to_string();
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        Self {
            path,
            name,
            ext,
            meta,
            state: Mutex::new(AssetState::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without any extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source extension with the dot, e.g. `.woff`.
    pub fn ext(&self) -> &str {
        &self.ext
    }

    /// `name` + source extension, as shown in reports.
    pub fn display_name(&self) -> String {
        format!("{}{}", self.name, self.ext)
    }

    pub fn origin(&self) -> &str {
        &self.meta.origin
    }

    pub fn text(&self) -> &str {
        &self.meta.text
    }

    pub fn format(&self) -> FontFormat {
        self.meta.format
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.meta.fingerprint
    }

    pub fn under_static_dir(&self) -> bool {
        self.meta.under_static_dir
    }

    pub fn size(&self) -> u64 {
        self.meta.size
    }

    /// Production file name: `{name}-{8 hex}{output ext}`.
    pub fn hashed_name(&self) -> String {
        format!(
            "{}-{}{}",
            self.name,
            self.meta.fingerprint.short(),
            self.meta.format.extension()
        )
    }

    /// Serve-mode file name. The suffix also covers the required text, so
    /// twins with the same bytes but different glyph sets never share a
    /// scratch file.
    pub fn scratch_name(&self) -> String {
        let key = format!("{}\n{}", self.meta.fingerprint.to_hex(), self.meta.text);
        format!(
            "{}-{}{}",
            self.name,
            Fingerprint::of(key.as_bytes()).short(),
            self.meta.format.extension()
        )
    }

    /// Static-dir file name: original name with the output extension.
    pub fn static_name(&self) -> String {
        format!("{}{}", self.name, self.meta.format.extension())
    }

    /// Lock the mutable state. Check-then-set sequences must happen under
    /// one guard.
    pub fn lock(&self) -> AssetGuard<'_> {
        AssetGuard {
            asset: self,
            state: self.state.lock(),
        }
    }
}

/// Exclusive access to one record's mutable state.
pub struct AssetGuard<'a> {
    asset: &'a FontAsset,
    state: MutexGuard<'a, AssetState>,
}

impl AssetGuard<'_> {
    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lifecycle
    }

    pub fn is_referenced(&self) -> bool {
        self.state.referenced
    }

    pub fn mark_referenced(&mut self) {
        self.state.referenced = true;
    }

    pub fn output(&self) -> Option<&OutputHandle> {
        self.state.output.as_ref()
    }

    pub fn emitted(&self) -> Option<&str> {
        self.state.emitted.as_deref()
    }

    pub fn set_emitted(&mut self, file_name: String) {
        self.state.emitted = Some(file_name);
    }

    pub fn scratch(&self) -> Option<&Path> {
        self.state.scratch.as_deref()
    }

    pub fn set_scratch(&mut self, path: PathBuf) {
        self.state.scratch = Some(path);
    }

    /// Format actually produced (may differ from the requested one when an
    /// override subsetter chose another container).
    pub fn actual_format(&self) -> Option<FontFormat> {
        self.state.actual_format
    }

    /// Byte length of the subsetted payload.
    pub fn compressed_size(&self) -> Option<usize> {
        self.state.compressed_size
    }

    pub fn failure(&self) -> Option<&FontError> {
        self.state.failure.as_ref()
    }

    /// Remember a subset failure. The record keeps its lifecycle state.
    pub fn record_failure(&mut self, err: FontError) {
        self.state.failure = Some(err);
    }

    pub fn is_finalized(&self) -> bool {
        self.state.finalized
    }

    /// `Pending -> Matched`, attaching the emitted output.
    pub fn attach_output(&mut self, handle: OutputHandle) -> Result<(), FontError> {
        if self.asset.under_static_dir() || self.state.lifecycle != Lifecycle::Pending {
            return Err(self.invalid(Lifecycle::Matched));
        }
        self.state.lifecycle = Lifecycle::Matched;
        self.state.output = Some(handle);
        Ok(())
    }

    /// `Matched -> Compressed`. The sole gate for at-most-once compression.
    pub fn mark_compressed(&mut self, format: FontFormat, size: usize) -> Result<(), FontError> {
        if self.asset.under_static_dir()
            || self.state.lifecycle != Lifecycle::Matched
            || self.state.output.is_none()
        {
            return Err(self.invalid(Lifecycle::Compressed));
        }
        self.state.lifecycle = Lifecycle::Compressed;
        self.state.actual_format = Some(format);
        self.state.compressed_size = Some(size);
        Ok(())
    }

    /// Static-dir counterpart of `mark_compressed`, set by the finalize step.
    pub fn mark_finalized(&mut self, format: FontFormat, size: usize) -> Result<(), FontError> {
        if !self.asset.under_static_dir() || self.state.finalized {
            return Err(self.invalid(Lifecycle::Compressed));
        }
        self.state.finalized = true;
        self.state.actual_format = Some(format);
        self.state.compressed_size = Some(size);
        Ok(())
    }

    fn invalid(&self, to: Lifecycle) -> FontError {
        FontError::InvalidTransition {
            name: self.asset.display_name(),
            from: self.state.lifecycle,
            to,
        }
    }
}
