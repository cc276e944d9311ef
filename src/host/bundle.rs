//! In-memory bundle of emitted assets.
//!
//! Emitted assets are named `{stem}-{8 hex}{ext}` from a content hash, like
//! any bundler would, and live in memory until [`OutputBundle::write_to`].

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::fs;
use std::path::Path;

use crate::font::{Fingerprint, OutputHandle};
use crate::plugin::AssetEmitter;

#[derive(Debug, Default)]
pub struct OutputBundle {
    /// Directory inside the output dir, `/`-separated, may be empty.
    assets_dir: String,
    outputs: Mutex<Vec<OutputHandle>>,
}

impl OutputBundle {
    pub fn new(assets_dir: impl Into<String>) -> Self {
        Self {
            assets_dir: assets_dir.into().trim_matches('/').to_string(),
            outputs: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the emitted outputs, emission order.
    pub fn outputs(&self) -> Vec<OutputHandle> {
        self.outputs.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.outputs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.lock().is_empty()
    }

    /// Hashed file name for `name` with content `source`.
    fn hashed_file_name(&self, name: &str, source: &[u8]) -> String {
        let (stem, ext) = name
            .split_once('.')
            .map_or((name, ""), |(s, _)| (s, &name[s.len()..]));
        let file = format!("{stem}-{}{ext}", Fingerprint::of(source).short());
        if self.assets_dir.is_empty() {
            file
        } else {
            format!("{}/{file}", self.assets_dir)
        }
    }

    /// Write every output under `out_dir`. Returns the number written.
    pub fn write_to(&self, out_dir: &Path) -> Result<usize> {
        let outputs = self.outputs();
        for output in &outputs {
            let path = out_dir.join(output.file_name());
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create `{}`", parent.display()))?;
            }
            output
                .with_source(|bytes| fs::write(&path, bytes))
                .with_context(|| format!("failed to write `{}`", path.display()))?;
        }
        Ok(outputs.len())
    }
}

impl AssetEmitter for OutputBundle {
    fn emit_asset(&self, name: &str, source: Vec<u8>) -> String {
        let file_name = self.hashed_file_name(name, &source);
        let mut outputs = self.outputs.lock();
        if !outputs.iter().any(|o| o.file_name() == file_name) {
            outputs.push(OutputHandle::new(file_name.clone(), source));
        }
        file_name
    }
}
