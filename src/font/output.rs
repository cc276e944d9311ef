//! Emitted output handles.
//!
//! The host owns the emitted bytes until they reach storage; the font
//! pipeline holds a clone of the handle so it can replace the payload in
//! place. Exactly one write is accepted per handle: the compression step.

use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::FontError;

#[derive(Debug)]
struct OutputCell {
    file_name: String,
    source: RwLock<Vec<u8>>,
    written: AtomicBool,
}

/// Shared handle to one emitted output (file name plus mutable bytes).
#[derive(Debug, Clone)]
pub struct OutputHandle(Arc<OutputCell>);

impl OutputHandle {
    pub fn new(file_name: impl Into<String>, source: Vec<u8>) -> Self {
        Self(Arc::new(OutputCell {
            file_name: file_name.into(),
            source: RwLock::new(source),
            written: AtomicBool::new(false),
        }))
    }

    /// File name relative to the output directory, `/`-separated.
    pub fn file_name(&self) -> &str {
        &self.0.file_name
    }

    /// Copy of the current payload.
    pub fn source(&self) -> Vec<u8> {
        self.0.source.read().clone()
    }

    pub fn len(&self) -> usize {
        self.0.source.read().len()
    }

    /// Run `f` against the current payload without copying it.
    pub fn with_source<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.0.source.read())
    }

    /// Replace the payload. Fails if it was already replaced once.
    pub fn write_once(&self, bytes: Vec<u8>) -> Result<(), FontError> {
        if self.0.written.swap(true, Ordering::SeqCst) {
            return Err(FontError::OutputAlreadyWritten(self.0.file_name.clone()));
        }
        *self.0.source.write() = bytes;
        Ok(())
    }

    pub fn is_written(&self) -> bool {
        self.0.written.load(Ordering::SeqCst)
    }

    /// Identity comparison: both handles point at the same output.
    pub fn same_output(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
