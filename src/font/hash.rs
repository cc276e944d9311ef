//! Content fingerprints using blake3.
//!
//! A fingerprint is the identity of a font: two files with the same bytes
//! have the same fingerprint no matter where they live on disk. Missing or
//! unreadable files have no fingerprint at all, which is how a declared font
//! that does not exist is detected.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// A 256-bit content hash (blake3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Create a fingerprint from raw digest bytes.
    #[inline]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Fingerprint an in-memory buffer.
    pub fn of(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    /// Fingerprint a file, streaming its contents.
    ///
    /// Returns `None` when the file cannot be opened or read.
    pub fn of_file(path: &Path) -> Option<Self> {
        let file = File::open(path).ok()?;

        let mut reader = BufReader::with_capacity(64 * 1024, file);
        let mut hasher = blake3::Hasher::new();
        let mut buffer = [0u8; 64 * 1024];

        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => {
                    hasher.update(&buffer[..n]);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => return None,
            }
        }

        Some(Self(*hasher.finalize().as_bytes()))
    }

    /// Get the raw bytes.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Full lowercase hex digest.
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// First 8 hex chars, used in hashed output names.
    pub fn short(self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a 64-char hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}
