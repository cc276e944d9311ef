//! Path and URL utilities.
//!
//! Pure functions for path manipulation.
//!
//! - [`fs`]: Filesystem path normalization (`normalize_path`, `slash_path`)

pub mod fs;

pub use fs::{normalize_path, slash_path};
