//! Shared utilities.
//!
//! - [`exec`]: external command runner
//! - [`mime`]: MIME types for the dev server
//! - [`path`]: path normalization
//! - [`plural`]: count formatting

pub mod exec;
pub mod mime;
pub mod path;
pub mod plural;

pub use plural::plural_count;
