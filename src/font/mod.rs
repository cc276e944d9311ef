//! Font asset identity and subsetting.
//!
//! Tracks declared fonts through a build, matches emitted outputs back to
//! their declarations by content, and subsets each matched font once.
//!
//! # Structure
//!
//! ```text
//! font/
//! ├── declaration  # [[fonts.declare]] entries
//! ├── resolve      # declared path / source URL -> absolute path
//! ├── hash         # content fingerprints
//! ├── extract      # @font-face url(...) scanning and rewriting
//! ├── asset        # per-font record and lifecycle
//! ├── output       # emitted output handle (write-once cell)
//! ├── registry     # records, lookup, output matching
//! ├── compress     # Subsetter capability
//! └── error        # FontError
//! ```

mod asset;
mod compress;
mod declaration;
mod error;
pub mod extract;
mod format;
mod hash;
mod output;
mod registry;
mod resolve;

pub use asset::{AssetGuard, AssetMeta, FontAsset, Lifecycle};
pub use compress::{CommandSubsetter, SubsetCompressor, Subsetter};
pub use declaration::{CharPreset, FontDeclaration};
pub use error::FontError;
pub use format::FontFormat;
pub use hash::Fingerprint;
pub use output::OutputHandle;
pub use registry::FontRegistry;
pub use resolve::{ModuleResolver, NoResolver, PathResolver};

#[cfg(test)]
pub(crate) use asset::tests::meta as test_meta;
#[cfg(test)]
pub(crate) use compress::tests::CountingSubsetter;
