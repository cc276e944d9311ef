//! Built-in host: the minimal build tool the font plugin runs inside.
//!
//! - [`resolver`]: alias / relative / root-relative module resolution
//! - [`bundle`]: content-hashed in-memory output bundle
//! - [`imports`]: inlining of font imports in scripts

pub mod bundle;
pub mod imports;
pub mod resolver;

pub use bundle::OutputBundle;
pub use imports::inline_font_imports;
pub use resolver::AliasResolver;

use std::path::Path;

/// Kind of source file the host feeds through the plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Style,
    Script,
    Other,
}

impl SourceKind {
    pub fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("css" | "scss" | "sass" | "less") => Self::Style,
            Some("js" | "ts" | "jsx" | "tsx" | "mjs" | "mts" | "cjs" | "cts") => Self::Script,
            _ => Self::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind() {
        assert_eq!(SourceKind::of(Path::new("a/style.css")), SourceKind::Style);
        assert_eq!(SourceKind::of(Path::new("main.ts")), SourceKind::Script);
        assert_eq!(SourceKind::of(Path::new("font.woff")), SourceKind::Other);
        assert_eq!(SourceKind::of(Path::new("README")), SourceKind::Other);
    }
}
