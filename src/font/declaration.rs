//! User-declared fonts (`[[fonts.declare]]`).

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::FontFormat;

/// A font source and the text it must be able to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FontDeclaration {
    /// `./relative/to/root.woff` or `/relative/to/public.woff`.
    pub path: String,
    /// Characters the subset must keep.
    #[serde(default)]
    pub text: String,
    /// Output format; falls back to `[fonts] format`.
    #[serde(default)]
    pub format: Option<FontFormat>,
    /// Extra character sets appended to `text`.
    #[serde(default)]
    pub presets: Vec<CharPreset>,
}

impl FontDeclaration {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
            format: None,
            presets: Vec::new(),
        }
    }

    pub fn with_format(mut self, format: FontFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// `text` plus presets, each character once, first-seen order.
    pub fn required_text(&self) -> String {
        let mut seen = rustc_hash::FxHashSet::default();
        self.text
            .chars()
            .chain(self.presets.iter().flat_map(|p| p.chars().chars()))
            .filter(|c| seen.insert(*c))
            .collect()
    }

    /// Declaration format, then the global default, then the source file's
    /// own format, then [`FontFormat::DEFAULT`].
    pub fn output_format(&self, global: Option<FontFormat>, resolved: &Path) -> FontFormat {
        self.format
            .or(global)
            .or_else(|| FontFormat::from_path(resolved))
            .unwrap_or(FontFormat::DEFAULT)
    }
}

/// Predefined character sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharPreset {
    Lowercase,
    Uppercase,
    Digits,
    Alphanumeric,
}

impl CharPreset {
    pub const fn chars(self) -> &'static str {
        match self {
            Self::Lowercase => "abcdefghijklmnopqrstuvwxyz",
            Self::Uppercase => "ABCDEFGHIJKLMNOPQRSTUVWXYZ",
            Self::Digits => "0123456789",
            Self::Alphanumeric => {
                "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text_merges_presets() {
        let mut decl = FontDeclaration::new("./a.woff", "a1中文中");
        decl.presets = vec![CharPreset::Digits];
        assert_eq!(decl.required_text(), "a1中文023456789");
    }

    #[test]
    fn test_output_format_fallbacks() {
        let path = Path::new("/site/a.ttf");
        let decl = FontDeclaration::new("./a.ttf", "x");
        assert_eq!(decl.output_format(None, path), FontFormat::Ttf);
        assert_eq!(decl.output_format(Some(FontFormat::Woff), path), FontFormat::Woff);
        assert_eq!(
            decl.clone()
                .with_format(FontFormat::Woff2)
                .output_format(Some(FontFormat::Woff), path),
            FontFormat::Woff2
        );
        assert_eq!(
            decl.output_format(None, Path::new("/site/a.font")),
            FontFormat::DEFAULT
        );
    }

    #[test]
    fn test_deserialize() {
        let decl: FontDeclaration = toml::from_str(
            r#"
path = "/fonts/a.ttf"
text = "hello"
format = "woff2"
presets = ["uppercase"]
"#,
        )
        .unwrap();
        assert_eq!(decl.path, "/fonts/a.ttf");
        assert_eq!(decl.format, Some(FontFormat::Woff2));
        assert_eq!(decl.presets, vec![CharPreset::Uppercase]);

        assert!(toml::from_str::<FontDeclaration>("path = \"a\"\ntype = \"woff\"").is_err());
    }
}
