//! Font container formats.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Output container format of a subsetted font.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFormat {
    Ttf,
    Otf,
    Woff,
    Woff2,
}

impl FontFormat {
    /// Used when neither the declaration, the config nor the source file
    /// names a format.
    pub const DEFAULT: Self = Self::Woff2;

    pub const ALL: [Self; 4] = [Self::Ttf, Self::Otf, Self::Woff, Self::Woff2];

    /// Format name, also the extension without the dot.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ttf => "ttf",
            Self::Otf => "otf",
            Self::Woff => "woff",
            Self::Woff2 => "woff2",
        }
    }

    /// Extension with the leading dot, e.g. `.woff2`.
    pub fn extension(self) -> String {
        format!(".{}", self.as_str())
    }

    /// Parse a format name or extension (`"woff2"`, `".woff2"`, `"WOFF2"`).
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim_start_matches('.');
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(name))
    }

    /// Format implied by a file's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|e| e.to_str()).and_then(Self::parse)
    }

    /// WOFF flavor understood by font tools, `None` for bare sfnt output.
    pub const fn flavor(self) -> Option<&'static str> {
        match self {
            Self::Woff => Some("woff"),
            Self::Woff2 => Some("woff2"),
            Self::Ttf | Self::Otf => None,
        }
    }
}

impl fmt::Display for FontFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(FontFormat::parse("woff2"), Some(FontFormat::Woff2));
        assert_eq!(FontFormat::parse(".WOFF"), Some(FontFormat::Woff));
        assert_eq!(FontFormat::parse("eot"), None);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(
            FontFormat::from_path(Path::new("fonts/Caveat[wght].ttf")),
            Some(FontFormat::Ttf)
        );
        assert_eq!(FontFormat::from_path(Path::new("fonts/readme")), None);
    }

    #[test]
    fn test_extension_and_flavor() {
        assert_eq!(FontFormat::Woff2.extension(), ".woff2");
        assert_eq!(FontFormat::Otf.flavor(), None);
        assert_eq!(FontFormat::Woff.flavor(), Some("woff"));
    }

    #[test]
    fn test_deserialize_lowercase() {
        #[derive(Deserialize)]
        struct Wrap {
            format: FontFormat,
        }
        let w: Wrap = toml::from_str("format = \"woff\"").unwrap();
        assert_eq!(w.format, FontFormat::Woff);
        assert!(toml::from_str::<Wrap>("format = \"svg\"").is_err());
    }
}
