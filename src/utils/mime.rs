//! MIME type detection for the dev server.

use std::path::Path;

use crate::font::FontFormat;

/// Common MIME type constants.
pub mod types {
    // Text
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const CSS: &str = "text/css; charset=utf-8";
    pub const JAVASCRIPT: &str = "text/javascript; charset=utf-8";
    pub const JSON: &str = "application/json";
    pub const XML: &str = "application/xml";
    pub const MARKDOWN: &str = "text/markdown; charset=utf-8";

    // Binary
    pub const OCTET_STREAM: &str = "application/octet-stream";
    pub const WASM: &str = "application/wasm";

    // Images
    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
    pub const GIF: &str = "image/gif";
    pub const WEBP: &str = "image/webp";
    pub const AVIF: &str = "image/avif";
    pub const SVG: &str = "image/svg+xml";
    pub const ICO: &str = "image/x-icon";

    // Fonts
    pub const WOFF: &str = "font/woff";
    pub const WOFF2: &str = "font/woff2";
    pub const TTF: &str = "font/ttf";
    pub const OTF: &str = "font/otf";
    pub const EOT: &str = "application/vnd.ms-fontobject";
}

/// Guess MIME type from file extension.
///
/// Returns a full MIME type string suitable for HTTP Content-Type header.
pub fn from_path(path: &Path) -> &'static str {
    from_extension(path.extension().and_then(|e| e.to_str()))
}

/// Guess MIME type from file extension string.
pub fn from_extension(ext: Option<&str>) -> &'static str {
    match ext {
        // Web / Text
        Some("html" | "htm") => types::HTML,
        Some("css" | "scss" | "sass" | "less") => types::CSS,
        // scripts are served untranspiled, the browser only sees JavaScript
        Some("js" | "mjs" | "cjs" | "ts" | "tsx" | "jsx" | "mts" | "cts") => types::JAVASCRIPT,
        Some("json" | "map") => types::JSON,
        Some("xml") => types::XML,
        Some("txt") => types::PLAIN,
        Some("md") => types::MARKDOWN,

        // Images
        Some("svg") => types::SVG,
        Some("png") => types::PNG,
        Some("jpg" | "jpeg") => types::JPEG,
        Some("gif") => types::GIF,
        Some("webp") => types::WEBP,
        Some("avif") => types::AVIF,
        Some("ico") => types::ICO,

        // Fonts
        Some("eot") => types::EOT,
        Some(ext) => match FontFormat::parse(ext) {
            Some(format) => for_font(format),
            None if ext == "wasm" => types::WASM,
            None => types::OCTET_STREAM,
        },

        None => types::OCTET_STREAM,
    }
}

pub const fn for_font(format: FontFormat) -> &'static str {
    match format {
        FontFormat::Ttf => types::TTF,
        FontFormat::Otf => types::OTF,
        FontFormat::Woff => types::WOFF,
        FontFormat::Woff2 => types::WOFF2,
    }
}

/// Check if the MIME type represents text content.
pub fn is_text(mime: &str) -> bool {
    mime.starts_with("text/") || mime == types::JSON || mime == types::XML
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_from_path() {
        assert_eq!(from_path(&PathBuf::from("index.html")), types::HTML);
        assert_eq!(from_path(&PathBuf::from("style.css")), types::CSS);
        assert_eq!(from_path(&PathBuf::from("app.js")), types::JAVASCRIPT);
        assert_eq!(from_path(&PathBuf::from("app.ts")), types::JAVASCRIPT);
        assert_eq!(from_path(&PathBuf::from("logo.png")), types::PNG);
        assert_eq!(from_path(&PathBuf::from("icon.svg")), types::SVG);
        assert_eq!(from_path(&PathBuf::from("unknown.xyz")), types::OCTET_STREAM);
        assert_eq!(from_path(&PathBuf::from("README")), types::OCTET_STREAM);
    }

    #[test]
    fn test_fonts() {
        assert_eq!(from_path(&PathBuf::from("a-1a2b3c4d.woff2")), types::WOFF2);
        assert_eq!(from_path(&PathBuf::from("a.ttf")), types::TTF);
        assert_eq!(from_path(&PathBuf::from("a.eot")), types::EOT);
        assert_eq!(for_font(FontFormat::Otf), types::OTF);
    }

    #[test]
    fn test_is_text() {
        assert!(is_text(types::HTML));
        assert!(is_text(types::CSS));
        assert!(is_text(types::JSON));
        assert!(!is_text(types::PNG));
        assert!(!is_text(types::WOFF));
    }
}
