//! `@font-face` URL extraction and rewriting.
//!
//! Pure text functions, no I/O. A font-face block is the `@font-face` token
//! followed by a brace-delimited body without nested braces; inside it every
//! `url(...)` notation is a reference, optionally single- or double-quoted.
//!
//! ```text
//! @font-face { src: url(./a.woff) url("./b.ttf"); }   -> ["./a.woff", "./b.ttf"]
//! ```

use regex::{Captures, Regex};
use std::sync::LazyLock;

static FONT_FACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@font-face\s*\{[^}]*\}").unwrap());

/// `url(x)`, `url('x')` or `url("x")`. The regex crate has no backreferences,
/// so each quoting style gets its own capture group.
static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*(?:"([^"]*)"|'([^']*)'|([^)'"]*?))\s*\)"#).unwrap()
});

/// All `@font-face` blocks in source order.
pub fn font_face_blocks(code: &str) -> Vec<&str> {
    if !code.contains("@font-face") {
        return Vec::new();
    }
    FONT_FACE.find_iter(code).map(|m| m.as_str()).collect()
}

/// URLs inside one block, first-seen order, exact duplicates removed.
pub fn block_urls(block: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    if !block.contains("url") {
        return urls;
    }
    for caps in URL.captures_iter(block) {
        let Some(url) = captured_url(&caps) else {
            continue;
        };
        if !urls.iter().any(|u| u == url) {
            urls.push(url.to_string());
        }
    }
    urls
}

/// References of every font-face block, concatenated.
///
/// Deduplication is per block only: a URL repeated in two blocks appears
/// twice. Use [`extract_unique`] for a global set.
pub fn extract_references(code: &str) -> Vec<String> {
    font_face_blocks(code)
        .into_iter()
        .flat_map(block_urls)
        .collect()
}

/// References with global deduplication, first-seen order.
pub fn extract_unique(code: &str) -> Vec<String> {
    let mut urls = extract_references(code);
    let mut seen = rustc_hash::FxHashSet::default();
    urls.retain(|u| seen.insert(u.clone()));
    urls
}

/// Rewrite URLs inside font-face blocks.
///
/// `map` returns the replacement for a URL, or `None` to keep it. The quote
/// style of each rewritten notation is preserved. Returns `None` when
/// nothing changed.
pub fn rewrite_references(code: &str, mut map: impl FnMut(&str) -> Option<String>) -> Option<String> {
    let mut changed = false;
    let rewritten = FONT_FACE.replace_all(code, |block: &Captures| {
        URL.replace_all(&block[0], |caps: &Captures| {
            let Some(url) = captured_url(caps) else {
                return caps[0].to_string();
            };
            match map(url) {
                Some(new_url) if new_url != url => {
                    changed = true;
                    match quote_of(caps) {
                        Some(q) => format!("url({q}{new_url}{q})"),
                        None => format!("url({new_url})"),
                    }
                }
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
    });
    changed.then(|| rewritten.into_owned())
}

fn captured_url<'a>(caps: &Captures<'a>) -> Option<&'a str> {
    let url = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))?
        .as_str()
        .trim();
    (!url.is_empty()).then_some(url)
}

fn quote_of(caps: &Captures<'_>) -> Option<char> {
    if caps.get(1).is_some() {
        Some('"')
    } else if caps.get(2).is_some() {
        Some('\'')
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE: &str = r#"a {
  text-decoration: none;
}

@font-face {
  src: url(./biantaoti.woff) url("./Caveat[wght].ttf");
}
"#;

    const MULTIPLE: &str = r#"a {
  text-decoration: none;
}

@font-face {
  src: url("./Caveat[wght].ttf");
}

@font-face {
  src: url(./biantaoti.woff);
}
"#;

    const REPEATED: &str = r#"@font-face {
  src: url("./biantaoti.woff");
}

@font-face {
  src: url(./biantaoti.woff) url("./Caveat[wght].ttf") url("./biantaoti.woff");
}
"#;

    #[test]
    fn test_font_face_blocks() {
        let blocks = font_face_blocks(MULTIPLE);
        assert_eq!(
            blocks,
            vec![
                "@font-face {\n  src: url(\"./Caveat[wght].ttf\");\n}",
                "@font-face {\n  src: url(./biantaoti.woff);\n}",
            ]
        );
    }

    #[test]
    fn test_extract_order_within_block() {
        let css = r#"@font-face { src: url(./a.woff) url("./b.ttf"); }"#;
        assert_eq!(extract_references(css), vec!["./a.woff", "./b.ttf"]);
        assert_eq!(
            extract_references(SINGLE),
            vec!["./biantaoti.woff", "./Caveat[wght].ttf"]
        );
    }

    #[test]
    fn test_extract_multiple_blocks() {
        assert_eq!(
            extract_references(MULTIPLE),
            vec!["./Caveat[wght].ttf", "./biantaoti.woff"]
        );
    }

    #[test]
    fn test_cross_block_repetition_preserved() {
        let css = "@font-face { src: url(./x.woff); }\n@font-face { src: url(./x.woff) url(./y.ttf); }";
        assert_eq!(extract_references(css), vec!["./x.woff", "./x.woff", "./y.ttf"]);
        assert_eq!(extract_unique(css), vec!["./x.woff", "./y.ttf"]);
    }

    #[test]
    fn test_dedup_within_block_only() {
        assert_eq!(
            extract_references(REPEATED),
            vec!["./biantaoti.woff", "./biantaoti.woff", "./Caveat[wght].ttf"]
        );
    }

    #[test]
    fn test_single_quotes_and_whitespace() {
        let css = "@font-face { src: url( 'fonts/a.otf' ) format('opentype'); }";
        assert_eq!(extract_references(css), vec!["fonts/a.otf"]);
    }

    #[test]
    fn test_no_matches() {
        assert!(extract_references("body { color: red; }").is_empty());
        assert!(extract_references("@font-face { font-family: X; }").is_empty());
        // url() outside a font-face block is not a font reference
        assert!(extract_references("div { background: url(./bg.png); }").is_empty());
    }

    #[test]
    fn test_rewrite_preserves_quotes() {
        let css = r#"@font-face { src: url(./a.woff) url("./b.ttf") url('./c.otf'); }"#;
        let out = rewrite_references(css, |url| Some(format!("/assets{}", &url[1..]))).unwrap();
        assert_eq!(
            out,
            r#"@font-face { src: url(/assets/a.woff) url("/assets/b.ttf") url('/assets/c.otf'); }"#
        );
    }

    #[test]
    fn test_rewrite_only_inside_font_face() {
        let css = "div { background: url(./a.woff); }\n@font-face { src: url(./a.woff); }";
        let out = rewrite_references(css, |_| Some("/x.woff".into())).unwrap();
        assert_eq!(
            out,
            "div { background: url(./a.woff); }\n@font-face { src: url(/x.woff); }"
        );
    }

    #[test]
    fn test_rewrite_unchanged_returns_none() {
        assert!(rewrite_references(SINGLE, |_| None).is_none());
        assert!(rewrite_references(SINGLE, |url| Some(url.to_string())).is_none());
    }
}
