//! URL to filesystem path resolution.

use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};

/// Resolve `url` against each root in turn, first hit wins.
pub fn resolve_in(url: &str, roots: &[&Path]) -> Option<PathBuf> {
    let clean = normalize_url(url);
    // reject traversal early, canonicalization below catches symlinks
    if clean.split('/').any(|seg| seg == "..") {
        return None;
    }
    roots.iter().find_map(|root| resolve_path(&clean, root))
}

/// Resolve a clean relative path, handling index.html for directories
fn resolve_path(clean: &str, serve_root: &Path) -> Option<PathBuf> {
    let canonical = serve_root.join(clean).canonicalize().ok()?;
    let root_canonical = serve_root.canonicalize().ok()?;

    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }

    if canonical.is_dir() {
        let index = canonical.join("index.html");
        if index.is_file() {
            return Some(index);
        }
    }

    None
}

/// Normalize URL: decode, strip query string and fragment, trim slashes
fn normalize_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();
    decoded.trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("/fonts/a%20b.woff?v=1"), "fonts/a b.woff");
        assert_eq!(normalize_url("/"), "");
        assert_eq!(normalize_url("/style.css#x"), "style.css");
    }

    #[test]
    fn test_resolve_in_order() {
        let dir = TempDir::new().unwrap();
        let public = dir.path().join("public");
        let src = dir.path().join("src");
        fs::create_dir_all(&public).unwrap();
        fs::create_dir_all(&src).unwrap();
        fs::write(public.join("a.txt"), "public").unwrap();
        fs::write(src.join("a.txt"), "src").unwrap();
        fs::write(src.join("index.html"), "home").unwrap();

        let roots = [public.as_path(), src.as_path()];
        let hit = resolve_in("/a.txt", &roots).unwrap();
        assert_eq!(fs::read_to_string(hit).unwrap(), "public");
        let index = resolve_in("/", &roots).unwrap();
        assert_eq!(fs::read_to_string(index).unwrap(), "home");

        assert!(resolve_in("/missing.css", &roots).is_none());
        assert!(resolve_in("/../public/a.txt", &roots).is_none());
    }
}
