//! Module resolution for the built-in host.
//!
//! | Specifier          | Resolved against            |
//! |--------------------|-----------------------------|
//! | `@/fonts/a.woff`   | alias target (`[project.alias]`) |
//! | `./a.woff`         | importer's directory        |
//! | `/src/a.woff`      | project root                |
//! | `fonts/a.woff`     | importer's directory, stylesheets only |
//! | `pkg/a.woff`       | nothing from scripts (bare specifier) |
//!
//! Only existing files resolve; anything else returns `None` and the font
//! pipeline falls back to the public directory.

use std::path::{Path, PathBuf};

use super::SourceKind;
use crate::font::ModuleResolver;
use crate::utils::path::normalize_path;

#[derive(Debug, Clone)]
pub struct AliasResolver {
    root: PathBuf,
    /// Longest prefix first.
    aliases: Vec<(String, PathBuf)>,
}

impl AliasResolver {
    /// `aliases` targets are taken relative to `root` unless absolute.
    pub fn new(root: &Path, aliases: Vec<(String, PathBuf)>) -> Self {
        let mut aliases: Vec<_> = aliases
            .into_iter()
            .map(|(prefix, target)| (prefix, root.join(target)))
            .collect();
        aliases.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self {
            root: root.to_path_buf(),
            aliases,
        }
    }

    fn candidate(&self, specifier: &str, importer: &Path) -> Option<PathBuf> {
        for (prefix, target) in &self.aliases {
            if let Some(rest) = specifier.strip_prefix(prefix.as_str())
                && (rest.is_empty() || rest.starts_with('/'))
            {
                return Some(target.join(rest.trim_start_matches('/')));
            }
        }

        if specifier.starts_with("./") || specifier.starts_with("../") {
            return Some(importer.parent()?.join(specifier));
        }
        if let Some(rest) = specifier.strip_prefix('/') {
            return Some(self.root.join(rest));
        }
        // `url()` in a stylesheet is relative even without `./`
        if SourceKind::of(importer) == SourceKind::Style && !specifier.contains(':') {
            return Some(importer.parent()?.join(specifier));
        }
        None
    }
}

impl ModuleResolver for AliasResolver {
    fn resolve(&self, specifier: &str, importer: &Path) -> Option<PathBuf> {
        let path = self.candidate(specifier, importer)?;
        path.is_file().then(|| normalize_path(&path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf, AliasResolver) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("src/fonts")).unwrap();
        fs::write(root.join("src/fonts/a.woff"), "a").unwrap();
        let resolver = AliasResolver::new(
            &root,
            vec![
                ("@".into(), PathBuf::from("src")),
                ("@fonts".into(), PathBuf::from("src/fonts")),
            ],
        );
        (dir, root, resolver)
    }

    #[test]
    fn test_alias_longest_prefix_wins() {
        let (_dir, root, resolver) = setup();
        let importer = root.join("src/main.ts");
        let expected = root.join("src/fonts/a.woff");
        assert_eq!(resolver.resolve("@fonts/a.woff", &importer), Some(expected.clone()));
        assert_eq!(resolver.resolve("@/fonts/a.woff", &importer), Some(expected));
    }

    #[test]
    fn test_relative_and_root_relative() {
        let (_dir, root, resolver) = setup();
        let importer = root.join("src/styles/main.css");
        let expected = root.join("src/fonts/a.woff");
        assert_eq!(resolver.resolve("../fonts/a.woff", &importer), Some(expected.clone()));
        assert_eq!(resolver.resolve("/src/fonts/a.woff", &importer), Some(expected));
    }

    #[test]
    fn test_stylesheet_relative_without_dot() {
        let (_dir, root, resolver) = setup();
        let expected = root.join("src/fonts/a.woff");
        assert_eq!(resolver.resolve("fonts/a.woff", &root.join("src/style.css")), Some(expected));
        // scripts keep bare specifiers for packages
        assert!(resolver.resolve("fonts/a.woff", &root.join("src/main.ts")).is_none());
        assert!(resolver.resolve("missing/a.woff", &root.join("src/style.css")).is_none());
    }

    #[test]
    fn test_unresolvable() {
        let (_dir, root, resolver) = setup();
        let importer = root.join("src/main.ts");
        assert!(resolver.resolve("./fonts/missing.woff", &importer).is_none());
        assert!(resolver.resolve("/fonts/a.woff", &importer).is_none());
        assert!(resolver.resolve("some-package/a.woff", &importer).is_none());
        // `@fontsx` is not the `@fonts` alias
        assert!(resolver.resolve("@fontsx/a.woff", &importer).is_none());
    }
}
