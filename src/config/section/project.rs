//! `[project]` section configuration.
//!
//! ```toml
//! [project]
//! source = "src"          # Scanned source tree
//! public = "public"       # Copied verbatim, served at `/`
//! output = "dist"         # Build output
//! assets = "assets"       # Hashed-asset directory inside `output`
//! cache = ".fontcut"      # Scratch files live in `<cache>/fonts`
//!
//! [project.alias]
//! "@" = "src"
//! ```

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::util::resolve_against;
use crate::config::{ConfigDiagnostics, FieldPath};
use crate::utils::path::normalize_path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub source: PathBuf,
    pub public: PathBuf,
    pub output: PathBuf,
    /// Relative to `output`, `/`-separated.
    pub assets: String,
    pub cache: PathBuf,
    /// Import alias prefix -> directory.
    pub alias: BTreeMap<String, PathBuf>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            source: "src".into(),
            public: "public".into(),
            output: "dist".into(),
            assets: "assets".into(),
            cache: ".fontcut".into(),
            alias: BTreeMap::new(),
        }
    }
}

pub struct ProjectConfigFields {
    pub source: FieldPath,
    pub output: FieldPath,
    pub assets: FieldPath,
    pub cache: FieldPath,
    pub alias: FieldPath,
}

impl ProjectConfig {
    pub const FIELDS: ProjectConfigFields = ProjectConfigFields {
        source: FieldPath::new("project.source"),
        output: FieldPath::new("project.output"),
        assets: FieldPath::new("project.assets"),
        cache: FieldPath::new("project.cache"),
        alias: FieldPath::new("project.alias"),
    };

    /// Checks that must see the paths as written, before normalization.
    pub fn validate_raw(&self, diag: &mut ConfigDiagnostics) {
        // `/assets/` == `assets`
        let assets = Path::new(self.assets.trim_matches('/'));
        if assets
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            diag.error_with_hint(
                Self::FIELDS.assets,
                format!("`{}` must stay inside the output directory", self.assets),
                "use a plain relative directory such as `assets`",
            );
        }
        if self.alias.keys().any(String::is_empty) {
            diag.error(Self::FIELDS.alias, "alias prefix must not be empty");
        }
    }

    /// Resolve every directory against `root`.
    pub fn normalize(&mut self, root: &Path) {
        let resolve = |path: &Path| normalize_path(&resolve_against(root, path));
        self.source = resolve(&self.source);
        self.public = resolve(&self.public);
        self.output = resolve(&self.output);
        self.cache = resolve(&self.cache);
        self.assets = self.assets.trim_matches('/').to_string();
        for target in self.alias.values_mut() {
            *target = resolve(target);
        }
    }

    /// Checks on normalized paths.
    pub fn validate(&self, root: &Path, diag: &mut ConfigDiagnostics) {
        if !self.source.is_dir() {
            diag.error_with_hint(
                Self::FIELDS.source,
                format!("source directory `{}` not found", self.source.display()),
                "create it or point `project.source` at your sources",
            );
        }
        if self.output == root || self.output == self.source || self.source.starts_with(&self.output) {
            diag.error(
                Self::FIELDS.output,
                format!(
                    "output directory `{}` would overwrite project files",
                    self.output.display()
                ),
            );
        }
        if self.cache == root || self.cache == self.output {
            diag.error(
                Self::FIELDS.cache,
                format!("cache directory `{}` must be its own directory", self.cache.display()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_project_defaults() {
        let config: ProjectConfig = toml::from_str("").unwrap();
        assert_eq!(config, ProjectConfig::default());
        assert_eq!(config.assets, "assets");
    }

    #[test]
    fn test_normalize() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let mut config: ProjectConfig =
            toml::from_str("assets = \"/static/\"\n[alias]\n\"@\" = \"src\"").unwrap();
        config.normalize(&root);

        assert_eq!(config.source, root.join("src"));
        assert_eq!(config.output, root.join("dist"));
        assert_eq!(config.cache, root.join(".fontcut"));
        assert_eq!(config.assets, "static");
        assert_eq!(config.alias["@"], root.join("src"));
    }

    #[test]
    fn test_validate_raw_assets_escape() {
        let config = ProjectConfig {
            assets: "../outside".into(),
            ..ProjectConfig::default()
        };
        let mut diag = ConfigDiagnostics::new();
        config.validate_raw(&mut diag);
        assert_eq!(diag.len(), 1);
        assert_eq!(diag.errors()[0].field, ProjectConfig::FIELDS.assets);
    }

    #[test]
    fn test_validate_missing_source_and_bad_output() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let mut config = ProjectConfig {
            output: ".".into(),
            ..ProjectConfig::default()
        };
        config.normalize(&root);

        let mut diag = ConfigDiagnostics::new();
        config.validate(&root, &mut diag);
        let fields: Vec<_> = diag.errors().iter().map(|e| e.field).collect();
        assert!(fields.contains(&ProjectConfig::FIELDS.source));
        assert!(fields.contains(&ProjectConfig::FIELDS.output));
    }
}
