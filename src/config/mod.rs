//! Project configuration management for `fontcut.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── project    # [project]
//! │   ├── fonts      # [fonts]
//! │   ├── serve      # [serve]
//! │   └── log        # [log]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError, ConfigDiagnostics
//! │   └── field      # FieldPath
//! └── mod.rs         # FontcutConfig (this file)
//! ```

pub mod section;
pub mod types;
mod util;

use util::find_config_file;

pub use section::{FontsConfig, LogConfig, ProjectConfig, ServeConfig};
pub use types::{ConfigDiagnostics, ConfigError, FieldPath};

use crate::{
    cli::{Cli, Commands},
    font::FontError,
    log,
    plugin::{FontOptions, Mode, PluginEnv},
    utils::path::normalize_path,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing `fontcut.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FontcutConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// `--clean` from the command line (internal use only)
    #[serde(skip)]
    pub clean: bool,

    #[serde(default)]
    pub project: ProjectConfig,

    #[serde(default)]
    pub fonts: FontsConfig,

    #[serde(default)]
    pub serve: ServeConfig,

    #[serde(default)]
    pub log: LogConfig,
}

impl FontcutConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd to find the config file. The project root
    /// is the config file's parent directory.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = find_config_file(&cli.config).ok_or_else(|| {
            FontError::Configuration(format!(
                "config file `{}` not found in this directory or any parent",
                cli.config.display()
            ))
        })?;

        let mut config = Self::from_path(&config_path)?;
        config.project_raw_check()?;

        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.config_path = normalize_path(&config_path);
        config.apply_command_options(cli);
        config.normalize_paths(&root);
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)
            .with_context(|| format!("failed to parse `{}`", path.display()))?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {field}");
        }
    }

    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Get path relative to the project root
    pub fn root_relative(&self, path: impl AsRef<Path>) -> PathBuf {
        path.as_ref()
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.as_ref().to_path_buf())
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    fn apply_command_options(&mut self, cli: &Cli) {
        let args = cli.build_args();
        self.clean = args.clean;
        self.log.verbose |= args.verbose;
        crate::logger::set_verbose(self.log.verbose);

        match &cli.command {
            Commands::Build { output, .. } => {
                Self::update_option(&mut self.project.output, output.as_ref());
            }
            Commands::Serve {
                interface, port, ..
            } => {
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
            }
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // path normalization
    // ========================================================================

    /// Normalize all paths relative to root directory.
    fn normalize_paths(&mut self, root: &Path) {
        self.root = normalize_path(root);
        let root = self.root.clone();
        self.project.normalize(&root);
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Checks on paths as written in the file.
    fn project_raw_check(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();
        self.project.validate_raw(&mut diag);
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }

    /// Validate the loaded configuration.
    ///
    /// Collects all validation errors and returns them at once.
    pub fn validate(&self) -> Result<()> {
        if !self.root.is_dir() {
            return Err(FontError::Configuration(format!(
                "project root `{}` does not exist",
                self.root.display()
            ))
            .into());
        }

        let mut diag = ConfigDiagnostics::new();
        self.project.validate(&self.root, &mut diag);
        self.fonts.validate(&mut diag);
        diag.print_hints();

        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }

    // ========================================================================
    // plugin wiring
    // ========================================================================

    pub fn plugin_options(&self) -> FontOptions {
        FontOptions {
            declarations: self.fonts.declare.clone(),
            format: self.fonts.format,
            source_map: self.fonts.source_map,
        }
    }

    pub fn plugin_env(&self, mode: Mode) -> PluginEnv {
        PluginEnv {
            root: self.root.clone(),
            public_dir: self.project.public.clone(),
            out_dir: self.project.output.clone(),
            assets_dir: self.project.assets.clone(),
            cache_dir: self.project.cache.clone(),
            mode,
        }
    }

    /// Import aliases for the host resolver.
    pub fn aliases(&self) -> Vec<(String, PathBuf)> {
        self.project
            .alias
            .iter()
            .map(|(prefix, dir)| (prefix.clone(), dir.clone()))
            .collect()
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

/// Config for a project rooted at `root`, with paths already normalized.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_config(root: &Path, content: &str) -> FontcutConfig {
    let (mut config, ignored) = FontcutConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    config.config_path = root.join("fontcut.toml");
    config.normalize_paths(root);
    config
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_from_str_invalid_toml() {
        let result: Result<FontcutConfig, _> = toml::from_str("[project\nsource = \"src\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_config_default() {
        let config = FontcutConfig::default();
        assert_eq!(config.config_path, PathBuf::new());
        assert_eq!(config.get_root(), Path::new(""));
        assert_eq!(config.serve.port, 5277);
        assert!(config.log.clear_screen);
        assert_eq!(config.fonts.command, vec!["pyftsubset".to_string()]);
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[project]\nsource = \"web\"\n[unknown_section]\nfield = \"value\"";
        let (config, ignored) = FontcutConfig::parse_with_ignored(content).unwrap();
        assert_eq!(config.project.source, PathBuf::from("web"));
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_no_unknown_fields() {
        let content = "[fonts]\nformat = \"woff\"\n[log]\nverbose = true";
        let (config, ignored) = FontcutConfig::parse_with_ignored(content).unwrap();
        assert!(ignored.is_empty());
        assert!(config.log.verbose);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from(["fontcut", "serve", "--port", "9000", "--clean"]);
        let mut config = FontcutConfig::default();
        config.apply_command_options(&cli);
        assert_eq!(config.serve.port, 9000);
        assert!(config.clean);

        let cli = Cli::parse_from(["fontcut", "build", "-o", "public_html"]);
        let mut config = FontcutConfig::default();
        config.apply_command_options(&cli);
        assert_eq!(config.project.output, PathBuf::from("public_html"));
    }

    #[test]
    fn test_plugin_wiring() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let config = test_config(
            &root,
            r#"
            [project]
            assets = "static"
            [project.alias]
            "@" = "src"

            [fonts]
            format = "woff"
            source_map = true

            [[fonts.declare]]
            path = "./src/a.ttf"
            text = "ab"
            "#,
        );

        let options = config.plugin_options();
        assert_eq!(options.declarations.len(), 1);
        assert!(options.source_map);

        let env = config.plugin_env(Mode::Build);
        assert_eq!(env.root, root);
        assert_eq!(env.out_dir, root.join("dist"));
        assert_eq!(env.assets_dir, "static");
        assert_eq!(env.scratch_dir(), root.join(".fontcut/fonts"));

        assert_eq!(config.aliases(), vec![("@".to_string(), root.join("src"))]);
        assert_eq!(config.root_relative(root.join("src/a.ttf")), PathBuf::from("src/a.ttf"));
    }

    #[test]
    fn test_validate_missing_source_is_error() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let config = test_config(&root, "");
        let err = config.validate().unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn test_validate_missing_root_is_fatal() {
        let mut config = FontcutConfig::default();
        config.root = PathBuf::from("/definitely/not/a/fontcut/root");
        let err = config.validate().unwrap_err();
        assert!(err.downcast_ref::<FontError>().is_some_and(FontError::is_fatal));
    }

    #[test]
    fn test_validate_ok() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        let config = test_config(
            &root,
            "[[fonts.declare]]\npath = \"./src/a.woff\"\ntext = \"a\"",
        );
        config.validate().unwrap();
    }
}
