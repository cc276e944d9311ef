use anyhow::{Context, Result};
use jwalk::WalkDir;
use rayon::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    config::FontcutConfig,
    debug,
    host::{SourceKind, inline_font_imports},
    logger::ProgressLine,
    plugin::FontPlugin,
};

const IGNORED_FILES: &[&str] = &[".DS_Store"];

/// Source files grouped by what the host does with them.
#[derive(Debug, Default)]
pub(super) struct SourceFiles {
    pub styles: Vec<PathBuf>,
    pub scripts: Vec<PathBuf>,
    /// Copied verbatim.
    pub others: Vec<PathBuf>,
}

impl SourceFiles {
    pub fn len(&self) -> usize {
        self.styles.len() + self.scripts.len() + self.others.len()
    }
}

/// Collect all files from a directory recursively, hidden entries skipped.
pub(super) fn collect_all_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    WalkDir::new(dir)
        .skip_hidden(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_str().unwrap_or_default();
            !IGNORED_FILES.contains(&name)
        })
        .map(|e| e.path())
        .collect()
}

/// Empty the output directory; `--clean` also drops the cache directory.
pub(super) fn prepare_output(config: &FontcutConfig) -> Result<()> {
    let output = &config.project.output;
    if output.exists() {
        fs::remove_dir_all(output)
            .with_context(|| format!("failed to clean `{}`", output.display()))?;
    }
    fs::create_dir_all(output)
        .with_context(|| format!("failed to create `{}`", output.display()))?;

    let cache = &config.project.cache;
    if config.clean && cache.exists() {
        fs::remove_dir_all(cache)
            .with_context(|| format!("failed to clean `{}`", cache.display()))?;
        debug!("build"; "removed {}", cache.display());
    }
    Ok(())
}

/// Copy the public directory into the output directory as is.
pub(super) fn copy_public(config: &FontcutConfig) -> Result<usize> {
    let public = &config.project.public;
    let files = collect_all_files(public);
    files.par_iter().try_for_each(|file| -> Result<()> {
        let Ok(relative) = file.strip_prefix(public) else {
            return Ok(());
        };
        let target = config.project.output.join(relative);
        ensure_parent(&target)?;
        fs::copy(file, &target)
            .with_context(|| format!("failed to copy `{}`", file.display()))?;
        Ok(())
    })?;
    Ok(files.len())
}

/// Walk the source tree. Declared fonts are left out, they only reach the
/// output through the bundle.
pub(super) fn collect_sources(config: &FontcutConfig, plugin: &FontPlugin) -> SourceFiles {
    let project = &config.project;
    let mut files = SourceFiles::default();

    for path in collect_all_files(&project.source) {
        if path.starts_with(&project.output)
            || path.starts_with(&project.public)
            || path.starts_with(&project.cache)
            || path == config.config_path
            || plugin.registry().get(&path).is_some()
        {
            continue;
        }
        match SourceKind::of(&path) {
            SourceKind::Style => files.styles.push(path),
            SourceKind::Script => files.scripts.push(path),
            SourceKind::Other => files.others.push(path),
        }
    }
    files
}

/// Transform styles, inline font imports in scripts, copy the rest.
pub(super) fn process_sources(
    config: &FontcutConfig,
    plugin: &FontPlugin,
    files: &SourceFiles,
    progress: Option<&ProgressLine>,
) -> Result<()> {
    let out = |path: &Path| -> PathBuf {
        let relative = path.strip_prefix(&config.project.source).unwrap_or(path);
        config.project.output.join(relative)
    };
    let tick = |name: &str| {
        if let Some(p) = progress {
            p.inc(name);
        }
    };

    let (styles, (scripts, others)) = rayon::join(
        || {
            files.styles.par_iter().try_for_each(|path| -> Result<()> {
                process_style(plugin, path, &out(path))?;
                tick("css");
                Ok(())
            })
        },
        || {
            rayon::join(
                || {
                    files.scripts.par_iter().try_for_each(|path| -> Result<()> {
                        process_script(plugin, path, &out(path))?;
                        tick("js");
                        Ok(())
                    })
                },
                || {
                    files.others.par_iter().try_for_each(|path| -> Result<()> {
                        let target = out(path);
                        ensure_parent(&target)?;
                        fs::copy(path, &target)
                            .with_context(|| format!("failed to copy `{}`", path.display()))?;
                        tick("other");
                        Ok(())
                    })
                },
            )
        },
    );
    styles?;
    scripts?;
    others
}

fn process_style(plugin: &FontPlugin, path: &Path, target: &Path) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("failed to read `{}`", path.display()))?;
    let Ok(code) = String::from_utf8(bytes) else {
        return copy_file(path, target);
    };

    ensure_parent(target)?;
    let Some(output) = plugin.transform(&code, path)? else {
        return write_file(target, code.as_bytes());
    };

    let mut code = output.code;
    if let Some(map) = output.map {
        let map_path = append_extension(target, "map");
        write_file(&map_path, map.as_bytes())?;
        if let Some(name) = map_path.file_name() {
            code.push_str(&format!("\n/*# sourceMappingURL={} */\n", name.to_string_lossy()));
        }
    }
    write_file(target, code.as_bytes())
}

fn process_script(plugin: &FontPlugin, path: &Path, target: &Path) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("failed to read `{}`", path.display()))?;
    let Ok(code) = String::from_utf8(bytes) else {
        return copy_file(path, target);
    };

    ensure_parent(target)?;
    match inline_font_imports(plugin, &code, path)? {
        Some(inlined) => write_file(target, inlined.as_bytes()),
        None => write_file(target, code.as_bytes()),
    }
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    ensure_parent(to)?;
    fs::copy(from, to).with_context(|| format!("failed to copy `{}`", from.display()))?;
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("failed to write `{}`", path.display()))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create `{}`", parent.display()))?;
    }
    Ok(())
}

/// `a/style.css` -> `a/style.css.map`
fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(ext);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collect_all_files_skips_hidden() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a/.cache")).unwrap();
        fs::write(dir.path().join("a/x.css"), "").unwrap();
        fs::write(dir.path().join("a/.cache/y.css"), "").unwrap();
        fs::write(dir.path().join(".DS_Store"), "").unwrap();

        let files = collect_all_files(dir.path());
        assert_eq!(files, vec![dir.path().join("a/x.css")]);
        assert!(collect_all_files(&dir.path().join("missing")).is_empty());
    }

    #[test]
    fn test_append_extension() {
        assert_eq!(
            append_extension(Path::new("dist/style.css"), "map"),
            PathBuf::from("dist/style.css.map")
        );
    }
}
