//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Find config file by searching upward from the current directory.
///
/// ```text
/// /home/user/site/src/styles/  ← cwd
/// /home/user/site/fontcut.toml ← found!
/// ```
pub fn find_config_file(config_name: &Path) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_file_from(&cwd, config_name)
}

/// Same as [`find_config_file`], starting from `start`.
pub fn find_config_file_from(start: &Path, config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let mut current = start;
    loop {
        let candidate = current.join(config_name);
        if candidate.is_file() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}

/// Expand `~` and resolve `path` against `root`.
pub fn resolve_against(root: &Path, path: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    let path = PathBuf::from(expanded);
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_upward() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("src/styles");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("fontcut.toml"), "").unwrap();

        let found = find_config_file_from(&nested, Path::new("fontcut.toml")).unwrap();
        assert_eq!(found, dir.path().join("fontcut.toml"));
    }

    #[test]
    fn test_find_config_missing() {
        let dir = TempDir::new().unwrap();
        assert!(find_config_file_from(dir.path(), Path::new("no-such-config.toml")).is_none());
    }

    #[test]
    fn test_find_config_absolute() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("site.toml");
        assert!(find_config_file_from(dir.path(), &config).is_none());
        fs::write(&config, "").unwrap();
        assert_eq!(find_config_file_from(Path::new("/"), &config), Some(config));
    }

    #[test]
    fn test_resolve_against() {
        let root = Path::new("/site");
        assert_eq!(resolve_against(root, Path::new("dist")), PathBuf::from("/site/dist"));
        assert_eq!(resolve_against(root, Path::new("/abs/out")), PathBuf::from("/abs/out"));
    }
}
