//! Script import inlining.
//!
//! The built-in host does not bundle scripts. It only inlines default
//! imports of declared fonts, which is all the font plugin contributes to a
//! script:
//!
//! ```text
//! import font from "./fonts/a.woff";   ->   const font = "/assets/a-1a2b3c4d.woff";
//! ```

use anyhow::Result;
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::LazyLock;

use crate::plugin::FontPlugin;

static DEFAULT_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"import\s+([A-Za-z_$][\w$]*)\s+from\s+(?:"([^"]+)"|'([^']+)')\s*;?"#).unwrap()
});

static EXPORT_DEFAULT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^export default (.+);$").unwrap());

/// Inline font imports in `code`. Returns `None` when nothing matched.
pub fn inline_font_imports(plugin: &FontPlugin, code: &str, importer: &Path) -> Result<Option<String>> {
    if !code.contains("import") {
        return Ok(None);
    }

    let mut error = None;
    let mut changed = false;
    let rewritten = DEFAULT_IMPORT.replace_all(code, |caps: &Captures| {
        if error.is_some() {
            return caps[0].to_string();
        }
        let specifier = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
        match load_font_module(plugin, specifier, importer) {
            Ok(Some(value)) => {
                changed = true;
                format!("const {} = {};", &caps[1], value)
            }
            Ok(None) => caps[0].to_string(),
            Err(err) => {
                error = Some(err);
                caps[0].to_string()
            }
        }
    });

    if let Some(err) = error {
        return Err(err);
    }
    Ok(changed.then(|| rewritten.into_owned()))
}

/// `resolve_id` + `load`, returning the default export expression.
fn load_font_module(plugin: &FontPlugin, specifier: &str, importer: &Path) -> Result<Option<String>> {
    let Some(id) = plugin.resolve_id(specifier, Some(importer))? else {
        return Ok(None);
    };
    let Some(module) = plugin.load(&id)? else {
        return Ok(None);
    };
    Ok(EXPORT_DEFAULT
        .captures(module.trim())
        .map(|caps| caps[1].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::{CountingSubsetter, FontDeclaration, SubsetCompressor};
    use crate::host::AliasResolver;
    use crate::plugin::{FontOptions, HostBindings, Mode, PluginEnv};
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_inline_font_imports() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("src/fonts")).unwrap();
        fs::write(root.join("src/fonts/a.woff"), "font").unwrap();

        let options = FontOptions {
            declarations: vec![FontDeclaration::new("./src/fonts/a.woff", "ab")],
            ..FontOptions::default()
        };
        let mut plugin = FontPlugin::new(
            options,
            SubsetCompressor::new(Arc::new(CountingSubsetter::default())),
        );
        let env = PluginEnv {
            root: root.clone(),
            public_dir: root.join("public"),
            out_dir: root.join("dist"),
            assets_dir: "assets".into(),
            cache_dir: root.join(".fontcut"),
            mode: Mode::Serve,
        };
        plugin
            .config_resolved(env, HostBindings::serve(Arc::new(AliasResolver::new(&root, Vec::new()))))
            .unwrap();
        plugin.build_start().unwrap();

        let code = "import font from './fonts/a.woff';\nimport { x } from './x.js';\nimport vue from 'vue';\n";
        let out = inline_font_imports(&plugin, code, &root.join("src/main.ts"))
            .unwrap()
            .unwrap();

        let mut lines = out.lines();
        let first = lines.next().unwrap();
        assert!(first.starts_with("const font = \"/.fontcut/fonts/a-"));
        assert!(first.ends_with(".woff\";"));
        assert_eq!(lines.next(), Some("import { x } from './x.js';"));
        assert_eq!(lines.next(), Some("import vue from 'vue';"));
    }

    #[test]
    fn test_export_default_pattern() {
        let caps = EXPORT_DEFAULT.captures("export default \"/a.woff\";").unwrap();
        assert_eq!(&caps[1], "\"/a.woff\"");
    }
}
