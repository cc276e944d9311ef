//! Font plugin: runs the font pipeline inside a host build tool.
//!
//! The host calls the hooks in this order:
//!
//! ```text
//! config_resolved → build_start → (resolve_id | load | transform)*
//!                 → generate_bundle (build only) → close_bundle
//! ```
//!
//! In serve mode a font is subsetted the first time a source asks for it and
//! written to the scratch directory. In build mode the original bytes are
//! emitted under the hashed name; `generate_bundle` then matches each emitted
//! output back to its declaration and subsets it in place before the host
//! writes it. Fonts under the public directory never enter the bundle: they
//! are subsetted over the host's verbatim copy in `close_bundle`.

mod host;
mod phase;
mod report;
mod sourcemap;

pub use host::{AssetEmitter, HostBindings, ModuleResolver};
pub use phase::{Phase, PhaseError};
pub use report::BuildReport;

use phase::PhaseTracker;

use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::font::{
    AssetGuard, FontAsset, FontDeclaration, FontError, FontFormat, FontRegistry, Lifecycle,
    OutputHandle, PathResolver, SubsetCompressor, extract,
};
use crate::utils::path::slash_path;
use crate::{debug, log};

/// Prefix marking a font module id produced by [`FontPlugin::resolve_id`].
pub const VIRTUAL_PREFIX: char = '\0';

/// Importers that can `import` a font file.
const JS_EXTENSIONS: &[&str] = &["js", "ts", "jsx", "tsx", "mjs", "mts", "cjs", "cts"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Development server: eager subsetting into the scratch dir.
    Serve,
    /// Production build: deferred subsetting of emitted outputs.
    Build,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Serve => "serve",
            Self::Build => "build",
        })
    }
}

/// Directories resolved by the host.
#[derive(Debug, Clone)]
pub struct PluginEnv {
    pub root: PathBuf,
    pub public_dir: PathBuf,
    pub out_dir: PathBuf,
    /// Hashed-asset directory inside `out_dir`, `/`-separated.
    pub assets_dir: String,
    pub cache_dir: PathBuf,
    pub mode: Mode,
}

impl PluginEnv {
    pub fn scratch_dir(&self) -> PathBuf {
        self.cache_dir.join("fonts")
    }

    /// URL a scratch file is served under (`/<cache>/fonts/<file>`).
    pub fn scratch_url(&self, file_name: &str) -> String {
        let scratch = self.scratch_dir();
        let base = scratch
            .strip_prefix(&self.root)
            .map(slash_path)
            .unwrap_or_else(|_| "@fonts".to_string());
        format!("/{base}/{file_name}")
    }
}

/// Plugin options, usually taken from `[fonts]`.
#[derive(Debug, Clone, Default)]
pub struct FontOptions {
    pub declarations: Vec<FontDeclaration>,
    /// Global default output format.
    pub format: Option<FontFormat>,
    pub source_map: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub code: String,
    /// Source map JSON, when enabled.
    pub map: Option<String>,
}

struct Session {
    env: PluginEnv,
    paths: PathResolver,
    host: HostBindings,
    not_found: Vec<PathBuf>,
}

pub struct FontPlugin {
    options: FontOptions,
    compressor: SubsetCompressor,
    registry: FontRegistry,
    phases: PhaseTracker,
    session: Option<Session>,
}

impl FontPlugin {
    pub fn new(options: FontOptions, compressor: SubsetCompressor) -> Self {
        Self {
            options,
            compressor,
            registry: FontRegistry::new(),
            phases: PhaseTracker::new(),
            session: None,
        }
    }

    pub fn registry(&self) -> &FontRegistry {
        &self.registry
    }

    pub fn phase(&self) -> Phase {
        self.phases.current()
    }

    // ========================================================================
    // hooks
    // ========================================================================

    /// Resolve directories and register every declaration.
    ///
    /// A missing project root is the only fatal error. Missing font files
    /// are reported and skipped.
    pub fn config_resolved(&mut self, env: PluginEnv, host: HostBindings) -> Result<()> {
        self.phases.enter(Phase::Configuring, env.mode)?;

        if !env.root.is_dir() {
            return Err(FontError::Configuration(format!(
                "project root `{}` does not exist",
                env.root.display()
            ))
            .into());
        }
        if env.mode == Mode::Build && host.emitter.is_none() {
            return Err(FontError::Configuration("build mode needs an asset emitter".into()).into());
        }

        let paths = PathResolver::new(&env.root, &env.public_dir);
        let registration =
            self.registry
                .register_declarations(&self.options.declarations, &paths, self.options.format);

        for dup in &registration.duplicates {
            log!("hint"; "`{}` resolves to an already declared font, ignored", dup);
        }
        let not_found = registration
            .errors
            .into_iter()
            .filter_map(|err| match err {
                FontError::AssetNotFound(path) => Some(path),
                _ => None,
            })
            .collect();

        debug!(
            "fonts";
            "{} of {} declared fonts registered",
            registration.candidates.len(),
            self.options.declarations.len()
        );

        self.session = Some(Session {
            env,
            paths,
            host,
            not_found,
        });
        Ok(())
    }

    /// Empty the scratch directory.
    pub fn build_start(&self) -> Result<()> {
        let session = self.session()?;
        self.phases.enter(Phase::Scanning, session.env.mode)?;

        let scratch = session.env.scratch_dir();
        if scratch.exists() {
            fs::remove_dir_all(&scratch)
                .with_context(|| format!("failed to empty `{}`", scratch.display()))?;
        }
        fs::create_dir_all(&scratch)
            .with_context(|| format!("failed to create `{}`", scratch.display()))?;
        Ok(())
    }

    /// Turn a declared font imported from a script into a virtual module id.
    ///
    /// Public-dir fonts are left to the host: they are never bundled.
    pub fn resolve_id(&self, specifier: &str, importer: Option<&Path>) -> Result<Option<String>> {
        let session = self.session()?;
        self.phases.enter(Phase::Scanning, session.env.mode)?;

        let Some(importer) = importer.filter(|i| is_script(i)) else {
            return Ok(None);
        };
        let Some(resolved) =
            session
                .paths
                .resolve_reference(specifier, importer, session.host.modules.as_ref())
        else {
            return Ok(None);
        };
        let Some(asset) = self.registry.get(&resolved.path) else {
            return Ok(None);
        };
        if asset.under_static_dir() {
            asset.lock().mark_referenced();
            debug!("fonts"; "{} is a public font, not bundled", asset.display_name());
            return Ok(None);
        }

        Ok(Some(format!("{VIRTUAL_PREFIX}{}", asset.path().display())))
    }

    /// Load a virtual font module: `export default "<url>";`.
    pub fn load(&self, id: &str) -> Result<Option<String>> {
        let session = self.session()?;
        let Some(path) = id.strip_prefix(VIRTUAL_PREFIX) else {
            return Ok(None);
        };
        let Some(asset) = self.registry.get(Path::new(path)) else {
            return Ok(None);
        };

        let phase = match session.env.mode {
            Mode::Serve => Phase::LoadingEager,
            Mode::Build => Phase::Scanning,
        };
        self.phases.enter(phase, session.env.mode)?;

        let Some(url) = self.materialize(session, &asset)? else {
            return Ok(None);
        };
        Ok(Some(format!("export default {};", serde_json::to_string(&url)?)))
    }

    /// Rewrite declared font URLs inside `@font-face` blocks.
    pub fn transform(&self, code: &str, id: &Path) -> Result<Option<TransformOutput>> {
        let session = self.session()?;
        self.phases.enter(Phase::Scanning, session.env.mode)?;

        let references = extract::extract_unique(code);
        if references.is_empty() {
            return Ok(None);
        }

        let mut replacements = rustc_hash::FxHashMap::default();
        for reference in references {
            let Some(resolved) =
                session
                    .paths
                    .resolve_reference(&reference, id, session.host.modules.as_ref())
            else {
                continue;
            };
            let Some(asset) = self.registry.get(&resolved.path) else {
                continue;
            };

            let url = if asset.under_static_dir() {
                asset.lock().mark_referenced();
                public_url(&reference, &asset, session.env.mode)
            } else {
                self.materialize(session, &asset)?
            };
            if let Some(url) = url.filter(|u| *u != reference) {
                debug!("fonts"; "{} -> {}", reference, url);
                replacements.insert(reference, url);
            }
        }

        let Some(code_out) = extract::rewrite_references(code, |url| replacements.get(url).cloned())
        else {
            return Ok(None);
        };
        let map = self
            .options
            .source_map
            .then(|| sourcemap::line_map(&slash_path(id), code, &code_out));

        Ok(Some(TransformOutput {
            code: code_out,
            map,
        }))
    }

    /// Match emitted outputs back to declarations and subset them in place.
    ///
    /// Matching walks `outputs` in order so ties between identical twins are
    /// settled the same way on every run; only the subsetting is parallel.
    pub fn generate_bundle(&self, outputs: &[OutputHandle]) -> Result<()> {
        let session = self.session()?;
        self.phases.enter(Phase::BundleGenerating, session.env.mode)?;

        let matched: Vec<_> = outputs
            .iter()
            .filter(|output| is_font_file(output.file_name()))
            .filter_map(|output| {
                let asset = self.registry.match_output(output);
                if asset.is_none() {
                    debug!("fonts"; "{} is not a declared font", output.file_name());
                }
                asset
            })
            .collect();

        matched.par_iter().for_each(|asset| {
            let mut guard = asset.lock();
            self.compress_matched(asset, &mut guard);
        });
        Ok(())
    }

    /// Subset public-dir fonts over their verbatim copies, then report.
    pub fn close_bundle(&self) -> Result<BuildReport> {
        let session = self.session()?;
        self.phases.enter(Phase::Finalizing, session.env.mode)?;

        if session.env.mode == Mode::Build {
            self.finalize_public_fonts(&session.env)?;
        }

        let report = BuildReport::collect(&self.registry, &session.not_found);
        report.log();
        Ok(report)
    }

    // ========================================================================
    // internals
    // ========================================================================

    fn session(&self) -> Result<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| anyhow!("font plugin used before config_resolved"))
    }

    /// URL of a bundled font for the current mode, `None` when the font can
    /// not be read (the reference is then left alone).
    fn materialize(&self, session: &Session, asset: &FontAsset) -> Result<Option<String>> {
        let mut guard = asset.lock();
        guard.mark_referenced();

        match session.env.mode {
            Mode::Build => {
                if let Some(file) = guard.emitted() {
                    return Ok(Some(format!("/{file}")));
                }
                let Some(source) = read_font(asset, &mut guard) else {
                    return Ok(None);
                };
                let emitter = session
                    .host
                    .emitter
                    .as_ref()
                    .ok_or_else(|| anyhow!("no asset emitter in build mode"))?;
                let file = emitter.emit_asset(&asset.static_name(), source);
                debug!("fonts"; "emitted {} as {}", asset.display_name(), file);
                guard.set_emitted(file.clone());
                Ok(Some(format!("/{file}")))
            }
            Mode::Serve => {
                let file_name = asset.scratch_name();
                if guard.scratch().is_some() {
                    return Ok(Some(session.env.scratch_url(&file_name)));
                }
                if guard.failure().is_some() {
                    return Ok(None);
                }
                let Some(source) = read_font(asset, &mut guard) else {
                    return Ok(None);
                };

                let handle = OutputHandle::new(file_name.clone(), source);
                guard.attach_output(handle.clone())?;
                self.compress_matched(asset, &mut guard);

                let target = session.env.scratch_dir().join(&file_name);
                fs::create_dir_all(session.env.scratch_dir())?;
                handle
                    .with_source(|bytes| fs::write(&target, bytes))
                    .with_context(|| format!("failed to write `{}`", target.display()))?;
                guard.set_scratch(target);
                Ok(Some(session.env.scratch_url(&file_name)))
            }
        }
    }

    /// `Matched -> Compressed`, rewriting the attached output once.
    ///
    /// Runs under the record's guard, so concurrent attempts on one record
    /// compress at most once. Failures leave the original bytes in place.
    fn compress_matched(&self, asset: &FontAsset, guard: &mut AssetGuard<'_>) {
        if guard.lifecycle() != Lifecycle::Matched {
            return;
        }
        let Some(output) = guard.output().cloned() else {
            return;
        };

        let result = output
            .with_source(|bytes| {
                self.compressor.compress(
                    &asset.display_name(),
                    bytes,
                    asset.text(),
                    asset.format(),
                    asset.path(),
                )
            })
            .and_then(|compressed| {
                let size = compressed.bytes.len();
                output.write_once(compressed.bytes)?;
                guard.mark_compressed(compressed.format, size)?;
                Ok(compressed.format)
            });

        match result {
            Ok(format) if format != asset.format() => log!(
                "warning";
                "{} was subsetted to {} but is emitted as {}",
                asset.display_name(),
                format,
                output.file_name()
            ),
            Ok(_) => debug!("fonts"; "compressed {}", asset.display_name()),
            Err(err) => {
                log!("warning"; "{}", err);
                guard.record_failure(err);
            }
        }
    }

    /// Read-compress-write each referenced public font next to the host's
    /// verbatim copy, removing the copy when the extension changed.
    ///
    /// Sources already point at the output name, so a font that fails to
    /// subset is written there unmodified. Unreferenced fonts keep the copy.
    fn finalize_public_fonts(&self, env: &PluginEnv) -> Result<()> {
        let assets: Vec<_> = self
            .registry
            .assets()
            .into_iter()
            .filter(|a| a.under_static_dir())
            .collect();

        assets.par_iter().try_for_each(|asset| -> Result<()> {
            let Ok(relative) = asset.path().strip_prefix(&env.public_dir) else {
                return Ok(());
            };
            let naive = env.out_dir.join(relative);
            let target = naive.with_file_name(asset.static_name());

            let mut guard = asset.lock();
            if guard.is_finalized() {
                return Ok(());
            }
            if !guard.is_referenced() {
                debug!("fonts"; "{} is never referenced, left as copied", asset.display_name());
                return Ok(());
            }
            let Some(source) = read_font(asset, &mut guard) else {
                return Ok(());
            };

            let compressed = match self.compressor.compress(
                &asset.display_name(),
                &source,
                asset.text(),
                asset.format(),
                asset.path(),
            ) {
                Ok(compressed) => Some(compressed),
                Err(err) => {
                    log!("warning"; "{}", err);
                    guard.record_failure(err);
                    None
                }
            };

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let bytes = compressed.as_ref().map_or(source.as_slice(), |c| c.bytes.as_slice());
            fs::write(&target, bytes)
                .with_context(|| format!("failed to write `{}`", target.display()))?;
            if target != naive && naive.exists() {
                fs::remove_file(&naive)
                    .with_context(|| format!("failed to remove `{}`", naive.display()))?;
            }
            let Some(compressed) = compressed else {
                return Ok(());
            };
            if compressed.format != asset.format() {
                log!(
                    "warning";
                    "{} was subsetted to {} but is written as {}",
                    asset.display_name(),
                    compressed.format,
                    asset.static_name()
                );
            }

            guard.mark_finalized(compressed.format, compressed.bytes.len())?;
            debug!("fonts"; "finalized {}", target.display());
            Ok(())
        })
    }
}

/// Read a font's original bytes, recording a vanished file as not found.
fn read_font(asset: &FontAsset, guard: &mut AssetGuard<'_>) -> Option<Vec<u8>> {
    match fs::read(asset.path()) {
        Ok(bytes) => Some(bytes),
        Err(_) => {
            let err = FontError::AssetNotFound(asset.path().to_path_buf());
            log!("warning"; "{}", err);
            guard.record_failure(err);
            None
        }
    }
}

/// Public fonts keep their directory and name; only the extension follows
/// the output format. Served verbatim in serve mode.
fn public_url(reference: &str, asset: &FontAsset, mode: Mode) -> Option<String> {
    if mode == Mode::Serve {
        return None;
    }
    let end = reference.find(['?', '#']).unwrap_or(reference.len());
    let (path, suffix) = reference.split_at(end);
    let dir_end = path.rfind('/').map_or(0, |i| i + 1);
    Some(format!("{}{}{}", &path[..dir_end], asset.static_name(), suffix))
}

fn is_script(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| JS_EXTENSIONS.contains(&ext))
}

fn is_font_file(file_name: &str) -> bool {
    FontFormat::from_path(Path::new(file_name)).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::{CountingSubsetter, Fingerprint};
    use crate::host::{AliasResolver, OutputBundle};
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    const FONT: &[u8] = b"pretend this is a large woff font with many glyphs";

    struct Fixture {
        _dir: TempDir,
        root: PathBuf,
        subsetter: Arc<CountingSubsetter>,
        bundle: Arc<OutputBundle>,
        plugin: FontPlugin,
    }

    fn fixture(mode: Mode, declarations: Vec<FontDeclaration>) -> Fixture {
        fixture_with(mode, declarations, &[])
    }

    /// `files` are written (relative to the root) before declarations are
    /// registered.
    fn fixture_with(
        mode: Mode,
        declarations: Vec<FontDeclaration>,
        files: &[(&str, &[u8])],
    ) -> Fixture {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("src/fonts")).unwrap();
        fs::create_dir_all(root.join("public/fonts")).unwrap();
        fs::create_dir_all(root.join("dist/fonts")).unwrap();
        fs::write(root.join("src/fonts/a.woff"), FONT).unwrap();
        fs::write(root.join("public/fonts/b.ttf"), FONT).unwrap();
        fs::write(root.join("dist/fonts/b.ttf"), FONT).unwrap();
        for (path, content) in files {
            let path = root.join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }

        let subsetter = Arc::new(CountingSubsetter::default());
        let bundle = Arc::new(OutputBundle::new("assets"));
        let modules = Arc::new(AliasResolver::new(&root, Vec::new()));
        let host = match mode {
            Mode::Serve => HostBindings::serve(modules),
            Mode::Build => HostBindings::build(modules, bundle.clone()),
        };

        let options = FontOptions {
            declarations,
            format: None,
            source_map: false,
        };
        let mut plugin = FontPlugin::new(options, SubsetCompressor::new(subsetter.clone()));
        let env = PluginEnv {
            root: root.clone(),
            public_dir: root.join("public"),
            out_dir: root.join("dist"),
            assets_dir: "assets".into(),
            cache_dir: root.join(".fontcut"),
            mode,
        };
        plugin.config_resolved(env, host).unwrap();
        plugin.build_start().unwrap();

        Fixture {
            _dir: dir,
            root,
            subsetter,
            bundle,
            plugin,
        }
    }

    fn declared() -> Vec<FontDeclaration> {
        vec![
            FontDeclaration::new("./src/fonts/a.woff", "ab"),
            FontDeclaration::new("/fonts/b.ttf", "xy").with_format(FontFormat::Woff2),
        ]
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let mut plugin = FontPlugin::new(FontOptions::default(), SubsetCompressor::default());
        let env = PluginEnv {
            root: PathBuf::from("/definitely/not/here"),
            public_dir: PathBuf::from("/definitely/not/here/public"),
            out_dir: PathBuf::from("/definitely/not/here/dist"),
            assets_dir: "assets".into(),
            cache_dir: PathBuf::from("/definitely/not/here/.fontcut"),
            mode: Mode::Serve,
        };
        let err = plugin
            .config_resolved(env, HostBindings::serve(Arc::new(crate::font::NoResolver)))
            .unwrap_err();
        assert!(err.downcast_ref::<FontError>().is_some_and(FontError::is_fatal));
    }

    #[test]
    fn test_hooks_before_config_fail() {
        let plugin = FontPlugin::new(FontOptions::default(), SubsetCompressor::default());
        assert!(plugin.build_start().is_err());
    }

    #[test]
    fn test_build_start_empties_scratch() {
        let fx = fixture(Mode::Serve, declared());
        let stale = fx.root.join(".fontcut/fonts/stale.woff");
        fs::write(&stale, "old").unwrap();
        fx.plugin.build_start().unwrap();
        assert!(!stale.exists());
        assert!(fx.root.join(".fontcut/fonts").is_dir());
    }

    #[test]
    fn test_serve_transform_compresses_eagerly() {
        let fx = fixture(Mode::Serve, declared());
        let css = "@font-face { font-family: A; src: url('./fonts/a.woff'); }";
        let out = fx
            .plugin
            .transform(css, &fx.root.join("src/style.css"))
            .unwrap()
            .unwrap();

        let asset = fx.plugin.registry().get(&fx.root.join("src/fonts/a.woff")).unwrap();
        let file = asset.scratch_name();
        assert_eq!(
            out.code,
            format!("@font-face {{ font-family: A; src: url('/.fontcut/fonts/{file}'); }}")
        );
        assert!(out.map.is_none());
        assert_eq!(asset.lock().lifecycle(), Lifecycle::Compressed);
        assert_eq!(fs::read(fx.root.join(".fontcut/fonts").join(&file)).unwrap(), b"woff:ab");
    }

    #[test]
    fn test_transform_resolves_bare_stylesheet_url() {
        let fx = fixture(Mode::Serve, declared());
        let css = "@font-face { src: url(fonts/a.woff); }";
        let out = fx.plugin.transform(css, &fx.root.join("src/style.css")).unwrap().unwrap();

        let asset = fx.plugin.registry().get(&fx.root.join("src/fonts/a.woff")).unwrap();
        assert_eq!(
            out.code,
            format!("@font-face {{ src: url(/.fontcut/fonts/{}); }}", asset.scratch_name())
        );
        assert!(asset.lock().is_referenced());
    }

    #[test]
    fn test_serve_leaves_public_fonts_alone() {
        let fx = fixture(Mode::Serve, declared());
        let css = "@font-face { src: url(/fonts/b.ttf); }";
        assert!(fx.plugin.transform(css, &fx.root.join("src/style.css")).unwrap().is_none());
        assert_eq!(fx.subsetter.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_serve_twins_get_their_own_scratch_files() {
        let fx = fixture_with(
            Mode::Serve,
            vec![
                FontDeclaration::new("./src/fonts/a.woff", "ab"),
                FontDeclaration::new("./src/other/a.woff", "xy"),
            ],
            &[("src/other/a.woff", FONT)],
        );
        let css = "@font-face { src: url(./a.woff); }";
        let first = fx.plugin.transform(css, &fx.root.join("src/fonts/a.css")).unwrap().unwrap();
        let second = fx.plugin.transform(css, &fx.root.join("src/other/b.css")).unwrap().unwrap();
        assert_ne!(first.code, second.code);

        let scratch = fx.root.join(".fontcut/fonts");
        let a = fx.plugin.registry().get(&fx.root.join("src/fonts/a.woff")).unwrap();
        let b = fx.plugin.registry().get(&fx.root.join("src/other/a.woff")).unwrap();
        assert_eq!(fs::read(scratch.join(a.scratch_name())).unwrap(), b"woff:ab");
        assert_eq!(fs::read(scratch.join(b.scratch_name())).unwrap(), b"woff:xy");
    }

    #[test]
    fn test_concurrent_loads_compress_once() {
        let fx = fixture(Mode::Serve, declared());
        let importer = fx.root.join("src/main.ts");
        let id = fx
            .plugin
            .resolve_id("./fonts/a.woff", Some(&importer))
            .unwrap()
            .unwrap();
        assert!(id.starts_with(VIRTUAL_PREFIX));

        let modules: Vec<String> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|_| s.spawn(|| fx.plugin.load(&id).unwrap().unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(fx.subsetter.calls.load(Ordering::SeqCst), 1);
        assert!(modules.windows(2).all(|w| w[0] == w[1]));
        assert!(modules[0].starts_with("export default \"/.fontcut/fonts/a-"));

        let asset = fx.plugin.registry().get(&fx.root.join("src/fonts/a.woff")).unwrap();
        let guard = asset.lock();
        assert_eq!(guard.lifecycle(), Lifecycle::Compressed);
        assert_eq!(guard.output().unwrap().source(), b"woff:ab");
    }

    #[test]
    fn test_resolve_id_only_from_scripts() {
        let fx = fixture(Mode::Serve, declared());
        let css = fx.root.join("src/style.css");
        let js = fx.root.join("src/main.js");
        assert!(fx.plugin.resolve_id("./fonts/a.woff", Some(&css)).unwrap().is_none());
        assert!(fx.plugin.resolve_id("./fonts/a.woff", None).unwrap().is_none());
        assert!(fx.plugin.resolve_id("./fonts/other.woff", Some(&js)).unwrap().is_none());
        // public fonts are never bundled
        assert!(fx.plugin.resolve_id("/fonts/b.ttf", Some(&js)).unwrap().is_none());
    }

    #[test]
    fn test_build_generate_bundle_compresses_once() {
        let fx = fixture(Mode::Build, declared());
        let css = "@font-face { src: url(\"./fonts/a.woff\") format('woff'); }";
        let out = fx
            .plugin
            .transform(css, &fx.root.join("src/style.css"))
            .unwrap()
            .unwrap();

        let hashed = format!("assets/a-{}.woff", Fingerprint::of(FONT).short());
        assert_eq!(
            out.code,
            format!("@font-face {{ src: url(\"/{hashed}\") format('woff'); }}")
        );
        // deferred: nothing compressed yet
        assert_eq!(fx.subsetter.calls.load(Ordering::SeqCst), 0);

        let outputs = fx.bundle.outputs();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].file_name(), hashed);

        // the same output offered many times is compressed exactly once
        let repeated: Vec<_> = std::iter::repeat_n(outputs[0].clone(), 8).collect();
        fx.plugin.generate_bundle(&repeated).unwrap();

        assert_eq!(fx.subsetter.calls.load(Ordering::SeqCst), 1);
        assert_eq!(outputs[0].source(), b"woff:ab");
        let asset = fx.plugin.registry().get(&fx.root.join("src/fonts/a.woff")).unwrap();
        assert_eq!(asset.lock().lifecycle(), Lifecycle::Compressed);
    }

    #[test]
    fn test_build_twins_matched_by_format_in_any_order() {
        let fx = fixture_with(
            Mode::Build,
            vec![
                FontDeclaration::new("./src/fonts/a.woff", "ab"),
                FontDeclaration::new("./src/other/a.woff", "xy").with_format(FontFormat::Woff2),
            ],
            &[("src/other/a.woff", FONT)],
        );
        let css = "@font-face { src: url(./fonts/a.woff); }\n@font-face { src: url(./other/a.woff); }";
        fx.plugin.transform(css, &fx.root.join("src/style.css")).unwrap().unwrap();

        let mut outputs = fx.bundle.outputs();
        assert_eq!(outputs.len(), 2);
        outputs.reverse();
        fx.plugin.generate_bundle(&outputs).unwrap();

        for output in &outputs {
            let expected: &[u8] = if output.file_name().ends_with(".woff2") {
                b"woff2:xy"
            } else {
                b"woff:ab"
            };
            assert_eq!(output.source(), expected, "{}", output.file_name());
        }
        let report = fx.plugin.close_bundle().unwrap();
        assert_eq!(report.compressed.len(), 2);
        assert!(report.ambiguous.is_empty());
    }

    #[test]
    fn test_build_public_font_finalized() {
        let fx = fixture(Mode::Build, declared());
        let css = "@font-face { src: url(/fonts/b.ttf?v=1); }";
        let out = fx
            .plugin
            .transform(css, &fx.root.join("src/style.css"))
            .unwrap()
            .unwrap();
        assert_eq!(out.code, "@font-face { src: url(/fonts/b.woff2?v=1); }");

        fx.plugin.generate_bundle(&fx.bundle.outputs()).unwrap();
        let asset = fx.plugin.registry().get(&fx.root.join("public/fonts/b.ttf")).unwrap();
        assert_eq!(asset.lock().lifecycle(), Lifecycle::Pending);

        let report = fx.plugin.close_bundle().unwrap();
        assert_eq!(fs::read(fx.root.join("dist/fonts/b.woff2")).unwrap(), b"woff2:xy");
        assert!(!fx.root.join("dist/fonts/b.ttf").exists());
        assert!(asset.lock().is_finalized());
        assert!(report.compressed.iter().any(|c| c.name == "b.ttf"));
        assert_eq!(report.unused, vec!["a.woff".to_string()]);
    }

    #[test]
    fn test_build_public_font_failure_still_lands_at_rewritten_url() {
        let fx = fixture_with(
            Mode::Build,
            vec![FontDeclaration::new("/fonts/bad.ttf", "xy").with_format(FontFormat::Woff2)],
            &[
                ("public/fonts/bad.ttf", &b"BROKEN ttf"[..]),
                ("dist/fonts/bad.ttf", &b"BROKEN ttf"[..]),
            ],
        );
        let css = "@font-face { src: url(/fonts/bad.ttf); }";
        let out = fx.plugin.transform(css, &fx.root.join("src/style.css")).unwrap().unwrap();
        assert_eq!(out.code, "@font-face { src: url(/fonts/bad.woff2); }");

        let report = fx.plugin.close_bundle().unwrap();
        assert_eq!(fs::read(fx.root.join("dist/fonts/bad.woff2")).unwrap(), b"BROKEN ttf");
        assert!(!fx.root.join("dist/fonts/bad.ttf").exists());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].name, "bad.ttf");
        assert!(report.compressed.is_empty());
    }

    #[test]
    fn test_build_unreferenced_public_font_is_unused() {
        let fx = fixture(Mode::Build, declared());
        let report = fx.plugin.close_bundle().unwrap();

        assert_eq!(fx.subsetter.calls.load(Ordering::SeqCst), 0);
        assert_eq!(fs::read(fx.root.join("dist/fonts/b.ttf")).unwrap(), FONT);
        assert!(!fx.root.join("dist/fonts/b.woff2").exists());
        assert!(report.compressed.is_empty());
        assert_eq!(report.unused, vec!["a.woff".to_string(), "b.ttf".to_string()]);
    }

    #[test]
    fn test_subset_failure_keeps_original_bytes() {
        let mut fx = fixture(Mode::Build, declared());
        fs::write(fx.root.join("src/fonts/broken.woff"), b"BROKEN font").unwrap();
        // fresh plugin with the broken font declared
        let options = FontOptions {
            declarations: vec![FontDeclaration::new("./src/fonts/broken.woff", "ab")],
            ..FontOptions::default()
        };
        fx.plugin = FontPlugin::new(options, SubsetCompressor::new(fx.subsetter.clone()));
        let env = PluginEnv {
            root: fx.root.clone(),
            public_dir: fx.root.join("public"),
            out_dir: fx.root.join("dist"),
            assets_dir: "assets".into(),
            cache_dir: fx.root.join(".fontcut"),
            mode: Mode::Build,
        };
        let bundle = Arc::new(OutputBundle::new("assets"));
        let modules = Arc::new(AliasResolver::new(&fx.root, Vec::new()));
        fx.plugin
            .config_resolved(env, HostBindings::build(modules, bundle.clone()))
            .unwrap();
        fx.plugin.build_start().unwrap();

        let css = "@font-face { src: url(./fonts/broken.woff); }";
        fx.plugin.transform(css, &fx.root.join("src/style.css")).unwrap();
        fx.plugin.generate_bundle(&bundle.outputs()).unwrap();
        let report = fx.plugin.close_bundle().unwrap();

        assert_eq!(bundle.outputs()[0].source(), b"BROKEN font");
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].name, "broken.woff");
    }

    #[test]
    fn test_source_map_when_enabled() {
        let mut fx = fixture(Mode::Serve, declared());
        fx.plugin.options.source_map = true;
        let css = "body {}\n@font-face { src: url(./fonts/a.woff); }\n";
        let out = fx
            .plugin
            .transform(css, &fx.root.join("src/style.css"))
            .unwrap()
            .unwrap();
        let map: serde_json::Value = serde_json::from_str(&out.map.unwrap()).unwrap();
        assert_eq!(map["mappings"], "AAAA;AACA");
    }

    #[test]
    fn test_hooks_after_close_are_rejected() {
        let fx = fixture(Mode::Build, declared());
        fx.plugin.close_bundle().unwrap();
        let css = "@font-face { src: url(./fonts/a.woff); }";
        let err = fx
            .plugin
            .transform(css, &fx.root.join("src/style.css"))
            .unwrap_err();
        assert!(err.downcast_ref::<PhaseError>().is_some());
    }

    #[test]
    fn test_public_url() {
        let asset = FontAsset::new(
            PathBuf::from("/site/public/fonts/b.ttf"),
            crate::font::AssetMeta {
                format: FontFormat::Woff2,
                ..crate::font::test_meta("x", true, b"b")
            },
        );
        assert_eq!(
            public_url("/fonts/b.ttf#iefix", &asset, Mode::Build).as_deref(),
            Some("/fonts/b.woff2#iefix")
        );
        assert_eq!(public_url("b.ttf", &asset, Mode::Build).as_deref(), Some("b.woff2"));
        assert!(public_url("/fonts/b.ttf", &asset, Mode::Serve).is_none());
    }
}
