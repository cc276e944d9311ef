//! Development server.
//!
//! Fonts are subset eagerly the first time a stylesheet or script refers to
//! them and served from the scratch directory. Stylesheets and scripts are
//! rewritten on every request; everything else is served from disk.

mod lifecycle;
mod path;
mod response;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tiny_http::{Request, Server};

use crate::{
    config::FontcutConfig,
    debug,
    font::{SubsetCompressor, Subsetter},
    host::{AliasResolver, SourceKind, inline_font_imports},
    log,
    logger::clear_screen,
    plugin::{BuildReport, FontPlugin, HostBindings, Mode},
    utils::mime::types,
};

/// Run the dev server until Ctrl+C, then print the session report.
pub fn serve_project(config: &FontcutConfig) -> Result<BuildReport> {
    let subsetter = config.fonts.subsetter();
    if !subsetter.is_available() {
        log!(
            "warning";
            "`{}` not found, fonts will be served uncompressed",
            subsetter.command().join(" ")
        );
    }
    let plugin = start_plugin(config, Arc::new(subsetter))?;

    let (server, addr) = lifecycle::bind_with_retry(config.serve.address())?;
    let server = Arc::new(server);
    lifecycle::register_shutdown(Arc::clone(&server))?;

    if config.log.clear_screen {
        clear_screen();
    }
    log!("serve"; "http://{}", addr);
    debug!("serve"; "scratch dir {}", config.plugin_env(Mode::Serve).scratch_dir().display());

    run_request_loop(&server, config, &plugin)?;
    plugin.close_bundle()
}

/// Configure the plugin for serving and empty the scratch directory.
fn start_plugin(config: &FontcutConfig, subsetter: Arc<dyn Subsetter>) -> Result<FontPlugin> {
    let resolver = Arc::new(AliasResolver::new(config.get_root(), config.aliases()));
    let mut plugin = FontPlugin::new(config.plugin_options(), SubsetCompressor::new(subsetter));
    plugin.config_resolved(config.plugin_env(Mode::Serve), HostBindings::serve(resolver))?;
    plugin.build_start()?;
    Ok(plugin)
}

fn run_request_loop(server: &Server, config: &FontcutConfig, plugin: &FontPlugin) -> Result<()> {
    // requests run concurrently so one slow subset does not stall the page
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(4)
        .build()
        .context("failed to create request thread pool")?;

    pool.scope(|scope| {
        for request in server.incoming_requests() {
            scope.spawn(move |_| {
                if let Err(e) = handle_request(request, config, plugin) {
                    log!("serve"; "request error: {e}");
                }
            });
        }
    });
    Ok(())
}

/// What a request resolves to.
#[derive(Debug)]
enum Content {
    /// A source rewritten by the font plugin.
    Rewritten {
        content_type: &'static str,
        body: Vec<u8>,
    },
    File(PathBuf),
}

fn handle_request(request: Request, config: &FontcutConfig, plugin: &FontPlugin) -> Result<()> {
    let url = request.url().to_string();
    match lookup(&url, config, plugin) {
        Ok(Some(Content::Rewritten { content_type, body })) => {
            response::respond_content(request, content_type, body)
        }
        Ok(Some(Content::File(path))) => response::respond_file(request, &path),
        Ok(None) => {
            debug!("serve"; "404 {}", url);
            response::respond_not_found(request)
        }
        Err(e) => {
            log!("error"; "{}: {:#}", url, e);
            response::respond_error(request, &e)
        }
    }
}

/// Map `url` to content: scratch files under their own prefix, otherwise
/// the public dir first, then the source tree. Nothing else under the
/// project root is served.
fn lookup(url: &str, config: &FontcutConfig, plugin: &FontPlugin) -> Result<Option<Content>> {
    let env = config.plugin_env(Mode::Serve);
    if let Some(file) = url.strip_prefix(&env.scratch_url("")) {
        let scratch = env.scratch_dir();
        return Ok(path::resolve_in(file, &[scratch.as_path()]).map(Content::File));
    }

    let project = &config.project;
    let roots = [project.public.as_path(), project.source.as_path()];
    let Some(path) = path::resolve_in(url, &roots) else {
        return Ok(None);
    };
    if path.starts_with(&project.public) {
        return Ok(Some(Content::File(path)));
    }

    match SourceKind::of(&path) {
        SourceKind::Style => rewrite(&path, types::CSS, |code| {
            Ok(plugin.transform(code, &path)?.map(|out| out.code))
        }),
        SourceKind::Script => rewrite(&path, types::JAVASCRIPT, |code| {
            inline_font_imports(plugin, code, &path)
        }),
        SourceKind::Other => Ok(Some(Content::File(path))),
    }
}

fn rewrite(
    path: &Path,
    content_type: &'static str,
    f: impl FnOnce(&str) -> Result<Option<String>>,
) -> Result<Option<Content>> {
    let code = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read `{}`", path.display()))?;
    let body = f(&code)?.unwrap_or(code).into_bytes();
    Ok(Some(Content::Rewritten { content_type, body }))
}
