//! Production build.
//!
//! Build pipeline phases:
//! - **Configure** - register font declarations with the plugin
//! - **Init** - empty the output dir, copy the public dir verbatim
//! - **Collect** - walk the source tree
//! - **Transform** - rewrite font URLs in styles and imports in scripts (parallel)
//! - **Bundle** - match emitted fonts back to declarations and subset them
//! - **Finalize** - subset public fonts over their copies, print the report

mod pipeline;

use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;

use crate::{
    config::FontcutConfig,
    font::{SubsetCompressor, Subsetter},
    host::{AliasResolver, OutputBundle},
    log,
    logger::ProgressLine,
    plugin::{BuildReport, FontPlugin, HostBindings, Mode},
    utils::plural_count,
};

/// Build the project with the configured subset command.
pub fn build_project(config: &FontcutConfig) -> Result<BuildReport> {
    let subsetter = config.fonts.subsetter();
    if !subsetter.is_available() {
        log!(
            "warning";
            "`{}` not found, declared fonts will be left uncompressed",
            subsetter.command().join(" ")
        );
    }
    build_with(config, Arc::new(subsetter), false)
}

/// Build the project with `subsetter`.
pub fn build_with(
    config: &FontcutConfig,
    subsetter: Arc<dyn Subsetter>,
    quiet: bool,
) -> Result<BuildReport> {
    let started = Instant::now();

    // Configure
    let bundle = Arc::new(OutputBundle::new(config.project.assets.as_str()));
    let resolver = Arc::new(AliasResolver::new(config.get_root(), config.aliases()));
    let mut plugin = FontPlugin::new(config.plugin_options(), SubsetCompressor::new(subsetter));
    plugin.config_resolved(
        config.plugin_env(Mode::Build),
        HostBindings::build(resolver, bundle.clone()),
    )?;

    // Init
    pipeline::prepare_output(config)?;
    let copied = pipeline::copy_public(config)?;
    plugin.build_start()?;

    // Collect + transform
    let files = pipeline::collect_sources(config, &plugin);
    let progress = (!quiet).then(|| {
        ProgressLine::new(&[
            ("css", files.styles.len()),
            ("js", files.scripts.len()),
            ("other", files.others.len()),
        ])
    });
    pipeline::process_sources(config, &plugin, &files, progress.as_ref())?;
    if let Some(p) = progress {
        p.finish();
    }

    // Bundle
    plugin.generate_bundle(&bundle.outputs())?;
    let emitted = bundle.write_to(&config.project.output)?;

    // Finalize
    let report = plugin.close_bundle()?;

    if !quiet {
        log!(
            "build";
            "{}, {} public, {} emitted to {} in {:.2?}",
            plural_count(files.len(), "source file"),
            plural_count(copied, "file"),
            plural_count(emitted, "asset"),
            config.root_relative(&config.project.output).display(),
            started.elapsed()
        );
    }
    Ok(report)
}
