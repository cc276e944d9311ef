//! fontcut - subset web fonts down to the characters a site actually uses.

mod cli;
mod config;
mod font;
mod host;
mod logger;
mod plugin;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::FontcutConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = FontcutConfig::load(&cli)?;

    let report = match &cli.command {
        Commands::Build { .. } => cli::build::build_project(&config)?,
        Commands::Serve { .. } => cli::serve::serve_project(&config)?,
    };
    debug!("fonts"; "{}", report);
    Ok(())
}
