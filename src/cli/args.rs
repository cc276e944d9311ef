//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Subset web fonts down to the characters a site actually uses
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: fontcut.toml)
    #[arg(short = 'C', long, default_value = "fontcut.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build the project for production
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        build_args: BuildArgs,

        /// Output directory path (relative to project root)
        #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
        output: Option<PathBuf>,
    },

    /// Start the development server
    #[command(visible_alias = "s")]
    Serve {
        #[command(flatten)]
        build_args: BuildArgs,

        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<std::net::IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
}

/// Shared arguments for Build and Serve commands
#[derive(clap::Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Clean the output / scratch directory completely first
    #[arg(short, long)]
    pub clean: bool,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

impl Cli {
    pub const fn build_args(&self) -> &BuildArgs {
        match &self.command {
            Commands::Build { build_args, .. } | Commands::Serve { build_args, .. } => build_args,
        }
    }

    pub const fn is_serve(&self) -> bool {
        matches!(self.command, Commands::Serve { .. })
    }
}
