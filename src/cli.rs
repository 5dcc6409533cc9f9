//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Kiln static site generator CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Config file name (relative to the project root)
    #[arg(short = 'C', long, default_value = "config.yml")]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create a starter site
    Init {
        /// the name(path) of site directory, related to `root`
        name: Option<PathBuf>,
    },

    /// Deletes the output directory if there is one and rebuilds the site
    Build,

    /// Serve the site. Rebuild and reload on change automatically
    Serve {
        /// Open the site in the default browser
        #[arg(long)]
        open: bool,
    },

    /// Manage themes under `themes/`
    Theme {
        #[command(subcommand)]
        action: ThemeAction,
    },
}

/// `theme` subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ThemeAction {
    /// Clone a theme repository into `themes/<name>`
    Add { url: String },

    /// Delete `themes/<name>`
    Remove {
        /// Theme name, or the URL it was added from
        name: String,
    },

    /// Replace an installed theme with a fresh clone
    Update { url: String },
}
