//! Kiln - A static site generator for Markdown content and themes.

mod build;
mod cli;
mod compiler;
mod config;
mod hub;
mod init;
mod logger;
mod reload;
mod serve;
mod theme;
mod utils;
mod watch;

use anyhow::{Context, Result};
use build::build_site;
use clap::Parser;
use cli::{Cli, Commands, ThemeAction};
use config::SiteConfig;
use init::new_site;
use serve::serve_site;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Init { name } => {
            let root = match name {
                Some(name) => cli.root.join(name),
                None => cli.root.clone(),
            };
            new_site(&root)?;
            log!("init"; "created site at {}", root.display());
            Ok(())
        }
        Commands::Build => {
            let config = load_config(&cli)?;
            build_site(&config)?;
            Ok(())
        }
        Commands::Serve { open } => serve_site(load_config(&cli)?, *open),
        Commands::Theme { action } => {
            match action {
                ThemeAction::Add { url } => theme::add_theme(&cli.root, url)?,
                ThemeAction::Remove { name } => theme::remove_theme(&cli.root, name)?,
                ThemeAction::Update { url } => theme::update_theme(&cli.root, url)?,
            };
            Ok(())
        }
    }
}

/// Load and validate configuration from CLI arguments
fn load_config(cli: &Cli) -> Result<SiteConfig> {
    SiteConfig::load(&cli.root, &cli.config)
        .with_context(|| format!("Failed to load `{}`", cli.config.display()))
}
