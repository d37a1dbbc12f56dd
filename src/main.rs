//! Vela - A static site generator for single-file components.

mod assets;
mod build;
mod cli;
mod compiler;
mod component;
mod config;
mod init;
mod logger;
mod reload;
mod render;
mod serve;
mod utils;
mod watch;

use anyhow::Result;
use build::{BuildMode, build_site};
use clap::Parser;
use cli::{Cli, Commands};
use config::SiteConfig;
use init::new_site;
use serve::serve_site;
use std::sync::Arc;

fn main() {
    if let Err(err) = run() {
        log!("error"; "{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = SiteConfig::load(&cli)?;
    config.validate(&cli)?;

    match &cli.command {
        Commands::Init { name } => new_site(&config, name.is_some()),
        Commands::Generate { .. } => {
            build_site(&config, BuildMode::Generate)?;
            Ok(())
        }
        Commands::Dev { .. } => serve_site(Arc::new(config)),
    }
}
