//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Vela static site generator CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Output directory path (relative to project root)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file name (default: vela.toml)
    #[arg(short = 'C', long, default_value = "vela.toml")]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Shared arguments for Generate and Dev
#[derive(clap::Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Remove stale files from the output directory after a successful render
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub clean: Option<bool>,

    /// Minify the generated html, css and js
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub minify: Option<bool>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create a starter site
    Init {
        /// the name(path) of site directory, related to `root`
        name: Option<PathBuf>,
    },

    /// Render every page into the output directory
    Generate {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Build, serve the output, rebuild on change and reload the browser
    Dev {
        #[command(flatten)]
        build_args: BuildArgs,

        /// Interface to bind on
        #[arg(short, long)]
        interface: Option<String>,

        /// HTTP port
        #[arg(short, long)]
        port: Option<u16>,

        /// WebSocket port for reload notifications
        #[arg(long)]
        reload_port: Option<u16>,

        /// enable watch
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        watch: Option<bool>,
    },
}

impl Cli {
    pub const fn is_init(&self) -> bool {
        matches!(self.command, Commands::Init { .. })
    }

    pub const fn is_dev(&self) -> bool {
        matches!(self.command, Commands::Dev { .. })
    }

    pub fn build_args(&self) -> Option<&BuildArgs> {
        match &self.command {
            Commands::Generate { build_args } | Commands::Dev { build_args, .. } => Some(build_args),
            Commands::Init { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate() {
        let cli = Cli::parse_from(["vela", "generate", "--minify", "false"]);
        assert!(!cli.is_dev());
        assert_eq!(cli.build_args().and_then(|a| a.minify), Some(false));
        assert_eq!(cli.config, PathBuf::from("vela.toml"));
    }

    #[test]
    fn test_parse_dev_flags() {
        let cli = Cli::parse_from([
            "vela", "--root", "site", "dev", "--port", "3000", "--reload-port", "3001", "--watch",
        ]);
        assert!(cli.is_dev());
        assert_eq!(cli.root, Some(PathBuf::from("site")));
        let Commands::Dev { port, reload_port, watch, .. } = cli.command else {
            panic!("expected dev command");
        };
        assert_eq!(port, Some(3000));
        assert_eq!(reload_port, Some(3001));
        assert_eq!(watch, Some(true));
    }

    #[test]
    fn test_parse_init() {
        let cli = Cli::parse_from(["vela", "init", "blog"]);
        assert!(cli.is_init());
        assert!(cli.build_args().is_none());
    }
}
