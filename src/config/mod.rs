//! Site configuration management for `vela.toml`.
//!
//! # Sections
//!
//! | Section     | Purpose                                           |
//! |-------------|---------------------------------------------------|
//! | `[build]`   | Source directories, output, minification          |
//! | `[serve]`   | Development server, reload channel, file watching |
//!
//! # Example
//!
//! ```toml
//! [build]
//! pages = "pages"
//! components = "components"
//! output = "dist"
//! minify = true
//!
//! [serve]
//! port = 5277
//! ```
//!
//! The file is optional: a project without `vela.toml` builds with defaults.

mod build;
pub mod defaults;
mod error;
mod serve;

pub use build::BuildConfig;
pub use error::ConfigError;
pub use serve::ServeConfig;

use crate::cli::{Cli, Commands};
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Root configuration structure representing vela.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Development server settings
    #[serde(default)]
    pub serve: ServeConfig,
}

impl SiteConfig {
    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `vela.toml` under the CLI root (defaults if absent) and apply CLI overrides.
    pub fn load(cli: &Cli) -> Result<Self> {
        let root = cli.root.as_deref().unwrap_or(Path::new("./"));
        let config_path = root.join(&cli.config);

        let mut config = if config_path.is_file() {
            Self::from_path(&config_path)?
        } else {
            Self::default()
        };
        config.update_with_cli(cli);
        Ok(config)
    }

    pub fn get_root(&self) -> &Path {
        self.build.root.as_deref().unwrap_or(Path::new("./"))
    }

    pub fn set_root(&mut self, path: &Path) {
        self.build.root = Some(path.to_path_buf())
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        let root = match &cli.command {
            Commands::Init { name: Some(name) } => cli
                .root
                .clone()
                .unwrap_or_else(|| self.get_root().to_owned())
                .join(name),
            _ => cli
                .root
                .clone()
                .unwrap_or_else(|| self.get_root().to_owned()),
        };

        Self::update_option(&mut self.build.output, cli.output.as_ref());
        self.config_path = normalize_path(&root.join(&cli.config));
        self.resolve_paths(&root);

        if let Some(args) = cli.build_args() {
            Self::update_option(&mut self.build.minify, args.minify.as_ref());
            Self::update_option(&mut self.build.clean, args.clean.as_ref());
        }

        if let Commands::Dev {
            interface,
            port,
            reload_port,
            watch,
            ..
        } = &cli.command
        {
            Self::update_option(&mut self.serve.interface, interface.as_ref());
            Self::update_option(&mut self.serve.port, port.as_ref());
            Self::update_option(&mut self.serve.reload_port, reload_port.as_ref());
            Self::update_option(&mut self.serve.watch, watch.as_ref());
        }
    }

    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Make the root and every directory absolute, relative to `root`.
    pub fn resolve_paths(&mut self, root: &Path) {
        let root = normalize_path(root);
        let build = &mut self.build;
        build.pages = normalize_path(&root.join(&build.pages));
        build.components = normalize_path(&root.join(&build.components));
        build.assets = normalize_path(&root.join(&build.assets));
        build.output = normalize_path(&root.join(&build.output));
        self.set_root(&root);
    }

    /// Validate configuration for the current command
    pub fn validate(&self, cli: &Cli) -> Result<()> {
        if cli.is_init() {
            if self.config_path.exists() {
                bail!("Config file already exists. Remove it manually or init in a different path.");
            }
            return Ok(());
        }

        if !self.build.pages.is_dir() {
            bail!(ConfigError::Invalid {
                key: "build.pages",
                reason: format!("`{}` is not a directory", self.build.pages.display()),
            });
        }

        if self.build.extension.is_empty() || self.build.extension.starts_with('.') {
            bail!(ConfigError::Invalid {
                key: "build.extension",
                reason: "must be a bare extension such as \"vue\"".into(),
            });
        }

        if let Err(err) = self.build.style_filters() {
            bail!(ConfigError::Invalid {
                key: "build.styles",
                reason: format!("contains an invalid regex: {err}"),
            });
        }

        if cli.is_dev() && self.serve.port == self.serve.reload_port {
            bail!(ConfigError::Invalid {
                key: "serve.port",
                reason: "must differ from [serve.reload_port]".into(),
            });
        }

        Ok(())
    }
}

/// Absolute form of `path`, canonicalized when it exists.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}
