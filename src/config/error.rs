//! Errors raised while loading or checking `vela.toml`.

use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read `{}`", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("`{}` is not a valid site config", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A setting parsed but cannot be used, e.g. a bad regex.
    #[error("[{key}] {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_config_error_display() {
        let read = ConfigError::Read {
            path: PathBuf::from("site/vela.toml"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(read.to_string(), "cannot read `site/vela.toml`");
        assert!(read.source().is_some());

        let invalid = ConfigError::Invalid {
            key: "serve.port",
            reason: "clashes with [serve.reload_port]".into(),
        };
        assert_eq!(invalid.to_string(), "[serve.port] clashes with [serve.reload_port]");
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let source = toml::from_str::<toml::Table>("[build").unwrap_err();
        let err = ConfigError::Parse {
            path: PathBuf::from("vela.toml"),
            source,
        };
        assert!(err.to_string().contains("`vela.toml`"));
    }
}
