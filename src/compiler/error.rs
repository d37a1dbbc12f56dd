//! Build failures.
//!
//! Every error carries the path or component it is about; nothing is retried.

use crate::{
    component::{ParseError, Stage},
    render::RenderError,
};
use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    // ------------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------------
    #[error("component `{name}` is defined twice: `{}` and `{}`", .first.display(), .second.display())]
    DuplicateComponent {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("dynamic page `{}` does not export `paths`", .page.display())]
    MissingRouteEnumerator { page: PathBuf },

    #[error("route #{index} of `{}` has no value for `[{param}]`", .page.display())]
    MissingRouteParam {
        page: PathBuf,
        param: String,
        index: usize,
    },

    #[error("route #{index} of `{}` has an invalid value {value:?} for `[{param}]`", .page.display())]
    InvalidRouteParam {
        page: PathBuf,
        param: String,
        value: String,
        index: usize,
    },

    #[error("failed to enumerate routes of `{}`", .page.display())]
    RouteEnumerator {
        page: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("`{}` and `{}` both write `{}`", .first.display(), .second.display(), .output.display())]
    DuplicateOutput {
        output: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("invalid style filter")]
    StyleFilter(#[from] regex::Error),

    // ------------------------------------------------------------------------
    // Graph
    // ------------------------------------------------------------------------
    #[error("dependency cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("component registry is {actual:?}, expected at least {expected:?}")]
    RegistryNotReady { expected: Stage, actual: Stage },

    // ------------------------------------------------------------------------
    // Pages
    // ------------------------------------------------------------------------
    #[error("stylesheet `{style}` used by `{}` is not in the asset index", .page.display())]
    MissingAsset { page: PathBuf, style: String },

    #[error("failed to render `{}`", .path.display())]
    Render {
        path: PathBuf,
        #[source]
        source: RenderError,
    },

    #[error("failed to parse `{}`", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("I/O error at `{}`", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl BuildError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn render(path: impl Into<PathBuf>, source: RenderError) -> Self {
        Self::Render {
            path: path.into(),
            source,
        }
    }
}
