//! Template rendering seam.
//!
//! The build pipeline only ever talks to [`Renderer`]: it asks for an
//! instance once per component (dependencies first) and later renders page
//! instances with data. [`TemplateRenderer`] is the implementation the CLI
//! ships with.

mod template;

pub use template::TemplateRenderer;

use crate::component::ExportedConfig;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Everything a renderer needs to construct one component instance.
///
/// `dependencies` maps tag names to the instances of the component's direct
/// dependencies, all of which are complete when this is handed out.
pub struct InstanceSpec<'a, I> {
    pub name: &'a str,
    pub template: &'a str,
    pub exports: &'a ExportedConfig,
    pub dependencies: FxHashMap<String, Arc<I>>,
}

pub trait Renderer: Send + Sync {
    /// Opaque renderable handle, shared between parents once built.
    type Instance: Send + Sync;

    fn instantiate(&self, spec: InstanceSpec<'_, Self::Instance>) -> Result<Self::Instance, RenderError>;

    /// Render `instance` with `data` (a JSON object, or `null` for no data).
    fn render(&self, instance: &Self::Instance, data: &Value) -> Result<String, RenderError>;
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("`{component}`: unclosed `{{{{` at byte {offset}")]
    UnclosedInterpolation { component: String, offset: usize },

    #[error("`{component}`: `<{tag}>` is never closed")]
    UnclosedTag { component: String, tag: String },

    #[error("`{component}`: unexpected `</{tag}>`")]
    UnexpectedClose { component: String, tag: String },

    #[error("`{component}`: unknown binding `{expr}`")]
    UnknownBinding { component: String, expr: String },

    #[error("`{component}`: render data must be an object")]
    DataShape { component: String },

    #[error("`{component}`: render data callback failed")]
    Data {
        component: String,
        #[source]
        source: anyhow::Error,
    },
}
