//! Page compilation.
//!
//! - **error**: [`BuildError`], shared by every build stage
//! - **pages**: route expansion, page rendering and writing
//! - **html**: document shell and reload client
//!
//! # Build Flow
//!
//! ```text
//! Site::prepare() ──► plan_pages() ──► render_page() ──► write_page()
//!       │                  │                │
//!       ▼                  ▼                ▼
//!  assets + registry    PageJob[]       PageOutput[]
//! ```

mod error;
mod html;
mod pages;

pub use error::BuildError;
pub use pages::{plan_pages, render_page, write_page};

use crate::{
    assets::AssetIndex,
    component::{ComponentLoader, Registry},
    config::SiteConfig,
    render::Renderer,
    utils::minify::{Minifier, MinifyKind},
};

/// Everything a page needs while rendering. Read-only once prepared.
pub struct Site<'a, R: Renderer> {
    pub config: &'a SiteConfig,
    pub renderer: &'a R,
    pub loader: ComponentLoader,
    pub registry: Registry<R::Instance>,
    pub assets: AssetIndex,
    pub minifier: Minifier,
    /// Reload client injected into every page, dev builds only.
    pub reload: Option<String>,
}

impl<'a, R: Renderer> Site<'a, R> {
    /// Load the asset index and the components, then run every registry pass.
    ///
    /// With `reload_port`, pages get a client for the push channel on that port.
    pub fn prepare(
        config: &'a SiteConfig,
        renderer: &'a R,
        reload_port: Option<u16>,
    ) -> Result<Self, BuildError> {
        let build = &config.build;
        let filters = build.style_filters()?;
        let loader = ComponentLoader::new(&build.extension);

        let (assets, registry) = rayon::join(
            || AssetIndex::load(&build.assets, &filters),
            || loader.load_dir(&build.components),
        );
        let assets = assets?;
        let mut registry = registry?;
        registry.prepare(renderer)?;

        let minifier = Minifier::new(build.minify);
        let reload = reload_port.map(|port| {
            minifier
                .minify(MinifyKind::Js, &html::reload_script(port))
                .into_owned()
        });

        Ok(Self {
            config,
            renderer,
            loader,
            registry,
            assets,
            minifier,
            reload,
        })
    }
}
