//! Site building orchestration.
//!
//! # Architecture
//!
//! ```text
//! build_site()
//!     │
//!     ├── Site::prepare()     assets ∥ components, then link → cycles → styles → instances
//!     ├── plan_pages()        one job per page, one per route for [param] pages
//!     ├── render_page() ∥     every page rendered in memory
//!     │
//!     │   (nothing below runs unless every page rendered)
//!     │
//!     ├── clean output        when [build] clean
//!     ├── write_page() ∥
//!     └── copy_assets()       when [build] copy_assets
//! ```

use crate::{
    assets::copy_assets,
    compiler::{BuildError, Site, plan_pages, render_page, write_page},
    config::SiteConfig,
    log,
    logger::ProgressBars,
    render::TemplateRenderer,
};
use rayon::prelude::*;
use std::{fs, time::Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Generate,
    /// Pages get a reload client for the push channel on this port.
    Dev { reload_port: u16 },
}

impl BuildMode {
    const fn reload_port(self) -> Option<u16> {
        match self {
            Self::Generate => None,
            Self::Dev { reload_port } => Some(reload_port),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub components: usize,
    pub pages: usize,
    pub assets: usize,
}

/// Build the whole site into `[build] output`.
///
/// Any error leaves the output directory as it was: pages are only written
/// once all of them rendered.
pub fn build_site(config: &SiteConfig, mode: BuildMode) -> Result<BuildSummary, BuildError> {
    let started = Instant::now();
    let build = &config.build;

    let renderer = TemplateRenderer;
    let site = Site::prepare(config, &renderer, mode.reload_port())?;
    let jobs = plan_pages(&site)?;

    let progress = ProgressBars::new_filtered(&[("pages", jobs.len())]);
    let rendered = jobs
        .par_iter()
        .map(|job| {
            let page = render_page(&site, job);
            if let Some(progress) = &progress {
                progress.inc(0);
            }
            page
        })
        .collect::<Result<Vec<_>, _>>();
    if let Some(progress) = &progress {
        progress.finish();
    }
    let rendered = rendered?;

    if build.clean && build.output.exists() {
        fs::remove_dir_all(&build.output).map_err(|err| BuildError::io(&build.output, err))?;
    }
    rendered.par_iter().try_for_each(write_page)?;

    let assets = if build.copy_assets {
        copy_assets(&build.assets, &build.output)?
    } else {
        0
    };

    let summary = BuildSummary {
        components: site.registry.len(),
        pages: rendered.len(),
        assets,
    };
    if summary.pages == 0 {
        log!("warn"; "no pages under `{}`", build.pages.display());
    }
    log!(
        "build";
        "{} pages, {} components, {} assets in {} ms",
        summary.pages,
        summary.components,
        summary.assets,
        started.elapsed().as_millis()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::testing::{config, write_tree};
    use std::path::Path;

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_chain_renders_with_styles_deepest_first() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(
            dir.path(),
            &[
                ("assets/a.css", ".a{}"),
                ("assets/b.css", ".b{}"),
                ("assets/c.css", ".c{}"),
                (
                    "components/A.component",
                    "<template><section><B/></section></template>\n<script>export default { css: ['assets/a.css'] }</script>",
                ),
                (
                    "components/B.component",
                    "<template><div><C/></div></template>\n<script>export default { css: ['assets/b.css'] }</script>",
                ),
                (
                    "components/C.component",
                    "<template><span>leaf</span></template>\n<script>export default { css: ['assets/c.css'] }</script>",
                ),
                ("pages/index.component", "<template><A/></template>"),
            ],
        );
        let config = config(dir.path());

        let summary = build_site(&config, BuildMode::Generate).unwrap();
        assert_eq!(summary.components, 3);
        assert_eq!(summary.pages, 1);
        assert_eq!(summary.assets, 3);

        let html = read(&config.build.output.join("index.html"));
        assert!(html.contains("<section><div><span>leaf</span></div></section>"));
        let (c, b, a) = (
            html.find(".c{}").unwrap(),
            html.find(".b{}").unwrap(),
            html.find(".a{}").unwrap(),
        );
        assert!(c < b && b < a);
        assert!(config.build.output.join("a.css").is_file());
    }

    #[test]
    fn test_native_tag_does_not_hide_component() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(
            dir.path(),
            &[
                ("assets/nav.css", ".nav{}"),
                (
                    "components/Nav.component",
                    "<template><ul>links</ul></template>\n<script>export default { css: ['assets/nav.css'] }</script>",
                ),
                ("pages/index.component", "<template><nav><Nav/></nav></template>"),
            ],
        );
        let config = config(dir.path());

        build_site(&config, BuildMode::Generate).unwrap();
        let html = read(&config.build.output.join("index.html"));
        assert!(html.contains("<nav><ul>links</ul></nav>"));
        assert!(html.contains(".nav{}"));
    }

    #[test]
    fn test_cycle_aborts_without_output() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(
            dir.path(),
            &[
                ("components/X.component", "<template><Y/></template>"),
                ("components/Y.component", "<template><X/></template>"),
                ("pages/index.component", "<template><X/></template>"),
            ],
        );
        let config = config(dir.path());

        let err = build_site(&config, BuildMode::Generate).unwrap_err();
        assert!(matches!(err, BuildError::Cycle(ref path) if path.len() == 3));
        assert!(!config.build.output.exists());
    }

    #[test]
    fn test_dynamic_page_expands_routes() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(
            dir.path(),
            &[(
                "pages/blog/[slug].component",
                r#"<template><h1>{{ title }}</h1><p>{{ params.slug }}</p></template>
<script>
export default {
  props: { title: "Post" },
  paths: [
    { params: { slug: "a" }, props: { title: "First" } },
    { params: { slug: "b" } },
  ],
}
</script>"#,
            )],
        );
        let config = config(dir.path());

        let summary = build_site(&config, BuildMode::Generate).unwrap();
        assert_eq!(summary.pages, 2);

        let out = &config.build.output;
        let a = read(&out.join("blog/a/index.html"));
        let b = read(&out.join("blog/b/index.html"));
        assert!(a.contains("<h1>First</h1><p>a</p>"));
        assert!(b.contains("<h1>Post</h1><p>b</p>"));
    }

    #[test]
    fn test_missing_asset_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(
            dir.path(),
            &[
                ("pages/about.component", "<template><p>about</p></template>"),
                (
                    "pages/index.component",
                    "<template><p/></template><script>export default { css: ['assets/missing.css'] }</script>",
                ),
            ],
        );
        let config = config(dir.path());

        let err = build_site(&config, BuildMode::Generate).unwrap_err();
        assert!(matches!(err, BuildError::MissingAsset { .. }));
        assert!(!config.build.output.join("about/index.html").exists());
        assert!(!config.build.output.join("index.html").exists());
    }

    #[test]
    fn test_clean_only_after_successful_render() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(
            dir.path(),
            &[
                ("dist/stale.html", "old"),
                ("pages/index.component", "<template>{{ nope }}</template>"),
            ],
        );
        let mut config = config(dir.path());
        config.build.clean = true;

        assert!(build_site(&config, BuildMode::Generate).is_err());
        assert!(config.build.output.join("stale.html").exists());

        write_tree(dir.path(), &[("pages/index.component", "<template>ok</template>")]);
        build_site(&config, BuildMode::Generate).unwrap();
        assert!(!config.build.output.join("stale.html").exists());
        assert!(config.build.output.join("index.html").exists());
    }

    #[test]
    fn test_dev_build_injects_reload_client() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path(), &[("pages/index.component", "<template>hi</template>")]);
        let config = config(dir.path());

        build_site(&config, BuildMode::Dev { reload_port: 7001 }).unwrap();
        let html = read(&config.build.output.join("index.html"));
        assert!(html.contains("<script>"));
        assert!(html.contains(":7001"));
    }
}
