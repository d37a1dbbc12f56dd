//! Page rendering.
//!
//! Pages are component files under the pages directory. They are not part of
//! the registry: each one is loaded on its own, pulls in the registered
//! components its template names, and is rendered into one `index.html` per
//! route.
//!
//! # Output layout
//!
//! ```text
//! pages/index.vue            → dist/index.html
//! pages/blog/index.vue       → dist/blog/index.html
//! pages/about.vue            → dist/about/index.html
//! pages/blog/[slug].vue      → dist/blog/<slug>/index.html   (one per route)
//! ```

use super::{BuildError, Site, html};
use crate::{
    component::{Component, PathData, RenderContext, Stage, StyleList, scan_tags},
    log,
    render::{InstanceSpec, RenderError, Renderer},
    utils::minify::MinifyKind,
};
use rayon::prelude::*;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, LazyLock},
};

/// `[name]` placeholder in a dynamic page's file stem.
static ROUTE_PARAM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(\w+)\]").unwrap());

// ============================================================================
// Types
// ============================================================================

/// One output file to render.
pub struct PageJob<I> {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Route record of a dynamic page.
    pub route: Option<PathData>,
    pub page: Arc<Component<I>>,
}

/// A rendered page, not yet written.
#[derive(Debug, Clone)]
pub struct PageOutput {
    pub path: PathBuf,
    pub html: String,
}

// ============================================================================
// Routes
// ============================================================================

/// Whether the file stem of `source` has a `[param]` placeholder.
pub fn is_dynamic(source: &Path) -> bool {
    source
        .file_stem()
        .and_then(OsStr::to_str)
        .is_some_and(|stem| ROUTE_PARAM.is_match(stem))
}

/// Output file of `source` under `output`, for the route at `index` if any.
pub fn output_path(
    pages: &Path,
    output: &Path,
    source: &Path,
    route: Option<(usize, &PathData)>,
) -> Result<PathBuf, BuildError> {
    let relative = source.strip_prefix(pages).unwrap_or(source);
    let dir = output.join(relative.parent().unwrap_or(Path::new("")));
    let stem = source
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or_default();

    if stem == "index" {
        return Ok(dir.join("index.html"));
    }

    let (index, data) = route.map_or((0, None), |(index, data)| (index, Some(data)));
    let mut name = String::with_capacity(stem.len());
    let mut last = 0;
    for caps in ROUTE_PARAM.captures_iter(stem) {
        let Some(whole) = caps.get(0) else { continue };
        let param = &caps[1];
        let value = data
            .and_then(|data| data.param(param))
            .ok_or_else(|| BuildError::MissingRouteParam {
                page: source.to_path_buf(),
                param: param.to_owned(),
                index,
            })?;
        if matches!(value, "" | ".") || value.contains(['/', '\\']) || value.contains("..") {
            return Err(BuildError::InvalidRouteParam {
                page: source.to_path_buf(),
                param: param.to_owned(),
                value: value.to_owned(),
                index,
            });
        }
        name.push_str(&stem[last..whole.start()]);
        name.push_str(value);
        last = whole.end();
    }
    name.push_str(&stem[last..]);

    Ok(dir.join(name).join("index.html"))
}

/// Load every page and expand dynamic pages into one job per route.
pub fn plan_pages<R: Renderer>(site: &Site<'_, R>) -> Result<Vec<PageJob<R::Instance>>, BuildError> {
    let sources = site.loader.collect(&site.config.build.pages);
    let planned = sources
        .par_iter()
        .map(|source| plan_page(site, source))
        .collect::<Result<Vec<_>, _>>()?;
    let jobs: Vec<_> = planned.into_iter().flatten().collect();

    let mut outputs: FxHashMap<&Path, &Path> = FxHashMap::default();
    for job in &jobs {
        if let Some(first) = outputs.insert(&job.output, &job.source) {
            return Err(BuildError::DuplicateOutput {
                output: job.output.clone(),
                first: first.to_path_buf(),
                second: job.source.clone(),
            });
        }
    }
    Ok(jobs)
}

fn plan_page<R: Renderer>(
    site: &Site<'_, R>,
    source: &Path,
) -> Result<Vec<PageJob<R::Instance>>, BuildError> {
    let build = &site.config.build;
    let page = Arc::new(site.loader.load(source)?);

    if !is_dynamic(source) {
        return Ok(vec![PageJob {
            source: source.to_path_buf(),
            output: output_path(&build.pages, &build.output, source, None)?,
            route: None,
            page,
        }]);
    }

    let enumerator = page
        .exports
        .route_enumerator
        .as_ref()
        .ok_or_else(|| BuildError::MissingRouteEnumerator {
            page: source.to_path_buf(),
        })?;
    let routes = enumerator
        .routes()
        .map_err(|err| BuildError::RouteEnumerator {
            page: source.to_path_buf(),
            source: err,
        })?;

    routes
        .into_iter()
        .enumerate()
        .map(|(index, route)| {
            let output = output_path(&build.pages, &build.output, source, Some((index, &route)))?;
            Ok::<_, BuildError>(PageJob {
                source: source.to_path_buf(),
                output,
                route: Some(route),
                page: Arc::clone(&page),
            })
        })
        .collect()
}

// ============================================================================
// Rendering
// ============================================================================

/// Render one job into a complete, minified document.
pub fn render_page<R: Renderer>(
    site: &Site<'_, R>,
    job: &PageJob<R::Instance>,
) -> Result<PageOutput, BuildError> {
    let registry = &site.registry;
    registry.require(Stage::Materialized)?;

    let page = &job.page;
    let used = registry.resolve_tags(&scan_tags(page.template()));

    let mut styles = StyleList::new();
    styles.extend(page.own_styles());
    for id in &used {
        styles.extend(&registry.get(*id).style_refs);
    }
    let css = page_css(site, job, &styles)?;
    let css = site.minifier.minify(MinifyKind::Css, &css);

    let render_err = |err: RenderError| BuildError::render(&job.source, err);
    let ctx = job.route.as_ref().map(RenderContext::from).unwrap_or_default();
    let data = match &page.exports.render_props {
        Some(props) => props.render_props(&ctx).map_err(|source| {
            render_err(RenderError::Data {
                component: page.name.clone(),
                source,
            })
        })?,
        None => Value::Object(Map::new()),
    };

    let spec = InstanceSpec {
        name: &page.name,
        template: page.template(),
        exports: &page.exports,
        dependencies: registry.dependency_instances(&used),
    };
    let instance = site.renderer.instantiate(spec).map_err(render_err)?;
    let body = site.renderer.render(&instance, &data).map_err(render_err)?;

    let html = html::assemble(&css, &body, site.reload.as_deref());
    let html = site.minifier.minify(MinifyKind::Html, &html).into_owned();

    Ok(PageOutput {
        path: job.output.clone(),
        html,
    })
}

/// Stylesheets in reverse list order, then the page's inline `<style>` blocks.
fn page_css<R: Renderer>(
    site: &Site<'_, R>,
    job: &PageJob<R::Instance>,
    styles: &StyleList,
) -> Result<String, BuildError> {
    let root = site.config.get_root();
    let resolved = styles
        .as_slice()
        .iter()
        .map(|style| {
            site.assets
                .resolve(root, style)
                .ok_or_else(|| BuildError::MissingAsset {
                    page: job.source.clone(),
                    style: style.clone(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut css = String::new();
    for content in resolved.iter().rev() {
        css.push_str(content);
        css.push('\n');
    }
    for block in &job.page.source.styles {
        if let Some(lang) = block.lang.as_deref()
            && !lang.eq_ignore_ascii_case("css")
        {
            log!("pages"; "{}: <style lang=\"{lang}\"> is emitted as plain css", job.page.name);
        }
        css.push_str(&block.content);
        css.push('\n');
    }
    Ok(css)
}

// ============================================================================
// Writing
// ============================================================================

pub fn write_page(page: &PageOutput) -> Result<(), BuildError> {
    if let Some(parent) = page.path.parent() {
        fs::create_dir_all(parent).map_err(|err| BuildError::io(parent, err))?;
    }
    fs::write(&page.path, &page.html).map_err(|err| BuildError::io(&page.path, err))
}
