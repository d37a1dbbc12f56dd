//! Script exports: what a component's `<script>` hands to the build.
//!
//! A script's `export default` object may carry
//!
//! | Key              | Meaning                                          |
//! |------------------|--------------------------------------------------|
//! | `name`           | Display name (informational)                     |
//! | `css` / `styles` | Stylesheet paths, relative to the project root   |
//! | `props`          | Render data for the component or page            |
//! | `paths`          | Route records for a `[param]` page               |
//!
//! `props` and `paths` become [`RenderProps`] and [`RouteEnumerator`]
//! implementations, so callers can also plug in computed data.

use super::{
    literal::{LiteralError, parse_literal, skip_trivia},
    source::ParseError,
};
use regex::Regex;
use serde_json::{Map, Value};
use std::{collections::BTreeMap, fmt, sync::Arc, sync::LazyLock};

// ============================================================================
// Route data
// ============================================================================

/// One route of a dynamic page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathData {
    pub params: BTreeMap<String, String>,
    /// Per-route data merged into the page's render data.
    pub props: Map<String, Value>,
}

impl PathData {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// Input of a render-data callback. Empty for static pages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    pub params: BTreeMap<String, String>,
    pub props: Map<String, Value>,
}

impl From<&PathData> for RenderContext {
    fn from(route: &PathData) -> Self {
        Self {
            params: route.params.clone(),
            props: route.props.clone(),
        }
    }
}

// ============================================================================
// Callbacks
// ============================================================================

pub trait RenderProps: Send + Sync {
    /// Render data for one page or component; must be a JSON object.
    fn render_props(&self, ctx: &RenderContext) -> anyhow::Result<Value>;
}

impl<F> RenderProps for F
where
    F: Fn(&RenderContext) -> anyhow::Result<Value> + Send + Sync,
{
    fn render_props(&self, ctx: &RenderContext) -> anyhow::Result<Value> {
        self(ctx)
    }
}

pub trait RouteEnumerator: Send + Sync {
    fn routes(&self) -> anyhow::Result<Vec<PathData>>;
}

impl<F> RouteEnumerator for F
where
    F: Fn() -> anyhow::Result<Vec<PathData>> + Send + Sync,
{
    fn routes(&self) -> anyhow::Result<Vec<PathData>> {
        self()
    }
}

/// Literal `props`. The route's `params` are exposed as `params`, and route
/// props override keys of the same name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticProps(pub Map<String, Value>);

impl RenderProps for StaticProps {
    fn render_props(&self, ctx: &RenderContext) -> anyhow::Result<Value> {
        let mut data = self.0.clone();
        data.insert("params".into(), serde_json::to_value(&ctx.params)?);
        data.extend(ctx.props.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(Value::Object(data))
    }
}

/// Literal `paths`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticPaths(pub Vec<PathData>);

impl RouteEnumerator for StaticPaths {
    fn routes(&self) -> anyhow::Result<Vec<PathData>> {
        Ok(self.0.clone())
    }
}

// ============================================================================
// Exported configuration
// ============================================================================

#[derive(Clone, Default)]
pub struct ExportedConfig {
    pub name: Option<String>,
    pub style_refs: Vec<String>,
    pub render_props: Option<Arc<dyn RenderProps>>,
    pub route_enumerator: Option<Arc<dyn RouteEnumerator>>,
}

impl fmt::Debug for ExportedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportedConfig")
            .field("name", &self.name)
            .field("style_refs", &self.style_refs)
            .field("render_props", &self.render_props.is_some())
            .field("route_enumerator", &self.route_enumerator.is_some())
            .finish()
    }
}

impl ExportedConfig {
    pub fn with_styles<I, S>(mut self, styles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.style_refs = styles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_render_props(mut self, props: impl RenderProps + 'static) -> Self {
        self.render_props = Some(Arc::new(props));
        self
    }

    pub fn with_routes(mut self, routes: impl RouteEnumerator + 'static) -> Self {
        self.route_enumerator = Some(Arc::new(routes));
        self
    }
}

pub trait ExportExtractor: Send + Sync {
    fn extract(&self, script: &str) -> Result<ExportedConfig, ParseError>;
}

// ============================================================================
// Literal extractor
// ============================================================================

static EXPORT_DEFAULT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bexport\s+default\b").unwrap());

/// Reads `export default { … }` without running any script.
///
/// Code before the export (imports, comments) is ignored; only a `;` and
/// comments may follow it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiteralExtractor;

impl ExportExtractor for LiteralExtractor {
    fn extract(&self, script: &str) -> Result<ExportedConfig, ParseError> {
        if script.trim().is_empty() {
            return Ok(ExportedConfig::default());
        }

        let start = EXPORT_DEFAULT
            .find(script)
            .ok_or(ParseError::MissingDefaultExport)?
            .end();
        let shift = |err: LiteralError| LiteralError {
            offset: err.offset + start,
            ..err
        };

        let (value, consumed) = parse_literal(&script[start..]).map_err(shift)?;
        let mut end = skip_trivia(script, start + consumed)?;
        if script[end..].starts_with(';') {
            end = skip_trivia(script, end + 1)?;
        }
        if end != script.len() {
            return Err(LiteralError {
                offset: end,
                message: "unexpected code after `export default`".into(),
            }
            .into());
        }

        match value {
            Value::Object(map) => config_from_object(map),
            _ => Err(ParseError::ExportShape {
                key: "default",
                expected: "an object",
            }),
        }
    }
}

fn config_from_object(mut map: Map<String, Value>) -> Result<ExportedConfig, ParseError> {
    let mut config = ExportedConfig::default();

    match map.remove("name") {
        None | Some(Value::Null) => {}
        Some(Value::String(name)) => config.name = Some(name),
        Some(_) => return Err(shape("name", "a string")),
    }

    let styles = map.remove("css").or_else(|| map.remove("styles"));
    let styles: Vec<String> = match styles {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(path)) => vec![path],
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(path) => Ok(path),
                _ => Err(shape("css", "a string or an array of strings")),
            })
            .collect::<Result<_, _>>()?,
        Some(_) => return Err(shape("css", "a string or an array of strings")),
    };
    config = config.with_styles(styles);

    match map.remove("props") {
        None | Some(Value::Null) => {}
        Some(Value::Object(props)) => config = config.with_render_props(StaticProps(props)),
        Some(_) => return Err(shape("props", "an object")),
    }

    match map.remove("paths") {
        None | Some(Value::Null) => {}
        Some(Value::Array(records)) => {
            let routes = records
                .into_iter()
                .map(path_data_from_value)
                .collect::<Result<_, _>>()?;
            config = config.with_routes(StaticPaths(routes));
        }
        Some(_) => return Err(shape("paths", "an array")),
    }

    Ok(config)
}

const PATHS_SHAPE: &str = "an array of `{ params: { … }, props: { … } }` records";

/// `{ params: { slug: "a" }, props: {…} }`; scalar params are stringified.
fn path_data_from_value(value: Value) -> Result<PathData, ParseError> {
    let Value::Object(mut record) = value else {
        return Err(shape("paths", PATHS_SHAPE));
    };

    let params = match record.remove("params") {
        None | Some(Value::Null) => BTreeMap::new(),
        Some(Value::Object(params)) => params
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(s) => Ok((key, s)),
                Value::Number(n) => Ok((key, n.to_string())),
                Value::Bool(b) => Ok((key, b.to_string())),
                _ => Err(shape("paths", PATHS_SHAPE)),
            })
            .collect::<Result<_, _>>()?,
        Some(_) => return Err(shape("paths", PATHS_SHAPE)),
    };

    let props = match record.remove("props") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(props)) => props,
        Some(_) => return Err(shape("paths", PATHS_SHAPE)),
    };

    Ok(PathData { params, props })
}

const fn shape(key: &'static str, expected: &'static str) -> ParseError {
    ParseError::ExportShape { key, expected }
}
