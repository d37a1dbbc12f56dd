//! `[build]` section configuration.
//!
//! Source directories, output directory, and output post-processing.

use super::defaults;
use educe::Educe;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[build]` section in vela.toml - build pipeline configuration.
///
/// # Example
/// ```toml
/// [build]
/// pages = "pages"            # Page components, mirrored into the output
/// components = "components"  # Reusable components, referenced by tag name
/// assets = "assets"          # Stylesheets and static files
/// output = "dist"
/// extension = "vue"
/// styles = ['\.css$']        # Which asset files can be referenced as styles
/// minify = true
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Project root directory (usually set via CLI `--root`).
    #[serde(default = "defaults::build::root")]
    #[educe(Default = defaults::build::root())]
    pub root: Option<PathBuf>,

    /// Page source directory.
    #[serde(default = "defaults::build::pages")]
    #[educe(Default = defaults::build::pages())]
    pub pages: PathBuf,

    /// Component source directory.
    #[serde(default = "defaults::build::components")]
    #[educe(Default = defaults::build::components())]
    pub components: PathBuf,

    /// Asset directory (stylesheets, images, fonts).
    #[serde(default = "defaults::build::assets")]
    #[educe(Default = defaults::build::assets())]
    pub assets: PathBuf,

    /// Build output directory.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// File extension of component and page sources, without the dot.
    #[serde(default = "defaults::build::extension")]
    #[educe(Default = defaults::build::extension())]
    pub extension: String,

    /// Regexes selecting which asset files are loaded into the style index.
    #[serde(default = "defaults::build::styles")]
    #[educe(Default = defaults::build::styles())]
    pub styles: Vec<String>,

    /// Minify html, inline css and inline js.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub minify: bool,

    /// Remove everything else from the output directory once all pages rendered.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub clean: bool,

    /// Mirror the asset directory into the output directory.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub copy_assets: bool,
}

impl BuildConfig {
    /// Compile the `styles` patterns.
    pub fn style_filters(&self) -> Result<Vec<Regex>, regex::Error> {
        self.styles.iter().map(|pattern| Regex::new(pattern)).collect()
    }
}
