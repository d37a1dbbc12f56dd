//! Reading component files into [`Component`] records.

use super::{
    Component, Registry,
    exports::{ExportExtractor, LiteralExtractor},
    source::{SfcParser, SourceParser},
};
use crate::{assets::files_under, compiler::BuildError, log};
use rayon::prelude::*;
use std::{
    ffi::OsStr,
    fmt, fs,
    path::{Path, PathBuf},
};

pub struct ComponentLoader {
    extension: String,
    parser: Box<dyn SourceParser>,
    extractor: Box<dyn ExportExtractor>,
}

impl fmt::Debug for ComponentLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentLoader")
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}

impl ComponentLoader {
    /// Loader for `*.{extension}` files using [`SfcParser`] and [`LiteralExtractor`].
    pub fn new(extension: impl Into<String>) -> Self {
        Self::with_parts(extension, SfcParser, LiteralExtractor)
    }

    pub fn with_parts(
        extension: impl Into<String>,
        parser: impl SourceParser + 'static,
        extractor: impl ExportExtractor + 'static,
    ) -> Self {
        Self {
            extension: extension.into(),
            parser: Box::new(parser),
            extractor: Box::new(extractor),
        }
    }

    pub fn is_source(&self, path: &Path) -> bool {
        path.extension().and_then(OsStr::to_str) == Some(self.extension.as_str())
    }

    /// Source files under `dir`, sorted. A missing directory yields nothing.
    pub fn collect(&self, dir: &Path) -> Vec<PathBuf> {
        let mut files = files_under(dir);
        files.retain(|path| self.is_source(path));
        files
    }

    /// Read and parse one file. The component is named after the file stem.
    pub fn load<I>(&self, path: &Path) -> Result<Component<I>, BuildError> {
        let raw = fs::read_to_string(path).map_err(|err| BuildError::io(path, err))?;
        self.load_source(path, &raw)
    }

    pub fn load_source<I>(&self, path: &Path, raw: &str) -> Result<Component<I>, BuildError> {
        let parse_err = |source| BuildError::Parse {
            path: path.to_path_buf(),
            source,
        };

        let name = path
            .file_stem()
            .and_then(OsStr::to_str)
            .unwrap_or_default()
            .to_owned();
        let source = self.parser.parse(raw).map_err(parse_err)?;
        let exports = self.extractor.extract(&source.script).map_err(parse_err)?;

        Ok(Component::new(name, path, source, exports))
    }

    /// Load every component under `dir` into a fresh registry.
    pub fn load_dir<I: Send + Sync>(&self, dir: &Path) -> Result<Registry<I>, BuildError> {
        let files = self.collect(dir);
        let components = files
            .par_iter()
            .map(|path| self.load(path))
            .collect::<Result<Vec<_>, _>>()?;

        let mut registry = Registry::new();
        for component in components {
            registry.insert(component)?;
        }

        if !registry.is_empty() {
            log!("components"; "loaded {}", registry.len());
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ParseError, Stage};
    use std::fs;

    const CARD: &str = r#"
<template><div class="card"><slot/></div></template>
<script>export default { css: ["assets/card.css"] }</script>
"#;

    #[test]
    fn test_load_names_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Card.vue");
        fs::write(&path, CARD).unwrap();

        let component: Component<()> = ComponentLoader::new("vue").load(&path).unwrap();
        assert_eq!(component.name, "Card");
        assert_eq!(component.source_path, path);
        assert_eq!(component.own_styles(), &["assets/card.css"]);
        assert!(component.instance.is_none());
    }

    #[test]
    fn test_load_dir_recursive_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("layout")).unwrap();
        fs::write(dir.path().join("Card.vue"), CARD).unwrap();
        fs::write(dir.path().join("layout/Nav.vue"), "<template><nav/></template>").unwrap();
        fs::write(dir.path().join("notes.md"), "# not a component").unwrap();

        let registry: Registry<()> = ComponentLoader::new("vue").load_dir(dir.path()).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.lookup("Card").is_some());
        assert!(registry.lookup("Nav").is_some());
        assert_eq!(registry.stage(), Stage::Loaded);
    }

    #[test]
    fn test_load_dir_duplicate_stems() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("a/Card.vue"), CARD).unwrap();
        fs::write(dir.path().join("b/Card.vue"), CARD).unwrap();

        let result: Result<Registry<()>, _> = ComponentLoader::new("vue").load_dir(dir.path());
        assert!(matches!(result, Err(BuildError::DuplicateComponent { .. })));
    }

    #[test]
    fn test_load_dir_missing_is_empty() {
        let registry: Registry<()> = ComponentLoader::new("vue")
            .load_dir(Path::new("/definitely/not/here"))
            .unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_load_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Broken.vue");
        fs::write(&path, "<script>export default {}</script>").unwrap();

        let err = ComponentLoader::new("vue").load::<()>(&path).unwrap_err();
        match err {
            BuildError::Parse { path: p, source: ParseError::MissingTemplate } => assert_eq!(p, path),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_custom_extension() {
        let loader = ComponentLoader::new("component");
        assert!(loader.is_source(Path::new("pages/index.component")));
        assert!(!loader.is_source(Path::new("pages/index.vue")));
        assert!(!loader.is_source(Path::new("pages/component")));
    }
}
