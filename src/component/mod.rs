//! Components and the registry that links them.
//!
//! # Passes
//!
//! ```text
//! ComponentLoader::load_dir()      Stage::Loaded
//!        │
//!        ├── link()                 Stage::Linked        tags → deps
//!        ├── check_cycles()         Stage::Checked       fails on any cycle
//!        ├── aggregate_styles()     Stage::Styled        own styles, then deps'
//!        └── materialize()          Stage::Materialized  dependencies first
//! ```
//!
//! Each pass refuses to run on a registry that has not reached the stage it
//! depends on. Components live in an arena and refer to each other by
//! [`ComponentId`].

mod exports;
mod graph;
mod literal;
mod loader;
mod materialize;
mod source;
mod styles;
mod tags;

pub use exports::{ExportedConfig, PathData, RenderContext};
pub use loader::ComponentLoader;
pub use source::ParseError;
pub use styles::StyleList;
pub use tags::{parse_open_tag, scan_tags};

#[cfg(test)]
pub use exports::StaticProps;

use graph::find_cycle;
use source::ComponentSource;

use crate::compiler::BuildError;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::{fmt, path::PathBuf, sync::Arc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(usize);

impl ComponentId {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// How far the registry has been processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Loaded,
    Linked,
    Checked,
    Styled,
    Materialized,
}

pub type Deps = SmallVec<[ComponentId; 4]>;

// ============================================================================
// Component
// ============================================================================

pub struct Component<I> {
    /// File stem; also the tag name other templates use.
    pub name: String,
    pub source_path: PathBuf,
    pub source: ComponentSource,
    pub exports: ExportedConfig,
    /// Direct dependencies in order of first appearance in the template.
    pub deps: Deps,
    /// Own styles followed by every dependency's, each path once.
    pub style_refs: Vec<String>,
    pub instance: Option<Arc<I>>,
}

impl<I> Component<I> {
    pub fn new(
        name: impl Into<String>,
        source_path: impl Into<PathBuf>,
        source: ComponentSource,
        exports: ExportedConfig,
    ) -> Self {
        Self {
            name: name.into(),
            source_path: source_path.into(),
            source,
            exports,
            deps: Deps::new(),
            style_refs: Vec::new(),
            instance: None,
        }
    }

    pub fn template(&self) -> &str {
        &self.source.template
    }

    /// Styles declared by the component's own script.
    pub fn own_styles(&self) -> &[String] {
        &self.exports.style_refs
    }
}

impl<I> fmt::Debug for Component<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("source_path", &self.source_path)
            .field("deps", &self.deps)
            .field("style_refs", &self.style_refs)
            .field("materialized", &self.instance.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Registry
// ============================================================================

pub struct Registry<I> {
    components: Vec<Component<I>>,
    index: FxHashMap<String, ComponentId>,
    stage: Stage,
}

impl<I> Default for Registry<I> {
    fn default() -> Self {
        Self {
            components: Vec::new(),
            index: FxHashMap::default(),
            stage: Stage::Loaded,
        }
    }
}

impl<I> fmt::Debug for Registry<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("stage", &self.stage)
            .field("components", &self.components)
            .finish()
    }
}

impl<I> Registry<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component. Names are unique; the registry drops back to
    /// [`Stage::Loaded`].
    pub fn insert(&mut self, component: Component<I>) -> Result<ComponentId, BuildError> {
        if let Some(&existing) = self.index.get(&component.name) {
            return Err(BuildError::DuplicateComponent {
                name: component.name,
                first: self.get(existing).source_path.clone(),
                second: component.source_path,
            });
        }

        let id = ComponentId(self.components.len());
        self.index.insert(component.name.clone(), id);
        self.components.push(component);
        self.stage = Stage::Loaded;
        Ok(id)
    }

    pub fn get(&self, id: ComponentId) -> &Component<I> {
        &self.components[id.0]
    }

    fn get_mut(&mut self, id: ComponentId) -> &mut Component<I> {
        &mut self.components[id.0]
    }

    pub fn id_of(&self, name: &str) -> Option<ComponentId> {
        self.index.get(name).copied()
    }

    #[cfg(test)]
    pub fn lookup(&self, name: &str) -> Option<&Component<I>> {
        self.id_of(name).map(|id| self.get(id))
    }

    pub fn ids(&self) -> impl Iterator<Item = ComponentId> + use<I> {
        (0..self.components.len()).map(ComponentId)
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &Component<I>> {
        self.components.iter()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    #[cfg(test)]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    pub fn require(&self, stage: Stage) -> Result<(), BuildError> {
        if self.stage < stage {
            return Err(BuildError::RegistryNotReady {
                expected: stage,
                actual: self.stage,
            });
        }
        Ok(())
    }

    /// Registered components among `tags`, keeping tag order.
    pub fn resolve_tags(&self, tags: &[String]) -> Deps {
        tags.iter().filter_map(|tag| self.id_of(tag)).collect()
    }

    /// Compute every component's direct dependencies from its template.
    ///
    /// Unknown tags (native elements, unregistered names) are ignored; a
    /// component naming itself gets a self edge.
    pub fn link(&mut self) {
        for id in self.ids() {
            let deps = self.resolve_tags(&scan_tags(self.get(id).template()));
            self.get_mut(id).deps = deps;
        }
        self.stage = Stage::Linked;
    }

    /// Fail with the offending path if the dependency graph has a cycle.
    pub fn check_cycles(&mut self) -> Result<(), BuildError> {
        self.require(Stage::Linked)?;
        if let Some(cycle) = find_cycle(self) {
            return Err(BuildError::Cycle(cycle));
        }
        self.stage = self.stage.max(Stage::Checked);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Registry from `(name, template, styles)` triples, not yet linked.
    pub fn registry<I>(defs: &[(&str, &str, &[&str])]) -> Registry<I> {
        let mut registry = Registry::new();
        for (name, template, styles) in defs {
            let source = ComponentSource {
                template: (*template).to_owned(),
                ..Default::default()
            };
            let exports = ExportedConfig::default().with_styles(styles.iter().copied());
            let path = format!("/components/{name}.vue");
            let component = Component::new(*name, path, source, exports);
            registry.insert(component).unwrap();
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::testing::registry;
    use super::*;

    fn bare(name: &str, path: &str) -> Component<()> {
        Component::new(name, path, ComponentSource::default(), ExportedConfig::default())
    }

    #[test]
    fn test_insert_rejects_duplicate_names() {
        let mut reg: Registry<()> = registry(&[("Card", "<div/>", &[])]);
        let dup = bare("Card", "/other/Card.vue");

        let err = reg.insert(dup).unwrap_err();
        assert!(matches!(
            err,
            BuildError::DuplicateComponent { ref name, .. } if name == "Card"
        ));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_link_ignores_unknown_tags() {
        let mut reg: Registry<()> = registry(&[
            ("Page", "<div><Card/><span>x</span><Unknown/><Nav/></div>", &[]),
            ("Card", "<p>card</p>", &[]),
            ("Nav", "<nav/>", &[]),
        ]);
        reg.link();

        let page = reg.lookup("Page").unwrap();
        let names: Vec<_> = page.deps.iter().map(|id| reg.get(*id).name.as_str()).collect();
        assert_eq!(names, vec!["Card", "Nav"]);
        assert!(reg.lookup("Card").unwrap().deps.is_empty());
        assert_eq!(reg.stage(), Stage::Linked);
    }

    #[test]
    fn test_link_keeps_self_edge() {
        let mut reg: Registry<()> = registry(&[("Tree", "<ul><Tree/></ul>", &[])]);
        reg.link();
        let tree = reg.lookup("Tree").unwrap();
        assert_eq!(tree.deps.as_slice(), &[reg.id_of("Tree").unwrap()]);
    }

    #[test]
    fn test_passes_require_previous_stage() {
        let mut reg: Registry<()> = registry(&[("A", "<p/>", &[])]);

        assert!(matches!(
            reg.check_cycles(),
            Err(BuildError::RegistryNotReady { expected: Stage::Linked, actual: Stage::Loaded })
        ));
        assert!(reg.aggregate_styles().is_err());

        reg.link();
        reg.check_cycles().unwrap();
        assert_eq!(reg.stage(), Stage::Checked);
        reg.aggregate_styles().unwrap();
    }

    #[test]
    fn test_insert_resets_stage() {
        let mut reg: Registry<()> = registry(&[("A", "<p/>", &[])]);
        reg.link();
        reg.check_cycles().unwrap();

        reg.insert(bare("B", "/components/B.vue")).unwrap();
        assert_eq!(reg.stage(), Stage::Loaded);
    }
}
