//! Renderer instances for every component, dependencies first.

use super::{ComponentId, Registry, Stage, graph::post_order};
use crate::{
    compiler::BuildError,
    render::{InstanceSpec, Renderer},
};
use rustc_hash::FxHashMap;
use std::sync::Arc;

impl<I> Registry<I> {
    /// Build an instance for each component.
    ///
    /// Runs in post-order, so every direct dependency already has its
    /// instance when a component is handed to the renderer.
    pub fn materialize<R>(&mut self, renderer: &R) -> Result<(), BuildError>
    where
        R: Renderer<Instance = I>,
    {
        self.require(Stage::Styled)?;

        for id in post_order(self)? {
            let component = self.get(id);
            let spec = InstanceSpec {
                name: &component.name,
                template: component.template(),
                exports: &component.exports,
                dependencies: self.dependency_instances(&component.deps),
            };
            let instance = renderer
                .instantiate(spec)
                .map_err(|err| BuildError::render(&component.source_path, err))?;
            self.get_mut(id).instance = Some(Arc::new(instance));
        }

        self.stage = Stage::Materialized;
        Ok(())
    }

    /// Tag name → instance for the materialized components among `deps`.
    pub fn dependency_instances(&self, deps: &[ComponentId]) -> FxHashMap<String, Arc<I>> {
        deps.iter()
            .map(|&id| self.get(id))
            .filter_map(|dep| Some((dep.name.clone(), Arc::clone(dep.instance.as_ref()?))))
            .collect()
    }

    /// Run every pass in order: link, cycle check, styles, instances.
    pub fn prepare<R>(&mut self, renderer: &R) -> Result<(), BuildError>
    where
        R: Renderer<Instance = I>,
    {
        self.link();
        self.check_cycles()?;
        self.aggregate_styles()?;
        self.materialize(renderer)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::registry;
    use super::*;
    use crate::render::RenderError;
    use parking_lot::Mutex;
    use serde_json::Value;

    /// Records `(name, dependency names)` per instantiation and checks that
    /// each dependency was built earlier.
    #[derive(Default)]
    struct Recorder {
        built: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl Renderer for Recorder {
        type Instance = String;

        fn instantiate(&self, spec: InstanceSpec<'_, String>) -> Result<String, RenderError> {
            let mut built = self.built.lock();
            let mut deps: Vec<String> = spec.dependencies.keys().cloned().collect();
            deps.sort();
            for (dep, instance) in &spec.dependencies {
                assert_eq!(instance.as_str(), dep);
                assert!(built.iter().any(|(name, _)| name == dep));
            }
            built.push((spec.name.to_owned(), deps));
            Ok(spec.name.to_owned())
        }

        fn render(&self, instance: &String, _data: &Value) -> Result<String, RenderError> {
            Ok(instance.clone())
        }
    }

    #[test]
    fn test_dependencies_exist_before_dependents() {
        let mut reg = registry(&[
            ("A", "<B/><C/>", &[]),
            ("B", "<C/><D/>", &[]),
            ("C", "<D/>", &[]),
            ("D", "", &[]),
        ]);
        let renderer = Recorder::default();
        reg.prepare(&renderer).unwrap();

        let built = renderer.built.lock();
        let order: Vec<_> = built.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(order, vec!["D", "C", "B", "A"]);
        assert_eq!(built[3].1, vec!["B", "C"]);
        assert!(reg.iter().all(|c| c.instance.is_some()));
        assert_eq!(reg.stage(), Stage::Materialized);
    }

    #[test]
    fn test_each_component_instantiated_once() {
        let mut reg = registry(&[
            ("Top", "<Left/><Right/>", &[]),
            ("Left", "<Base/>", &[]),
            ("Right", "<Base/>", &[]),
            ("Base", "", &[]),
        ]);
        let renderer = Recorder::default();
        reg.prepare(&renderer).unwrap();
        assert_eq!(renderer.built.lock().len(), 4);
    }

    #[test]
    fn test_cycle_stops_before_materializing() {
        let mut reg = registry(&[("X", "<Y/>", &[]), ("Y", "<X/>", &[])]);
        let renderer = Recorder::default();

        assert!(matches!(reg.prepare(&renderer), Err(BuildError::Cycle(_))));
        assert!(renderer.built.lock().is_empty());
        assert!(reg.iter().all(|c| c.instance.is_none()));
    }

    #[test]
    fn test_materialize_requires_styles() {
        let mut reg = registry(&[("A", "", &[])]);
        reg.link();
        reg.check_cycles().unwrap();
        assert!(matches!(
            reg.materialize(&Recorder::default()),
            Err(BuildError::RegistryNotReady { expected: Stage::Styled, .. })
        ));
    }
}
