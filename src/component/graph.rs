//! Depth-first traversal of the dependency graph.
//!
//! One iterative walk serves both cycle detection and build ordering. Every
//! component is a root, so disconnected parts of the graph are covered.
//!
//! ```text
//! Unvisited ──push──► InProgress ──all deps done──► Completed
//!                         │
//!                         └── edge back to an InProgress node = cycle
//! ```

use super::{ComponentId, Registry};
use crate::compiler::BuildError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Completed,
}

/// Post-order over all components, or the first cycle found.
///
/// A cycle is reported as the path that closes it: `[X, Y, X]`.
fn depth_first<I>(registry: &Registry<I>) -> Result<Vec<ComponentId>, Vec<ComponentId>> {
    let mut marks = vec![Mark::Unvisited; registry.len()];
    let mut order = Vec::with_capacity(registry.len());
    // (component, index of the next dependency to visit)
    let mut stack: Vec<(ComponentId, usize)> = Vec::new();

    for root in registry.ids() {
        if marks[root.index()] != Mark::Unvisited {
            continue;
        }
        marks[root.index()] = Mark::InProgress;
        stack.push((root, 0));

        while let Some(frame) = stack.last_mut() {
            let (id, next) = *frame;
            let Some(&dep) = registry.get(id).deps.get(next) else {
                marks[id.index()] = Mark::Completed;
                order.push(id);
                stack.pop();
                continue;
            };
            frame.1 += 1;

            match marks[dep.index()] {
                Mark::Unvisited => {
                    marks[dep.index()] = Mark::InProgress;
                    stack.push((dep, 0));
                }
                Mark::InProgress => {
                    let start = stack.iter().position(|(f, _)| *f == dep).unwrap_or(0);
                    let mut cycle: Vec<_> = stack[start..].iter().map(|(f, _)| *f).collect();
                    cycle.push(dep);
                    return Err(cycle);
                }
                Mark::Completed => {}
            }
        }
    }

    Ok(order)
}

/// Names along the first dependency cycle, if any.
///
/// Only meaningful on a linked registry; before linking there are no edges.
pub fn find_cycle<I>(registry: &Registry<I>) -> Option<Vec<String>> {
    depth_first(registry).err().map(|cycle| {
        cycle
            .into_iter()
            .map(|id| registry.get(id).name.clone())
            .collect()
    })
}

#[cfg(test)]
pub fn has_cycle<I>(registry: &Registry<I>) -> bool {
    depth_first(registry).is_err()
}

/// Dependencies before dependents; each component exactly once.
pub(super) fn post_order<I>(registry: &Registry<I>) -> Result<Vec<ComponentId>, BuildError> {
    depth_first(registry).map_err(|_| {
        BuildError::Cycle(find_cycle(registry).unwrap_or_default())
    })
}

#[cfg(test)]
mod tests {
    use super::super::testing::registry;
    use super::*;

    fn linked(defs: &[(&str, &str, &[&str])]) -> Registry<()> {
        let mut reg = registry(defs);
        reg.link();
        reg
    }

    fn names(reg: &Registry<()>, ids: Vec<ComponentId>) -> Vec<&str> {
        ids.into_iter().map(|id| reg.get(id).name.as_str()).collect()
    }

    #[test]
    fn test_acyclic_chain() {
        let reg = linked(&[("A", "<B/>", &[]), ("B", "<C/>", &[]), ("C", "<p/>", &[])]);
        assert!(!has_cycle(&reg));
        assert_eq!(names(&reg, post_order(&reg).unwrap()), vec!["C", "B", "A"]);
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let reg = linked(&[
            ("Top", "<Left/><Right/>", &[]),
            ("Left", "<Base/>", &[]),
            ("Right", "<Base/>", &[]),
            ("Base", "", &[]),
        ]);
        assert!(!has_cycle(&reg));

        let order = names(&reg, post_order(&reg).unwrap());
        assert_eq!(order, vec!["Base", "Left", "Right", "Top"]);
    }

    #[test]
    fn test_forest() {
        let reg = linked(&[("A", "<B/>", &[]), ("B", "", &[]), ("X", "<Y/>", &[]), ("Y", "", &[])]);
        assert!(!has_cycle(&reg));
        assert_eq!(post_order(&reg).unwrap().len(), 4);
    }

    #[test]
    fn test_two_cycle() {
        let reg = linked(&[("X", "<Y/>", &[]), ("Y", "<X/>", &[])]);
        assert!(has_cycle(&reg));
        assert_eq!(find_cycle(&reg).unwrap(), vec!["X", "Y", "X"]);
        assert!(matches!(post_order(&reg), Err(BuildError::Cycle(_))));
    }

    #[test]
    fn test_self_loop() {
        let reg = linked(&[("Tree", "<Tree/>", &[])]);
        assert_eq!(find_cycle(&reg).unwrap(), vec!["Tree", "Tree"]);
    }

    #[test]
    fn test_long_cycle_behind_acyclic_root() {
        let reg = linked(&[
            ("Root", "<A/>", &[]),
            ("A", "<B/>", &[]),
            ("B", "<C/>", &[]),
            ("C", "<A/>", &[]),
        ]);
        assert_eq!(find_cycle(&reg).unwrap(), vec!["A", "B", "C", "A"]);
    }

    #[test]
    fn test_unlinked_registry_has_no_edges() {
        let reg: Registry<()> = registry(&[("X", "<Y/>", &[]), ("Y", "<X/>", &[])]);
        assert!(!has_cycle(&reg));
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let names: Vec<String> = (0..5000).map(|i| format!("C{i}")).collect();
        let templates: Vec<String> = (0..5000)
            .map(|i| if i + 1 < 5000 { format!("<C{}/>", i + 1) } else { String::new() })
            .collect();
        let defs: Vec<(&str, &str, &[&str])> = names
            .iter()
            .zip(&templates)
            .map(|(n, t)| (n.as_str(), t.as_str(), &[][..]))
            .collect();
        let reg = linked(&defs);

        let order = post_order(&reg).unwrap();
        assert_eq!(reg.get(order[0]).name, "C4999");
        assert_eq!(reg.get(order[4999]).name, "C0");
    }
}
