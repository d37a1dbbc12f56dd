//! Stylesheet aggregation.
//!
//! Every component ends up with its own styles first, followed by each
//! direct dependency's aggregated list in declaration order, skipping paths
//! already present. Pages consume the list in reverse, so deeper components'
//! styles come first in the emitted `<style>` and the page's own win.

use super::{Registry, Stage, graph::post_order};
use crate::compiler::BuildError;
use rustc_hash::FxHashSet;

/// Ordered stylesheet references without repeats.
#[derive(Debug, Clone, Default)]
pub struct StyleList {
    refs: Vec<String>,
    seen: FxHashSet<String>,
}

impl StyleList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `style` unless already present. Returns whether it was added.
    pub fn push(&mut self, style: &str) -> bool {
        if self.seen.contains(style) {
            return false;
        }
        self.seen.insert(style.to_owned());
        self.refs.push(style.to_owned());
        true
    }

    pub fn extend<S: AsRef<str>>(&mut self, styles: impl IntoIterator<Item = S>) {
        for style in styles {
            self.push(style.as_ref());
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.refs
    }

    pub fn into_vec(self) -> Vec<String> {
        self.refs
    }
}

impl<I> Registry<I> {
    /// Fill every component's `style_refs`, dependencies first.
    ///
    /// Lists are rebuilt from the declared styles on each call, so running it
    /// twice gives the same result.
    pub fn aggregate_styles(&mut self) -> Result<(), BuildError> {
        self.require(Stage::Checked)?;

        for id in post_order(self)? {
            let component = self.get(id);
            let mut list = StyleList::new();
            list.extend(component.own_styles());
            for dep in &component.deps {
                list.extend(&self.get(*dep).style_refs);
            }
            self.get_mut(id).style_refs = list.into_vec();
        }

        self.stage = self.stage.max(Stage::Styled);
        Ok(())
    }
}
