//! Plugin discovery and run-once execution.
//!
//! A plugin's configuration step has side effects, and discovery can hand the
//! same plugin type back several times (one enumeration pass per unit, a
//! shared unit seen from two hosts). Identity is the plugin type, never an
//! instance, so repeated discoveries collapse into one execution.

use std::collections::BTreeSet;

use crate::classify::Classifications;
use crate::collection::CandidateSet;
use crate::config::FrameworkTypes;
use crate::key::TypeRef;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A discovered plugin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PluginEntry {
    pub plugin_type: TypeRef,
    /// Plugin contracts the type implements
    pub interfaces: Vec<TypeRef>,
    pub order: i32,
}

impl PluginEntry {
    pub fn new(plugin_type: impl Into<TypeRef>) -> Self {
        Self {
            plugin_type: plugin_type.into(),
            interfaces: Vec::new(),
            order: 0,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

/// Collects plugin entries and runs each plugin type's step exactly once.
///
/// # Examples
///
/// ```rust
/// use ferrous_plan::{PluginDeduplicator, PluginEntry};
///
/// let mut dedup = PluginDeduplicator::new();
/// let mut runs = Vec::new();
/// for _ in 0..3 {
///     dedup.execute(vec![PluginEntry::new("App.Setup")], |p| runs.push(p.plugin_type.clone()));
/// }
/// assert_eq!(runs.len(), 1);
/// assert!(dedup.has_executed(&"App.Setup".into()));
/// ```
#[derive(Debug, Default, Clone)]
pub struct PluginDeduplicator {
    executed: BTreeSet<TypeRef>,
}

impl PluginDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plugin entries of a candidate set, one per type, in `(order, name)`
    /// order. Exclusion does not hide a plugin.
    pub fn discover(
        candidates: &CandidateSet,
        classifications: &Classifications,
        framework: &FrameworkTypes,
    ) -> Vec<PluginEntry> {
        let entries = candidates.iter().filter_map(|ty| {
            let class = classifications.get(&ty.full_name)?;
            if !class.plugin {
                return None;
            }
            let interfaces = ty
                .declared_interfaces
                .iter()
                .chain(&ty.base_types)
                .filter(|i| framework.is_plugin_contract(i))
                .cloned()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            Some(PluginEntry {
                plugin_type: ty.full_name.clone(),
                interfaces,
                order: ty.order(),
            })
        });
        Self::unique(entries)
    }

    /// Collapses entries by plugin type (the first seen wins) and sorts them
    /// by `(order, name)`.
    pub fn unique<I>(entries: I) -> Vec<PluginEntry>
    where
        I: IntoIterator<Item = PluginEntry>,
    {
        let mut seen = BTreeSet::new();
        let mut unique: Vec<_> = entries
            .into_iter()
            .filter(|e| seen.insert(e.plugin_type.clone()))
            .collect();
        unique.sort_by(|a, b| (a.order, &a.plugin_type).cmp(&(b.order, &b.plugin_type)));
        unique
    }

    /// Runs `step` for every entry whose type has not run yet, in
    /// `(order, name)` order. Returns how many steps ran.
    pub fn execute<I, F>(&mut self, entries: I, mut step: F) -> usize
    where
        I: IntoIterator<Item = PluginEntry>,
        F: FnMut(&PluginEntry),
    {
        let mut ran = 0;
        for entry in Self::unique(entries) {
            if !self.executed.insert(entry.plugin_type.clone()) {
                tracing::trace!(plugin = %entry.plugin_type, "plugin already executed");
                continue;
            }
            tracing::debug!(plugin = %entry.plugin_type, order = entry.order, "executing plugin");
            step(&entry);
            ran += 1;
        }
        ran
    }

    /// Like [`execute`](Self::execute) for fallible steps. A failing step
    /// still counts as executed; the first error stops the run.
    pub fn try_execute<I, F, E>(&mut self, entries: I, mut step: F) -> Result<usize, E>
    where
        I: IntoIterator<Item = PluginEntry>,
        F: FnMut(&PluginEntry) -> Result<(), E>,
    {
        let mut ran = 0;
        for entry in Self::unique(entries) {
            if !self.executed.insert(entry.plugin_type.clone()) {
                continue;
            }
            step(&entry)?;
            ran += 1;
        }
        Ok(ran)
    }

    pub fn has_executed(&self, plugin_type: &TypeRef) -> bool {
        self.executed.contains(plugin_type)
    }

    pub fn executed_count(&self) -> usize {
        self.executed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::TypeClassifier;
    use crate::descriptors::{CandidateType, Marker};

    #[test]
    fn discovery_orders_by_order_then_name() {
        let framework = FrameworkTypes::default();
        let candidates: CandidateSet = vec![
            CandidateType::class("App.B").implements("IServicePlugin"),
            CandidateType::class("App.A").implements("IServicePlugin").marker(Marker::Order(10)),
            CandidateType::class("App.C").marker(Marker::PluginRole).marker(Marker::Excluded),
            CandidateType::class("App.NotAPlugin"),
        ]
        .into_iter()
        .collect();
        let mut diagnostics = Vec::new();
        let classes = Classifications::compute(&candidates, &TypeClassifier::new(&framework), &mut diagnostics);

        let found = PluginDeduplicator::discover(&candidates, &classes, &framework);
        let names: Vec<_> = found.iter().map(|p| p.plugin_type.name()).collect();
        assert_eq!(names, ["App.B", "App.C", "App.A"]);
        assert_eq!(found[0].interfaces, vec![TypeRef::new("IServicePlugin")]);
    }

    #[test]
    fn same_type_in_one_batch_runs_once() {
        let mut dedup = PluginDeduplicator::new();
        let mut count = 0;
        let ran = dedup.execute(
            vec![PluginEntry::new("P"), PluginEntry::new("P").with_order(4), PluginEntry::new("Q")],
            |_| count += 1,
        );
        assert_eq!(ran, 2);
        assert_eq!(count, 2);
    }

    #[test]
    fn failing_step_is_not_retried() {
        let mut dedup = PluginDeduplicator::new();
        let first: Result<usize, &str> = dedup.try_execute(vec![PluginEntry::new("P")], |_| Err("boom"));
        assert!(first.is_err());
        let second: Result<usize, &str> = dedup.try_execute(vec![PluginEntry::new("P")], |_| Ok(()));
        assert_eq!(second, Ok(0));
    }
}
