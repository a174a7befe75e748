//! Candidate collection and the frozen candidate set.
//!
//! Collection is the only concurrent phase. Each provider runs on its own
//! scoped worker thread and sends its batch through a channel; a single merge
//! step on the calling thread deduplicates the batches into a
//! [`CandidateSet`]. Once built, the set is immutable and every analysis
//! phase reads it single-threaded.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc;
use std::thread;

use crate::descriptors::CandidateType;
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::error::PlanError;
use crate::key::{AssemblyRef, TypeRef};
use crate::provider::CandidateProvider;

/// Frozen, name-ordered set of candidate types.
///
/// Iteration order is ordinal by full name, independent of the order the
/// candidates were supplied in.
///
/// # Examples
///
/// ```rust
/// use ferrous_plan::{CandidateSet, CandidateType};
///
/// let set: CandidateSet = vec![
///     CandidateType::class("App.Logger").implements("App.ILogger"),
///     CandidateType::interface("App.ILogger"),
///     CandidateType::class("App.FileLogger").implements("App.ILogger"),
/// ]
/// .into_iter()
/// .collect();
///
/// let logger_iface = "App.ILogger".into();
/// let names: Vec<_> = set
///     .implementors(&logger_iface)
///     .map(|t| t.full_name.name())
///     .collect();
/// assert_eq!(names, ["App.FileLogger", "App.Logger"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSet {
    by_name: BTreeMap<TypeRef, CandidateType>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set, collapsing duplicates.
    ///
    /// Identical records with the same name collapse silently. Differing
    /// records keep the one from the first source unit (then the smallest
    /// debug rendering, so the choice never depends on input order) and
    /// report a conflict.
    pub fn build<I>(candidates: I, diagnostics: &mut Vec<Diagnostic>) -> Self
    where
        I: IntoIterator<Item = CandidateType>,
    {
        let mut groups: BTreeMap<TypeRef, Vec<CandidateType>> = BTreeMap::new();
        for candidate in candidates {
            groups.entry(candidate.full_name.clone()).or_default().push(candidate);
        }

        let mut by_name = BTreeMap::new();
        for (name, mut group) in groups {
            group.sort_by_cached_key(|c| (c.source_unit.clone(), format!("{:?}", c)));
            group.dedup();
            let mut group = group.into_iter();
            let Some(kept) = group.next() else { continue };
            let dropped: Vec<_> = group.map(|c| c.source_unit.to_string()).collect();
            if !dropped.is_empty() {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::ConflictingCandidate,
                        format!(
                            "'{}' discovered with conflicting metadata; keeping the record from '{}', ignoring [{}]",
                            name,
                            kept.source_unit,
                            dropped.join(", ")
                        ),
                    )
                    .with_subject(name.clone())
                    .with_unit(kept.source_unit.clone()),
                );
            }
            by_name.insert(name, kept);
        }
        Self { by_name }
    }

    pub fn get(&self, name: &TypeRef) -> Option<&CandidateType> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &TypeRef) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CandidateType> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Concrete candidates assignable to `target`, in name order.
    pub fn implementors<'s>(&'s self, target: &'s TypeRef) -> impl Iterator<Item = &'s CandidateType> + 's {
        self.by_name
            .values()
            .filter(move |c| c.is_concrete() && c.is_assignable_to(target))
    }

    /// Source units present in the set.
    pub fn units(&self) -> BTreeSet<AssemblyRef> {
        self.by_name.values().map(|c| c.source_unit.clone()).collect()
    }
}

impl FromIterator<CandidateType> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = CandidateType>>(iter: I) -> Self {
        let mut ignored = Vec::new();
        Self::build(iter, &mut ignored)
    }
}

/// A provider that failed; other providers still contribute.
#[derive(Debug)]
pub struct ProviderFailure {
    pub unit: AssemblyRef,
    pub error: PlanError,
}

/// Result of running every provider of a collection.
#[derive(Debug)]
pub struct Collected {
    pub candidates: CandidateSet,
    pub diagnostics: Vec<Diagnostic>,
    pub failures: Vec<ProviderFailure>,
}

/// Accumulates providers and loose candidates for one planning pass.
///
/// # Examples
///
/// ```rust
/// use ferrous_plan::{CandidateCollection, CandidateType};
///
/// let mut collection = CandidateCollection::new();
/// collection
///     .add_candidate(CandidateType::class("App.Logger"))
///     .add_candidate(CandidateType::class("App.Logger"));
///
/// let collected = collection.collect();
/// assert_eq!(collected.candidates.len(), 1);
/// assert!(collected.diagnostics.is_empty());
/// ```
#[derive(Default)]
pub struct CandidateCollection {
    providers: Vec<Box<dyn CandidateProvider>>,
    loose: Vec<CandidateType>,
}

impl CandidateCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_provider(&mut self, provider: impl CandidateProvider + 'static) -> &mut Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn add_candidate(&mut self, candidate: CandidateType) -> &mut Self {
        self.loose.push(candidate);
        self
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Runs all providers concurrently and merges their output.
    pub fn collect(&self) -> Collected {
        let (tx, rx) = mpsc::channel();

        thread::scope(|scope| {
            for provider in &self.providers {
                let tx = tx.clone();
                scope.spawn(move || {
                    let unit = provider.unit();
                    let _span = tracing::debug_span!("collect", unit = %unit).entered();
                    let batch = provider.provide();
                    // The receiver outlives the scope, so sending cannot fail
                    let _ = tx.send((unit, batch));
                });
            }
        });
        drop(tx);

        let mut batches: Vec<_> = rx.into_iter().collect();
        batches.sort_by(|a, b| a.0.cmp(&b.0));

        let mut failures = Vec::new();
        let mut all = self.loose.clone();
        for (unit, batch) in batches {
            match batch {
                Ok(candidates) => {
                    tracing::debug!(unit = %unit, count = candidates.len(), "collected candidates");
                    all.extend(candidates);
                }
                Err(error) => {
                    tracing::warn!(unit = %unit, error = %error, "candidate provider failed");
                    failures.push(ProviderFailure { unit, error });
                }
            }
        }

        let mut diagnostics = Vec::new();
        let candidates = CandidateSet::build(all, &mut diagnostics);
        Collected { candidates, diagnostics, failures }
    }
}
