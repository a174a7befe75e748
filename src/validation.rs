//! Lifetime validation over the dependency graph.
//!
//! A consumer that outlives one of its dependencies keeps that dependency
//! alive past its intended lifetime (a captive dependency).
//!
//! # Validation Rules
//!
//! - **Transient consumer**: never flagged, whatever it depends on
//! - **Singleton → Scoped / Transient**: mismatch
//! - **Scoped → Transient**: mismatch
//! - **Disposable captive**: a mismatch where both lifetimes are explicit, the
//!   dependency is a concrete constructor parameter (not reached through an
//!   interface) and it implements a disposal contract
//!
//! Excluded consumers and excluded dependencies are skipped; framework
//! parameters never produced edges in the first place.

use std::fmt;

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::graph::{DependencyEdge, DependencyGraph, Resolution};
use crate::key::TypeRef;
use crate::lifetime::Lifetime;

/// A consumer holding a shorter-lived dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifetimeMismatch {
    pub consumer: TypeRef,
    pub consumer_lifetime: Lifetime,
    pub dependency: TypeRef,
    pub dependency_lifetime: Lifetime,
    /// Qualifies for the stricter disposable-captive check
    pub is_disposable: bool,
}

impl LifetimeMismatch {
    pub fn code(&self) -> DiagnosticCode {
        if self.is_disposable {
            DiagnosticCode::DisposableCaptive
        } else {
            DiagnosticCode::LifetimeMismatch
        }
    }
}

impl fmt::Display for LifetimeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_disposable {
            write!(
                f,
                "{} service '{}' captures disposable {} service '{}'; it will be disposed while still in use",
                self.consumer_lifetime, self.consumer, self.dependency_lifetime, self.dependency
            )
        } else {
            write!(
                f,
                "{} service '{}' depends on {} service '{}' and will hold a single instance of it",
                self.consumer_lifetime, self.consumer, self.dependency_lifetime, self.dependency
            )
        }
    }
}

/// Checks every graph edge for captive dependencies.
///
/// # Examples
///
/// ```rust
/// use ferrous_plan::{CandidateSet, CandidateType, Classifications, DependencyGraphBuilder, FrameworkTypes, Lifetime, LifetimeVerifier, TypeClassifier};
///
/// let candidates: CandidateSet = vec![
///     CandidateType::class("App.Cache").lifetime(Lifetime::Singleton).ctor(["App.Session"]),
///     CandidateType::class("App.Session").lifetime(Lifetime::Scoped),
/// ]
/// .into_iter()
/// .collect();
/// let framework = FrameworkTypes::default();
/// let mut diagnostics = Vec::new();
/// let classes = Classifications::compute(&candidates, &TypeClassifier::new(&framework), &mut diagnostics);
/// let graph = DependencyGraphBuilder::new(&candidates, &classes, &framework).build(&mut diagnostics);
///
/// let mismatches = LifetimeVerifier::new(&graph).verify();
/// assert_eq!(mismatches.len(), 1);
/// assert_eq!(mismatches[0].consumer_lifetime, Lifetime::Singleton);
/// assert!(!mismatches[0].is_disposable);
/// ```
pub struct LifetimeVerifier<'g> {
    graph: &'g DependencyGraph,
    strict_disposable_check: bool,
}

impl<'g> LifetimeVerifier<'g> {
    pub fn new(graph: &'g DependencyGraph) -> Self {
        Self {
            graph,
            strict_disposable_check: true,
        }
    }

    /// Disables the disposable-captive refinement; every mismatch is then
    /// reported as a plain lifetime mismatch.
    pub fn strict_disposable_check(mut self, enabled: bool) -> Self {
        self.strict_disposable_check = enabled;
        self
    }

    /// One mismatch per offending edge, in edge order.
    pub fn verify(&self) -> Vec<LifetimeMismatch> {
        self.graph.edges().filter_map(|edge| self.check(edge)).collect()
    }

    /// Verifies and reports one diagnostic per mismatch.
    pub fn verify_into(&self, diagnostics: &mut Vec<Diagnostic>) -> Vec<LifetimeMismatch> {
        let mismatches = self.verify();
        for m in &mismatches {
            let mut diagnostic = Diagnostic::new(m.code(), m.to_string()).with_subject(m.consumer.clone());
            if let Some(node) = self.graph.node(&m.consumer) {
                diagnostic = diagnostic.with_unit(node.unit.clone());
            }
            diagnostics.push(diagnostic);
        }
        mismatches
    }

    fn check(&self, edge: &DependencyEdge) -> Option<LifetimeMismatch> {
        let consumer = self.graph.node(&edge.from)?;
        let dependency = self.graph.node(&edge.to)?;
        let consumer_lt = consumer.lifetime?;
        let dependency_lt = dependency.lifetime?;

        if consumer_lt.lifetime == Lifetime::Transient || !consumer_lt.lifetime.outlives(dependency_lt.lifetime) {
            return None;
        }

        let is_disposable = self.strict_disposable_check
            && consumer_lt.explicit
            && dependency_lt.explicit
            && edge.resolution == Resolution::Direct
            && dependency.disposable;

        Some(LifetimeMismatch {
            consumer: edge.from.clone(),
            consumer_lifetime: consumer_lt.lifetime,
            dependency: edge.to.clone(),
            dependency_lifetime: dependency_lt.lifetime,
            is_disposable,
        })
    }
}
