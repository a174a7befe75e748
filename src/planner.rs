//! Planning pass orchestration.
//!
//! A [`Planner`] runs every analysis phase over one frozen [`CandidateSet`]
//! and returns a [`PlanReport`]. All state a pass needs travels in the
//! [`PlanContext`]; there is no process-wide registry.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::assembly_order::AssemblyOrderResolver;
use crate::cancellation::CancellationToken;
use crate::circular::{Cycle, CycleDetector};
use crate::classify::{Classifications, TypeClassifier};
use crate::collection::{CandidateCollection, CandidateSet, ProviderFailure};
use crate::config::PlannerConfig;
use crate::decoration::{Chains, DecoratorChainResolver};
use crate::diagnostics::{Diagnostic, DiagnosticSink, Severity, SeverityCounts};
use crate::error::PlanResult;
use crate::graph::{DependencyGraph, DependencyGraphBuilder};
use crate::key::AssemblyRef;
use crate::plugins::PluginDeduplicator;
use crate::registration::{merge_plans, RegistrationPlan, RegistrationPlanAssembler};
use crate::validation::{LifetimeMismatch, LifetimeVerifier};

/// Everything a planning pass reads besides its candidates.
#[derive(Clone, Default)]
pub struct PlanContext {
    pub config: PlannerConfig,
    pub cancellation: CancellationToken,
    sinks: Vec<Arc<dyn DiagnosticSink>>,
}

impl PlanContext {
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Adds a sink notified with every diagnostic once a pass completes.
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    fn publish(&self, diagnostics: &[Diagnostic]) {
        for sink in &self.sinks {
            for diagnostic in diagnostics {
                sink.report(diagnostic);
            }
        }
    }
}

impl fmt::Debug for PlanContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanContext")
            .field("config", &self.config)
            .field("cancellation", &self.cancellation)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

/// Result of one planning pass: the plan plus every finding.
#[derive(Debug)]
pub struct PlanReport {
    pub plan: RegistrationPlan,
    pub graph: DependencyGraph,
    pub cycles: Vec<Cycle>,
    pub mismatches: Vec<LifetimeMismatch>,
    pub chains: Chains,
    /// In phase order: collection, classification, graph, cycles, lifetimes,
    /// chains, merge
    pub diagnostics: Vec<Diagnostic>,
    /// Providers that failed during collection
    pub failures: Vec<ProviderFailure>,
}

impl PlanReport {
    /// Returns true if no error-severity diagnostic was reported.
    pub fn is_valid(&self) -> bool {
        !self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    /// Returns true if there are warnings.
    pub fn has_warnings(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Warning)
    }

    pub fn counts(&self) -> SeverityCounts {
        SeverityCounts::of(&self.diagnostics)
    }

    /// Diagnostics of one severity, in report order.
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.severity == severity)
    }

    /// Formats errors and warnings for display.
    pub fn format_issues(&self) -> String {
        let mut output = String::new();

        for (title, severity) in [
            ("Plan Errors", Severity::Error),
            ("Plan Warnings", Severity::Warning),
        ] {
            let mut items = self.with_severity(severity).peekable();
            if items.peek().is_none() {
                continue;
            }
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(title);
            output.push_str(":\n");
            for d in items {
                output.push_str(&format!("  - {} {}\n", d.code.id(), d.message));
            }
        }

        if !self.failures.is_empty() {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str("Provider Failures:\n");
            for failure in &self.failures {
                output.push_str(&format!("  - {}: {}\n", failure.unit, failure.error));
            }
        }

        output
    }
}

/// Runs planning passes.
///
/// # Examples
///
/// ```rust
/// use ferrous_plan::{CandidateSet, CandidateType, Lifetime, PlanContext, Planner, PlannerConfig};
///
/// let candidates: CandidateSet = vec![
///     CandidateType::interface("App.ILogger"),
///     CandidateType::class("App.Logger").implements("App.ILogger"),
///     CandidateType::class("App.Repo").ctor(["App.Logger"]),
///     CandidateType::class("App.Service").ctor(["App.Repo", "App.ILogger"]),
/// ]
/// .into_iter()
/// .collect();
///
/// let report = Planner::new(PlanContext::new(PlannerConfig::default())).plan(&candidates).unwrap();
/// assert!(report.cycles.is_empty());
/// assert!(report.mismatches.is_empty());
/// assert!(report.is_valid());
/// assert_eq!(report.plan.entry(&"App.Service".into()).unwrap().lifetime, Lifetime::Singleton);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Planner {
    context: PlanContext,
}

impl Planner {
    pub fn new(context: PlanContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &PlanContext {
        &self.context
    }

    /// Analyses a frozen candidate set.
    ///
    /// Returns `Err(PlanError::Cancelled)` if the token was cancelled before
    /// analysis began; no sink is notified in that case.
    pub fn plan(&self, candidates: &CandidateSet) -> PlanResult<PlanReport> {
        self.plan_with(candidates, Vec::new(), Vec::new())
    }

    /// Collects candidates from every provider, then analyses them.
    pub fn plan_collection(&self, collection: &CandidateCollection) -> PlanResult<PlanReport> {
        let collected = collection.collect();
        self.plan_with(&collected.candidates, collected.diagnostics, collected.failures)
    }

    /// Merges per-unit reports into one plan in configured assembly order.
    ///
    /// Findings of every unit are kept in that order, followed by merge
    /// findings. Decorator and interceptor chains of all units are combined
    /// per service, so the result does not depend on the order units are
    /// passed in.
    pub fn merge<I>(&self, units: I) -> PlanResult<PlanReport>
    where
        I: IntoIterator<Item = (AssemblyRef, PlanReport)>,
    {
        self.context.cancellation.check()?;
        let _span = tracing::info_span!("merge").entered();

        let mut by_unit: BTreeMap<AssemblyRef, Vec<PlanReport>> = BTreeMap::new();
        for (unit, report) in units {
            by_unit.entry(unit).or_default().push(report);
        }
        let order = AssemblyOrderResolver::new(self.context.config.assembly_order.clone())
            .resolve(by_unit.keys().cloned());

        let mut diagnostics = Vec::new();
        let mut cycles = Vec::new();
        let mut mismatches = Vec::new();
        let mut failures = Vec::new();
        let mut decorators = Vec::new();
        let mut interceptors = Vec::new();
        let mut plans = Vec::new();

        for unit in order {
            let Some(reports) = by_unit.remove(&unit) else { continue };
            for report in reports {
                diagnostics.extend(report.diagnostics);
                cycles.extend(report.cycles);
                mismatches.extend(report.mismatches);
                failures.extend(report.failures);
                decorators.extend(report.chains.decorators.into_values().flat_map(|c| c.entries));
                interceptors.extend(report.chains.interceptors.into_values().flat_map(|c| c.entries));
                plans.push((unit.clone(), report.plan));
            }
        }

        let resolver = DecoratorChainResolver::new();
        let chains = Chains {
            decorators: resolver.resolve(decorators),
            interceptors: resolver.resolve(interceptors),
        };

        let mut merge_diagnostics = Vec::new();
        let plan = merge_plans(plans, &self.context.config.assembly_order, &mut merge_diagnostics);
        self.context.publish(&merge_diagnostics);
        diagnostics.extend(merge_diagnostics);

        Ok(PlanReport {
            plan,
            graph: DependencyGraph::default(),
            cycles,
            mismatches,
            chains,
            diagnostics,
            failures,
        })
    }

    fn plan_with(
        &self,
        candidates: &CandidateSet,
        mut diagnostics: Vec<Diagnostic>,
        failures: Vec<ProviderFailure>,
    ) -> PlanResult<PlanReport> {
        // The only cancellation point
        self.context.cancellation.check()?;

        let config = &self.context.config;
        let framework = &config.framework;
        let _pass = tracing::info_span!("plan", candidates = candidates.len()).entered();

        let classifier = TypeClassifier::new(framework);
        let classes = {
            let _span = tracing::debug_span!("classify").entered();
            Classifications::compute(candidates, &classifier, &mut diagnostics)
        };

        let graph = {
            let _span = tracing::debug_span!("graph").entered();
            DependencyGraphBuilder::new(candidates, &classes, framework).build(&mut diagnostics)
        };

        let cycles = {
            let _span = tracing::debug_span!("cycles").entered();
            CycleDetector::new(&graph).detect_into(&mut diagnostics)
        };

        let mismatches = {
            let _span = tracing::debug_span!("lifetimes").entered();
            LifetimeVerifier::new(&graph)
                .strict_disposable_check(config.strict_disposable_check)
                .verify_into(&mut diagnostics)
        };

        let chains = {
            let _span = tracing::debug_span!("decorators").entered();
            DecoratorChainResolver::new().resolve_candidates(candidates, &classes, &mut diagnostics)
        };

        let plan = {
            let _span = tracing::debug_span!("assemble").entered();
            let plugins = PluginDeduplicator::discover(candidates, &classes, framework);
            RegistrationPlanAssembler::new(candidates, &classes, &chains, classifier).assemble(plugins)
        };

        let counts = SeverityCounts::of(&diagnostics);
        tracing::info!(
            entries = plan.len(),
            cycles = cycles.len(),
            errors = counts.errors,
            warnings = counts.warnings,
            "planning pass complete"
        );
        self.context.publish(&diagnostics);

        Ok(PlanReport {
            plan,
            graph,
            cycles,
            mismatches,
            chains,
            diagnostics,
            failures,
        })
    }
}
