//! Plan consumers: populating a live container and emitting a manifest.
//!
//! Applying a plan is the one step allowed to turn findings into a failure.
//! [`PlanApplier`] refuses a report with errors, and with warnings too when
//! [`ApplyPolicy::treat_warnings_as_fatal`] is set. Otherwise it hands every
//! registration to a [`ContainerPopulator`] in plan order and then runs each
//! plugin type's configuration step once.

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::config::PlannerConfig;
use crate::diagnostics::{Severity, SeverityCounts};
use crate::error::{PlanError, PlanResult};
use crate::key::{ServiceKey, TypeRef};
use crate::lifetime::Lifetime;
use crate::planner::PlanReport;
use crate::plugins::{PluginDeduplicator, PluginEntry};
use crate::registration::{FactoryDescriptor, ServiceRegistration};

#[cfg(feature = "config")]
use crate::diagnostics::Diagnostic;
#[cfg(feature = "config")]
use crate::registration::RegistrationPlan;

/// Target of plan application, typically an adapter over a real container.
///
/// Calls arrive in plan order. A registration method returning `Err` stops
/// the application.
pub trait ContainerPopulator {
    /// Register a factory that constructs `implementation` (possibly wrapped
    /// in interceptors).
    fn add_constructed(&mut self, registration: &ServiceRegistration) -> PlanResult<()>;

    /// Register `key` as resolving whatever `target` resolves.
    fn add_forward(&mut self, key: &ServiceKey, target: &ServiceKey, lifetime: Lifetime) -> PlanResult<()>;

    /// Register `key` as `inner` wrapped in `chain`, innermost first.
    fn add_decorated(
        &mut self,
        key: &ServiceKey,
        inner: &ServiceKey,
        chain: &[TypeRef],
        lifetime: Lifetime,
    ) -> PlanResult<()>;

    /// Bind `options_type` to a configuration section.
    fn add_options(&mut self, key: &ServiceKey, options_type: &TypeRef, section: &str) -> PlanResult<()>;

    /// Run a plugin's configuration step.
    fn run_plugin(&mut self, plugin: &PluginEntry) -> PlanResult<()>;
}

/// When plan application refuses a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyPolicy {
    /// Refuse reports that carry warnings, not only errors
    pub treat_warnings_as_fatal: bool,
}

impl ApplyPolicy {
    pub fn strict() -> Self {
        Self { treat_warnings_as_fatal: true }
    }
}

impl From<&PlannerConfig> for ApplyPolicy {
    fn from(config: &PlannerConfig) -> Self {
        Self {
            treat_warnings_as_fatal: config.treat_warnings_as_fatal,
        }
    }
}

/// What an application did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub registrations: usize,
    pub forwards: usize,
    pub plugins_run: usize,
}

/// Applies plan reports to populators.
///
/// The applier remembers which plugin types it has run, so applying several
/// reports (one per unit, say) through the same applier never repeats a
/// plugin's step.
///
/// # Examples
///
/// ```rust
/// use ferrous_plan::{ApplyPolicy, CandidateSet, CandidateType, Lifetime, PlanApplier, PlanError, Planner};
///
/// let candidates: CandidateSet = vec![
///     CandidateType::class("App.Cache").lifetime(Lifetime::Singleton).ctor(["App.Session"]),
///     CandidateType::class("App.Session").lifetime(Lifetime::Scoped),
/// ]
/// .into_iter()
/// .collect();
/// let report = Planner::default().plan(&candidates).unwrap();
///
/// let mut applier = PlanApplier::new(ApplyPolicy::strict());
/// let err = applier.check(&report).unwrap_err();
/// assert!(matches!(err, PlanError::FatalDiagnostics { errors: 0, warnings: 1, .. }));
///
/// assert!(PlanApplier::new(ApplyPolicy::default()).check(&report).is_ok());
/// ```
#[derive(Debug, Default)]
pub struct PlanApplier {
    policy: ApplyPolicy,
    plugins: PluginDeduplicator,
}

impl PlanApplier {
    pub fn new(policy: ApplyPolicy) -> Self {
        Self {
            policy,
            plugins: PluginDeduplicator::new(),
        }
    }

    pub fn policy(&self) -> ApplyPolicy {
        self.policy
    }

    /// Fails if the policy refuses the report.
    pub fn check(&self, report: &PlanReport) -> PlanResult<()> {
        let counts = SeverityCounts::of(&report.diagnostics);
        let fatal = counts.errors > 0 || (self.policy.treat_warnings_as_fatal && counts.warnings > 0);
        if !fatal {
            return Ok(());
        }

        let first = report
            .diagnostics
            .iter()
            .find(|d| d.severity == Severity::Error)
            .or_else(|| report.diagnostics.iter().find(|d| d.severity == Severity::Warning))
            .map(ToString::to_string)
            .unwrap_or_default();
        tracing::warn!(errors = counts.errors, warnings = counts.warnings, "refusing to apply plan");
        Err(PlanError::FatalDiagnostics {
            errors: counts.errors,
            warnings: counts.warnings,
            first,
        })
    }

    /// Checks the report, registers every service and runs new plugins.
    pub fn apply(&mut self, report: &PlanReport, populator: &mut dyn ContainerPopulator) -> PlanResult<ApplySummary> {
        self.check(report)?;
        let _span = tracing::info_span!("apply", entries = report.plan.len()).entered();

        let mut summary = ApplySummary::default();
        for registration in report.plan.registrations() {
            match &registration.factory {
                FactoryDescriptor::Constructor { .. } | FactoryDescriptor::Intercepted { .. } => {
                    populator.add_constructed(&registration)?;
                    summary.registrations += 1;
                }
                FactoryDescriptor::Options { section } => {
                    populator.add_options(&registration.key, &registration.implementation, section)?;
                    summary.registrations += 1;
                }
                FactoryDescriptor::Forward { target } => {
                    populator.add_forward(&registration.key, target, registration.lifetime)?;
                    summary.forwards += 1;
                }
                FactoryDescriptor::Decorated { inner, chain, .. } => {
                    populator.add_decorated(&registration.key, inner, chain, registration.lifetime)?;
                    summary.registrations += 1;
                }
            }
        }

        summary.plugins_run = self
            .plugins
            .try_execute(report.plan.plugins.iter().cloned(), |plugin| populator.run_plugin(plugin))?;

        tracing::info!(
            registrations = summary.registrations,
            forwards = summary.forwards,
            plugins = summary.plugins_run,
            "applied registration plan"
        );
        Ok(summary)
    }

    pub fn has_run_plugin(&self, plugin_type: &TypeRef) -> bool {
        self.plugins.has_executed(plugin_type)
    }
}

/// The plan encoded as data, for code emitters and build tooling.
#[cfg(feature = "config")]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanManifest {
    pub version: String,
    pub plan: RegistrationPlan,
    pub registrations: Vec<ServiceRegistration>,
    pub diagnostics: Vec<Diagnostic>,
}

#[cfg(feature = "config")]
impl PlanManifest {
    pub fn from_report(report: &PlanReport) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            plan: report.plan.clone(),
            registrations: report.plan.registrations(),
            diagnostics: report.diagnostics.clone(),
        }
    }

    pub fn to_json(&self) -> PlanResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> PlanResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Writes the manifest as pretty JSON.
    pub fn write_to(&self, path: impl AsRef<std::path::Path>) -> PlanResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
