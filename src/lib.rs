//! # ferrous-plan
//!
//! Static dependency-registration planning: decide, before anything runs,
//! how a set of candidate types should be registered in a dependency
//! injection container, and report what would go wrong at resolution time.
//!
//! ## Features
//!
//! - **Classification**: each candidate gets a role, a lifetime (explicit or
//!   inferred) and a registration decision, computed once as plain data
//! - **Dependency graph**: constructor parameters become edges, fanned out
//!   over every implementation of an interface or abstract base
//! - **Cycle detection**: each closed loop reported exactly once, in a
//!   deterministic order
//! - **Lifetime verification**: captive dependencies and the stricter
//!   disposable-captive case
//! - **Decorators and interceptors**: ordered wrapper chains per service
//! - **Plugins**: discovered any number of times, executed once
//! - **Deterministic plans**: the same candidates in any order produce the
//!   same plan
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_plan::{CandidateSet, CandidateType, FactoryDescriptor, Planner, ServiceKey, TypeRef};
//!
//! let candidates: CandidateSet = vec![
//!     CandidateType::interface("App.ILogger"),
//!     CandidateType::class("App.Logger").implements("App.ILogger"),
//!     CandidateType::class("App.Repo").ctor(["App.Logger"]),
//!     CandidateType::class("App.Service").ctor(["App.Repo", "App.ILogger"]),
//! ]
//! .into_iter()
//! .collect();
//!
//! let report = Planner::default().plan(&candidates).unwrap();
//! assert!(report.is_valid());
//!
//! // `App.ILogger` forwards to the one `App.Logger` registration
//! let registrations = report.plan.registrations();
//! let logger = registrations
//!     .iter()
//!     .find(|r| r.key == ServiceKey::Type(TypeRef::new("App.ILogger")))
//!     .unwrap();
//! assert_eq!(
//!     logger.factory,
//!     FactoryDescriptor::Forward { target: ServiceKey::Type(TypeRef::new("App.Logger")) }
//! );
//! ```
//!
//! ## Pipeline
//!
//! 1. **Collect**: [`CandidateCollection`] runs [`provider::CandidateProvider`]s
//!    concurrently and freezes their output into a [`CandidateSet`]
//! 2. **Analyse**: [`Planner`] classifies, builds the [`DependencyGraph`],
//!    detects cycles, verifies lifetimes and resolves wrapper chains
//! 3. **Consume**: a [`PlanReport`] is applied to a container through
//!    [`PlanApplier`], exported as a graph, or emitted as a manifest
//!
//! Analysis never fails because of what it finds; every finding is a
//! [`Diagnostic`] with a stable code. Only [`PlanApplier`] turns findings into
//! an error, and only for errors or under a warnings-are-fatal policy.
//!
//! ## Feature Flags
//!
//! - `config`: JSON configuration and plan manifests
//! - `graph-export`: JSON/YAML graph export with timestamps
//! - `parking-lot`: `parking_lot` mutexes in diagnostic sinks
//! - `performance`: enables `parking-lot`

// Module declarations
pub mod apply;
pub mod assembly_order;
pub mod cancellation;
pub mod circular;
pub mod classify;
pub mod collection;
pub mod config;
pub mod decoration;
pub mod descriptors;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod graph_export;
pub mod key;
pub mod lifetime;
pub mod planner;
pub mod plugins;
pub mod provider;
pub mod registration;
pub mod validation;

// Re-export core types
pub use apply::{ApplyPolicy, ApplySummary, ContainerPopulator, PlanApplier};
#[cfg(feature = "config")]
pub use apply::PlanManifest;
pub use assembly_order::{AssemblyOrderResolver, AssemblyOrderSpec, AssemblyPreset};
pub use cancellation::CancellationToken;
pub use circular::{Cycle, CycleDetector};
pub use classify::{Classification, Classifications, Role, TypeClassifier};
pub use collection::{CandidateCollection, CandidateSet, Collected, ProviderFailure};
pub use config::{ConfigSource, EnvironmentSource, FrameworkTypes, PlannerConfig};
pub use decoration::{Chains, DecoratorChain, DecoratorChainResolver, DecoratorEntry};
pub use descriptors::{CandidateType, Marker};
pub use diagnostics::{
    CollectingSink, Diagnostic, DiagnosticCode, DiagnosticSink, Severity, SeverityCounts, TracingSink,
};
pub use error::{PlanError, PlanResult};
pub use graph::{DependencyEdge, DependencyGraph, DependencyGraphBuilder, GraphNode, Resolution};
pub use graph_export::{DefaultGraphExporter, ExportFormat, ExportOptions, GraphDocument, GraphExporter};
pub use key::{AssemblyRef, ServiceKey, TypeKind, TypeRef};
pub use lifetime::{EffectiveLifetime, Lifetime};
pub use planner::{PlanContext, PlanReport, Planner};
pub use plugins::{PluginDeduplicator, PluginEntry};
pub use registration::{
    merge_plans, DecoratedService, FactoryDescriptor, RegistrationPlan, RegistrationPlanAssembler,
    RegistrationPlanEntry, ServiceRegistration,
};
pub use validation::{LifetimeMismatch, LifetimeVerifier};
