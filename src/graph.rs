//! Dependency graph over classified candidates.
//!
//! Nodes are the concrete candidates, excluded ones included (a cycle or a
//! decorator chain may pass through them). An edge `A -> B` means A's
//! constructor needs B. Parameters typed by an interface or abstract class fan
//! out to every concrete implementation in the set, which over-approximates
//! what the container will actually pick at resolution time.
//!
//! Framework parameter types (factories, lazy wrappers, the provider itself)
//! never produce edges.

use std::collections::{BTreeMap, BTreeSet};

use crate::classify::{Classifications, Role};
use crate::collection::CandidateSet;
use crate::config::FrameworkTypes;
use crate::descriptors::CandidateType;
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::key::{AssemblyRef, TypeKind, TypeRef};
use crate::lifetime::EffectiveLifetime;

/// How an edge was obtained from its constructor parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resolution {
    /// The parameter names the concrete dependency itself
    Direct,
    /// The parameter is an interface or base type; one of possibly many targets
    FanOut,
}

/// `from` needs `to`; `to` is always concrete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    pub from: TypeRef,
    pub to: TypeRef,
    /// First constructor parameter producing the edge
    pub via: TypeRef,
    pub resolution: Resolution,
}

/// Per-node facts the analyses need, copied out of the classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub ty: TypeRef,
    pub unit: AssemblyRef,
    pub role: Role,
    /// `None` when the type is excluded from registration
    pub lifetime: Option<EffectiveLifetime>,
    pub disposable: bool,
}

impl GraphNode {
    pub fn is_excluded(&self) -> bool {
        self.lifetime.is_none()
    }
}

/// Immutable dependency graph of one planning pass.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeMap<TypeRef, GraphNode>,
    edges: BTreeMap<(TypeRef, TypeRef), DependencyEdge>,
    successors: BTreeMap<TypeRef, BTreeSet<TypeRef>>,
}

impl DependencyGraph {
    pub fn node(&self, ty: &TypeRef) -> Option<&GraphNode> {
        self.nodes.get(ty)
    }

    /// Nodes in ordinal name order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    /// Edges ordered by `(from, to)`.
    pub fn edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.edges.values()
    }

    pub fn edge(&self, from: &TypeRef, to: &TypeRef) -> Option<&DependencyEdge> {
        self.edges.get(&(from.clone(), to.clone()))
    }

    /// Direct dependencies of `ty`, in name order.
    pub fn successors<'g>(&'g self, ty: &TypeRef) -> impl Iterator<Item = &'g TypeRef> + 'g {
        self.successors.get(ty).into_iter().flatten()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// Builds the [`DependencyGraph`] for a frozen candidate set.
///
/// # Examples
///
/// ```rust
/// use ferrous_plan::{CandidateSet, CandidateType, Classifications, DependencyGraphBuilder, FrameworkTypes, TypeClassifier};
///
/// let candidates: CandidateSet = vec![
///     CandidateType::interface("App.ILogger"),
///     CandidateType::class("App.Logger").implements("App.ILogger"),
///     CandidateType::class("App.Repo").ctor(["App.ILogger", "Func<App.Clock>"]),
/// ]
/// .into_iter()
/// .collect();
///
/// let framework = FrameworkTypes::default();
/// let mut diagnostics = Vec::new();
/// let classes = Classifications::compute(&candidates, &TypeClassifier::new(&framework), &mut diagnostics);
/// let graph = DependencyGraphBuilder::new(&candidates, &classes, &framework).build(&mut diagnostics);
///
/// let deps: Vec<_> = graph.successors(&"App.Repo".into()).map(|t| t.name()).collect();
/// assert_eq!(deps, ["App.Logger"]);
/// ```
pub struct DependencyGraphBuilder<'a> {
    candidates: &'a CandidateSet,
    classifications: &'a Classifications,
    framework: &'a FrameworkTypes,
}

impl<'a> DependencyGraphBuilder<'a> {
    pub fn new(
        candidates: &'a CandidateSet,
        classifications: &'a Classifications,
        framework: &'a FrameworkTypes,
    ) -> Self {
        Self {
            candidates,
            classifications,
            framework,
        }
    }

    /// Builds the graph. Unresolved interface parameters and references to
    /// excluded types are reported as diagnostics; nothing here fails.
    pub fn build(&self, diagnostics: &mut Vec<Diagnostic>) -> DependencyGraph {
        let mut graph = DependencyGraph::default();

        for ty in self.candidates.iter().filter(|c| c.is_concrete()) {
            let Some(class) = self.classifications.get(&ty.full_name) else { continue };
            graph.nodes.insert(
                ty.full_name.clone(),
                GraphNode {
                    ty: ty.full_name.clone(),
                    unit: ty.source_unit.clone(),
                    role: class.role,
                    lifetime: class.lifetime(),
                    disposable: class.disposable,
                },
            );
        }

        let consumers: Vec<&CandidateType> = graph
            .nodes
            .keys()
            .filter_map(|name| self.candidates.get(name))
            .collect();
        for consumer in consumers {
            let registered = graph
                .nodes
                .get(&consumer.full_name)
                .map_or(false, |n| !n.is_excluded());

            for param in consumer.dependency_types() {
                if self.framework.is_framework_parameter(param) {
                    continue;
                }
                let (targets, resolution) = self.resolve(consumer, param);
                if targets.is_empty() {
                    if registered && self.is_unresolved_reference(param) {
                        diagnostics.push(
                            Diagnostic::new(
                                DiagnosticCode::UnresolvedInterface,
                                format!(
                                    "'{}' requires '{}' but no implementation was discovered; it may be registered elsewhere",
                                    consumer.full_name, param
                                ),
                            )
                            .with_subject(consumer.full_name.clone())
                            .with_unit(consumer.source_unit.clone()),
                        );
                    }
                    continue;
                }
                for target in targets {
                    graph.add_edge(DependencyEdge {
                        from: consumer.full_name.clone(),
                        to: target,
                        via: param.clone(),
                        resolution,
                    });
                }
            }
        }

        let mut excluded_consumers: BTreeMap<&TypeRef, Vec<&DependencyEdge>> = BTreeMap::new();
        for edge in graph.edges.values() {
            let from_registered = graph.nodes.get(&edge.from).map_or(false, |n| !n.is_excluded());
            let to_excluded = graph.nodes.get(&edge.to).map_or(false, GraphNode::is_excluded);
            if from_registered && to_excluded {
                excluded_consumers.entry(&edge.to).or_default().push(edge);
            }
        }
        for (target, edges) in excluded_consumers {
            let consumers: Vec<String> = edges
                .iter()
                .map(|e| format!("'{}' (via '{}')", e.from, e.via))
                .collect();
            let unit = graph.nodes.get(target).map(|n| n.unit.clone()).unwrap_or_default();
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::ExcludedTypeReferenced,
                    format!(
                        "'{}' is excluded from registration but required by {}",
                        target,
                        consumers.join(", ")
                    ),
                )
                .with_subject(target.clone())
                .with_unit(unit),
            );
        }

        tracing::debug!(nodes = graph.node_count(), edges = graph.edge_count(), "built dependency graph");
        graph
    }

    fn resolve(&self, consumer: &CandidateType, param: &TypeRef) -> (Vec<TypeRef>, Resolution) {
        if let Some(direct) = self.candidates.get(param).filter(|c| c.is_concrete()) {
            return (vec![direct.full_name.clone()], Resolution::Direct);
        }

        // A decorator asking for the service it wraps gets the inner
        // implementations, not its sibling decorators.
        let decorates_param = consumer.decorator_targets().iter().any(|(s, _)| *s == param);
        let targets = self
            .candidates
            .implementors(param)
            .filter(|impl_ty| {
                !decorates_param || !impl_ty.decorator_targets().iter().any(|(s, _)| *s == param)
            })
            .map(|impl_ty| impl_ty.full_name.clone())
            .collect();
        (targets, Resolution::FanOut)
    }

    /// Interfaces, abstract classes and unknown reference types may be
    /// resolved elsewhere; primitives and values are the classifier's concern.
    fn is_unresolved_reference(&self, param: &TypeRef) -> bool {
        match self.candidates.get(param) {
            Some(known) => !known.is_concrete(),
            None => param.kind() == TypeKind::Reference && !self.framework.is_non_injectable(param),
        }
    }
}

impl DependencyGraph {
    fn add_edge(&mut self, edge: DependencyEdge) {
        let key = (edge.from.clone(), edge.to.clone());
        match self.edges.get_mut(&key) {
            // A direct parameter is the stronger fact when both exist
            Some(existing) => {
                if existing.resolution == Resolution::FanOut && edge.resolution == Resolution::Direct {
                    *existing = edge;
                }
            }
            None => {
                self.successors
                    .entry(edge.from.clone())
                    .or_default()
                    .insert(edge.to.clone());
                self.edges.insert(key, edge);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::TypeClassifier;
    use crate::descriptors::Marker;

    fn build(types: Vec<CandidateType>) -> (DependencyGraph, Vec<Diagnostic>) {
        let framework = FrameworkTypes::default();
        let candidates: CandidateSet = types.into_iter().collect();
        let mut diagnostics = Vec::new();
        let classes = Classifications::compute(&candidates, &TypeClassifier::new(&framework), &mut diagnostics);
        let graph = DependencyGraphBuilder::new(&candidates, &classes, &framework).build(&mut diagnostics);
        (graph, diagnostics)
    }

    fn succ(graph: &DependencyGraph, name: &str) -> Vec<String> {
        graph.successors(&name.into()).map(|t| t.name().to_string()).collect()
    }

    #[test]
    fn interface_parameter_fans_out_to_every_implementation() {
        let (graph, _) = build(vec![
            CandidateType::interface("App.IStore"),
            CandidateType::class("App.SqlStore").implements("App.IStore"),
            CandidateType::class("App.MemStore").implements("App.IStore"),
            CandidateType::class("App.Cache").ctor(["App.IStore"]),
        ]);
        assert_eq!(succ(&graph, "App.Cache"), ["App.MemStore", "App.SqlStore"]);
        let edge = graph.edge(&"App.Cache".into(), &"App.SqlStore".into()).unwrap();
        assert_eq!(edge.resolution, Resolution::FanOut);
        assert_eq!(edge.via.name(), "App.IStore");
    }

    #[test]
    fn abstract_base_resolves_to_subclasses() {
        let (graph, _) = build(vec![
            CandidateType::abstract_class("App.Handler"),
            CandidateType::class("App.PingHandler").extends("App.Handler"),
            CandidateType::class("App.Router").ctor(["App.Handler"]),
        ]);
        assert_eq!(succ(&graph, "App.Router"), ["App.PingHandler"]);
        assert!(graph.node(&"App.Handler".into()).is_none());
    }

    #[test]
    fn framework_parameters_produce_no_edges() {
        let (graph, diagnostics) = build(vec![
            CandidateType::class("App.Worker").ctor(["Lazy<App.Repo>", "IServiceProvider"]),
            CandidateType::class("App.Repo"),
        ]);
        assert_eq!(graph.edge_count(), 0);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn missing_implementation_is_informational() {
        let (graph, diagnostics) = build(vec![CandidateType::class("App.Mailer").ctor(["App.ISmtp"])]);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::UnresolvedInterface);
    }

    #[test]
    fn excluded_types_stay_nodes_and_are_reported_when_referenced() {
        let (graph, diagnostics) = build(vec![
            CandidateType::class("App.Legacy").marker(Marker::Excluded),
            CandidateType::class("App.Facade").ctor(["App.Legacy"]),
            CandidateType::class("App.Importer").ctor(["App.Legacy"]),
            CandidateType::class("App.Report").ctor(["App.Legacy"]),
        ]);
        assert!(graph.node(&"App.Legacy".into()).unwrap().is_excluded());
        assert_eq!(succ(&graph, "App.Facade"), ["App.Legacy"]);

        let reported: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.code == DiagnosticCode::ExcludedTypeReferenced)
            .collect();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].subject.as_ref().map(TypeRef::name), Some("App.Legacy"));
        for consumer in ["App.Facade", "App.Importer", "App.Report"] {
            assert!(reported[0].message.contains(consumer), "{}", reported[0].message);
        }
    }

    #[test]
    fn decorator_parameter_skips_sibling_decorators() {
        let (graph, _) = build(vec![
            CandidateType::interface("App.IRepo"),
            CandidateType::class("App.Repo").implements("App.IRepo"),
            CandidateType::class("App.CachedRepo")
                .implements("App.IRepo")
                .ctor(["App.IRepo"])
                .marker(Marker::DecoratorFor { service: "App.IRepo".into(), order: 1 }),
            CandidateType::class("App.LoggedRepo")
                .implements("App.IRepo")
                .ctor(["App.IRepo"])
                .marker(Marker::DecoratorFor { service: "App.IRepo".into(), order: 2 }),
        ]);
        assert_eq!(succ(&graph, "App.CachedRepo"), ["App.Repo"]);
        assert_eq!(succ(&graph, "App.LoggedRepo"), ["App.Repo"]);
    }

    #[test]
    fn direct_parameter_wins_over_fan_out_for_the_same_target() {
        let (graph, _) = build(vec![
            CandidateType::interface("App.IClock"),
            CandidateType::class("App.Clock").implements("App.IClock"),
            CandidateType::class("App.Timer").ctor(["App.IClock", "App.Clock"]),
        ]);
        let edge = graph.edge(&"App.Timer".into(), &"App.Clock".into()).unwrap();
        assert_eq!(edge.resolution, Resolution::Direct);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn declared_dependencies_replace_constructor_edges() {
        let (graph, _) = build(vec![
            CandidateType::class("App.Settings"),
            CandidateType::class("App.Client")
                .param(TypeRef::with_kind("string", TypeKind::Primitive))
                .marker(Marker::DeclaredDependencies(vec!["App.Settings".into()])),
        ]);
        assert_eq!(succ(&graph, "App.Client"), ["App.Settings"]);
    }
}
