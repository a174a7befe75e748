//! Cycle detection over the dependency graph.

use std::collections::BTreeSet;
use std::fmt;

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::graph::DependencyGraph;
use crate::key::TypeRef;

/// One closed loop. `path[0]` is where the loop was entered and where it is
/// reported; the edge from the last element back to `path[0]` closes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    pub path: Vec<TypeRef>,
}

impl Cycle {
    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    pub fn start(&self) -> Option<&TypeRef> {
        self.path.first()
    }

    pub fn contains(&self, ty: &TypeRef) -> bool {
        self.path.contains(ty)
    }
}

impl fmt::Display for Cycle {
    /// `A -> B -> A`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ty in &self.path {
            write!(f, "{} -> ", ty)?;
        }
        match self.path.first() {
            Some(start) => write!(f, "{}", start),
            None => Ok(()),
        }
    }
}

/// Depth-first cycle search with a deterministic root order.
///
/// Roots and successors are visited in ordinal name order. When an edge hits
/// a node on the current path, the stack slice from that node up is one
/// cycle. Fully explored nodes are never entered again, so each closed loop
/// is reported once rather than once per edge.
///
/// # Examples
///
/// ```rust
/// use ferrous_plan::{CandidateSet, CandidateType, Classifications, CycleDetector, DependencyGraphBuilder, FrameworkTypes, TypeClassifier};
///
/// let candidates: CandidateSet = vec![
///     CandidateType::class("App.A").ctor(["App.B"]),
///     CandidateType::class("App.B").ctor(["App.A"]),
/// ]
/// .into_iter()
/// .collect();
/// let framework = FrameworkTypes::default();
/// let mut diagnostics = Vec::new();
/// let classes = Classifications::compute(&candidates, &TypeClassifier::new(&framework), &mut diagnostics);
/// let graph = DependencyGraphBuilder::new(&candidates, &classes, &framework).build(&mut diagnostics);
///
/// let cycles = CycleDetector::new(&graph).detect();
/// assert_eq!(cycles.len(), 1);
/// assert_eq!(cycles[0].to_string(), "App.A -> App.B -> App.A");
/// ```
pub struct CycleDetector<'g> {
    graph: &'g DependencyGraph,
}

struct Search<'g> {
    graph: &'g DependencyGraph,
    done: BTreeSet<&'g TypeRef>,
    on_stack: BTreeSet<&'g TypeRef>,
    stack: Vec<&'g TypeRef>,
    cycles: Vec<Cycle>,
}

impl<'g> CycleDetector<'g> {
    pub fn new(graph: &'g DependencyGraph) -> Self {
        Self { graph }
    }

    pub fn detect(&self) -> Vec<Cycle> {
        let mut search = Search {
            graph: self.graph,
            done: BTreeSet::new(),
            on_stack: BTreeSet::new(),
            stack: Vec::new(),
            cycles: Vec::new(),
        };
        for node in self.graph.nodes() {
            if !search.done.contains(&node.ty) {
                search.visit(&node.ty);
            }
        }
        tracing::debug!(cycles = search.cycles.len(), "cycle detection finished");
        search.cycles
    }

    /// Detects cycles and turns each into one error diagnostic.
    pub fn detect_into(&self, diagnostics: &mut Vec<Diagnostic>) -> Vec<Cycle> {
        let cycles = self.detect();
        for cycle in &cycles {
            let Some(start) = cycle.start() else { continue };
            let mut diagnostic = Diagnostic::new(
                DiagnosticCode::CycleDetected,
                format!("Circular dependency detected: {}", cycle),
            )
            .with_subject(start.clone());
            if let Some(node) = self.graph.node(start) {
                diagnostic = diagnostic.with_unit(node.unit.clone());
            }
            diagnostics.push(diagnostic);
        }
        cycles
    }
}

impl<'g> Search<'g> {
    /// Explores everything reachable from `root`. Frames live on the heap, so
    /// path length is bounded by memory rather than by the thread stack.
    fn visit(&mut self, root: &'g TypeRef) {
        let graph = self.graph;
        self.enter(root);
        let mut frames = vec![(root, graph.successors(root))];

        loop {
            let Some((node, successors)) = frames.last_mut() else { break };
            let node = *node;
            match successors.next() {
                Some(next) if self.on_stack.contains(next) => {
                    if let Some(pos) = self.stack.iter().position(|t| *t == next) {
                        let path = self.stack[pos..].iter().map(|t| (*t).clone()).collect();
                        self.cycles.push(Cycle { path });
                    }
                }
                Some(next) if !self.done.contains(next) => {
                    self.enter(next);
                    frames.push((next, graph.successors(next)));
                }
                Some(_) => {}
                None => {
                    frames.pop();
                    self.leave(node);
                }
            }
        }
    }

    fn enter(&mut self, node: &'g TypeRef) {
        self.on_stack.insert(node);
        self.stack.push(node);
    }

    fn leave(&mut self, node: &'g TypeRef) {
        self.stack.pop();
        self.on_stack.remove(node);
        self.done.insert(node);
    }
}
