//! Dependency graph export for visualization and tooling.
//!
//! The analysed graph is first flattened into a [`GraphDocument`], a plain
//! snapshot with string ids, then rendered by a [`GraphExporter`]. DOT and
//! Mermaid are always available; JSON and YAML need the `graph-export`
//! feature.

use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "graph-export")]
use serde::{Deserialize, Serialize};

use crate::circular::Cycle;
use crate::error::{PlanError, PlanResult};
use crate::graph::{DependencyGraph, Resolution};
use crate::lifetime::Lifetime;

/// A node of an exported graph.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "graph-export", derive(Serialize, Deserialize))]
pub struct GraphNode {
    /// Identifier safe for DOT and Mermaid
    pub id: String,
    pub type_name: String,
    /// `Singleton`, `Scoped`, `Transient` or `Excluded`
    pub lifetime: String,
    pub unit: String,
    pub dependencies: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

/// An edge of an exported graph.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "graph-export", derive(Serialize, Deserialize))]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub dependency_type: DependencyType,
    /// Constructor parameter the edge came from
    pub via: String,
    /// Part of a detected cycle
    pub in_cycle: bool,
}

/// How the dependency was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "graph-export", derive(Serialize, Deserialize))]
pub enum DependencyType {
    /// Parameter names the concrete type
    Required,
    /// Parameter is an interface or base type
    FanOut,
}

/// Counts describing the whole graph.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "graph-export", derive(Serialize, Deserialize))]
pub struct GraphMetadata {
    pub node_count: usize,
    pub edge_count: usize,
    pub singleton_count: usize,
    pub scoped_count: usize,
    pub transient_count: usize,
    pub excluded_count: usize,
    pub cycle_count: usize,
    /// RFC 3339 timestamp, when `graph-export` is enabled
    pub exported_at: Option<String>,
    pub version: String,
}

/// Serializable snapshot of a dependency graph.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "graph-export", derive(Serialize, Deserialize))]
pub struct GraphDocument {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub metadata: GraphMetadata,
}

/// Graph export configuration options.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Include nodes excluded from registration
    pub include_excluded: bool,
    /// Restrict to these type names (empty = all)
    pub type_filter: BTreeSet<String>,
    /// Stamp the export time into the metadata
    pub include_timestamp: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_excluded: true,
            type_filter: BTreeSet::new(),
            include_timestamp: true,
        }
    }
}

/// Export formats supported for dependency graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// JSON for web UIs and tooling
    Json,
    /// YAML for human-readable review
    Yaml,
    /// DOT for Graphviz
    Dot,
    /// Mermaid for documentation
    Mermaid,
}

impl std::str::FromStr for ExportFormat {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "yaml" | "yml" => Ok(ExportFormat::Yaml),
            "dot" | "graphviz" => Ok(ExportFormat::Dot),
            "mermaid" => Ok(ExportFormat::Mermaid),
            other => Err(PlanError::Export(format!("unsupported format '{}'", other))),
        }
    }
}

impl GraphDocument {
    /// Flattens an analysed graph.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_plan::{CandidateSet, CandidateType, Classifications, DependencyGraphBuilder, FrameworkTypes, TypeClassifier};
    /// use ferrous_plan::graph_export::{DefaultGraphExporter, ExportFormat, ExportOptions, GraphDocument, GraphExporter};
    ///
    /// let candidates: CandidateSet = vec![
    ///     CandidateType::class("App.Repo").ctor(["App.Db"]),
    ///     CandidateType::class("App.Db"),
    /// ]
    /// .into_iter()
    /// .collect();
    /// let framework = FrameworkTypes::default();
    /// let mut diagnostics = Vec::new();
    /// let classes = Classifications::compute(&candidates, &TypeClassifier::new(&framework), &mut diagnostics);
    /// let graph = DependencyGraphBuilder::new(&candidates, &classes, &framework).build(&mut diagnostics);
    ///
    /// let doc = GraphDocument::from_graph(&graph, &[], &ExportOptions::default());
    /// let dot = DefaultGraphExporter.export(&doc, ExportFormat::Dot).unwrap();
    /// assert!(dot.contains("\"App_Repo\" -> \"App_Db\""));
    /// ```
    pub fn from_graph(graph: &DependencyGraph, cycles: &[Cycle], options: &ExportOptions) -> Self {
        let keep = |name: &str, excluded: bool| {
            (options.include_excluded || !excluded)
                && (options.type_filter.is_empty() || options.type_filter.contains(name))
        };

        let cyclic: BTreeSet<(String, String)> = cycles
            .iter()
            .flat_map(|c| {
                let path = &c.path;
                (0..path.len()).map(move |i| {
                    (path[i].name().to_string(), path[(i + 1) % path.len()].name().to_string())
                })
            })
            .collect();

        let mut nodes = Vec::new();
        let mut metadata = GraphMetadata {
            node_count: 0,
            edge_count: 0,
            singleton_count: 0,
            scoped_count: 0,
            transient_count: 0,
            excluded_count: 0,
            cycle_count: cycles.len(),
            exported_at: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        };

        for node in graph.nodes() {
            if !keep(node.ty.name(), node.is_excluded()) {
                continue;
            }
            let lifetime = match node.lifetime {
                Some(lt) => {
                    match lt.lifetime {
                        Lifetime::Singleton => metadata.singleton_count += 1,
                        Lifetime::Scoped => metadata.scoped_count += 1,
                        Lifetime::Transient => metadata.transient_count += 1,
                    }
                    lt.lifetime.to_string()
                }
                None => {
                    metadata.excluded_count += 1;
                    "Excluded".to_string()
                }
            };
            let mut meta = BTreeMap::new();
            meta.insert("role".to_string(), format!("{:?}", node.role));
            if let Some(lt) = node.lifetime {
                meta.insert("explicit".to_string(), lt.explicit.to_string());
            }
            if node.disposable {
                meta.insert("disposable".to_string(), "true".to_string());
            }
            nodes.push(GraphNode {
                id: node_id(node.ty.name()),
                type_name: node.ty.name().to_string(),
                lifetime,
                unit: node.unit.to_string(),
                dependencies: graph.successors(&node.ty).map(|t| t.name().to_string()).collect(),
                metadata: meta,
            });
        }

        let kept: BTreeSet<&str> = nodes.iter().map(|n| n.type_name.as_str()).collect();
        let edges: Vec<GraphEdge> = graph
            .edges()
            .filter(|e| kept.contains(e.from.name()) && kept.contains(e.to.name()))
            .map(|e| GraphEdge {
                from: node_id(e.from.name()),
                to: node_id(e.to.name()),
                dependency_type: match e.resolution {
                    Resolution::Direct => DependencyType::Required,
                    Resolution::FanOut => DependencyType::FanOut,
                },
                via: e.via.name().to_string(),
                in_cycle: cyclic.contains(&(e.from.name().to_string(), e.to.name().to_string())),
            })
            .collect();

        metadata.node_count = nodes.len();
        metadata.edge_count = edges.len();
        if options.include_timestamp {
            metadata.exported_at = export_timestamp();
        }

        GraphDocument { nodes, edges, metadata }
    }
}

#[cfg(feature = "graph-export")]
fn export_timestamp() -> Option<String> {
    Some(chrono::Utc::now().to_rfc3339())
}

#[cfg(not(feature = "graph-export"))]
fn export_timestamp() -> Option<String> {
    None
}

/// Identifier usable unquoted in Mermaid and quoted in DOT.
fn node_id(type_name: &str) -> String {
    type_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Renders a [`GraphDocument`] in some format.
pub trait GraphExporter {
    fn export(&self, graph: &GraphDocument, format: ExportFormat) -> PlanResult<String>;
}

/// Exporter for JSON, YAML, DOT and Mermaid.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultGraphExporter;

impl GraphExporter for DefaultGraphExporter {
    fn export(&self, graph: &GraphDocument, format: ExportFormat) -> PlanResult<String> {
        match format {
            ExportFormat::Json => self.export_json(graph),
            ExportFormat::Yaml => self.export_yaml(graph),
            ExportFormat::Dot => Ok(self.export_dot(graph)),
            ExportFormat::Mermaid => Ok(self.export_mermaid(graph)),
        }
    }
}

impl DefaultGraphExporter {
    #[cfg(feature = "graph-export")]
    fn export_json(&self, graph: &GraphDocument) -> PlanResult<String> {
        Ok(serde_json::to_string_pretty(graph)?)
    }

    #[cfg(not(feature = "graph-export"))]
    fn export_json(&self, _graph: &GraphDocument) -> PlanResult<String> {
        Err(PlanError::Export("JSON export requires the `graph-export` feature".to_string()))
    }

    #[cfg(feature = "graph-export")]
    fn export_yaml(&self, graph: &GraphDocument) -> PlanResult<String> {
        serde_yaml::to_string(graph).map_err(|e| PlanError::Export(format!("YAML serialization failed: {}", e)))
    }

    #[cfg(not(feature = "graph-export"))]
    fn export_yaml(&self, _graph: &GraphDocument) -> PlanResult<String> {
        Err(PlanError::Export("YAML export requires the `graph-export` feature".to_string()))
    }

    fn export_dot(&self, graph: &GraphDocument) -> String {
        let mut output = String::new();
        output.push_str("digraph DependencyGraph {\n");
        output.push_str("  rankdir=TB;\n");
        output.push_str("  node [shape=box];\n\n");

        for node in &graph.nodes {
            let color = match node.lifetime.as_str() {
                "Singleton" => "lightblue",
                "Scoped" => "lightgreen",
                "Transient" => "lightyellow",
                _ => "lightgrey",
            };
            output.push_str(&format!(
                "  \"{}\" [label=\"{}\\n({})\", fillcolor={}, style=filled];\n",
                node.id, node.type_name, node.lifetime, color
            ));
        }

        output.push('\n');

        for edge in &graph.edges {
            let style = match edge.dependency_type {
                DependencyType::Required => "solid",
                DependencyType::FanOut => "dashed",
            };
            let color = if edge.in_cycle { ", color=red" } else { "" };
            output.push_str(&format!(
                "  \"{}\" -> \"{}\" [style={}{}];\n",
                edge.from, edge.to, style, color
            ));
        }

        output.push_str("}\n");
        output
    }

    fn export_mermaid(&self, graph: &GraphDocument) -> String {
        let mut output = String::new();
        output.push_str("graph TD\n");

        for node in &graph.nodes {
            output.push_str(&format!("  {}[\"{}\"]\n", node.id, node.type_name));
        }

        for edge in &graph.edges {
            let arrow = match edge.dependency_type {
                DependencyType::Required => "-->",
                DependencyType::FanOut => "-.->",
            };
            output.push_str(&format!("  {} {} {}\n", edge.from, arrow, edge.to));
        }

        output.push_str("\n  classDef singleton fill:#e1f5fe\n");
        output.push_str("  classDef scoped fill:#e8f5e8\n");
        output.push_str("  classDef transient fill:#fff3e0\n");
        output.push_str("  classDef excluded fill:#eeeeee\n");

        for node in &graph.nodes {
            let class = match node.lifetime.as_str() {
                "Singleton" => "singleton",
                "Scoped" => "scoped",
                "Transient" => "transient",
                _ => "excluded",
            };
            output.push_str(&format!("  class {} {}\n", node.id, class));
        }

        output
    }
}
