use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::fmt::Write as _;
use std::str::FromStr;

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

pub use tangle_graphs::{CouplingEdge, EdgeProperties, RelationshipKind, WildcardKind};

// ── Node types ─────────────────────────────────────────────────────

/// The code units tangle tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A discovered source or class file.
    File,
    /// A class, interface, enum, record or annotation type.
    Class,
    /// A Java package.
    Package,
}

impl NodeKind {
    pub const ALL: [Self; 3] = [Self::File, Self::Class, Self::Package];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Class => "class",
            Self::Package => "package",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown node kind: {s}"))
    }
}

/// A node of the coupling graph. The id never changes once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// File path for files, binary name for classes, dotted name for packages.
    pub id: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            properties: BTreeMap::new(),
            tags: BTreeSet::new(),
            metrics: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }

    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(serde_json::Value::as_str)
    }

    pub fn metric(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).copied()
    }

    /// Whether `key` is present as a tag, property or metric. This is the
    /// test an inspector's `consumes` set is checked against.
    pub fn has_key(&self, key: &str) -> bool {
        self.tags.contains(key) || self.properties.contains_key(key) || self.metrics.contains_key(key)
    }
}

// ── Edge types ─────────────────────────────────────────────────────

/// A directed, typed coupling edge. Never a self-edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source_id: String,
    pub target_id: String,
    pub kind: RelationshipKind,
    #[serde(default)]
    pub properties: EdgeProperties,
}

impl GraphEdge {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        kind: RelationshipKind,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            kind,
            properties: EdgeProperties::default(),
        }
    }

    pub fn is_self_edge(&self) -> bool {
        self.source_id == self.target_id
    }

    /// Deterministic identity over the six-tuple
    /// (source, target, kind, container, index, wildcard).
    pub fn identity_key(&self) -> String {
        let mut key = format!("{}|{}|{}", self.source_id, self.target_id, self.kind);
        let p = &self.properties;
        let _ = write!(
            key,
            "|{}|{}|{}",
            p.container_type.as_deref().unwrap_or(""),
            p.type_argument_index.map(|i| i.to_string()).unwrap_or_default(),
            p.wildcard_kind.map_or("", WildcardKind::as_str),
        );
        key
    }
}

impl From<CouplingEdge> for GraphEdge {
    fn from(e: CouplingEdge) -> Self {
        Self {
            source_id: e.source,
            target_id: e.target,
            kind: e.kind,
            properties: e.properties,
        }
    }
}

impl fmt::Display for GraphEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -[{}]-> {}", self.source_id, self.kind, self.target_id)?;
        let p = &self.properties;
        if let (Some(c), Some(i)) = (&p.container_type, p.type_argument_index) {
            write!(f, " ({c}#{i}")?;
            if let Some(w) = p.wildcard_kind {
                write!(f, ", ? {}", w.as_str())?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

// ── Store query types ──────────────────────────────────────────────

/// Filter for finding nodes in the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeFilter {
    /// Only return nodes of this kind.
    pub kind: Option<NodeKind>,
    /// Only return nodes carrying every one of these tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Only return nodes whose id starts with this prefix.
    pub id_prefix: Option<String>,
    /// Maximum number of results to return.
    pub limit: Option<u32>,
}

impl NodeFilter {
    pub fn of_kind(kind: NodeKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// Summary statistics for the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_nodes: u64,
    pub total_edges: u64,
    /// Node count broken down by `NodeKind`.
    pub nodes_by_kind: BTreeMap<String, u64>,
    /// Edge count broken down by `RelationshipKind`.
    pub edges_by_kind: BTreeMap<String, u64>,
    /// Database file size in bytes.
    pub db_size_bytes: u64,
}

/// A petgraph `DiGraph` over node ids, loaded from stored edges.
#[derive(Debug, Default)]
pub struct InMemoryGraph {
    pub graph: DiGraph<String, RelationshipKind>,
    pub node_to_index: HashMap<String, NodeIndex>,
}

impl InMemoryGraph {
    pub fn from_edges(edges: &[GraphEdge]) -> Self {
        let mut graph = DiGraph::<String, RelationshipKind>::with_capacity(edges.len(), edges.len());
        let mut node_to_index: HashMap<String, NodeIndex> = HashMap::with_capacity(edges.len());

        let mut index_of = |graph: &mut DiGraph<String, RelationshipKind>, id: &str| {
            *node_to_index
                .entry(id.to_string())
                .or_insert_with(|| graph.add_node(id.to_string()))
        };

        for edge in edges {
            let src = index_of(&mut graph, &edge.source_id);
            let tgt = index_of(&mut graph, &edge.target_id);
            graph.add_edge(src, tgt, edge.kind);
        }

        Self {
            graph,
            node_to_index,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.node_to_index.get(id).copied()
    }
}
