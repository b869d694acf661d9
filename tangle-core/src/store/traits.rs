use crate::types::{GraphEdge, GraphNode, InMemoryGraph, NodeFilter, NodeKind, RelationshipKind, StoreStats};

/// One buffered mutation, applied by [`GraphStore::commit`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreWrite {
    Node(GraphNode),
    Tag {
        node: String,
        tag: String,
    },
    Property {
        node: String,
        key: String,
        value: serde_json::Value,
    },
    Metric {
        node: String,
        key: String,
        value: f64,
    },
    MetricMax {
        node: String,
        key: String,
        value: f64,
    },
    Edge(GraphEdge),
}

impl StoreWrite {
    /// The node this write touches, or the source for edges.
    pub fn node_id(&self) -> &str {
        match self {
            Self::Node(n) => &n.id,
            Self::Tag { node, .. }
            | Self::Property { node, .. }
            | Self::Metric { node, .. }
            | Self::MetricMax { node, .. } => node,
            Self::Edge(e) => &e.source_id,
        }
    }

    /// The tag/property/metric key written, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Tag { tag, .. } => Some(tag),
            Self::Property { key, .. } | Self::Metric { key, .. } | Self::MetricMax { key, .. } => {
                Some(key)
            }
            Self::Node(_) | Self::Edge(_) => None,
        }
    }
}

/// The graph store abstraction. Every inspector reads and writes through it.
///
/// Implementations serialize writers internally, so one store may be
/// shared by the items of a parallel pass.
pub trait GraphStore: Send + Sync + std::fmt::Debug {
    // ── Node operations ────────────────────────────────────────────

    /// Insert a node, or merge into the existing one: tags are unioned,
    /// properties and metrics overwritten key by key. The kind of an
    /// existing node never changes.
    fn upsert_node(&self, node: &GraphNode) -> crate::error::Result<()>;

    fn get_node(&self, id: &str) -> crate::error::Result<Option<GraphNode>>;

    fn find_nodes(&self, filter: &NodeFilter) -> crate::error::Result<Vec<GraphNode>>;

    /// Ids of every node of `kind`, sorted.
    fn node_ids(&self, kind: NodeKind) -> crate::error::Result<Vec<String>>;

    /// Returns whether the tag was newly enabled.
    fn enable_tag(&self, id: &str, tag: &str) -> crate::error::Result<bool>;

    /// Returns whether the stored value changed.
    fn set_property(&self, id: &str, key: &str, value: &serde_json::Value) -> crate::error::Result<bool>;

    fn set_metric(&self, id: &str, key: &str, value: f64) -> crate::error::Result<()>;

    /// `metrics[key] = max(existing_or_zero, value)`; returns the result.
    fn merge_metric_max(&self, id: &str, key: &str, value: f64) -> crate::error::Result<f64>;

    // ── Edge operations ────────────────────────────────────────────

    /// Returns whether the edge was new. Self-edges are a no-op.
    fn upsert_edge(&self, edge: &GraphEdge) -> crate::error::Result<bool>;

    fn edges_from(&self, id: &str) -> crate::error::Result<Vec<GraphEdge>>;

    fn edges_to(&self, id: &str) -> crate::error::Result<Vec<GraphEdge>>;

    fn edges_by_kind(&self, kind: RelationshipKind) -> crate::error::Result<Vec<GraphEdge>>;

    fn all_edges(&self) -> crate::error::Result<Vec<GraphEdge>>;

    // ── Batches ────────────────────────────────────────────────────

    /// Apply a batch of writes. Returns how many changed stored state.
    /// The default applies them one by one; stores should override it
    /// to make the batch atomic.
    fn commit(&self, writes: &[StoreWrite]) -> crate::error::Result<usize> {
        let mut changed = 0;
        for write in writes {
            let did_change = match write {
                StoreWrite::Node(node) => {
                    self.upsert_node(node)?;
                    true
                }
                StoreWrite::Tag { node, tag } => self.enable_tag(node, tag)?,
                StoreWrite::Property { node, key, value } => self.set_property(node, key, value)?,
                StoreWrite::Metric { node, key, value } => {
                    self.set_metric(node, key, *value)?;
                    true
                }
                StoreWrite::MetricMax { node, key, value } => {
                    let before = self
                        .get_node(node)?
                        .and_then(|n| n.metric(key));
                    let after = self.merge_metric_max(node, key, *value)?;
                    before != Some(after)
                }
                StoreWrite::Edge(edge) => self.upsert_edge(edge)?,
            };
            if did_change {
                changed += 1;
            }
        }
        Ok(changed)
    }

    // ── Graph loading ──────────────────────────────────────────────

    /// Every coupling edge as a petgraph `DiGraph` over node ids.
    fn load_coupling_graph(&self) -> crate::error::Result<InMemoryGraph> {
        Ok(InMemoryGraph::from_edges(&self.all_edges()?))
    }

    // ── Metrics ────────────────────────────────────────────────────

    fn stats(&self) -> crate::error::Result<StoreStats>;
}
