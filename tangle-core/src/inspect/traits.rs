use std::collections::BTreeSet;

use crate::types::{GraphNode, NodeKind};

use super::cache::PerItemCache;
use super::context::{AnalysisContext, ItemOutput, ItemView};

/// What an inspector reads, what it writes, and when it may run.
///
/// Built once at registration with the builder methods:
///
/// ```
/// use tangle_core::inspect::InspectorContract;
/// use tangle_core::types::NodeKind;
///
/// let contract = InspectorContract::new("coupling", NodeKind::Class)
///     .consumes("java.classStub")
///     .produces("coupling.computed");
/// assert!(!contract.requires_all_items_processed);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectorContract {
    pub id: String,
    pub target_kind: NodeKind,
    /// Keys (tags, properties or metrics) that must be present on the item.
    pub consumes: BTreeSet<String>,
    /// Keys the inspector may write on its own item.
    pub produces: BTreeSet<String>,
    /// Run once, after every item of `target_kind` reached its fixpoint.
    pub requires_all_items_processed: bool,
}

impl InspectorContract {
    pub fn new(id: impl Into<String>, target_kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            target_kind,
            consumes: BTreeSet::new(),
            produces: BTreeSet::new(),
            requires_all_items_processed: false,
        }
    }

    #[must_use]
    pub fn consumes(mut self, key: impl Into<String>) -> Self {
        self.consumes.insert(key.into());
        self
    }

    #[must_use]
    pub fn produces(mut self, key: impl Into<String>) -> Self {
        self.produces.insert(key.into());
        self
    }

    #[must_use]
    pub fn global(mut self) -> Self {
        self.requires_all_items_processed = true;
        self
    }

    /// Whether every consumed key is present on `node`.
    pub fn is_satisfied_by(&self, node: &GraphNode) -> bool {
        self.consumes.iter().all(|key| node.has_key(key))
    }

    pub fn declares(&self, key: &str) -> bool {
        self.produces.contains(key)
    }
}

/// An inspector that runs against one item at a time inside the fixpoint.
pub trait ItemInspector: Send + Sync {
    fn contract(&self) -> &InspectorContract;

    /// Inspect `item`, buffering writes in `out`. Writes are committed only
    /// when this returns `Ok`.
    fn run(
        &self,
        item: &ItemView<'_>,
        out: &mut ItemOutput,
        cache: &mut PerItemCache,
    ) -> crate::error::Result<()>;
}

/// An inspector that runs once over the completed graph of its kind.
pub trait GlobalInspector: Send + Sync {
    fn contract(&self) -> &InspectorContract;

    fn run(&self, ctx: &AnalysisContext<'_>, out: &mut ItemOutput) -> crate::error::Result<()>;
}

/// A registered inspector: per-item or global barrier.
pub enum Inspector {
    Item(Box<dyn ItemInspector>),
    Global(Box<dyn GlobalInspector>),
}

impl Inspector {
    pub fn item(inspector: impl ItemInspector + 'static) -> Self {
        Self::Item(Box::new(inspector))
    }

    pub fn global(inspector: impl GlobalInspector + 'static) -> Self {
        Self::Global(Box::new(inspector))
    }

    pub fn contract(&self) -> &InspectorContract {
        match self {
            Self::Item(i) => i.contract(),
            Self::Global(g) => g.contract(),
        }
    }

    pub fn id(&self) -> &str {
        &self.contract().id
    }
}

impl std::fmt::Debug for Inspector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = match self {
            Self::Item(_) => "Item",
            Self::Global(_) => "Global",
        };
        f.debug_tuple(variant).field(&self.id()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_satisfaction_checks_every_key_kind() {
        let contract = InspectorContract::new("x", NodeKind::Class)
            .consumes("java.classStub")
            .consumes("coupling.computed")
            .produces("migration.complexity");

        let mut node = GraphNode::new("a.A", NodeKind::Class)
            .with_property("java.classStub", serde_json::json!({}));
        assert!(!contract.is_satisfied_by(&node));
        node.tags.insert("coupling.computed".to_string());
        assert!(contract.is_satisfied_by(&node));

        assert!(contract.declares("migration.complexity"));
        assert!(!contract.declares("coupling.computed"));
    }

    #[test]
    fn empty_consumes_is_always_satisfied() {
        let contract = InspectorContract::new("x", NodeKind::File);
        assert!(contract.is_satisfied_by(&GraphNode::new("f", NodeKind::File)));
    }
}
