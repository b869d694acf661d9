use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::TangleConfig;
use crate::error::InspectError;
use crate::store::{GraphStore, StoreWrite};
use crate::types::{GraphEdge, GraphNode};

// ── Diagnostics ────────────────────────────────────────────────────

/// Recoverable problems collected during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A signature or type could not be parsed; an erased shape was used.
    ParseDegradation,
    /// An inspector returned an error; its writes were discarded.
    InspectorFailure,
    /// The pass bound was reached with runnable inspectors left.
    ConvergenceTimeout,
    /// A coupling target has no node in the graph.
    UnresolvedTarget,
    /// An inspector wrote a key it does not declare; the write was dropped.
    UndeclaredOutput,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ParseDegradation => "parse_degradation",
            Self::InspectorFailure => "inspector_failure",
            Self::ConvergenceTimeout => "convergence_timeout",
            Self::UnresolvedTarget => "unresolved_target",
            Self::UndeclaredOutput => "undeclared_output",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Node id of the item, when the problem concerns one item.
    pub item: Option<String>,
    pub inspector: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            item: None,
            inspector: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn on_item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into());
        self
    }

    #[must_use]
    pub fn by_inspector(mut self, inspector: impl Into<String>) -> Self {
        self.inspector = Some(inspector.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if let Some(item) = &self.item {
            write!(f, " {item}")?;
        }
        if let Some(inspector) = &self.inspector {
            write!(f, " ({inspector})")?;
        }
        write!(f, ": {}", self.message)
    }
}

// ── Run context ────────────────────────────────────────────────────

/// Everything one analysis run shares: the store, the configuration, the
/// analysed root and the diagnostics collected so far. Created at the
/// start of a run and dropped at its end.
pub struct AnalysisContext<'a> {
    pub store: &'a dyn GraphStore,
    pub config: &'a TangleConfig,
    root: PathBuf,
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(store: &'a dyn GraphStore, config: &'a TangleConfig, root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            config,
            root: root.into(),
            diagnostics: Mutex::new(Vec::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics
            .lock()
            .expect("diagnostics mutex poisoned")
            .push(diagnostic);
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .expect("diagnostics mutex poisoned")
            .clone()
    }

    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.lock().expect("diagnostics mutex poisoned"))
    }
}

impl fmt::Debug for AnalysisContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisContext")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

// ── Item view ──────────────────────────────────────────────────────

/// Read access to the item under inspection, as of the last commit.
#[derive(Debug)]
pub struct ItemView<'a> {
    pub node: &'a GraphNode,
    pub ctx: &'a AnalysisContext<'a>,
}

impl<'a> ItemView<'a> {
    pub fn new(node: &'a GraphNode, ctx: &'a AnalysisContext<'a>) -> Self {
        Self { node, ctx }
    }

    pub fn id(&self) -> &str {
        &self.node.id
    }

    pub fn require_property(&self, key: &str) -> crate::error::Result<&serde_json::Value> {
        self.node.property(key).ok_or_else(|| {
            InspectError::MissingInput {
                item: self.node.id.clone(),
                key: key.to_string(),
            }
            .into()
        })
    }

    /// Deserialize a consumed property into `T`.
    pub fn property_as<T: DeserializeOwned>(&self, key: &str) -> crate::error::Result<T> {
        let value = self.require_property(key)?;
        serde_json::from_value(value.clone()).map_err(|e| {
            InspectError::Invalid {
                item: self.node.id.clone(),
                message: format!("{key}: {e}"),
            }
            .into()
        })
    }

    /// Absolute path of a file item.
    pub fn file_path(&self) -> PathBuf {
        self.ctx.root().join(&self.node.id)
    }
}

// ── Buffered output ────────────────────────────────────────────────

/// Writes buffered by one inspector run.
///
/// `owner` is the item's own node for per-item inspectors and `None` for
/// global ones. Keyed writes to the owner (or to any node, for a global
/// inspector) are checked against the contract's `produces` before commit.
#[derive(Debug, Default)]
pub struct ItemOutput {
    owner: Option<String>,
    writes: Vec<StoreWrite>,
    diagnostics: Vec<Diagnostic>,
}

impl ItemOutput {
    pub fn for_item(id: impl Into<String>) -> Self {
        Self {
            owner: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn for_global() -> Self {
        Self::default()
    }

    fn owner_or_empty(&self) -> String {
        self.owner.clone().unwrap_or_default()
    }

    // ── Own node ──

    pub fn enable_tag(&mut self, tag: impl Into<String>) {
        let node = self.owner_or_empty();
        self.tag_node(node, tag);
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: serde_json::Value) {
        let node = self.owner_or_empty();
        self.set_node_property(node, key, value);
    }

    pub fn set_metric(&mut self, key: impl Into<String>, value: f64) {
        let node = self.owner_or_empty();
        self.set_node_metric(node, key, value);
    }

    pub fn merge_metric_max(&mut self, key: impl Into<String>, value: f64) {
        let node = self.owner_or_empty();
        self.merge_node_metric_max(node, key, value);
    }

    // ── Any node ──

    pub fn upsert_node(&mut self, node: GraphNode) {
        self.writes.push(StoreWrite::Node(node));
    }

    pub fn tag_node(&mut self, node: impl Into<String>, tag: impl Into<String>) {
        self.writes.push(StoreWrite::Tag {
            node: node.into(),
            tag: tag.into(),
        });
    }

    pub fn set_node_property(
        &mut self,
        node: impl Into<String>,
        key: impl Into<String>,
        value: serde_json::Value,
    ) {
        self.writes.push(StoreWrite::Property {
            node: node.into(),
            key: key.into(),
            value,
        });
    }

    pub fn set_node_metric(&mut self, node: impl Into<String>, key: impl Into<String>, value: f64) {
        self.writes.push(StoreWrite::Metric {
            node: node.into(),
            key: key.into(),
            value,
        });
    }

    pub fn merge_node_metric_max(
        &mut self,
        node: impl Into<String>,
        key: impl Into<String>,
        value: f64,
    ) {
        self.writes.push(StoreWrite::MetricMax {
            node: node.into(),
            key: key.into(),
            value,
        });
    }

    pub fn add_edge(&mut self, edge: GraphEdge) {
        self.writes.push(StoreWrite::Edge(edge));
    }

    pub fn diagnose(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::new(kind, message));
    }

    pub fn writes(&self) -> &[StoreWrite] {
        &self.writes
    }

    /// Split into writes allowed by `produces`, the keys that were
    /// dropped, and the diagnostics the inspector raised.
    pub fn into_checked(
        self,
        produces: &std::collections::BTreeSet<String>,
    ) -> (Vec<StoreWrite>, Vec<String>, Vec<Diagnostic>) {
        let owner = self.owner;
        let mut accepted = Vec::with_capacity(self.writes.len());
        let mut undeclared: Vec<String> = Vec::new();
        for write in self.writes {
            let checked = match &owner {
                Some(id) => write.node_id() == id,
                None => true,
            };
            match write.key() {
                Some(key) if checked && !produces.contains(key) => {
                    if !undeclared.iter().any(|k| k == key) {
                        undeclared.push(key.to_string());
                    }
                }
                _ => accepted.push(write),
            }
        }
        (accepted, undeclared, self.diagnostics)
    }
}
