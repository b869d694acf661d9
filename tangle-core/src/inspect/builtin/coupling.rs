use std::collections::{BTreeMap, BTreeSet};

use tangle_graphs::{CouplingGraphBuilder, ExternalPolicy};
use tracing::debug;

use crate::config::TangleConfig;
use crate::contracts::{metrics, properties, tags};
use crate::inspect::{
    DiagnosticKind, InspectorContract, ItemInspector, ItemOutput, ItemView, PerItemCache,
};
use crate::types::{GraphEdge, GraphNode, NodeKind};

use super::cached_coupling;

/// Derives the coupling edges of a class from its declared shape.
///
/// Targets are resolved against the class nodes created in the file
/// phase; a source name with several candidates settles on the first one
/// that has a node. A platform target kept by the builder gets an
/// `external.platform` placeholder; any other target without a node is
/// dropped with an `UnresolvedTarget` diagnostic, or kept with an
/// `external.unresolved` placeholder, depending on configuration.
#[derive(Debug)]
pub struct CouplingInspector {
    contract: InspectorContract,
    builder: CouplingGraphBuilder,
    unresolved_policy: ExternalPolicy,
}

impl CouplingInspector {
    pub fn new(config: &TangleConfig) -> Self {
        Self {
            contract: InspectorContract::new("coupling", NodeKind::Class)
                .consumes(properties::CLASS_STUB)
                .produces(tags::COUPLING_COMPUTED)
                .produces(metrics::COUPLING_EFFERENT),
            builder: CouplingGraphBuilder::new(config.coupling_options()),
            unresolved_policy: config.coupling.unresolved_policy,
        }
    }
}

/// How one edge target resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Known,
    Placeholder(&'static str),
    Dropped,
}

impl ItemInspector for CouplingInspector {
    fn contract(&self) -> &InspectorContract {
        &self.contract
    }

    fn run(
        &self,
        item: &ItemView<'_>,
        out: &mut ItemOutput,
        cache: &mut PerItemCache,
    ) -> crate::error::Result<()> {
        let report = cached_coupling(item, &self.builder, cache)?;

        for d in &report.degradations {
            out.diagnose(
                DiagnosticKind::ParseDegradation,
                format!("{}: {} ({})", d.member, d.degradation.reason, d.degradation.input),
            );
        }

        let mut resolved: BTreeMap<&str, Target> = BTreeMap::new();
        for edge in &report.edges {
            let target = edge.target.as_str();
            if !resolved.contains_key(target) {
                let outcome = self.resolve(item, target, report.platform_targets.contains(target))?;
                resolved.insert(target, outcome);
            }
        }

        for (target, outcome) in &resolved {
            match outcome {
                Target::Known => {}
                Target::Placeholder(tag) => {
                    out.upsert_node(
                        GraphNode::new(*target, NodeKind::Class)
                            .with_tag(tags::EXTERNAL)
                            .with_tag(*tag),
                    );
                }
                Target::Dropped => {
                    out.diagnose(
                        DiagnosticKind::UnresolvedTarget,
                        format!("no class node for coupling target {target}"),
                    );
                }
            }
        }

        let mut kept: BTreeSet<&str> = BTreeSet::new();
        for edge in &report.edges {
            if resolved.get(edge.target.as_str()) == Some(&Target::Dropped) {
                continue;
            }
            kept.insert(edge.target.as_str());
            out.add_edge(GraphEdge::from(edge.clone()));
        }
        debug!(
            class = %item.id(),
            edges = report.edges.len(),
            targets = kept.len(),
            "Coupling computed"
        );

        #[allow(clippy::cast_precision_loss)]
        out.set_metric(metrics::COUPLING_EFFERENT, kept.len() as f64);
        out.enable_tag(tags::COUPLING_COMPUTED);
        Ok(())
    }
}

impl CouplingInspector {
    fn resolve(
        &self,
        item: &ItemView<'_>,
        target: &str,
        is_platform: bool,
    ) -> crate::error::Result<Target> {
        if item.ctx.store.get_node(target)?.is_some() {
            return Ok(Target::Known);
        }
        if is_platform {
            return Ok(Target::Placeholder(tags::EXTERNAL_PLATFORM));
        }
        Ok(match self.unresolved_policy {
            ExternalPolicy::Drop => Target::Dropped,
            ExternalPolicy::Placeholder => Target::Placeholder(tags::EXTERNAL_UNRESOLVED),
        })
    }
}
