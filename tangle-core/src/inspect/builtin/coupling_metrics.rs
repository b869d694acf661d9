use std::collections::HashSet;

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use tracing::{debug, info};

use crate::contracts::{metrics, tags};
use crate::inspect::{AnalysisContext, GlobalInspector, InspectorContract, ItemOutput};
use crate::types::NodeKind;

/// Afferent coupling, instability and dependency cycles over the whole
/// class graph.
///
/// Instability is `Ce / (Ca + Ce)`, zero for a class with no coupling
/// at all. Edges of every kind count; parallel edges to one neighbour
/// count once.
#[derive(Debug)]
pub struct CouplingMetricsInspector {
    contract: InspectorContract,
}

impl CouplingMetricsInspector {
    pub fn new() -> Self {
        Self {
            contract: InspectorContract::new("coupling-metrics", NodeKind::Class)
                .global()
                .produces(metrics::COUPLING_AFFERENT)
                .produces(metrics::COUPLING_INSTABILITY)
                .produces(tags::COUPLING_CYCLE),
        }
    }
}

impl Default for CouplingMetricsInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalInspector for CouplingMetricsInspector {
    fn contract(&self) -> &InspectorContract {
        &self.contract
    }

    fn run(&self, ctx: &AnalysisContext<'_>, out: &mut ItemOutput) -> crate::error::Result<()> {
        let classes: HashSet<String> = ctx.store.node_ids(NodeKind::Class)?.into_iter().collect();
        let coupling = ctx.store.load_coupling_graph()?;
        let graph = &coupling.graph;

        for id in &classes {
            let (afferent, efferent) = match coupling.index_of(id) {
                Some(ix) => (
                    graph.neighbors_directed(ix, Direction::Incoming).collect::<HashSet<_>>().len(),
                    graph.neighbors_directed(ix, Direction::Outgoing).collect::<HashSet<_>>().len(),
                ),
                None => (0, 0),
            };
            #[allow(clippy::cast_precision_loss)]
            let (ca, ce) = (afferent as f64, efferent as f64);
            let instability = if ca + ce > 0.0 { ce / (ca + ce) } else { 0.0 };
            out.set_node_metric(id, metrics::COUPLING_AFFERENT, ca);
            out.set_node_metric(id, metrics::COUPLING_INSTABILITY, instability);
        }

        let mut cycles = 0;
        for component in tarjan_scc(graph) {
            if component.len() < 2 {
                continue;
            }
            cycles += 1;
            let members: Vec<&str> = component.iter().map(|ix| graph[*ix].as_str()).collect();
            debug!(size = members.len(), first = members[0], "Dependency cycle");
            for id in members.into_iter().filter(|id| classes.contains(*id)) {
                out.tag_node(id, tags::COUPLING_CYCLE);
            }
        }

        info!(classes = classes.len(), cycles, "Coupling metrics computed");
        Ok(())
    }
}
