use tangle_graphs::CouplingGraphBuilder;

use crate::config::TangleConfig;
use crate::contracts::{metrics, tags};
use crate::inspect::{InspectorContract, ItemInspector, ItemOutput, ItemView, PerItemCache};
use crate::types::NodeKind;

use super::cached_coupling;

/// Points per level of generic nesting beyond a plain type.
const DEPTH_WEIGHT: f64 = 5.0;
/// Points per bound on a declared type variable.
const BOUND_WEIGHT: f64 = 3.0;

/// Scores how hard a class's generics are to migrate.
///
/// Runs after `coupling` and reuses its report from the item cache when
/// both ran in the same visit.
#[derive(Debug)]
pub struct GenericComplexityInspector {
    contract: InspectorContract,
    builder: CouplingGraphBuilder,
}

impl GenericComplexityInspector {
    pub fn new(config: &TangleConfig) -> Self {
        Self {
            contract: InspectorContract::new("generic-complexity", NodeKind::Class)
                .consumes(tags::COUPLING_COMPUTED)
                .produces(metrics::MIGRATION_COMPLEXITY),
            builder: CouplingGraphBuilder::new(config.coupling_options()),
        }
    }
}

impl ItemInspector for GenericComplexityInspector {
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
        out.merge_metric_max(
            metrics::MIGRATION_COMPLEXITY,
            generic_score(report.max_generic_depth, report.type_variable_bounds),
        );
        Ok(())
    }
}

#[allow(clippy::cast_precision_loss)]
fn generic_score(max_depth: usize, bounds: usize) -> f64 {
    max_depth as f64 * DEPTH_WEIGHT + bounds as f64 * BOUND_WEIGHT
}

#[cfg(test)]
mod tests {
    use tangle_graphs::{ClassKind, ClassStub, FieldStub, StubOrigin};

    use super::*;
    use crate::contracts::properties;
    use crate::inspect::AnalysisContext;
    use crate::inspect::builtin::testing::run_item;
    use crate::store::{GraphStore, SqliteStore};
    use crate::types::GraphNode;

    #[test]
    fn nested_generics_and_bounds_raise_complexity() {
        let mut stub = ClassStub::new("a.Index", ClassKind::Class, StubOrigin::Binary);
        stub.signature =
            Some("<K::Ljava/lang/Comparable<TK;>;>Ljava/lang/Object;".to_string());
        stub.fields.push(FieldStub {
            name: "byKey".to_string(),
            descriptor: "Ljava/util/Map;".to_string(),
            signature: Some("Ljava/util/Map<TK;Ljava/util/List<La/Entry;>;>;".to_string()),
            annotations: Vec::new(),
        });
        let store = SqliteStore::in_memory().unwrap();
        store
            .upsert_node(
                &GraphNode::new("a.Index", NodeKind::Class)
                    .with_property(properties::CLASS_STUB, serde_json::to_value(&stub).unwrap())
                    .with_tag(tags::COUPLING_COMPUTED),
            )
            .unwrap();
        store.merge_metric_max("a.Index", metrics::MIGRATION_COMPLEXITY, 1.0).unwrap();
        let config = TangleConfig::default();
        let ctx = AnalysisContext::new(&store, &config, "/");

        run_item(&GenericComplexityInspector::new(&config), &ctx, "a.Index");

        let node = store.get_node("a.Index").unwrap().unwrap();
        let score = node.metric(metrics::MIGRATION_COMPLEXITY).unwrap();
        assert!(score > 1.0, "score {score}");
    }

    #[test]
    fn score_weights() {
        assert!((generic_score(0, 0)).abs() < f64::EPSILON);
        assert!((generic_score(2, 1) - 13.0).abs() < f64::EPSILON);
    }
}
