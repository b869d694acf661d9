use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::contracts::{metrics, properties, tags};
use crate::inspect::{AnalysisContext, GlobalInspector, InspectorContract, ItemOutput};
use crate::types::{GraphNode, NodeFilter, NodeKind};

/// Package node id used for classes without a package declaration.
pub const DEFAULT_PACKAGE: &str = "<default>";

/// Creates one package node per package seen in the declared types of
/// every file, with the number of distinct types it holds.
#[derive(Debug)]
pub struct PackageIndexInspector {
    contract: InspectorContract,
}

impl PackageIndexInspector {
    pub fn new() -> Self {
        Self {
            contract: InspectorContract::new("package-index", NodeKind::File)
                .global()
                .produces(metrics::PACKAGE_TYPE_COUNT)
                .produces(tags::PACKAGE_INDEXED),
        }
    }
}

impl Default for PackageIndexInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalInspector for PackageIndexInspector {
    fn contract(&self) -> &InspectorContract {
        &self.contract
    }

    fn run(&self, ctx: &AnalysisContext<'_>, out: &mut ItemOutput) -> crate::error::Result<()> {
        let mut packages: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for file in ctx.store.find_nodes(&NodeFilter::of_kind(NodeKind::File))? {
            let Some(declared) = file
                .property(properties::DECLARED_TYPES)
                .and_then(serde_json::Value::as_array)
            else {
                continue;
            };
            for name in declared.iter().filter_map(serde_json::Value::as_str) {
                packages
                    .entry(package_of(name).to_string())
                    .or_default()
                    .insert(name.to_string());
            }
            out.tag_node(&file.id, tags::PACKAGE_INDEXED);
        }

        for (package, types) in &packages {
            out.upsert_node(GraphNode::new(package, NodeKind::Package));
            #[allow(clippy::cast_precision_loss)]
            out.set_node_metric(package, metrics::PACKAGE_TYPE_COUNT, types.len() as f64);
        }
        debug!(packages = packages.len(), "Indexed packages");
        Ok(())
    }
}

/// Package node id for a binary class name.
pub fn package_of(binary_name: &str) -> &str {
    match binary_name.rsplit_once('.') {
        Some((package, _)) => package,
        None => DEFAULT_PACKAGE,
    }
}
