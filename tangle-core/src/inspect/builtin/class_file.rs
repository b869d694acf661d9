use tangle_graphs::classfile;
use tracing::debug;

use crate::contracts::{properties, tags};
use crate::error::StoreError;
use crate::inspect::{InspectorContract, ItemInspector, ItemOutput, ItemView, PerItemCache};
use crate::types::{GraphNode, NodeKind};

use super::file_content::read_bytes;

/// Reads a `.class` file into a class node.
///
/// When the same class was also read from source, the source stub is
/// kept: it carries parameter annotations and generic signatures the
/// compiler may have erased.
#[derive(Debug)]
pub struct ClassFileInspector {
    contract: InspectorContract,
}

impl ClassFileInspector {
    pub fn new() -> Self {
        Self {
            contract: InspectorContract::new("class-file", NodeKind::File)
                .consumes(tags::LANG_JAVA_BINARY)
                .produces(tags::BINARY_PARSED)
                .produces(properties::DECLARED_TYPES),
        }
    }
}

impl Default for ClassFileInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemInspector for ClassFileInspector {
    fn contract(&self) -> &InspectorContract {
        &self.contract
    }

    fn run(
        &self,
        item: &ItemView<'_>,
        out: &mut ItemOutput,
        cache: &mut PerItemCache,
    ) -> crate::error::Result<()> {
        let path = item.file_path();
        let bytes = cache.bytes_or_load(|| read_bytes(&path))?;
        let stub = classfile::read_class(bytes)?;

        let from_source = item
            .ctx
            .store
            .get_node(&stub.name)?
            .and_then(|n| n.property_str(properties::SOURCE_FILE).map(is_source_path))
            .unwrap_or(false);
        if from_source {
            debug!(class = %stub.name, "Class already read from source, keeping source stub");
        } else {
            let value = serde_json::to_value(&stub).map_err(StoreError::from)?;
            out.upsert_node(
                GraphNode::new(&stub.name, NodeKind::Class)
                    .with_property(properties::CLASS_STUB, value)
                    .with_property(properties::SOURCE_FILE, serde_json::json!(item.id())),
            );
        }

        out.set_property(properties::DECLARED_TYPES, serde_json::json!([stub.name]));
        out.enable_tag(tags::BINARY_PARSED);
        Ok(())
    }
}

fn is_source_path(path: &str) -> bool {
    path.ends_with(".java")
}
