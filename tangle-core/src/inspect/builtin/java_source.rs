use tangle_graphs::languages::java;
use tracing::debug;

use crate::contracts::{properties, tags};
use crate::error::StoreError;
use crate::inspect::{
    DiagnosticKind, InspectorContract, ItemInspector, ItemOutput, ItemView, PerItemCache,
};
use crate::types::{GraphNode, NodeKind};

use super::file_content::read_bytes;

/// Reads the declared types of a `.java` file and creates one class node
/// per type, carrying its stub.
#[derive(Debug)]
pub struct JavaSourceInspector {
    contract: InspectorContract,
}

impl JavaSourceInspector {
    pub fn new() -> Self {
        Self {
            contract: InspectorContract::new("java-source", NodeKind::File)
                .consumes(tags::LANG_JAVA_SOURCE)
                .produces(tags::SOURCE_PARSED)
                .produces(properties::PACKAGE)
                .produces(properties::DECLARED_TYPES),
        }
    }
}

impl Default for JavaSourceInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemInspector for JavaSourceInspector {
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
        let text = cache
            .text_or_load(|| {
                let bytes = read_bytes(&path)?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            })?
            .to_string();
        let tree = cache.source_tree_or_parse(|| Ok(java::parse_tree(&text)?))?;
        let file = java::read_source(tree, &text);

        if file.has_syntax_errors {
            out.diagnose(
                DiagnosticKind::ParseDegradation,
                "syntax errors in source; declarations read best-effort",
            );
        }

        let mut declared = Vec::with_capacity(file.types.len());
        for stub in &file.types {
            declared.push(stub.name.clone());
            let value = serde_json::to_value(stub).map_err(StoreError::from)?;
            out.upsert_node(
                GraphNode::new(&stub.name, NodeKind::Class)
                    .with_property(properties::CLASS_STUB, value)
                    .with_property(properties::SOURCE_FILE, serde_json::json!(item.id())),
            );
        }
        debug!(file = %item.id(), types = declared.len(), "Read Java source");

        out.set_property(properties::PACKAGE, serde_json::json!(file.package));
        out.set_property(properties::DECLARED_TYPES, serde_json::json!(declared));
        out.enable_tag(tags::SOURCE_PARSED);
        Ok(())
    }
}
