use tangle_graphs::ClassKind;

use crate::contracts::{metrics, properties, tags};
use crate::inspect::{InspectorContract, ItemInspector, ItemOutput, ItemView, PerItemCache};
use crate::types::NodeKind;

use super::cached_stub;

/// Records the declaration shape of a class: its flavour tags, names and
/// a member-count complexity.
#[derive(Debug)]
pub struct ClassShapeInspector {
    contract: InspectorContract,
}

impl ClassShapeInspector {
    pub fn new() -> Self {
        Self {
            contract: InspectorContract::new("class-shape", NodeKind::Class)
                .consumes(properties::CLASS_STUB)
                .produces(tags::INTERFACE)
                .produces(tags::ENUM)
                .produces(tags::ANNOTATION)
                .produces(tags::RECORD)
                .produces(tags::ABSTRACT)
                .produces(tags::GENERIC)
                .produces(properties::SIMPLE_NAME)
                .produces(properties::PACKAGE_NAME)
                .produces(properties::CLASS_KIND)
                .produces(metrics::MIGRATION_COMPLEXITY),
        }
    }
}

impl Default for ClassShapeInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemInspector for ClassShapeInspector {
    fn contract(&self) -> &InspectorContract {
        &self.contract
    }

    fn run(
        &self,
        item: &ItemView<'_>,
        out: &mut ItemOutput,
        cache: &mut PerItemCache,
    ) -> crate::error::Result<()> {
        let stub = cached_stub(item, cache)?;

        let kind_tag = match stub.kind {
            ClassKind::Class => None,
            ClassKind::Interface => Some(tags::INTERFACE),
            ClassKind::Enum => Some(tags::ENUM),
            ClassKind::Annotation => Some(tags::ANNOTATION),
            ClassKind::Record => Some(tags::RECORD),
        };
        if let Some(tag) = kind_tag {
            out.enable_tag(tag);
        }
        if stub.is_abstract && stub.kind == ClassKind::Class {
            out.enable_tag(tags::ABSTRACT);
        }
        if stub.signature.as_deref().is_some_and(|s| s.starts_with('<')) {
            out.enable_tag(tags::GENERIC);
        }

        out.set_property(properties::SIMPLE_NAME, serde_json::json!(stub.simple_name()));
        out.set_property(properties::PACKAGE_NAME, serde_json::json!(stub.package_name()));
        out.set_property(properties::CLASS_KIND, serde_json::json!(stub.kind.as_str()));
        out.merge_metric_max(metrics::MIGRATION_COMPLEXITY, member_complexity(stub));
        Ok(())
    }
}

/// One point per declared field and method, constructors included.
#[allow(clippy::cast_precision_loss)]
fn member_complexity(stub: &tangle_graphs::ClassStub) -> f64 {
    (stub.fields.len() + stub.methods.len()) as f64
}
