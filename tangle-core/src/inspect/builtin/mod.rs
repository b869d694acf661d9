//! Inspectors shipped with tangle.
//!
//! File phase: `file-content` → `java-source` / `class-file`, then the
//! `package-index` barrier. Class phase: `class-shape`, `coupling`,
//! `generic-complexity`, then the `coupling-metrics` barrier.

mod class_file;
mod class_shape;
mod coupling;
mod coupling_metrics;
mod file_content;
mod generic_complexity;
mod java_source;
mod package_index;

pub use class_file::ClassFileInspector;
pub use class_shape::ClassShapeInspector;
pub use coupling::CouplingInspector;
pub use coupling_metrics::CouplingMetricsInspector;
pub use file_content::FileContentInspector;
pub use generic_complexity::GenericComplexityInspector;
pub use java_source::JavaSourceInspector;
pub use package_index::PackageIndexInspector;

use std::collections::BTreeSet;

use tangle_graphs::{ClassStub, CouplingGraphBuilder, CouplingReport};

use crate::config::TangleConfig;
use crate::contracts::properties;

use super::{Inspector, ItemView, PerItemCache};

/// Every built-in inspector, in registration order.
pub fn all(config: &TangleConfig) -> Vec<Inspector> {
    vec![
        Inspector::item(FileContentInspector::new()),
        Inspector::item(JavaSourceInspector::new()),
        Inspector::item(ClassFileInspector::new()),
        Inspector::global(PackageIndexInspector::new()),
        Inspector::item(ClassShapeInspector::new()),
        Inspector::item(CouplingInspector::new(config)),
        Inspector::item(GenericComplexityInspector::new(config)),
        Inspector::global(CouplingMetricsInspector::new()),
    ]
}

// ── Shared cache slots ─────────────────────────────────────────────

const STUB_SLOT: &str = "class_stub";
const COUPLING_SLOT: &str = "coupling_report";

/// The item's class stub, decoded once per visit.
fn cached_stub<'c>(
    item: &ItemView<'_>,
    cache: &'c mut PerItemCache,
) -> crate::error::Result<&'c ClassStub> {
    cache.get_or_compute(STUB_SLOT, || item.property_as::<ClassStub>(properties::CLASS_STUB))
}

/// The coupling report of the item's stub, built once per visit.
/// Ambiguous source names settle on whichever candidate has a class node.
fn cached_coupling<'c>(
    item: &ItemView<'_>,
    builder: &CouplingGraphBuilder,
    cache: &'c mut PerItemCache,
) -> crate::error::Result<&'c CouplingReport> {
    let stub = cached_stub(item, cache)?.clone();
    cache.get_or_compute(COUPLING_SLOT, || {
        let mut known = BTreeSet::new();
        for name in stub.name_candidates.values().flatten() {
            if item.ctx.store.get_node(name)?.is_some() {
                known.insert(name.as_str());
            }
        }
        Ok(builder.build_resolved(&stub, &|n: &str| known.contains(n)))
    })
}
