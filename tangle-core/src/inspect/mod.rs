//! Inspectors and the multi-pass scheduler that drives them.
//!
//! An inspector declares what it reads and writes in an
//! [`InspectorContract`]. The [`MultiPassScheduler`] runs every inspector
//! whose inputs are present, commits its buffered [`ItemOutput`], and
//! repeats until nothing runnable is left.

pub mod builtin;
mod cache;
mod context;
mod registry;
mod scheduler;
mod traits;

pub use cache::PerItemCache;
pub use context::{AnalysisContext, Diagnostic, DiagnosticKind, ItemOutput, ItemView};
pub use registry::InspectorRegistry;
pub use scheduler::{InspectorStatus, MultiPassScheduler, PhaseReport};
pub use traits::{GlobalInspector, Inspector, InspectorContract, ItemInspector};
