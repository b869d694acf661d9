pub mod classfile;
pub mod coupling;
pub mod languages;
pub mod signature;
pub mod stub;
pub mod type_structure;

pub use coupling::{
    CouplingEdge, CouplingGraphBuilder, CouplingOptions, CouplingReport, EdgeProperties,
    ExternalPolicy, RelationshipKind, WildcardKind,
};
pub use signature::{Degradation, ParseOutcome};
pub use stub::{ClassKind, ClassStub, FieldStub, MethodStub, StubOrigin};
pub use type_structure::{TypeStructure, WildcardBound};

/// Error type for the type-structure engine.
#[derive(thiserror::Error, Debug)]
pub enum GraphError {
    #[error("Parse error in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Class format error: {0}")]
    ClassFormat(String),

    #[error("Tree-sitter error: {0}")]
    TreeSitter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;
