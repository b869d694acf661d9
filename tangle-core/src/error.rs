/// Top-level tangle error type.
///
/// All fallible operations in `tangle-core` return [`Result<T, TangleError>`](Result).
/// Each variant wraps a domain-specific error enum, allowing callers to
/// match on the error source without losing type information.
///
/// Recoverable analysis problems (degraded signatures, failing inspectors,
/// unresolved targets) are not errors: they are collected as
/// [`Diagnostic`](crate::inspect::Diagnostic)s in the analysis report.
#[derive(thiserror::Error, Debug)]
pub enum TangleError {
    /// Error from the graph store layer (`SQLite` operations, migrations).
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Error raised by an inspector or by inspector registration.
    #[error("Inspector error: {0}")]
    Inspect(#[from] InspectError),

    /// Error in configuration parsing or validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error while enumerating the files under the analysed root.
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// Error from the type-structure engine (class files, tree-sitter).
    #[error("Graph engine error: {0}")]
    Graph(#[from] tangle_graphs::GraphError),
}

/// Errors from the SQLite-backed graph store.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Underlying `SQLite` operation failed.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Schema migration failed (version mismatch or DDL error).
    #[error("Migration failed: {0}")]
    Migration(String),

    /// A referenced node was not found in the store.
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// A node id was re-used with a different kind.
    #[error("Node {id} is a {existing}, cannot upsert it as a {requested}")]
    KindConflict {
        id: String,
        existing: String,
        requested: String,
    },

    /// JSON serialization/deserialization of a property value failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised by inspectors and the inspector registry.
#[derive(thiserror::Error, Debug)]
pub enum InspectError {
    /// Two inspectors were registered under one id.
    #[error("Duplicate inspector id: {0}")]
    DuplicateId(String),

    /// An inspector ran without an input it declared.
    #[error("Item {item} is missing input {key}")]
    MissingInput { item: String, key: String },

    /// An input was present but unusable.
    #[error("Invalid input on {item}: {message}")]
    Invalid { item: String, message: String },

    /// Filesystem I/O error while reading an item.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors in tangle configuration parsing and validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist at the expected path.
    #[error("Config file not found: {0}")]
    NotFound(String),

    /// Configuration values are present but semantically invalid.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Configuration file syntax could not be parsed (TOML error).
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Errors while walking the analysed root.
#[derive(thiserror::Error, Debug)]
pub enum DiscoveryError {
    /// The root directory does not exist or is not a directory.
    #[error("Cannot resolve path: {0}")]
    RootNotFound(String),

    /// An include or exclude pattern is not a valid glob.
    #[error("Invalid glob pattern {pattern}: {message}")]
    Pattern { pattern: String, message: String },

    /// Filesystem I/O error during the walk.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for `Result<T, TangleError>`.
pub type Result<T> = std::result::Result<T, TangleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_their_layer() {
        let err: TangleError = StoreError::NodeNotFound("a.B".to_string()).into();
        assert_eq!(err.to_string(), "Store error: Node not found: a.B");

        let err: TangleError = ConfigError::Invalid("max_passes must be > 0".to_string()).into();
        assert!(err.to_string().starts_with("Configuration error"));

        let err: TangleError = DiscoveryError::RootNotFound("/nope".to_string()).into();
        assert!(err.to_string().contains("Cannot resolve path"));
    }

    #[test]
    fn kind_conflict_is_descriptive() {
        let err = StoreError::KindConflict {
            id: "com.acme".to_string(),
            existing: "package".to_string(),
            requested: "class".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Node com.acme is a package, cannot upsert it as a class"
        );
    }
}
