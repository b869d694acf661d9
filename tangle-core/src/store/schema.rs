/// Current schema version.
pub const SCHEMA_VERSION: &str = "1";

/// Full SQL schema for tangle's `SQLite` database.
pub const SCHEMA_SQL: &str = r"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS tangle_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Code units: files, classes, packages
CREATE TABLE IF NOT EXISTS nodes (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_nodes_kind ON nodes(kind);

-- Presence markers
CREATE TABLE IF NOT EXISTS node_tags (
    node_id TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    tag TEXT NOT NULL,
    PRIMARY KEY (node_id, tag)
);
CREATE INDEX IF NOT EXISTS idx_node_tags_tag ON node_tags(tag);

-- Arbitrary JSON values
CREATE TABLE IF NOT EXISTS node_properties (
    node_id TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (node_id, key)
);

-- Numeric values with keep-maximum merge
CREATE TABLE IF NOT EXISTS node_metrics (
    node_id TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    key TEXT NOT NULL,
    value REAL NOT NULL,
    PRIMARY KEY (node_id, key)
);

-- Coupling edges; endpoints may name classes without a node
CREATE TABLE IF NOT EXISTS edges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    identity_key TEXT NOT NULL UNIQUE,
    source_id TEXT NOT NULL,
    target_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    container_type TEXT,
    type_argument_index INTEGER,
    wildcard_kind TEXT,
    CHECK (source_id != target_id)
);
CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id);
CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id);
CREATE INDEX IF NOT EXISTS idx_edges_kind ON edges(kind);
";

/// Projected views for common query patterns.
pub const VIEWS_SQL: &str = r"
-- Distinct class-to-class dependencies, whatever the relationship
CREATE VIEW IF NOT EXISTS class_dependencies AS
SELECT DISTINCT e.source_id, e.target_id
FROM edges e
JOIN nodes s ON s.id = e.source_id AND s.kind = 'class'
JOIN nodes t ON t.id = e.target_id AND t.kind = 'class';
";
