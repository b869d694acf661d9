use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};

use crate::error::StoreError;
use crate::types::{
    EdgeProperties, GraphEdge, GraphNode, NodeFilter, NodeKind, RelationshipKind, StoreStats,
};

use super::schema;
use super::traits::{GraphStore, StoreWrite};

/// SQLite-backed implementation of `GraphStore`.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn open(path: &Path) -> crate::error::Result<Self> {
        let conn = Connection::open(path).map_err(StoreError::Sqlite)?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(path.to_path_buf()),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> crate::error::Result<Self> {
        let conn = Connection::open_in_memory().map_err(StoreError::Sqlite)?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> crate::error::Result<()> {
        let conn = self.conn.lock().expect("tangle store mutex poisoned");

        conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA foreign_keys = ON;",
        )
        .map_err(StoreError::Sqlite)?;

        // Silently ignored for in-memory databases
        let _ = conn.execute_batch("PRAGMA journal_mode = WAL;");

        conn.execute_batch(schema::SCHEMA_SQL)
            .map_err(StoreError::Sqlite)?;
        conn.execute_batch(schema::VIEWS_SQL)
            .map_err(StoreError::Sqlite)?;

        conn.execute(
            "INSERT OR IGNORE INTO tangle_meta (key, value) VALUES ('schema_version', ?1)",
            params![schema::SCHEMA_VERSION],
        )
        .map_err(StoreError::Sqlite)?;

        let version: String = conn
            .query_row(
                "SELECT value FROM tangle_meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .map_err(StoreError::Sqlite)?;
        if version != schema::SCHEMA_VERSION {
            return Err(StoreError::Migration(format!(
                "database has schema version {version}, this build expects {}",
                schema::SCHEMA_VERSION
            ))
            .into());
        }

        Ok(())
    }

    /// Whether the existing file at `path` is a tangle database, i.e. a
    /// SQLite file with a `tangle_meta` table. Never creates the file;
    /// anything SQLite cannot read is not one.
    pub fn is_store_file(path: &Path) -> bool {
        let Ok(conn) = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE) else {
            return false;
        };
        conn.query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'tangle_meta'",
            [],
            |_| Ok(()),
        )
        .optional()
        .is_ok_and(|found| found.is_some())
    }
}

// ── Row helpers ────────────────────────────────────────────────────
//
// These take a plain `&Connection` so the same code runs standalone and
// inside the transaction opened by `commit`.

fn node_kind(conn: &Connection, id: &str) -> Result<Option<NodeKind>, StoreError> {
    let kind: Option<String> = conn
        .query_row("SELECT kind FROM nodes WHERE id = ?1", params![id], |row| {
            row.get(0)
        })
        .optional()?;
    kind.map(|k| {
        k.parse::<NodeKind>()
            .map_err(|e| StoreError::Sqlite(conversion_error(1, e)))
    })
    .transpose()
}

fn require_node(conn: &Connection, id: &str) -> Result<(), StoreError> {
    match node_kind(conn, id)? {
        Some(_) => Ok(()),
        None => Err(StoreError::NodeNotFound(id.to_string())),
    }
}

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, message.into())
}

fn write_node(conn: &Connection, node: &GraphNode) -> Result<(), StoreError> {
    match node_kind(conn, &node.id)? {
        Some(existing) if existing != node.kind => {
            return Err(StoreError::KindConflict {
                id: node.id.clone(),
                existing: existing.to_string(),
                requested: node.kind.to_string(),
            });
        }
        Some(_) => {}
        None => {
            conn.execute(
                "INSERT INTO nodes (id, kind, created_at) VALUES (?1, ?2, ?3)",
                params![node.id, node.kind.as_str(), Utc::now().to_rfc3339()],
            )?;
        }
    }

    for tag in &node.tags {
        write_tag(conn, &node.id, tag)?;
    }
    for (key, value) in &node.properties {
        write_property(conn, &node.id, key, value)?;
    }
    for (key, value) in &node.metrics {
        write_metric(conn, &node.id, key, *value)?;
    }
    Ok(())
}

fn write_tag(conn: &Connection, id: &str, tag: &str) -> Result<bool, StoreError> {
    require_node(conn, id)?;
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO node_tags (node_id, tag) VALUES (?1, ?2)",
        params![id, tag],
    )?;
    Ok(inserted > 0)
}

fn write_property(
    conn: &Connection,
    id: &str,
    key: &str,
    value: &serde_json::Value,
) -> Result<bool, StoreError> {
    require_node(conn, id)?;
    let existing: Option<String> = conn
        .query_row(
            "SELECT value FROM node_properties WHERE node_id = ?1 AND key = ?2",
            params![id, key],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(raw) = existing {
        let current: serde_json::Value = serde_json::from_str(&raw)?;
        if &current == value {
            return Ok(false);
        }
    }
    conn.execute(
        "INSERT INTO node_properties (node_id, key, value) VALUES (?1, ?2, ?3)
         ON CONFLICT(node_id, key) DO UPDATE SET value = excluded.value",
        params![id, key, serde_json::to_string(value)?],
    )?;
    Ok(true)
}

fn finite(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value }
}

fn read_metric(conn: &Connection, id: &str, key: &str) -> Result<Option<f64>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT value FROM node_metrics WHERE node_id = ?1 AND key = ?2",
            params![id, key],
            |row| row.get(0),
        )
        .optional()?)
}

fn write_metric(conn: &Connection, id: &str, key: &str, value: f64) -> Result<(), StoreError> {
    require_node(conn, id)?;
    conn.execute(
        "INSERT INTO node_metrics (node_id, key, value) VALUES (?1, ?2, ?3)
         ON CONFLICT(node_id, key) DO UPDATE SET value = excluded.value",
        params![id, key, finite(value)],
    )?;
    Ok(())
}

/// Returns the merged value and whether it differs from what was stored.
fn write_metric_max(
    conn: &Connection,
    id: &str,
    key: &str,
    value: f64,
) -> Result<(f64, bool), StoreError> {
    require_node(conn, id)?;
    let before = read_metric(conn, id, key)?;
    conn.execute(
        "INSERT INTO node_metrics (node_id, key, value) VALUES (?1, ?2, MAX(?3, 0.0))
         ON CONFLICT(node_id, key) DO UPDATE SET value = MAX(value, excluded.value)",
        params![id, key, finite(value)],
    )?;
    let after = read_metric(conn, id, key)?.unwrap_or(0.0);
    Ok((after, before != Some(after)))
}

fn write_edge(conn: &Connection, edge: &GraphEdge) -> Result<bool, StoreError> {
    if edge.is_self_edge() {
        return Ok(false);
    }
    let p = &edge.properties;
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO edges
            (identity_key, source_id, target_id, kind, container_type, type_argument_index, wildcard_kind)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            edge.identity_key(),
            edge.source_id,
            edge.target_id,
            edge.kind.as_str(),
            p.container_type,
            p.type_argument_index,
            p.wildcard_kind.map(|w| w.as_str()),
        ],
    )?;
    Ok(inserted > 0)
}

fn read_node(conn: &Connection, id: &str) -> Result<Option<GraphNode>, StoreError> {
    let Some(kind) = node_kind(conn, id)? else {
        return Ok(None);
    };
    let mut node = GraphNode::new(id, kind);

    let mut stmt = conn.prepare_cached("SELECT tag FROM node_tags WHERE node_id = ?1")?;
    node.tags = stmt
        .query_map(params![id], |row| row.get(0))?
        .collect::<rusqlite::Result<BTreeSet<String>>>()?;

    let mut stmt =
        conn.prepare_cached("SELECT key, value FROM node_properties WHERE node_id = ?1")?;
    let raw: Vec<(String, String)> = stmt
        .query_map(params![id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<_>>()?;
    for (key, value) in raw {
        node.properties.insert(key, serde_json::from_str(&value)?);
    }

    let mut stmt = conn.prepare_cached("SELECT key, value FROM node_metrics WHERE node_id = ?1")?;
    node.metrics = stmt
        .query_map(params![id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<BTreeMap<String, f64>>>()?;

    Ok(Some(node))
}

fn row_to_edge(row: &rusqlite::Row<'_>) -> rusqlite::Result<GraphEdge> {
    let kind: String = row.get("kind")?;
    let wildcard: Option<String> = row.get("wildcard_kind")?;
    Ok(GraphEdge {
        source_id: row.get("source_id")?,
        target_id: row.get("target_id")?,
        kind: kind
            .parse::<RelationshipKind>()
            .map_err(|e| conversion_error(3, e))?,
        properties: EdgeProperties {
            container_type: row.get("container_type")?,
            type_argument_index: row.get("type_argument_index")?,
            wildcard_kind: wildcard
                .map(|w| w.parse().map_err(|e| conversion_error(6, e)))
                .transpose()?,
        },
    })
}

const EDGE_COLUMNS: &str =
    "source_id, target_id, kind, container_type, type_argument_index, wildcard_kind";

fn query_edges(
    conn: &Connection,
    where_clause: &str,
    param: Option<&str>,
) -> Result<Vec<GraphEdge>, StoreError> {
    let sql = format!("SELECT {EDGE_COLUMNS} FROM edges {where_clause} ORDER BY identity_key");
    let mut stmt = conn.prepare_cached(&sql)?;
    let edges = match param {
        Some(p) => stmt
            .query_map(params![p], row_to_edge)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        None => stmt
            .query_map([], row_to_edge)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
    };
    Ok(edges)
}

impl GraphStore for SqliteStore {
    // ── Node operations ────────────────────────────────────────────

    fn upsert_node(&self, node: &GraphNode) -> crate::error::Result<()> {
        let mut conn = self.conn.lock().expect("tangle store mutex poisoned");
        let tx = conn.transaction().map_err(StoreError::Sqlite)?;
        write_node(&tx, node)?;
        tx.commit().map_err(StoreError::Sqlite)?;
        Ok(())
    }

    fn get_node(&self, id: &str) -> crate::error::Result<Option<GraphNode>> {
        let conn = self.conn.lock().expect("tangle store mutex poisoned");
        Ok(read_node(&conn, id)?)
    }

    fn find_nodes(&self, filter: &NodeFilter) -> crate::error::Result<Vec<GraphNode>> {
        let conn = self.conn.lock().expect("tangle store mutex poisoned");
        let mut sql = String::from("SELECT id FROM nodes WHERE 1=1");
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(kind) = filter.kind {
            let _ = write!(sql, " AND kind = ?{}", param_values.len() + 1);
            param_values.push(Box::new(kind.as_str().to_string()));
        }
        if let Some(prefix) = &filter.id_prefix {
            // substr instead of LIKE: ids contain `_` and `$`
            let _ = write!(
                sql,
                " AND substr(id, 1, ?{}) = ?{}",
                param_values.len() + 1,
                param_values.len() + 2
            );
            param_values.push(Box::new(i64::try_from(prefix.chars().count()).unwrap_or(i64::MAX)));
            param_values.push(Box::new(prefix.clone()));
        }
        for tag in &filter.tags {
            let _ = write!(
                sql,
                " AND id IN (SELECT node_id FROM node_tags WHERE tag = ?{})",
                param_values.len() + 1
            );
            param_values.push(Box::new(tag.clone()));
        }
        sql.push_str(" ORDER BY id");
        if let Some(limit) = filter.limit {
            let _ = write!(sql, " LIMIT {limit}");
        }

        let mut stmt = conn.prepare(&sql).map_err(StoreError::Sqlite)?;
        let params_ref: Vec<&dyn rusqlite::types::ToSql> = param_values
            .iter()
            .map(std::convert::AsRef::as_ref)
            .collect();
        let ids = stmt
            .query_map(params_ref.as_slice(), |row| row.get::<_, String>(0))
            .map_err(StoreError::Sqlite)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::Sqlite)?;

        let mut nodes = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(node) = read_node(&conn, &id)? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    fn node_ids(&self, kind: NodeKind) -> crate::error::Result<Vec<String>> {
        let conn = self.conn.lock().expect("tangle store mutex poisoned");
        let mut stmt = conn
            .prepare_cached("SELECT id FROM nodes WHERE kind = ?1 ORDER BY id")
            .map_err(StoreError::Sqlite)?;
        let ids = stmt
            .query_map(params![kind.as_str()], |row| row.get(0))
            .map_err(StoreError::Sqlite)?
            .collect::<rusqlite::Result<Vec<String>>>()
            .map_err(StoreError::Sqlite)?;
        Ok(ids)
    }

    fn enable_tag(&self, id: &str, tag: &str) -> crate::error::Result<bool> {
        let conn = self.conn.lock().expect("tangle store mutex poisoned");
        Ok(write_tag(&conn, id, tag)?)
    }

    fn set_property(
        &self,
        id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> crate::error::Result<bool> {
        let conn = self.conn.lock().expect("tangle store mutex poisoned");
        Ok(write_property(&conn, id, key, value)?)
    }

    fn set_metric(&self, id: &str, key: &str, value: f64) -> crate::error::Result<()> {
        let conn = self.conn.lock().expect("tangle store mutex poisoned");
        Ok(write_metric(&conn, id, key, value)?)
    }

    fn merge_metric_max(&self, id: &str, key: &str, value: f64) -> crate::error::Result<f64> {
        let conn = self.conn.lock().expect("tangle store mutex poisoned");
        Ok(write_metric_max(&conn, id, key, value)?.0)
    }

    // ── Edge operations ────────────────────────────────────────────

    fn upsert_edge(&self, edge: &GraphEdge) -> crate::error::Result<bool> {
        let conn = self.conn.lock().expect("tangle store mutex poisoned");
        Ok(write_edge(&conn, edge)?)
    }

    fn edges_from(&self, id: &str) -> crate::error::Result<Vec<GraphEdge>> {
        let conn = self.conn.lock().expect("tangle store mutex poisoned");
        Ok(query_edges(&conn, "WHERE source_id = ?1", Some(id))?)
    }

    fn edges_to(&self, id: &str) -> crate::error::Result<Vec<GraphEdge>> {
        let conn = self.conn.lock().expect("tangle store mutex poisoned");
        Ok(query_edges(&conn, "WHERE target_id = ?1", Some(id))?)
    }

    fn edges_by_kind(&self, kind: RelationshipKind) -> crate::error::Result<Vec<GraphEdge>> {
        let conn = self.conn.lock().expect("tangle store mutex poisoned");
        Ok(query_edges(&conn, "WHERE kind = ?1", Some(kind.as_str()))?)
    }

    fn all_edges(&self) -> crate::error::Result<Vec<GraphEdge>> {
        let conn = self.conn.lock().expect("tangle store mutex poisoned");
        Ok(query_edges(&conn, "", None)?)
    }

    // ── Batches ────────────────────────────────────────────────────

    fn commit(&self, writes: &[StoreWrite]) -> crate::error::Result<usize> {
        if writes.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.lock().expect("tangle store mutex poisoned");
        let tx = conn.transaction().map_err(StoreError::Sqlite)?;

        let mut changed = 0;
        for write in writes {
            let did_change = match write {
                StoreWrite::Node(node) => {
                    let before = read_node(&tx, &node.id)?;
                    write_node(&tx, node)?;
                    before != read_node(&tx, &node.id)?
                }
                StoreWrite::Tag { node, tag } => write_tag(&tx, node, tag)?,
                StoreWrite::Property { node, key, value } => {
                    write_property(&tx, node, key, value)?
                }
                StoreWrite::Metric { node, key, value } => {
                    let before = read_metric(&tx, node, key)?;
                    write_metric(&tx, node, key, *value)?;
                    before != Some(finite(*value))
                }
                StoreWrite::MetricMax { node, key, value } => {
                    write_metric_max(&tx, node, key, *value)?.1
                }
                StoreWrite::Edge(edge) => write_edge(&tx, edge)?,
            };
            if did_change {
                changed += 1;
            }
        }

        tx.commit().map_err(StoreError::Sqlite)?;
        Ok(changed)
    }

    // ── Metrics ────────────────────────────────────────────────────

    fn stats(&self) -> crate::error::Result<StoreStats> {
        let conn = self.conn.lock().expect("tangle store mutex poisoned");

        let total_nodes: u64 = conn
            .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))
            .map_err(StoreError::Sqlite)?;
        let total_edges: u64 = conn
            .query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))
            .map_err(StoreError::Sqlite)?;

        let mut stmt = conn
            .prepare("SELECT kind, COUNT(*) FROM nodes GROUP BY kind")
            .map_err(StoreError::Sqlite)?;
        let nodes_by_kind: BTreeMap<String, u64> = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
            })
            .map_err(StoreError::Sqlite)?
            .collect::<rusqlite::Result<BTreeMap<_, _>>>()
            .map_err(StoreError::Sqlite)?;

        let mut stmt = conn
            .prepare("SELECT kind, COUNT(*) FROM edges GROUP BY kind")
            .map_err(StoreError::Sqlite)?;
        let edges_by_kind: BTreeMap<String, u64> = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
            })
            .map_err(StoreError::Sqlite)?
            .collect::<rusqlite::Result<BTreeMap<_, _>>>()
            .map_err(StoreError::Sqlite)?;

        let db_size_bytes = self
            .db_path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map_or(0, |m| m.len());

        Ok(StoreStats {
            total_nodes,
            total_edges,
            nodes_by_kind,
            edges_by_kind,
            db_size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TangleError;
    use crate::types::WildcardKind;

    fn class(id: &str) -> GraphNode {
        GraphNode::new(id, NodeKind::Class)
    }

    #[test]
    fn upsert_and_get_node() {
        let store = SqliteStore::in_memory().unwrap();
        let node = GraphNode::new("src/A.java", NodeKind::File)
            .with_tag("file.read")
            .with_property("file.size", serde_json::json!(120));
        store.upsert_node(&node).unwrap();

        let fetched = store.get_node("src/A.java").unwrap().unwrap();
        assert_eq!(fetched, node);
        assert!(store.get_node("src/B.java").unwrap().is_none());
    }

    #[test]
    fn upsert_node_merges_instead_of_replacing() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .upsert_node(&class("a.A").with_tag("one").with_property("k", serde_json::json!(1)))
            .unwrap();
        store
            .upsert_node(&class("a.A").with_tag("two").with_property("k", serde_json::json!(2)))
            .unwrap();

        let node = store.get_node("a.A").unwrap().unwrap();
        assert!(node.has_tag("one") && node.has_tag("two"));
        assert_eq!(node.property("k"), Some(&serde_json::json!(2)));
        assert_eq!(store.stats().unwrap().total_nodes, 1);
    }

    #[test]
    fn node_kind_is_immutable() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_node(&class("a.A")).unwrap();
        let err = store
            .upsert_node(&GraphNode::new("a.A", NodeKind::Package))
            .unwrap_err();
        assert!(matches!(
            err,
            TangleError::Store(StoreError::KindConflict { .. })
        ));
    }

    #[test]
    fn tags_and_properties_report_changes() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_node(&class("a.A")).unwrap();

        assert!(store.enable_tag("a.A", "java.generic").unwrap());
        assert!(!store.enable_tag("a.A", "java.generic").unwrap());

        let v = serde_json::json!(["a.A", "a.B"]);
        assert!(store.set_property("a.A", "java.declaredTypes", &v).unwrap());
        assert!(!store.set_property("a.A", "java.declaredTypes", &v).unwrap());
        assert!(
            store
                .set_property("a.A", "java.declaredTypes", &serde_json::json!([]))
                .unwrap()
        );
    }

    #[test]
    fn writes_to_missing_nodes_fail() {
        let store = SqliteStore::in_memory().unwrap();
        let err = store.enable_tag("nope", "t").unwrap_err();
        assert!(matches!(err, TangleError::Store(StoreError::NodeNotFound(_))));
    }

    #[test]
    fn metric_max_merge_keeps_maximum() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_node(&class("a.A")).unwrap();

        assert_eq!(store.merge_metric_max("a.A", "m", -2.0).unwrap(), 0.0);
        assert_eq!(store.merge_metric_max("a.A", "m", 4.0).unwrap(), 4.0);
        assert_eq!(store.merge_metric_max("a.A", "m", 1.0).unwrap(), 4.0);

        store.set_metric("a.A", "m", 1.0).unwrap();
        assert_eq!(store.get_node("a.A").unwrap().unwrap().metric("m"), Some(1.0));
    }

    #[test]
    fn edges_are_unique_by_identity() {
        let store = SqliteStore::in_memory().unwrap();
        let mut edge = GraphEdge::new("a.A", "a.B", RelationshipKind::TypeParameter);
        edge.properties.container_type = Some("java.util.List".to_string());
        edge.properties.type_argument_index = Some(0);

        assert!(store.upsert_edge(&edge).unwrap());
        assert!(!store.upsert_edge(&edge).unwrap());

        let mut wild = edge.clone();
        wild.properties.wildcard_kind = Some(WildcardKind::Super);
        assert!(store.upsert_edge(&wild).unwrap());

        let edges = store.edges_from("a.A").unwrap();
        assert_eq!(edges.len(), 2);
        assert!(edges.contains(&wild));
        assert_eq!(store.edges_to("a.B").unwrap().len(), 2);
        assert_eq!(store.edges_by_kind(RelationshipKind::Uses).unwrap().len(), 0);
    }

    #[test]
    fn self_edges_are_a_no_op() {
        let store = SqliteStore::in_memory().unwrap();
        let edge = GraphEdge::new("a.A", "a.A", RelationshipKind::Uses);
        assert!(!store.upsert_edge(&edge).unwrap());
        assert!(store.all_edges().unwrap().is_empty());
    }

    #[test]
    fn find_nodes_with_filter() {
        let store = SqliteStore::in_memory().unwrap();
        for id in ["com.acme.A", "com.acme.B", "com.acme_x.C", "org.other.D"] {
            store.upsert_node(&class(id)).unwrap();
        }
        store.enable_tag("com.acme.B", "java.interface").unwrap();
        store
            .upsert_node(&GraphNode::new("com.acme", NodeKind::Package))
            .unwrap();

        let mut filter = NodeFilter::of_kind(NodeKind::Class);
        filter.id_prefix = Some("com.acme.".to_string());
        let ids: Vec<String> = store
            .find_nodes(&filter)
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, ["com.acme.A", "com.acme.B"]);

        let tagged = store
            .find_nodes(&NodeFilter::of_kind(NodeKind::Class).with_tag("java.interface"))
            .unwrap();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].id, "com.acme.B");

        let limited = store
            .find_nodes(&NodeFilter {
                limit: Some(2),
                ..NodeFilter::default()
            })
            .unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(store.node_ids(NodeKind::Package).unwrap(), ["com.acme"]);
    }

    #[test]
    fn commit_applies_batch_and_counts_changes() {
        let store = SqliteStore::in_memory().unwrap();
        let writes = vec![
            StoreWrite::Node(class("a.A")),
            StoreWrite::Tag {
                node: "a.A".to_string(),
                tag: "coupling.computed".to_string(),
            },
            StoreWrite::MetricMax {
                node: "a.A".to_string(),
                key: "coupling.efferent".to_string(),
                value: 3.0,
            },
            StoreWrite::Edge(GraphEdge::new("a.A", "a.B", RelationshipKind::Extends)),
        ];
        assert_eq!(store.commit(&writes).unwrap(), 4);
        assert_eq!(store.commit(&writes).unwrap(), 0);
    }

    #[test]
    fn failed_commit_rolls_back() {
        let store = SqliteStore::in_memory().unwrap();
        let writes = vec![
            StoreWrite::Node(class("a.A")),
            StoreWrite::Tag {
                node: "missing".to_string(),
                tag: "x".to_string(),
            },
        ];
        assert!(store.commit(&writes).is_err());
        assert!(store.get_node("a.A").unwrap().is_none());
    }

    #[test]
    fn load_coupling_graph_uses_all_edges() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .upsert_edge(&GraphEdge::new("a", "b", RelationshipKind::Uses))
            .unwrap();
        store
            .upsert_edge(&GraphEdge::new("b", "c", RelationshipKind::Implements))
            .unwrap();
        let graph = store.load_coupling_graph().unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn store_stats() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_node(&class("a.A")).unwrap();
        store
            .upsert_node(&GraphNode::new("A.java", NodeKind::File))
            .unwrap();
        store
            .upsert_edge(&GraphEdge::new("a.A", "a.B", RelationshipKind::Uses))
            .unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_nodes, 2);
        assert_eq!(stats.total_edges, 1);
        assert_eq!(stats.nodes_by_kind["class"], 1);
        assert_eq!(stats.nodes_by_kind["file"], 1);
        assert_eq!(stats.edges_by_kind["uses"], 1);
    }

    #[test]
    fn reopening_a_file_store_keeps_data() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tangle.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.upsert_node(&class("a.A").with_tag("t")).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert!(store.get_node("a.A").unwrap().unwrap().has_tag("t"));
        assert!(store.stats().unwrap().db_size_bytes > 0);
    }

    #[test]
    fn store_files_are_recognised_by_their_meta_table() {
        let tmp = tempfile::tempdir().unwrap();
        let db = tmp.path().join("tangle.db");
        SqliteStore::open(&db).unwrap();
        assert!(SqliteStore::is_store_file(&db));

        let text = tmp.path().join("Main.java");
        std::fs::write(&text, "class Main {}\n").unwrap();
        assert!(!SqliteStore::is_store_file(&text));

        let other = tmp.path().join("other.db");
        Connection::open(&other)
            .unwrap()
            .execute_batch("CREATE TABLE notes (body TEXT);")
            .unwrap();
        assert!(!SqliteStore::is_store_file(&other));

        let missing = tmp.path().join("missing.db");
        assert!(!SqliteStore::is_store_file(&missing));
        assert!(!missing.exists());
    }

    #[test]
    fn foreign_schema_version_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tangle.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE tangle_meta (key TEXT PRIMARY KEY, value TEXT NOT NULL);
                 INSERT INTO tangle_meta VALUES ('schema_version', '0');",
            )
            .unwrap();
        }
        let err = SqliteStore::open(&path).unwrap_err();
        assert!(matches!(err, TangleError::Store(StoreError::Migration(_))));
    }
}

// ── Property-based tests ──────────────────────────────────────────────
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Keep-maximum writes give the same result in any order.
        #[test]
        fn metric_max_merge_is_order_independent(
            values in proptest::collection::vec(-100.0..100.0_f64, 1..8),
        ) {
            let forward = SqliteStore::in_memory().unwrap();
            let backward = SqliteStore::in_memory().unwrap();
            for store in [&forward, &backward] {
                store.upsert_node(&GraphNode::new("a.A", NodeKind::Class)).unwrap();
            }
            for v in &values {
                forward.merge_metric_max("a.A", "m", *v).unwrap();
            }
            for v in values.iter().rev() {
                backward.merge_metric_max("a.A", "m", *v).unwrap();
            }
            let expected = values.iter().copied().fold(0.0_f64, f64::max);
            let a = forward.get_node("a.A").unwrap().unwrap().metric("m");
            let b = backward.get_node("a.A").unwrap().unwrap().metric("m");
            prop_assert_eq!(a, Some(expected));
            prop_assert_eq!(b, Some(expected));
        }

        /// Property values survive the JSON column unchanged.
        #[test]
        fn property_roundtrip(key in "[a-z.]{1,20}", n in any::<i64>(), s in "[a-zA-Z0-9 ]{0,30}") {
            let store = SqliteStore::in_memory().unwrap();
            let value = serde_json::json!({ "n": n, "s": s });
            store.upsert_node(&GraphNode::new("x", NodeKind::File).with_property(key.clone(), value.clone())).unwrap();
            let fetched = store.get_node("x").unwrap().unwrap();
            prop_assert_eq!(fetched.property(&key), Some(&value));
        }
    }

    #[test]
    fn max_merge_of_three_nine_six_is_nine() {
        let orders = [[3.0, 9.0, 6.0], [6.0, 3.0, 9.0], [9.0, 6.0, 3.0]];
        for order in orders {
            let store = SqliteStore::in_memory().unwrap();
            store.upsert_node(&GraphNode::new("a.A", NodeKind::Class)).unwrap();
            for v in order {
                store.merge_metric_max("a.A", "severity", v).unwrap();
            }
            assert_eq!(
                store.get_node("a.A").unwrap().unwrap().metric("severity"),
                Some(9.0)
            );
        }
    }
}
