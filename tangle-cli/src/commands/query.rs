use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, ValueEnum};

use tangle_core::store::{GraphStore, SqliteStore};
use tangle_core::types::{GraphEdge, GraphNode, NodeFilter, RelationshipKind};

use super::OutputFormat;

/// Candidates listed when the id matches no node exactly.
const MAX_CANDIDATES: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    /// Edges from the node (what it depends on)
    Out,
    /// Edges to the node (what depends on it)
    In,
    Both,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Node id: binary class name, package name or file path
    pub node: String,

    /// Analysed root (default: current directory)
    #[arg(long, default_value = ".")]
    pub path: PathBuf,

    /// Custom database location
    #[arg(long)]
    pub db: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Direction::Out)]
    pub direction: Direction,

    /// Only edges of this kind (extends, implements, uses, annotated_with,
    /// type_parameter, throws, type_variable)
    #[arg(long)]
    pub kind: Option<RelationshipKind>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub fn run(args: QueryArgs) -> anyhow::Result<()> {
    let root = super::resolve_root(&args.path)?;
    let db_path = super::existing_db(&root, args.db.as_deref())?;
    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("Cannot open database: {}", db_path.display()))?;

    let Some(node) = store.get_node(&args.node)? else {
        let candidates = store.find_nodes(&NodeFilter {
            id_prefix: Some(args.node.clone()),
            limit: Some(MAX_CANDIDATES),
            ..NodeFilter::default()
        })?;
        println!("No node found matching: {}", args.node);
        if !candidates.is_empty() {
            println!("Did you mean:");
            for c in candidates {
                println!("  {} ({})", c.id, c.kind);
            }
        }
        return Ok(());
    };

    let mut edges: Vec<GraphEdge> = Vec::new();
    if matches!(args.direction, Direction::Out | Direction::Both) {
        edges.extend(store.edges_from(&node.id)?);
    }
    if matches!(args.direction, Direction::In | Direction::Both) {
        edges.extend(store.edges_to(&node.id)?);
    }
    edges.retain(|e| args.kind.is_none_or(|k| e.kind == k));
    edges.sort();

    match args.format {
        OutputFormat::Json => print_json(&node, &edges)?,
        OutputFormat::Text => print_text(&node, &edges),
    }
    Ok(())
}

// ── Text format ──────────────────────────────────────────────────

fn print_text(node: &GraphNode, edges: &[GraphEdge]) {
    println!("{}: {}", node.kind, node.id);
    if !node.tags.is_empty() {
        let tags: Vec<&str> = node.tags.iter().map(String::as_str).collect();
        println!("Tags: {}", tags.join(", "));
    }
    if !node.metrics.is_empty() {
        println!();
        println!("Metrics:");
        for (key, value) in &node.metrics {
            println!("  {key:<24} {value:>8.2}");
        }
    }
    println!();
    println!("Edges: {}", edges.len());
    for edge in edges {
        println!("  {edge}");
    }
}

// ── JSON format ──────────────────────────────────────────────────

fn print_json(node: &GraphNode, edges: &[GraphEdge]) -> anyhow::Result<()> {
    let out = serde_json::json!({
        "node": node,
        "edges": edges,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
