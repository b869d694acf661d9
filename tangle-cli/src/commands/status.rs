use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use tangle_core::contracts::tags;
use tangle_core::store::{GraphStore, SqliteStore};
use tangle_core::types::{NodeFilter, NodeKind};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Analysed root (default: current directory)
    #[arg(long, default_value = ".")]
    pub path: PathBuf,

    /// Custom database location
    #[arg(long)]
    pub db: Option<PathBuf>,
}

pub fn run(args: StatusArgs) -> anyhow::Result<()> {
    let root = super::resolve_root(&args.path)?;
    let db_path = super::existing_db(&root, args.db.as_deref())?;

    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("Cannot open database: {}", db_path.display()))?;

    let stats = store.stats().context("Failed to read store stats")?;

    println!("Tangle status for {}", root.display());
    println!();
    println!("  Database: {}", db_path.display());

    // Database size
    if stats.db_size_bytes > 0 {
        let size = format_bytes(stats.db_size_bytes);
        println!("  Size:     {size}");
    }
    println!();

    // Node counts
    println!("  Nodes: {} total", stats.total_nodes);
    if !stats.nodes_by_kind.is_empty() {
        let mut kinds: Vec<_> = stats.nodes_by_kind.iter().collect();
        kinds.sort_by(|a, b| b.1.cmp(a.1));
        for (kind, count) in &kinds {
            println!("    {kind:<20} {count:>6}");
        }
    }
    println!();

    // Edge counts
    println!("  Edges: {} total", stats.total_edges);
    if !stats.edges_by_kind.is_empty() {
        let mut kinds: Vec<_> = stats.edges_by_kind.iter().collect();
        kinds.sort_by(|a, b| b.1.cmp(a.1));
        for (kind, count) in &kinds {
            println!("    {kind:<20} {count:>6}");
        }
    }
    println!();

    let external = store.find_nodes(&NodeFilter::of_kind(NodeKind::Class).with_tag(tags::EXTERNAL))?;
    let in_cycles =
        store.find_nodes(&NodeFilter::of_kind(NodeKind::Class).with_tag(tags::COUPLING_CYCLE))?;
    println!("  External placeholders: {}", external.len());
    println!("  Classes in cycles:     {}", in_cycles.len());

    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_sizes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
