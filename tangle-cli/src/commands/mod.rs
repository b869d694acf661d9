pub mod analyze;
pub mod query;
pub mod status;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Subcommand, ValueEnum};

use tangle_core::config::{DB_FILE, TANGLE_DIR};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyse a Java source or class tree into the coupling graph
    Analyze(analyze::AnalyzeArgs),
    /// Show node and edge counts of the last analysis
    Status(status::StatusArgs),
    /// List the coupling edges of one node
    Query(query::QueryArgs),
}

/// How a command prints its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub fn run(cmd: Command, quiet: bool) -> anyhow::Result<()> {
    match cmd {
        Command::Analyze(args) => analyze::run(args, quiet),
        Command::Status(args) => status::run(args),
        Command::Query(args) => query::run(args),
    }
}

/// Default database location under the analysed root.
pub fn resolve_db_path(root: &Path) -> PathBuf {
    root.join(TANGLE_DIR).join(DB_FILE)
}

pub fn resolve_root(path: &Path) -> anyhow::Result<PathBuf> {
    std::fs::canonicalize(path).with_context(|| format!("Cannot resolve path: {}", path.display()))
}

/// Database of a previous `tangle analyze` run.
pub fn existing_db(root: &Path, db: Option<&Path>) -> anyhow::Result<PathBuf> {
    let db_path = db.map_or_else(|| resolve_db_path(root), Path::to_path_buf);
    if !db_path.exists() {
        anyhow::bail!(
            "Tangle is not initialized in {}. Run `tangle analyze` first.",
            root.display()
        );
    }
    Ok(db_path)
}
