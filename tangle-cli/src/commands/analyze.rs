use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use tracing::info;

use tangle_core::config::TangleConfig;
use tangle_core::pipeline::{AnalysisPipeline, AnalysisReport};
use tangle_core::progress::IndicatifReporter;
use tangle_core::store::SqliteStore;

use super::OutputFormat;

/// Diagnostics printed in text mode before the rest are summarised.
const SHOWN_DIAGNOSTICS: usize = 20;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Root of the Java code to analyse (default: current directory)
    #[arg(long, default_value = ".")]
    pub path: PathBuf,

    /// Custom database location
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Upper bound on fixpoint passes per item kind
    #[arg(long)]
    pub max_passes: Option<u32>,

    /// Inspect the items of one pass in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Exit with code 10 when the analysis produced diagnostics
    #[arg(long)]
    pub strict: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub fn run(args: AnalyzeArgs, quiet: bool) -> anyhow::Result<()> {
    let root = super::resolve_root(&args.path)?;

    let mut config = TangleConfig::load(&root).context("Cannot load config")?;
    if let Some(n) = args.max_passes {
        config.analysis.max_passes = n;
    }
    if args.parallel {
        config.analysis.parallel_items = true;
    }
    let pipeline = AnalysisPipeline::new(&root, config).context("Invalid config")?;

    let db_path = args.db.clone().unwrap_or_else(|| super::resolve_db_path(&root));
    let store = fresh_store(&db_path)?;

    let reporter = if quiet || args.format == OutputFormat::Json {
        IndicatifReporter::hidden()
    } else {
        IndicatifReporter::new()
    };
    let report = pipeline
        .run_with_reporter(&store, &reporter)
        .context("Analysis failed")?;
    info!(db = %db_path.display(), "Graph written");

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text if quiet => {}
        OutputFormat::Text => print_summary(&report, &db_path),
    }

    if args.strict && !report.diagnostics.is_empty() {
        anyhow::bail!(
            "Analysis completed with {} diagnostics",
            report.diagnostics.len()
        );
    }
    Ok(())
}

/// Open `db_path` empty: every analysis starts from a clean graph. Only
/// a previous tangle database is replaced; any other file is left alone.
fn fresh_store(db_path: &Path) -> anyhow::Result<SqliteStore> {
    if db_path.exists() && !SqliteStore::is_store_file(db_path) {
        anyhow::bail!(
            "Refusing to replace {}: not a tangle database",
            db_path.display()
        );
    }
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create database directory: {}", parent.display()))?;
    }
    for suffix in ["", "-wal", "-shm"] {
        let mut file = db_path.as_os_str().to_owned();
        file.push(suffix);
        let file = PathBuf::from(file);
        if file.exists() {
            std::fs::remove_file(&file)
                .with_context(|| format!("Cannot replace database: {}", file.display()))?;
        }
    }
    SqliteStore::open(db_path)
        .with_context(|| format!("Cannot open database: {}", db_path.display()))
}

fn print_summary(report: &AnalysisReport, db_path: &Path) {
    println!(
        "Analyzed {} in {} ms",
        report.root.display(),
        report.duration().num_milliseconds()
    );
    println!();
    println!("  Database: {}", db_path.display());
    println!();

    for phase in &report.phases {
        println!(
            "  {:<6} {:>6} items  {:>3} passes  {:>7} runs  {}",
            phase.kind.as_str(),
            phase.items,
            phase.passes,
            phase.inspector_runs,
            if phase.converged { "converged" } else { "NOT converged" }
        );
    }
    println!();
    println!("  Nodes: {}  Edges: {}", report.total_nodes, report.total_edges);
    println!();

    println!("  Diagnostics: {}", report.diagnostics.len());
    let mut by_kind: BTreeMap<&str, usize> = BTreeMap::new();
    for d in &report.diagnostics {
        *by_kind.entry(d.kind.as_str()).or_default() += 1;
    }
    for (kind, count) in &by_kind {
        println!("    {kind:<20} {count:>6}");
    }
    for d in report.diagnostics.iter().take(SHOWN_DIAGNOSTICS) {
        println!("    {d}");
    }
    if report.diagnostics.len() > SHOWN_DIAGNOSTICS {
        println!(
            "    ... and {} more",
            report.diagnostics.len() - SHOWN_DIAGNOSTICS
        );
    }
}
