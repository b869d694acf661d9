//! Pipeline orchestrator: discovery → file fixpoint → file globals →
//! class fixpoint → class globals.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::TangleConfig;
use crate::contracts::tags;
use crate::discovery;
use crate::inspect::{
    AnalysisContext, Diagnostic, DiagnosticKind, InspectorRegistry, MultiPassScheduler, PhaseReport,
};
use crate::progress::{NoopReporter, ProgressReporter};
use crate::store::{GraphStore, StoreWrite};
use crate::types::{NodeFilter, NodeKind};

/// Result of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub root: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One report per item kind, in execution order.
    pub phases: Vec<PhaseReport>,
    pub total_nodes: u64,
    pub total_edges: u64,
    pub diagnostics: Vec<Diagnostic>,
}

impl AnalysisReport {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// Every phase reached its fixpoint within the pass bound.
    pub fn converged(&self) -> bool {
        self.phases.iter().all(|p| p.converged)
    }

    pub fn phase(&self, kind: NodeKind) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.kind == kind)
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }
}

/// Runs the built-in (or a caller-supplied) inspector set over one root.
#[derive(Debug)]
pub struct AnalysisPipeline {
    root: PathBuf,
    config: TangleConfig,
    registry: InspectorRegistry,
}

impl AnalysisPipeline {
    /// Pipeline with every built-in inspector the config leaves enabled.
    pub fn new(root: impl Into<PathBuf>, config: TangleConfig) -> crate::error::Result<Self> {
        config.validate()?;
        let registry = InspectorRegistry::with_builtins(&config)?;
        Ok(Self::with_registry(root, config, registry))
    }

    pub fn with_registry(
        root: impl Into<PathBuf>,
        config: TangleConfig,
        registry: InspectorRegistry,
    ) -> Self {
        Self {
            root: root.into(),
            config,
            registry,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &TangleConfig {
        &self.config
    }

    pub fn run(&self, store: &dyn GraphStore) -> crate::error::Result<AnalysisReport> {
        self.run_with_reporter(store, &NoopReporter)
    }

    /// Run every phase against `store`.
    ///
    /// Recoverable problems end up in [`AnalysisReport::diagnostics`];
    /// `Err` means the store, the config or the root itself is unusable.
    #[instrument(skip_all, name = "analysis", fields(root = %self.root.display()))]
    pub fn run_with_reporter(
        &self,
        store: &dyn GraphStore,
        reporter: &dyn ProgressReporter,
    ) -> crate::error::Result<AnalysisReport> {
        let started_at = Utc::now();
        self.config.validate()?;
        info!(inspectors = self.registry.len(), "Starting analysis");

        let files = discovery::discover(&self.root, &self.config.discovery)?;
        let file_ids: Vec<String> = files.iter().map(|n| n.id.clone()).collect();
        let seeded = store.commit(&files.into_iter().map(StoreWrite::Node).collect::<Vec<_>>())?;
        reporter.message(&format!("Discovered {} files", file_ids.len()));
        info!(files = file_ids.len(), seeded, "Files seeded");

        let ctx = AnalysisContext::new(store, &self.config, &self.root);
        let scheduler = MultiPassScheduler::new(&self.registry, self.config.analysis.max_passes)
            .parallel(self.config.analysis.parallel_items)
            .with_reporter(reporter);

        let mut phases = Vec::with_capacity(2);
        phases.push(scheduler.run_phase(&ctx, NodeKind::File, &file_ids)?);

        // Placeholders for code outside the root are never items.
        let class_ids: Vec<String> = store
            .find_nodes(&NodeFilter::of_kind(NodeKind::Class))?
            .into_iter()
            .filter(|n| !n.has_tag(tags::EXTERNAL))
            .map(|n| n.id)
            .collect();
        reporter.message(&format!("Inspecting {} classes", class_ids.len()));
        phases.push(scheduler.run_phase(&ctx, NodeKind::Class, &class_ids)?);

        let stats = store.stats()?;
        let diagnostics = ctx.take_diagnostics();
        let report = AnalysisReport {
            root: self.root.clone(),
            started_at,
            finished_at: Utc::now(),
            phases,
            total_nodes: stats.total_nodes,
            total_edges: stats.total_edges,
            diagnostics,
        };

        if !report.converged() {
            warn!("Analysis stopped before every phase converged");
        }
        info!(
            nodes = report.total_nodes,
            edges = report.total_edges,
            diagnostics = report.diagnostics.len(),
            duration_ms = report.duration().num_milliseconds(),
            "Analysis complete"
        );
        Ok(report)
    }
}
