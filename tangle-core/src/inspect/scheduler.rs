use std::collections::BTreeSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{StoreError, TangleError};
use crate::progress::{NoopReporter, ProgressReporter};
use crate::types::{GraphNode, NodeKind};

use super::cache::PerItemCache;
use super::context::{AnalysisContext, Diagnostic, DiagnosticKind, ItemOutput, ItemView};
use super::registry::InspectorRegistry;
use super::traits::{InspectorContract, ItemInspector};

/// State of one (item, inspector) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectorStatus {
    Pending,
    Ran,
    /// A consumed key was missing at the last visit.
    Blocked,
}

/// Outcome of one item kind's fixpoint and barrier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub kind: NodeKind,
    pub passes: u32,
    pub converged: bool,
    pub items: usize,
    pub inspector_runs: u64,
    /// (item, inspector) pairs that never ran.
    pub blocked: usize,
    pub global_runs: usize,
}

#[derive(Debug)]
struct ItemState {
    id: String,
    statuses: Vec<InspectorStatus>,
    /// Fingerprint of the item when the inspector last failed.
    failed_at: Vec<Option<u64>>,
}

impl ItemState {
    fn new(id: &str, inspectors: usize) -> Self {
        Self {
            id: id.to_string(),
            statuses: vec![InspectorStatus::Pending; inspectors],
            failed_at: vec![None; inspectors],
        }
    }

    fn is_runnable(&self, index: usize, contract: &InspectorContract, node: &GraphNode) -> bool {
        self.statuses[index] != InspectorStatus::Ran
            && contract.is_satisfied_by(node)
            && self.failed_at[index] != Some(fingerprint(node))
    }
}

fn fingerprint(node: &GraphNode) -> u64 {
    let mut hasher = DefaultHasher::new();
    serde_json::to_vec(node).unwrap_or_default().hash(&mut hasher);
    hasher.finish()
}

/// Store failures caused by what an inspector wrote rather than by the
/// store itself.
fn is_inspector_fault(err: &TangleError) -> bool {
    matches!(
        err,
        TangleError::Store(StoreError::NodeNotFound(_) | StoreError::KindConflict { .. })
    )
}

/// Drives the per-item fixpoint and the global barrier for one item kind.
pub struct MultiPassScheduler<'r> {
    registry: &'r InspectorRegistry,
    max_passes: u32,
    parallel: bool,
    reporter: &'r dyn ProgressReporter,
}

impl<'r> MultiPassScheduler<'r> {
    pub fn new(registry: &'r InspectorRegistry, max_passes: u32) -> Self {
        Self {
            registry,
            max_passes,
            parallel: false,
            reporter: &NoopReporter,
        }
    }

    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: &'r dyn ProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Fixpoint over `items`, then every global inspector of `kind`.
    pub fn run_phase(
        &self,
        ctx: &AnalysisContext<'_>,
        kind: NodeKind,
        items: &[String],
    ) -> crate::error::Result<PhaseReport> {
        let mut report = self.run_items(ctx, kind, items)?;
        report.global_runs = self.run_globals(ctx, kind)?;
        Ok(report)
    }

    /// Run the per-item inspectors of `kind` until no pending inspector is
    /// runnable or the pass bound is reached.
    #[instrument(skip_all, name = "item_fixpoint", fields(kind = %kind, items = items.len()))]
    pub fn run_items(
        &self,
        ctx: &AnalysisContext<'_>,
        kind: NodeKind,
        items: &[String],
    ) -> crate::error::Result<PhaseReport> {
        let inspectors = self.registry.item_inspectors(kind);
        let mut states: Vec<ItemState> = items
            .iter()
            .map(|id| ItemState::new(id, inspectors.len()))
            .collect();

        self.reporter
            .start(&format!("{kind} inspectors"), Some(u64::from(self.max_passes)));

        let mut passes = 0;
        let mut inspector_runs = 0;
        let mut converged = inspectors.is_empty() || states.is_empty();
        while !converged && passes < self.max_passes {
            passes += 1;
            let runs: u64 = if self.parallel {
                states
                    .par_iter_mut()
                    .map_init(PerItemCache::new, |cache, state| {
                        self.visit(ctx, &inspectors, state, cache)
                    })
                    .collect::<crate::error::Result<Vec<u64>>>()?
                    .into_iter()
                    .sum()
            } else {
                let mut cache = PerItemCache::new();
                let mut runs = 0;
                for state in &mut states {
                    runs += self.visit(ctx, &inspectors, state, &mut cache)?;
                }
                runs
            };
            inspector_runs += runs;
            self.reporter.advance(1);
            debug!(kind = %kind, pass = passes, runs, "Pass complete");

            converged = self.pending(ctx, &inspectors, &states)?.is_empty();
        }
        self.reporter.finish();

        if !converged {
            let pending = self.pending(ctx, &inspectors, &states)?;
            let ids: Vec<&str> = pending.iter().map(String::as_str).collect();
            warn!(
                kind = %kind,
                passes,
                pending = %ids.join(", "),
                "Pass bound reached before convergence"
            );
            ctx.report(Diagnostic::new(
                DiagnosticKind::ConvergenceTimeout,
                format!(
                    "{kind} phase stopped after {passes} passes; still pending: {}",
                    ids.join(", ")
                ),
            ));
        }

        let blocked = states
            .iter()
            .flat_map(|s| s.statuses.iter())
            .filter(|s| **s != InspectorStatus::Ran)
            .count();

        info!(
            kind = %kind,
            passes,
            converged,
            inspector_runs,
            blocked,
            "Fixpoint finished"
        );

        Ok(PhaseReport {
            kind,
            passes,
            converged,
            items: items.len(),
            inspector_runs,
            blocked,
            global_runs: 0,
        })
    }

    /// Run each global inspector of `kind` once, in registration order.
    #[instrument(skip_all, name = "global_barrier", fields(kind = %kind))]
    pub fn run_globals(
        &self,
        ctx: &AnalysisContext<'_>,
        kind: NodeKind,
    ) -> crate::error::Result<usize> {
        let mut runs = 0;
        for inspector in self.registry.global_inspectors(kind) {
            let contract = inspector.contract();
            let mut out = ItemOutput::for_global();
            let result = inspector
                .run(ctx, &mut out)
                .and_then(|()| commit_output(ctx, contract, None, out));
            match result {
                Ok(changed) => {
                    runs += 1;
                    debug!(inspector = %contract.id, changed, "Global inspector ran");
                }
                Err(e) if is_inspector_fault(&e) || !matches!(e, TangleError::Store(_)) => {
                    warn!(inspector = %contract.id, error = %e, "Global inspector failed");
                    ctx.report(
                        Diagnostic::new(DiagnosticKind::InspectorFailure, e.to_string())
                            .by_inspector(&contract.id),
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(runs)
    }

    /// One visit of one item: every runnable inspector, in order, with
    /// the item's node refreshed after each commit.
    fn visit(
        &self,
        ctx: &AnalysisContext<'_>,
        inspectors: &[&dyn ItemInspector],
        state: &mut ItemState,
        cache: &mut PerItemCache,
    ) -> crate::error::Result<u64> {
        let Some(mut node) = ctx.store.get_node(&state.id)? else {
            return Ok(0);
        };
        cache.reset(&state.id);

        let mut runs = 0;
        for (index, inspector) in inspectors.iter().enumerate() {
            if state.statuses[index] == InspectorStatus::Ran {
                continue;
            }
            let contract = inspector.contract();
            if !contract.is_satisfied_by(&node) {
                state.statuses[index] = InspectorStatus::Blocked;
                continue;
            }
            let print = fingerprint(&node);
            if state.failed_at[index] == Some(print) {
                state.statuses[index] = InspectorStatus::Pending;
                continue;
            }

            let mut out = ItemOutput::for_item(&state.id);
            let result = inspector
                .run(&ItemView::new(&node, ctx), &mut out, cache)
                .and_then(|()| commit_output(ctx, contract, Some(&state.id), out));

            match result {
                Ok(changed) => {
                    state.statuses[index] = InspectorStatus::Ran;
                    state.failed_at[index] = None;
                    runs += 1;
                    debug!(item = %state.id, inspector = %contract.id, changed, "Inspector ran");
                    if changed > 0 {
                        if let Some(fresh) = ctx.store.get_node(&state.id)? {
                            node = fresh;
                        }
                    }
                }
                Err(e) if is_inspector_fault(&e) || !matches!(e, TangleError::Store(_)) => {
                    warn!(item = %state.id, inspector = %contract.id, error = %e, "Inspector failed");
                    ctx.report(
                        Diagnostic::new(DiagnosticKind::InspectorFailure, e.to_string())
                            .on_item(&state.id)
                            .by_inspector(&contract.id),
                    );
                    state.statuses[index] = InspectorStatus::Pending;
                    state.failed_at[index] = Some(print);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(runs)
    }

    /// Ids of inspectors still runnable on some item.
    fn pending(
        &self,
        ctx: &AnalysisContext<'_>,
        inspectors: &[&dyn ItemInspector],
        states: &[ItemState],
    ) -> crate::error::Result<BTreeSet<String>> {
        let mut pending = BTreeSet::new();
        for state in states {
            if state.statuses.iter().all(|s| *s == InspectorStatus::Ran) {
                continue;
            }
            let Some(node) = ctx.store.get_node(&state.id)? else {
                continue;
            };
            for (index, inspector) in inspectors.iter().enumerate() {
                let contract = inspector.contract();
                if state.is_runnable(index, contract, &node) {
                    pending.insert(contract.id.clone());
                }
            }
        }
        Ok(pending)
    }
}

impl std::fmt::Debug for MultiPassScheduler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiPassScheduler")
            .field("registry", &self.registry)
            .field("max_passes", &self.max_passes)
            .field("parallel", &self.parallel)
            .finish_non_exhaustive()
    }
}

/// Check an inspector's buffered writes against its contract, commit the
/// accepted ones and record its diagnostics. Returns how many writes
/// changed the store.
fn commit_output(
    ctx: &AnalysisContext<'_>,
    contract: &InspectorContract,
    item: Option<&str>,
    out: ItemOutput,
) -> crate::error::Result<usize> {
    let (accepted, undeclared, diagnostics) = out.into_checked(&contract.produces);
    let changed = ctx.store.commit(&accepted)?;

    for key in undeclared {
        warn!(item = item.unwrap_or(""), inspector = %contract.id, key, "Undeclared output dropped");
        let mut d = Diagnostic::new(
            DiagnosticKind::UndeclaredOutput,
            format!("wrote undeclared key {key}"),
        )
        .by_inspector(&contract.id);
        d.item = item.map(str::to_string);
        ctx.report(d);
    }
    for mut d in diagnostics {
        if d.item.is_none() {
            d.item = item.map(str::to_string);
        }
        d.inspector.get_or_insert_with(|| contract.id.clone());
        ctx.report(d);
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::config::TangleConfig;
    use crate::error::InspectError;
    use crate::inspect::{GlobalInspector, Inspector};
    use crate::store::{GraphStore, SqliteStore};
    use crate::types::NodeFilter;

    type ItemFn =
        dyn Fn(&ItemView<'_>, &mut ItemOutput, &mut PerItemCache) -> crate::error::Result<()>
            + Send
            + Sync;

    struct FnInspector {
        contract: InspectorContract,
        f: Box<ItemFn>,
    }

    impl ItemInspector for FnInspector {
        fn contract(&self) -> &InspectorContract {
            &self.contract
        }
        fn run(
            &self,
            item: &ItemView<'_>,
            out: &mut ItemOutput,
            cache: &mut PerItemCache,
        ) -> crate::error::Result<()> {
            (self.f)(item, out, cache)
        }
    }

    fn item_fn<F>(contract: InspectorContract, f: F) -> Inspector
    where
        F: Fn(&ItemView<'_>, &mut ItemOutput, &mut PerItemCache) -> crate::error::Result<()>
            + Send
            + Sync
            + 'static,
    {
        Inspector::item(FnInspector {
            contract,
            f: Box::new(f),
        })
    }

    fn tagger(id: &str, consumes: Option<&str>, produces: &str) -> Inspector {
        let mut contract = InspectorContract::new(id, NodeKind::File).produces(produces);
        if let Some(c) = consumes {
            contract = contract.consumes(c);
        }
        let tag = produces.to_string();
        item_fn(contract, move |_, out, _| {
            out.enable_tag(tag.clone());
            Ok(())
        })
    }

    fn chain(depth: usize, reversed: bool) -> InspectorRegistry {
        let mut stages: Vec<Inspector> = (0..depth)
            .map(|k| {
                let consumes = (k > 0).then(|| format!("stage{}", k - 1));
                tagger(&format!("s{k}"), consumes.as_deref(), &format!("stage{k}"))
            })
            .collect();
        if reversed {
            stages.reverse();
        }
        let mut registry = InspectorRegistry::new();
        for s in stages {
            registry.register(s).unwrap();
        }
        registry
    }

    fn store_with_files(ids: &[&str]) -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        for id in ids {
            store
                .upsert_node(&GraphNode::new(*id, NodeKind::File))
                .unwrap();
        }
        store
    }

    fn items(ids: &[&str]) -> Vec<String> {
        ids.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn reversed_chain_of_five_converges_in_five_passes() {
        let ids = ["a.java", "b.java", "c.java"];
        let store = store_with_files(&ids);
        let config = TangleConfig::default();
        let ctx = AnalysisContext::new(&store, &config, "/");
        let registry = chain(5, true);

        let report = MultiPassScheduler::new(&registry, 16)
            .run_items(&ctx, NodeKind::File, &items(&ids))
            .unwrap();

        assert!(report.converged);
        assert_eq!(report.passes, 5);
        assert_eq!(report.inspector_runs, 15);
        assert_eq!(report.blocked, 0);
        assert!(store.get_node("b.java").unwrap().unwrap().has_tag("stage4"));
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn ordered_chain_converges_in_one_pass() {
        let store = store_with_files(&["a.java"]);
        let config = TangleConfig::default();
        let ctx = AnalysisContext::new(&store, &config, "/");
        let registry = chain(5, false);

        let report = MultiPassScheduler::new(&registry, 16)
            .run_items(&ctx, NodeKind::File, &items(&["a.java"]))
            .unwrap();
        assert!(report.converged);
        assert_eq!(report.passes, 1);
    }

    #[test]
    fn parallel_passes_match_sequential() {
        let ids: Vec<String> = (0..20).map(|i| format!("f{i}.java")).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let store = store_with_files(&refs);
        let config = TangleConfig::default();
        let ctx = AnalysisContext::new(&store, &config, "/");
        let registry = chain(3, true);

        let report = MultiPassScheduler::new(&registry, 16)
            .parallel(true)
            .run_items(&ctx, NodeKind::File, &ids)
            .unwrap();
        assert!(report.converged);
        assert_eq!(report.passes, 3);
        assert_eq!(report.inspector_runs, 60);
        let done = store
            .find_nodes(&NodeFilter::of_kind(NodeKind::File).with_tag("stage2"))
            .unwrap();
        assert_eq!(done.len(), 20);
    }

    #[test]
    fn pass_bound_reports_convergence_timeout() {
        let store = store_with_files(&["a.java"]);
        let config = TangleConfig::default();
        let ctx = AnalysisContext::new(&store, &config, "/");
        let registry = chain(5, true);

        let report = MultiPassScheduler::new(&registry, 2)
            .run_items(&ctx, NodeKind::File, &items(&["a.java"]))
            .unwrap();
        assert!(!report.converged);
        assert_eq!(report.passes, 2);
        assert_eq!(report.blocked, 3);

        let diagnostics = ctx.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::ConvergenceTimeout);
        assert!(diagnostics[0].message.contains("s2"));
        // Partial results are kept
        assert!(store.get_node("a.java").unwrap().unwrap().has_tag("stage1"));
    }

    #[test]
    fn cache_is_reset_between_identical_items() {
        let store = store_with_files(&["a.java", "b.java"]);
        let config = TangleConfig::default();
        let ctx = AnalysisContext::new(&store, &config, "/");

        let parses = std::sync::Arc::new(AtomicUsize::new(0));
        let mut registry = InspectorRegistry::new();
        for id in ["first", "second"] {
            let parses = parses.clone();
            registry
                .register(item_fn(
                    InspectorContract::new(id, NodeKind::File),
                    move |_, _, cache| {
                        cache.text_or_load(|| {
                            parses.fetch_add(1, Ordering::SeqCst);
                            Ok("class Same {}".to_string())
                        })?;
                        Ok(())
                    },
                ))
                .unwrap();
        }

        MultiPassScheduler::new(&registry, 4)
            .run_items(&ctx, NodeKind::File, &items(&["a.java", "b.java"]))
            .unwrap();
        // One parse per item, shared by both inspectors, never across items
        assert_eq!(parses.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failing_inspector_is_isolated_and_its_writes_discarded() {
        let store = store_with_files(&["bad.java", "good.java"]);
        let config = TangleConfig::default();
        let ctx = AnalysisContext::new(&store, &config, "/");

        let mut registry = InspectorRegistry::new();
        registry.register(tagger("steady", None, "steady.done")).unwrap();
        registry
            .register(item_fn(
                InspectorContract::new("flaky", NodeKind::File).produces("flaky.done"),
                |item, out, _| {
                    out.enable_tag("flaky.done");
                    if item.id() == "bad.java" {
                        return Err(InspectError::Invalid {
                            item: item.id().to_string(),
                            message: "boom".to_string(),
                        }
                        .into());
                    }
                    Ok(())
                },
            ))
            .unwrap();

        let report = MultiPassScheduler::new(&registry, 8)
            .run_items(&ctx, NodeKind::File, &items(&["bad.java", "good.java"]))
            .unwrap();

        assert!(report.converged);
        assert_eq!(report.blocked, 1);
        let bad = store.get_node("bad.java").unwrap().unwrap();
        assert!(!bad.has_tag("flaky.done"));
        assert!(bad.has_tag("steady.done"));
        assert!(store.get_node("good.java").unwrap().unwrap().has_tag("flaky.done"));

        let failures: Vec<Diagnostic> = ctx
            .diagnostics()
            .into_iter()
            .filter(|d| d.kind == DiagnosticKind::InspectorFailure)
            .collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].item.as_deref(), Some("bad.java"));
        assert_eq!(failures[0].inspector.as_deref(), Some("flaky"));
    }

    #[test]
    fn failed_inspector_retries_after_item_changes() {
        let store = store_with_files(&["a.java"]);
        let config = TangleConfig::default();
        let ctx = AnalysisContext::new(&store, &config, "/");

        let mut registry = InspectorRegistry::new();
        registry
            .register(item_fn(
                InspectorContract::new("impatient", NodeKind::File).produces("impatient.done"),
                |item, out, _| {
                    if !item.node.has_tag("ready") {
                        return Err(InspectError::MissingInput {
                            item: item.id().to_string(),
                            key: "ready".to_string(),
                        }
                        .into());
                    }
                    out.enable_tag("impatient.done");
                    Ok(())
                },
            ))
            .unwrap();
        registry.register(tagger("prepare", None, "ready")).unwrap();

        let report = MultiPassScheduler::new(&registry, 8)
            .run_items(&ctx, NodeKind::File, &items(&["a.java"]))
            .unwrap();
        assert!(report.converged);
        assert_eq!(report.passes, 2);
        assert!(store.get_node("a.java").unwrap().unwrap().has_tag("impatient.done"));
    }

    #[test]
    fn undeclared_outputs_are_dropped_with_a_diagnostic() {
        let store = store_with_files(&["a.java"]);
        let config = TangleConfig::default();
        let ctx = AnalysisContext::new(&store, &config, "/");

        let mut registry = InspectorRegistry::new();
        registry
            .register(item_fn(
                InspectorContract::new("sloppy", NodeKind::File).produces("declared"),
                |_, out, _| {
                    out.enable_tag("declared");
                    out.enable_tag("undeclared");
                    Ok(())
                },
            ))
            .unwrap();

        MultiPassScheduler::new(&registry, 4)
            .run_items(&ctx, NodeKind::File, &items(&["a.java"]))
            .unwrap();

        let node = store.get_node("a.java").unwrap().unwrap();
        assert!(node.has_tag("declared"));
        assert!(!node.has_tag("undeclared"));
        let diagnostics = ctx.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::UndeclaredOutput);
    }

    struct CountTagged {
        contract: InspectorContract,
        seen: Mutex<Option<usize>>,
    }

    impl GlobalInspector for CountTagged {
        fn contract(&self) -> &InspectorContract {
            &self.contract
        }
        fn run(&self, ctx: &AnalysisContext<'_>, out: &mut ItemOutput) -> crate::error::Result<()> {
            let tagged = ctx
                .store
                .find_nodes(&NodeFilter::of_kind(NodeKind::Class).with_tag("counted"))?;
            *self.seen.lock().unwrap() = Some(tagged.len());
            for node in &tagged {
                out.set_node_metric(&node.id, "total", tagged.len() as f64);
            }
            Ok(())
        }
    }

    #[test]
    fn global_barrier_sees_every_item_in_any_order() {
        let ids = ["a.A", "a.B", "a.C", "a.D"];
        for order in [ids.to_vec(), ids.iter().rev().copied().collect()] {
            let store = SqliteStore::in_memory().unwrap();
            for id in &ids {
                store.upsert_node(&GraphNode::new(*id, NodeKind::Class)).unwrap();
            }
            let config = TangleConfig::default();
            let ctx = AnalysisContext::new(&store, &config, "/");

            let mut registry = InspectorRegistry::new();
            registry
                .register(item_fn(
                    InspectorContract::new("count-me", NodeKind::Class).produces("counted"),
                    |_, out, _| {
                        out.enable_tag("counted");
                        Ok(())
                    },
                ))
                .unwrap();
            let global = std::sync::Arc::new(CountTagged {
                contract: InspectorContract::new("counter", NodeKind::Class)
                    .produces("total")
                    .global(),
                seen: Mutex::new(None),
            });
            registry.register(Inspector::Global(Box::new(SharedGlobal(global.clone())))).unwrap();

            let report = MultiPassScheduler::new(&registry, 4)
                .run_phase(&ctx, NodeKind::Class, &items(&order))
                .unwrap();

            assert_eq!(report.global_runs, 1);
            assert_eq!(*global.seen.lock().unwrap(), Some(4));
            assert_eq!(store.get_node("a.C").unwrap().unwrap().metric("total"), Some(4.0));
        }
    }

    struct SharedGlobal(std::sync::Arc<CountTagged>);

    impl GlobalInspector for SharedGlobal {
        fn contract(&self) -> &InspectorContract {
            self.0.contract()
        }
        fn run(&self, ctx: &AnalysisContext<'_>, out: &mut ItemOutput) -> crate::error::Result<()> {
            self.0.run(ctx, out)
        }
    }

    #[test]
    fn failing_global_is_reported_not_fatal() {
        struct Broken(InspectorContract);
        impl GlobalInspector for Broken {
            fn contract(&self) -> &InspectorContract {
                &self.0
            }
            fn run(&self, _: &AnalysisContext<'_>, out: &mut ItemOutput) -> crate::error::Result<()> {
                // Writing to a node that does not exist fails the commit
                out.tag_node("ghost", "x");
                Ok(())
            }
        }

        let store = SqliteStore::in_memory().unwrap();
        let config = TangleConfig::default();
        let ctx = AnalysisContext::new(&store, &config, "/");
        let mut registry = InspectorRegistry::new();
        registry
            .register(Inspector::global(Broken(
                InspectorContract::new("broken", NodeKind::File).produces("x").global(),
            )))
            .unwrap();

        let runs = MultiPassScheduler::new(&registry, 4)
            .run_globals(&ctx, NodeKind::File)
            .unwrap();
        assert_eq!(runs, 0);
        assert_eq!(ctx.diagnostics()[0].kind, DiagnosticKind::InspectorFailure);
    }
}
