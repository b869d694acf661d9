// Benchmark the full pipeline over a generated Java project, sequential vs parallel.

use std::fmt::Write;
use std::path::Path;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use tangle_core::config::TangleConfig;
use tangle_core::pipeline::AnalysisPipeline;
use tangle_core::store::SqliteStore;

/// `classes` source files in one package, each using the next three.
fn generate_project(root: &Path, classes: usize) {
    let dir = root.join("src/com/acme");
    std::fs::create_dir_all(&dir).unwrap();
    for i in 0..classes {
        let mut src = String::from("package com.acme;\n\nimport java.util.List;\nimport java.util.Map;\n\n");
        let _ = writeln!(src, "public class C{i} {{");
        for k in 1..=3 {
            let j = (i + k) % classes;
            let _ = writeln!(src, "    private Map<String, List<C{j}>> f{k};");
        }
        let _ = writeln!(src, "    public <T extends C{}> T pick(List<? super T> from) {{ return null; }}", (i + 5) % classes);
        src.push_str("}\n");
        std::fs::write(dir.join(format!("C{i}.java")), src).unwrap();
    }
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);

    for classes in [50, 200] {
        let dir = tempfile::tempdir().unwrap();
        generate_project(dir.path(), classes);

        for parallel in [false, true] {
            let mut config = TangleConfig::default();
            config.analysis.parallel_items = parallel;
            let pipeline = AnalysisPipeline::new(dir.path(), config).unwrap();
            let label = if parallel { "parallel" } else { "sequential" };

            group.bench_with_input(BenchmarkId::new(label, classes), &pipeline, |b, p| {
                b.iter(|| {
                    let store = SqliteStore::in_memory().unwrap();
                    p.run(&store).unwrap()
                });
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
