use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn tangle() -> Command {
    Command::cargo_bin("tangle").unwrap()
}

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, text).unwrap();
}

fn small_project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "src/com/acme/Order.java",
        "package com.acme;\n\nimport java.util.List;\n\npublic class Order extends Base {\n    private List<Line> lines;\n    private Customer customer;\n}\n",
    );
    write(dir.path(), "src/com/acme/Base.java", "package com.acme;\n\npublic abstract class Base {}\n");
    write(dir.path(), "src/com/acme/Line.java", "package com.acme;\n\npublic record Line(String sku) {}\n");
    write(
        dir.path(),
        "src/com/acme/Customer.java",
        "package com.acme;\n\nimport java.util.Set;\n\npublic class Customer {\n    private Set<Order> orders;\n}\n",
    );
    dir
}

#[test]
fn analyze_then_status_then_query() {
    let project = small_project();
    let path = project.path().to_str().unwrap();

    tangle()
        .args(["analyze", "--path", path])
        .assert()
        .success()
        .stdout(predicate::str::contains("converged"))
        .stdout(predicate::str::contains("Diagnostics: 0"));
    assert!(project.path().join(".tangle/tangle.db").exists());

    tangle()
        .args(["status", "--path", path])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nodes:"))
        .stdout(predicate::str::contains("Classes in cycles:     2"));

    tangle()
        .args(["query", "com.acme.Order", "--path", path])
        .assert()
        .success()
        .stdout(predicate::str::contains("class: com.acme.Order"))
        .stdout(predicate::str::contains("com.acme.Order -[extends]-> com.acme.Base"))
        .stdout(predicate::str::contains("(java.util.List#0)"));

    tangle()
        .args(["query", "com.acme.Base", "--path", path, "--direction", "in", "--kind", "extends"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Edges: 1"));
}

#[test]
fn analyze_json_report() {
    let project = small_project();
    let output = tangle()
        .args(["analyze", "--format", "json", "--path"])
        .arg(project.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["phases"].as_array().unwrap().len(), 2);
    assert!(report["total_edges"].as_u64().unwrap() > 0);
    assert_eq!(report["diagnostics"].as_array().unwrap().len(), 0);
}

#[test]
fn query_suggests_candidates() {
    let project = small_project();
    tangle().args(["-q", "analyze", "--path"]).arg(project.path()).assert().success();

    tangle()
        .args(["query", "com.acme.Ord", "--path"])
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No node found matching: com.acme.Ord"))
        .stdout(predicate::str::contains("com.acme.Order (class)"));
}

#[test]
fn strict_mode_fails_on_diagnostics() {
    let project = small_project();
    write(
        project.path(),
        "src/com/acme/Invoice.java",
        "package com.acme;\n\nimport com.vendor.Ledger;\n\npublic class Invoice {\n    private Ledger ledger;\n}\n",
    );

    tangle()
        .args(["-q", "analyze", "--strict", "--path"])
        .arg(project.path())
        .assert()
        .code(10)
        .stderr(predicate::str::contains("Analysis completed with 1 diagnostics"));

    // Without --strict the same run succeeds
    tangle()
        .args(["-q", "analyze", "--path"])
        .arg(project.path())
        .assert()
        .success();
}

#[test]
fn status_before_analyze_is_not_initialized() {
    let dir = tempfile::tempdir().unwrap();
    tangle()
        .args(["status", "--path"])
        .arg(dir.path())
        .assert()
        .code(3)
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn missing_path_cannot_be_resolved() {
    tangle()
        .args(["analyze", "--path", "/definitely/not/here"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Cannot resolve path"));
}

#[test]
fn invalid_config_exits_with_config_code() {
    let project = small_project();
    write(project.path(), ".tangle/config.toml", "[analysis]\nmax_passes = 0\n");
    tangle()
        .args(["analyze", "--path"])
        .arg(project.path())
        .assert()
        .code(2);
}

#[test]
fn db_pointing_at_a_non_tangle_file_is_left_alone() {
    let project = small_project();
    let source = project.path().join("src/com/acme/Order.java");
    let before = std::fs::read(&source).unwrap();

    tangle()
        .args(["-q", "analyze", "--path"])
        .arg(project.path())
        .arg("--db")
        .arg(&source)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("not a tangle database"));
    assert_eq!(std::fs::read(&source).unwrap(), before);

    // A database from an earlier run is replaced as usual
    let db = project.path().join("graph.db");
    for _ in 0..2 {
        tangle()
            .args(["-q", "analyze", "--path"])
            .arg(project.path())
            .arg("--db")
            .arg(&db)
            .assert()
            .success();
    }
}

#[test]
fn unknown_output_format_is_a_usage_error() {
    let project = small_project();
    tangle()
        .args(["analyze", "--format", "xml", "--path"])
        .arg(project.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("possible values: text, json"));
    assert!(!project.path().join(".tangle").exists());
}
