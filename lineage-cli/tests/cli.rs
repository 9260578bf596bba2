// End-to-end tests of the `lineage` binary.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn lineage() -> Command {
    Command::cargo_bin("lineage").unwrap()
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn codebase() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/lib.rs", "//! Crate docs.\npub fn a() {}\n");
    write(dir.path(), "src/util.rs", "pub fn b() {}\n");
    dir
}

fn init(dir: &Path) {
    lineage().arg("init").arg(dir).assert().success();
}

#[test]
fn init_writes_state_and_baseline() {
    let dir = codebase();
    lineage()
        .arg("init")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized Lineage"))
        .stdout(predicate::str::contains("Files:       2"));

    let state = dir.path().join(".lineage");
    assert!(state.join("config.toml").exists());
    assert!(state.join("metrics.json").exists());
    assert!(state.join("scan.json").exists());
}

#[test]
fn init_twice_keeps_config() {
    let dir = codebase();
    init(dir.path());
    lineage()
        .arg("init")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("already initialized"));
}

#[test]
fn init_rejects_invalid_threshold() {
    let dir = codebase();
    lineage()
        .args(["init", "--coverage-min", "150"])
        .arg(dir.path())
        .assert()
        .code(2);
    assert!(!dir.path().join(".lineage/config.toml").exists());
}

#[test]
fn uninitialized_codebase_exits_3() {
    let dir = codebase();
    lineage()
        .arg("status")
        .arg(dir.path())
        .assert()
        .code(3)
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn missing_path_exits_3() {
    lineage()
        .args(["check", "/definitely/not/a/real/path"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Cannot resolve path"));
}

#[test]
fn check_reports_current_then_new_language() {
    let dir = codebase();
    init(dir.path());

    lineage()
        .arg("check")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("[current]"));

    write(dir.path(), "tools/gen.py", "\"\"\"Generator.\"\"\"\n");
    lineage()
        .arg("check")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("[OBSOLETE]"))
        .stdout(predicate::str::contains("new language(s) detected: python"))
        .stdout(predicate::str::contains("phase1-regeneration-prompt.md"));

    assert!(dir
        .path()
        .join(".lineage/phase1-regeneration-prompt.json")
        .exists());
}

#[test]
fn check_json_handles_several_codebases() {
    let a = codebase();
    let b = codebase();
    init(a.path());
    init(b.path());

    let output = lineage()
        .args(["check", "--json"])
        .arg(a.path())
        .arg(b.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let reports: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(reports.len(), 2);
    for report in &reports {
        assert_eq!(report["is_obsolete"], false);
        assert_eq!(report["files_total"], 2);
        assert_eq!(report["latest_generation"], 0);
    }
}

#[test]
fn check_same_codebase_twice_reports_once() {
    let dir = codebase();
    init(dir.path());

    let output = lineage()
        .args(["check", "--json"])
        .arg(dir.path())
        .arg(dir.path().join("."))
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 1, "{stdout}");
    assert!(!dir.path().join(".lineage/metrics.json.tmp").exists());
}

#[test]
fn record_then_status_shows_generation() {
    let dir = codebase();
    init(dir.path());

    let learnings = dir.path().join("learnings.json");
    std::fs::write(
        &learnings,
        r#"{"metadata":{"tool_name":"analyzer"},"improvements":[{"category":"scanning","description":"Follow symlinks"}]}"#,
    )
    .unwrap();

    lineage()
        .arg("record")
        .arg(dir.path())
        .arg("--file")
        .arg(&learnings)
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded generation 1"));
    assert!(dir.path().join(".lineage/learnings-gen-1.json").exists());

    lineage()
        .arg("status")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Generation:  1"))
        .stdout(predicate::str::contains("Prompt:      not generated"));
}

#[test]
fn record_missing_file_fails() {
    let dir = codebase();
    init(dir.path());
    lineage()
        .arg("record")
        .arg(dir.path())
        .args(["--file", "nope.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Learnings file not found"));
}

#[test]
fn record_corrupt_file_exits_4() {
    let dir = codebase();
    init(dir.path());
    let learnings = dir.path().join("broken.json");
    std::fs::write(&learnings, "{ not json").unwrap();

    lineage()
        .arg("record")
        .arg(dir.path())
        .arg("--file")
        .arg(&learnings)
        .assert()
        .code(4);
}

#[test]
fn regenerate_with_reason_and_diff() {
    let dir = codebase();
    init(dir.path());

    lineage()
        .arg("regenerate")
        .arg(dir.path())
        .args(["--reason", "quarterly refresh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("generation 1"));

    let md = std::fs::read_to_string(dir.path().join(".lineage/phase1-regeneration-prompt.md"))
        .unwrap();
    assert!(md.contains("quarterly refresh"));

    lineage()
        .arg("regenerate")
        .arg(dir.path())
        .args(["--reason", "second pass", "--diff"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-").and(predicate::str::contains("+")))
        .stdout(predicate::str::contains("second pass"));
}

#[test]
fn corrupt_config_exits_2() {
    let dir = codebase();
    init(dir.path());
    std::fs::write(dir.path().join(".lineage/config.toml"), "thresholds = [").unwrap();

    lineage().arg("check").arg(dir.path()).assert().code(2);
}

#[test]
fn unwritable_prompt_exits_7() {
    let dir = codebase();
    init(dir.path());
    std::fs::create_dir_all(dir.path().join(".lineage/phase1-regeneration-prompt.md")).unwrap();

    lineage()
        .arg("regenerate")
        .arg(dir.path())
        .assert()
        .code(7)
        .stderr(predicate::str::contains("phase1-regeneration-prompt.md"));
}
