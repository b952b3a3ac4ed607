use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::{TempDir, tempdir};

fn reposcribe() -> Command {
    Command::cargo_bin("reposcribe").unwrap()
}

fn sample_project() -> TempDir {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join("README.md"), "# Sample\n\nA tiny project.\n").unwrap();
    fs::write(root.join("src/main.rs"), "fn main() {\n    println!(\"hi\");\n}\n").unwrap();
    fs::write(root.join("debug.log"), "noise\n").unwrap();
    dir
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn init_writes_config_and_refuses_to_overwrite() {
    let dir = tempdir().unwrap();
    reposcribe()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created default configuration"));
    let config_path = dir.path().join(".reposcribe.yml");
    assert!(read(&config_path).contains("max_file_size"));

    fs::write(&config_path, "general:\n  max_depth: 3\n").unwrap();
    reposcribe()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already exists"));
    assert_eq!(read(&config_path), "general:\n  max_depth: 3\n");

    reposcribe()
        .current_dir(dir.path())
        .args(["init", "--force"])
        .assert()
        .success();
    assert!(read(&config_path).contains("max_file_size"));
}

#[test]
fn process_writes_markdown_summary() {
    let dir = sample_project();
    reposcribe()
        .current_dir(dir.path())
        .args(["process", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total Files:"))
        .stdout(predicate::str::contains("Documentation generated successfully"));

    let summary = read(&dir.path().join("project_summary.md"));
    assert!(summary.starts_with("# Project Summary:"));
    assert!(summary.contains("### src/main.rs"));
    assert!(summary.contains("println!(\"hi\");"));
    assert!(!summary.contains("### debug.log"));
}

#[test]
fn process_writes_json_with_requested_format() {
    let dir = sample_project();
    reposcribe()
        .current_dir(dir.path())
        .args(["process", "--force", "--format", "json", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let doc: serde_json::Value =
        serde_json::from_str(&read(&dir.path().join("project_summary.json"))).unwrap();
    assert_eq!(doc["project"]["readme"], "# Sample\n\nA tiny project.\n");
    assert_eq!(doc["project"]["statistics"]["total_files"], 2);
    let paths: Vec<&str> = doc["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, vec!["README.md", "src/main.rs"]);
}

#[test]
fn cli_patterns_and_output_override() {
    let dir = sample_project();
    let out_dir = tempdir().unwrap();
    let output = out_dir.path().join("docs/summary.md");
    reposcribe()
        .current_dir(dir.path())
        .args(["process", "--force", "--exclude-extra", "*.md", "--output"])
        .arg(&output)
        .assert()
        .success();

    let summary = read(&output);
    assert!(summary.contains("### src/main.rs"));
    assert!(!summary.contains("### README.md"));
    assert!(!dir.path().join("project_summary.md").exists());
}

#[test]
fn root_dir_selects_the_processed_tree() {
    let project = sample_project();
    let cwd = tempdir().unwrap();
    reposcribe()
        .current_dir(cwd.path())
        .args(["process", "--force", "--root-dir"])
        .arg(project.path())
        .assert()
        .success();
    assert!(read(&cwd.path().join("project_summary.md")).contains("### README.md"));
}

#[test]
fn invalid_pattern_in_config_is_a_configuration_error() {
    let dir = sample_project();
    fs::write(
        dir.path().join(".reposcribe.yml"),
        "exclude:\n  files:\n    - \"src/[abc.rs\"\n",
    )
    .unwrap();
    reposcribe()
        .current_dir(dir.path())
        .args(["process", "--force"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unmatched brackets"));
    assert!(!dir.path().join("project_summary.md").exists());
}

#[test]
fn unknown_config_key_is_rejected() {
    let dir = sample_project();
    fs::write(dir.path().join(".reposcribe.yml"), "general:\n  depth: 3\n").unwrap();
    reposcribe()
        .current_dir(dir.path())
        .args(["process", "--force"])
        .assert()
        .code(1);
}

#[test]
fn plain_directory_without_force_fails_acquisition() {
    let dir = sample_project();
    reposcribe()
        .current_dir(dir.path())
        .arg("process")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn missing_target_directory_fails_before_walking() {
    let dir = tempdir().unwrap();
    reposcribe()
        .current_dir(dir.path())
        .args(["process", "--force", "--target", "does-not-exist"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn bad_timeout_value_is_rejected() {
    let dir = sample_project();
    reposcribe()
        .current_dir(dir.path())
        .args(["process", "--force", "--timeout", "soon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--timeout"));
}

#[test]
fn usage_errors_exit_with_configuration_code() {
    let dir = tempdir().unwrap();
    reposcribe()
        .current_dir(dir.path())
        .args(["process", "--no-such-flag"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--no-such-flag"));
    reposcribe()
        .current_dir(dir.path())
        .args(["process", "--format", "xml"])
        .assert()
        .code(1);
    reposcribe().arg("--version").assert().success();
}

#[test]
fn root_dir_help_describes_processed_tree() {
    reposcribe()
        .args(["process", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("precedence"));
}
