//! Integration tests for the tfimport CLI
//!
//! These tests run the built binary end-to-end against temporary directories.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Get the path to the tfimport binary
fn tfimport_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // Remove test executable name
    path.pop(); // Remove deps directory

    // In debug mode, binary is at target/debug/tfimport
    path.push("tfimport");

    if cfg!(windows) {
        path.set_extension("exe");
    }

    path
}

/// Build a tfimport invocation with a clean environment
fn tfimport_command(args: &[&str]) -> Command {
    let mut command = Command::new(tfimport_binary());
    for (key, _) in std::env::vars() {
        if key.starts_with("TFIMPORT_") {
            command.env_remove(key);
        }
    }
    command.env_remove("RUST_LOG").args(args);
    command
}

/// Run tfimport and return output
fn run_tfimport(args: &[&str]) -> std::process::Output {
    tfimport_command(args)
        .output()
        .expect("Failed to execute tfimport")
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[test]
fn test_version() {
    let output = run_tfimport(&["--version"]);

    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("tfimport"));
}

#[test]
fn test_help_lists_options() {
    let output = run_tfimport(&["--help"]);

    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("--working-dir"));
    assert!(stdout.contains("--addr-file"));
    assert!(stdout.contains("--saved-file"));
    assert!(stdout.contains("--concurrency"));
}

#[test]
fn test_missing_working_dir_fails() {
    let output = run_tfimport(&["--working-dir", "/definitely/not/here", "--addr-file", "a.txt"]);

    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"));
}

#[test]
fn test_malformed_line_aborts_without_touching_ledger() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("addrs.txt"),
        "aws_s3_bucket.a bucket-a us-east-1\naws_s3_bucket.b bucket-123\n",
    )
    .unwrap();

    let output = run_tfimport(&[
        "--working-dir",
        &path_arg(dir.path()),
        "--addr-file",
        "addrs.txt",
        "--binary",
        "/nonexistent/terraform",
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("line 2"), "stderr: {}", stderr);

    let ledger = fs::read_to_string(dir.path().join("imported.txt")).unwrap_or_default();
    assert!(ledger.is_empty());
    assert!(!dir.path().join("terraform.tfstate").exists());
}

#[test]
fn test_everything_recorded_never_invokes_tool() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("addrs.txt"), "aws_s3_bucket.b bucket-123 us-east-1\n").unwrap();
    fs::write(dir.path().join("imported.txt"), "aws_s3_bucket.b\n").unwrap();

    // A tool that does not exist would fail the version check if it were reached
    let output = run_tfimport(&[
        "--working-dir",
        &path_arg(dir.path()),
        "--addr-file",
        "addrs.txt",
        "--binary",
        "/nonexistent/terraform",
    ]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(!dir.path().join("terraform.tfstate").exists());
    assert_eq!(
        fs::read_to_string(dir.path().join("imported.txt")).unwrap(),
        "aws_s3_bucket.b\n"
    );
}

#[test]
fn test_missing_tool_fails_setup() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("addrs.txt"), "aws_s3_bucket.b bucket-123 us-east-1\n").unwrap();

    let output = run_tfimport(&[
        "--working-dir",
        &path_arg(dir.path()),
        "--addr-file",
        "addrs.txt",
        "--binary",
        "/nonexistent/terraform",
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not installed"), "stderr: {}", stderr);
}

#[cfg(unix)]
mod with_fake_tool {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Stand-in for terraform: writes a one-resource fragment to -state-out,
    /// reports ids named `missing` as non-existent.
    const FAKE_TERRAFORM: &str = r#"#!/bin/sh
case "$1" in
  version) echo "Terraform v1.1.6"; exit 0 ;;
  init) exit 0 ;;
  import)
    out=""; prev=""; last=""
    for arg in "$@"; do
      case "$arg" in -state-out=*) out="${arg#-state-out=}" ;; esac
      prev="$last"; last="$arg"
    done
    if [ "$last" = "missing" ]; then
      echo "Error: Cannot import non-existent remote object" >&2
      exit 1
    fi
    printf '{"version":4,"resources":[{"type":"fake","name":"%s","region":"%s"}]}' "$prev" "$AWS_DEFAULT_REGION" > "$out"
    exit 0 ;;
esac
exit 1
"#;

    fn install_fake_tool(dir: &Path) -> PathBuf {
        let path = dir.join("fake-terraform");
        fs::write(&path, FAKE_TERRAFORM).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn run_in(dir: &Path, tool: &Path) -> std::process::Output {
        run_tfimport(&[
            "--working-dir",
            &path_arg(dir),
            "--addr-file",
            "addrs.txt",
            "--concurrency",
            "2",
            "--binary",
            &path_arg(tool),
        ])
    }

    #[test]
    fn test_end_to_end_import_is_resumable() {
        let work = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        let tool = install_fake_tool(bin.path());
        fs::write(
            work.path().join("addrs.txt"),
            "aws_s3_bucket.a bucket-a us-east-1\n\
             aws_s3_bucket.b bucket-b eu-west-1\n\
             aws_iam_role.gone missing us-east-1\n",
        )
        .unwrap();

        let output = run_in(work.path(), &tool);
        assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("aws_s3_bucket.a bucket-a us-east-1 => IMPORTED"));
        assert!(stdout.contains("missing does not exist"));

        let state: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(work.path().join("terraform.tfstate")).unwrap())
                .unwrap();
        assert_eq!(state["version"], 4);
        assert_eq!(state["serial"], 1);
        assert!(state["outputs"].is_null());
        let resources = state["resources"].as_array().unwrap();
        assert_eq!(resources.len(), 2);
        assert!(resources.iter().any(|r| r["name"] == "aws_s3_bucket.b" && r["region"] == "eu-west-1"));

        let mut ledger: Vec<String> = fs::read_to_string(work.path().join("imported.txt"))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        ledger.sort();
        assert_eq!(ledger, vec!["aws_iam_role.gone", "aws_s3_bucket.a", "aws_s3_bucket.b"]);

        let leftovers: Vec<_> = fs::read_dir(work.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("import_"))
            .collect();
        assert!(leftovers.is_empty());

        // Second run: nothing pending, state file untouched
        let before = fs::read_to_string(work.path().join("terraform.tfstate")).unwrap();
        let output = run_in(work.path(), &tool);
        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("SKIPPED"));
        assert_eq!(
            fs::read_to_string(work.path().join("terraform.tfstate")).unwrap(),
            before
        );
    }

    #[test]
    fn test_relative_working_dir() {
        let root = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        let tool = install_fake_tool(bin.path());
        let infra = root.path().join("infra");
        fs::create_dir(&infra).unwrap();
        fs::write(infra.join("addrs.txt"), "aws_s3_bucket.a bucket-a us-east-1\n").unwrap();

        let output = tfimport_command(&[
            "--working-dir",
            "infra",
            "--addr-file",
            "addrs.txt",
            "--binary",
            &path_arg(&tool),
        ])
        .current_dir(root.path())
        .output()
        .expect("Failed to execute tfimport");

        assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("=> IMPORTED"), "stdout: {}", stdout);

        let state: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(infra.join("terraform.tfstate")).unwrap())
                .unwrap();
        assert_eq!(state["resources"].as_array().unwrap().len(), 1);
        assert_eq!(
            fs::read_to_string(infra.join("imported.txt")).unwrap(),
            "aws_s3_bucket.a\n"
        );
        assert!(!root.path().join("infra").join("infra").exists());
    }
}

