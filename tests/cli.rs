//! End-to-end CLI tests against a fake container runtime.
//!
//! The fake is a shell script that records its arguments in `calls.log` and
//! keeps the container state (absent, running, exited) in a `state` file.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const FAKE_DOCKER: &str = r#"#!/bin/sh
dir="$(dirname "$0")"
echo "$*" >> "$dir/calls.log"
state="absent"
[ -f "$dir/state" ] && state="$(cat "$dir/state")"

case "$1" in
  --version)
    echo "Docker version 27.3.1, build ce12230" ;;
  ps)
    if [ -f "$dir/daemon_down" ]; then
      echo "Cannot connect to the Docker daemon at unix:///var/run/docker.sock. Is the docker daemon running?" >&2
      exit 1
    fi
    [ "$state" != "absent" ] && echo "ollama"
    exit 0 ;;
  run)
    echo running > "$dir/state"
    echo "4f3c2b1a9e8d7c6b5a4f3c2b1a9e8d7c6b5a" ;;
  start)
    echo running > "$dir/state" ;;
  stop)
    echo exited > "$dir/state"
    echo ollama ;;
  rm)
    echo absent > "$dir/state"
    echo ollama ;;
  restart)
    echo ollama ;;
  pull)
    echo "latest: Pulling from ollama/ollama"
    echo "Status: Image is up to date for $2" ;;
  logs)
    echo 'time=2026-10-18T10:00:00Z level=INFO msg="Listening on [::]:11434"'
    echo 'time=2026-10-18T10:00:01Z level=INFO msg="inference compute"' >&2 ;;
  exec)
    shift
    echo "exec: $*" ;;
  container)
    if [ "$state" = "absent" ]; then
      echo "[]"
      echo "Error: No such container: ollama" >&2
      exit 1
    fi
    running=false
    [ "$state" = "running" ] && running=true
    cat <<EOF
[{"Id":"4f3c2b1a9e8d","Name":"/ollama","Image":"sha256:1111",
  "State":{"Status":"$state","Running":$running,"StartedAt":"2026-10-18T10:00:00Z"},
  "HostConfig":{"PortBindings":{"11434/tcp":[{"HostIp":"","HostPort":"11434"}]}},
  "Mounts":[{"Type":"volume","Name":"ollama","Source":"/var/lib/docker/volumes/ollama/_data","Destination":"/root/.ollama"}],
  "Config":{"Image":"docker.io/ollama/ollama:latest","Env":["PATH=/usr/bin","OLLAMA_KEEP_ALIVE=10m"]}}]
EOF
    ;;
  image)
    image_id="sha256:1111"
    [ -f "$dir/image_id" ] && image_id="$(cat "$dir/image_id")"
    echo "[{\"Id\":\"$image_id\",\"Size\":3221225472}]" ;;
  *)
    echo "unknown command: $1" >&2
    exit 1 ;;
esac
"#;

struct FakeRuntime {
    dir: TempDir,
}

impl FakeRuntime {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("docker");
        fs::write(&script, FAKE_DOCKER).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        Self { dir }
    }

    fn with_state(self, state: &str) -> Self {
        fs::write(self.path().join("state"), format!("{}\n", state)).unwrap();
        self
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn binary(&self) -> PathBuf {
        self.path().join("docker")
    }

    fn state(&self) -> String {
        fs::read_to_string(self.path().join("state"))
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| "absent".to_string())
    }

    fn calls(&self) -> String {
        fs::read_to_string(self.path().join("calls.log")).unwrap_or_default()
    }

    /// The binary under test, isolated from the caller's environment
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("ollamactl").unwrap();
        for var in [
            "OLLAMACTL_CONTAINER",
            "OLLAMACTL_IMAGE",
            "OLLAMACTL_PORT",
            "OLLAMACTL_VOLUME",
            "OLLAMA_DEBUG",
            "OLLAMA_FLASH_ATTENTION",
            "OLLAMA_KEEP_ALIVE",
            "OLLAMA_MAX_LOADED_MODELS",
            "OLLAMA_NUM_PARALLEL",
            "RUST_LOG",
        ] {
            cmd.env_remove(var);
        }
        cmd.env("OLLAMACTL_RUNTIME", self.binary())
            .env("OLLAMACTL_GPU", "none")
            .env("NO_COLOR", "1")
            .current_dir(self.path());
        cmd
    }
}

#[test]
fn test_version_and_help_succeed() {
    let fake = FakeRuntime::new();
    fake.cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ollamactl"));
    fake.cmd()
        .arg("help")
        .assert()
        .success()
        .stdout(predicate::str::contains("recreate"));
}

#[test]
fn test_unknown_subcommand_shows_usage() {
    FakeRuntime::new()
        .cmd()
        .arg("frobnicate")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_missing_flag_argument() {
    FakeRuntime::new()
        .cmd()
        .args(["run", "--port"])
        .assert()
        .code(1);
}

#[test]
fn test_invalid_port_rejected() {
    let fake = FakeRuntime::new();
    fake.cmd().args(["run", "--port", "0"]).assert().code(1);
    assert!(!fake.calls().contains("run -d"));
}

#[test]
fn test_operations_need_a_container() {
    let fake = FakeRuntime::new();
    for op in ["stop", "restart", "recreate", "logs", "shell"] {
        fake.cmd()
            .arg(op)
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Container 'ollama' does not exist"));
    }
}

#[test]
fn test_missing_runtime() {
    let fake = FakeRuntime::new();
    fake.cmd()
        .env_remove("OLLAMACTL_RUNTIME")
        .env("PATH", fake.path().join("empty"))
        .arg("status")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No container runtime found"));
}

#[test]
fn test_run_then_stop_leaves_no_container() {
    let fake = FakeRuntime::new();

    fake.cmd()
        .args(["run", "--flash-attention", "--keep-alive", "30m"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Started container 'ollama'"));
    assert_eq!(fake.state(), "running");
    let calls = fake.calls();
    assert!(calls.contains("run -d --name ollama -p 11434:11434 -v ollama:/root/.ollama"));
    assert!(calls.contains("-e OLLAMA_FLASH_ATTENTION=1 -e OLLAMA_KEEP_ALIVE=30m"));

    fake.cmd()
        .arg("stop")
        .assert()
        .success()
        .stdout(predicate::str::contains("Stopped and removed container 'ollama'"));
    assert_eq!(fake.state(), "absent");

    fake.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("does not exist"));
}

#[test]
fn test_run_existing_running_container() {
    let fake = FakeRuntime::new().with_state("running");
    fake.cmd()
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("already running"));
    assert!(!fake.calls().contains("run -d"));
}

#[test]
fn test_run_starts_stopped_container() {
    let fake = FakeRuntime::new().with_state("exited");
    fake.cmd().arg("run").assert().success();
    assert!(fake.calls().contains("start ollama"));
    assert_eq!(fake.state(), "running");
}

#[test]
fn test_update_unchanged_image_is_noop() {
    let fake = FakeRuntime::new().with_state("running");
    fake.cmd()
        .arg("update")
        .assert()
        .success()
        .stdout(predicate::str::contains("is up to date"));
    let calls = fake.calls();
    assert!(calls.contains("pull docker.io/ollama/ollama:latest"));
    assert!(!calls.contains("rm "));
    assert!(!calls.contains("run -d"));
}

#[test]
fn test_update_changed_image_recreates() {
    let fake = FakeRuntime::new().with_state("running");
    fs::write(fake.path().join("image_id"), "sha256:2222").unwrap();
    fake.cmd().arg("update").assert().success();
    let calls = fake.calls();
    assert!(calls.contains("rm -f ollama"));
    // Settings recovered from inspect output
    assert!(calls.contains("-e OLLAMA_KEEP_ALIVE=10m"));
    assert_eq!(fake.state(), "running");
}

#[test]
fn test_logs_are_prefixed() {
    let fake = FakeRuntime::new().with_state("running");
    fake.cmd()
        .args(["logs", "--tail", "20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[ollama] time=2026-10-18T10:00:00Z"))
        .stderr(predicate::str::contains("[ollama] time=2026-10-18T10:00:01Z"));
    assert!(fake.calls().contains("logs --tail 20 ollama"));
}

#[test]
fn test_ollama_exec_passthrough() {
    let fake = FakeRuntime::new().with_state("running");
    fake.cmd()
        .args(["ollama", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("exec: -i ollama ollama list"));
}

#[test]
fn test_exec_needs_running_container() {
    let fake = FakeRuntime::new().with_state("exited");
    fake.cmd()
        .args(["ollama", "ps"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("is not running"));
}

#[test]
fn test_dry_run_changes_nothing() {
    let fake = FakeRuntime::new();
    fake.cmd()
        .args(["--dry-run", "run", "--port", "8080"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[dry-run]"))
        .stdout(predicate::str::contains("-p 8080:11434"));
    assert_eq!(fake.state(), "absent");
}

#[test]
fn test_runtime_failure_reason_is_shown() {
    let fake = FakeRuntime::new().with_state("running");
    fs::write(fake.path().join("daemon_down"), "").unwrap();
    fake.cmd()
        .arg("stop")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Command failed (1)"))
        .stderr(predicate::str::contains("Cannot connect to the Docker daemon"));
    assert_eq!(fake.state(), "running");
}

#[test]
fn test_recreate_keeps_settings() {
    let fake = FakeRuntime::new().with_state("exited");
    fake.cmd()
        .arg("recreate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Recreated container 'ollama'"))
        .stdout(predicate::str::contains("http://localhost:11434"));
    let calls = fake.calls();
    let rm = calls.find("rm -f ollama").unwrap();
    let run = calls.find("run -d --name ollama -p 11434:11434 -v ollama:/root/.ollama").unwrap();
    assert!(rm < run);
    assert!(calls.contains("-e OLLAMA_KEEP_ALIVE=10m"));
    assert_eq!(fake.state(), "running");
}

#[test]
fn test_run_json_output_is_valid() {
    let fake = FakeRuntime::new();
    let output = fake.cmd().args(["--json", "run"]).output().unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(value["message"].as_str().unwrap().contains("Started container 'ollama'"));
    // the runtime's own output (the new container id) still reaches the user
    assert!(String::from_utf8_lossy(&output.stderr).contains("4f3c2b1a9e8d"));
}

#[test]
fn test_status_json() {
    let fake = FakeRuntime::new().with_state("running");
    let output = fake.cmd().args(["status", "--json"]).output().unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["name"], "ollama");
    assert_eq!(value["container"]["port"], 11434);
    assert_eq!(value["container"]["running"], true);
    assert_eq!(value["image_size"], 3221225472u64);
}
