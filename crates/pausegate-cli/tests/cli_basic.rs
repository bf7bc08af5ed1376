//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own data directory, so
//! every invocation is a cold start over the same SQLite store.

use std::path::Path;
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_pausegate-cli"))
        .args(args)
        .env("PAUSEGATE_DATA_DIR", dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_json(dir: &Path, args: &[&str]) -> Value {
    let (stdout, stderr, code) = run_cli(dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("{args:?} printed non-JSON ({e}): {stdout}"))
}

fn monitored_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["config", "set", "monitored_apps", "com.a,com.b"]);
    assert_eq!(code, 0, "config set failed: {stderr}");
    dir
}

#[test]
fn test_config_get_default() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["config", "get", "quick_task.duration_ms"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "180000");
}

#[test]
fn test_config_unknown_key_fails() {
    let dir = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["config", "set", "no.such.key", "1"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"), "stderr: {stderr}");
}

#[test]
fn test_unmonitored_app_gets_no_decision() {
    let dir = TempDir::new().unwrap();
    let outcome = run_json(dir.path(), &["event", "foreground", "com.a", "--at", "0"]);
    assert!(outcome.get("decision").is_none(), "outcome: {outcome}");
    assert!(outcome.get("command").is_none(), "outcome: {outcome}");
}

#[test]
fn test_quick_task_lifecycle_across_processes() {
    let dir = monitored_workspace();
    let path = dir.path();

    let outcome = run_json(path, &["event", "foreground", "com.a", "--at", "0"]);
    assert_eq!(outcome["decision"]["decision"], "show_quick_task_dialog");
    assert_eq!(outcome["command"]["action"], "Launch");
    assert_eq!(outcome["command"]["sessionKind"], "QuickTask");

    run_json(path, &["choice", "accept-quick-task", "com.a", "--at", "0"]);
    let state = run_json(path, &["state", "show"]);
    assert_eq!(state["quota"]["remaining_uses"], 0);

    let outcome = run_json(path, &["event", "expired", "com.a", "--at", "180000"]);
    assert_eq!(outcome["decision"]["decision"], "show_post_quick_task_choice");
    assert_eq!(outcome["command"]["sessionKind"], "PostQuickTaskChoice");

    // A fresh process entering the app again reaches the same decision.
    let outcome = run_json(path, &["event", "foreground", "com.a", "--at", "181000"]);
    assert_eq!(outcome["decision"]["decision"], "show_post_quick_task_choice");

    run_json(path, &["choice", "quit", "com.a", "--at", "182000"]);
    let outcome = run_json(path, &["event", "foreground", "com.a", "--at", "183000"]);
    assert_eq!(outcome["decision"]["decision"], "start_intervention");
}

#[test]
fn test_intention_via_timer_set_suppresses() {
    let dir = monitored_workspace();
    let path = dir.path();

    run_json(
        path,
        &["event", "timer-set", "com.b", "--kind", "intention", "--expires-at", "300000", "--at", "0"],
    );
    let outcome = run_json(path, &["event", "foreground", "com.b", "--at", "1000"]);
    assert_eq!(outcome["decision"]["decision"], "suppress");
    assert_eq!(outcome["decision"]["reason"], "intention_active");
}

#[test]
fn test_quota_and_state_reset() {
    let dir = monitored_workspace();
    let path = dir.path();

    run_json(path, &["event", "foreground", "com.a", "--at", "0"]);
    run_json(path, &["choice", "accept-quick-task", "com.a", "--at", "0"]);
    let quota = run_json(path, &["quota", "reset"]);
    assert_eq!(quota["remaining_uses"], 1);

    let (stdout, _, code) = run_cli(path, &["state", "reset"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("state_reset"));
    let state = run_json(path, &["state", "show"]);
    assert!(state["last_meaningful_app"].is_null(), "state: {state}");
}

#[test]
fn test_replay_prints_commands_in_order() {
    let dir = monitored_workspace();
    let path = dir.path();
    let script = path.join("events.jsonl");
    std::fs::write(
        &script,
        concat!(
            "# enter, decline, hop to the other app, leave\n",
            "{\"type\":\"ForegroundChanged\",\"app\":\"com.a\",\"timestamp\":0}\n",
            "{\"choice\":\"decline\",\"app\":\"com.a\"}\n",
            "{\"type\":\"ForegroundChanged\",\"app\":\"com.b\",\"timestamp\":5000}\n",
            "\n",
            "{\"type\":\"ForegroundChanged\",\"app\":\"com.launcher\",\"timestamp\":9000}\n",
        ),
    )
    .unwrap();

    let (stdout, stderr, code) =
        run_cli(path, &["replay", "--memory", script.to_str().unwrap()]);
    assert_eq!(code, 0, "replay failed: {stderr}");

    let commands: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let actions: Vec<&str> = commands
        .iter()
        .map(|c| c["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, ["Launch", "Replace", "Replace", "Teardown"]);
    assert_eq!(commands[1]["sessionKind"], "Intervention");
    assert_eq!(commands[2]["app"], "com.b");
}

#[test]
fn test_replay_rejects_malformed_line() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("bad.jsonl");
    std::fs::write(&script, "{\"type\":\"Nope\"}\n").unwrap();

    let (_, stderr, code) = run_cli(dir.path(), &["replay", script.to_str().unwrap()]);
    assert_eq!(code, 1);
    assert!(stderr.contains("line 1"), "stderr: {stderr}");
}

#[test]
fn test_resident_surface_is_torn_down_when_user_leaves() {
    let dir = monitored_workspace();
    let path = dir.path();

    let outcome = run_json(path, &["event", "foreground", "com.a", "--at", "0"]);
    assert_eq!(outcome["command"]["action"], "Launch");

    let outcome = run_json(
        path,
        &["--resident", "QuickTask:com.a", "event", "foreground", "com.c", "--at", "1000"],
    );
    assert_eq!(outcome["command"]["action"], "Teardown", "outcome: {outcome}");
}

#[test]
fn test_resident_surface_is_resumed_not_relaunched() {
    let dir = monitored_workspace();
    let path = dir.path();

    run_json(path, &["event", "foreground", "com.a", "--at", "0"]);
    let outcome = run_json(
        path,
        &["--resident", "QuickTask:com.a", "event", "foreground", "com.a", "--at", "500"],
    );
    assert_eq!(outcome["decision"]["decision"], "show_quick_task_dialog");
    assert!(outcome.get("command").is_none(), "outcome: {outcome}");
}

#[test]
fn test_surface_resident_without_session_gets_teardown() {
    let dir = monitored_workspace();
    let path = dir.path();

    let reply = run_json(path, &["surface", "resident"]);
    assert_eq!(reply["command"]["action"], "Teardown");

    let reply = run_json(path, &["--resident", "Intervention:com.a", "surface", "resident"]);
    assert!(reply["command"].is_null(), "reply: {reply}");
}

#[test]
fn test_bad_resident_argument_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (_, _, code) = run_cli(dir.path(), &["--resident", "com.a", "state", "show"]);
    assert_ne!(code, 0);
}
