//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary and verify outputs.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_pomodesk"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp path is valid UTF-8")
}

fn json_lines(stdout: &str) -> Vec<serde_json::Value> {
    stdout
        .lines()
        .map(|l| serde_json::from_str(l).expect("every output line is JSON"))
        .collect()
}

#[test]
fn test_config_get_default() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("config.toml");
    let (stdout, _, code) = run_cli(&["config", "get", "timing.debounce_ms", "--file", path_arg(&file)]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "200");
}

#[test]
fn test_config_set_then_get() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("config.toml");
    let file = path_arg(&file);

    let (stdout, _, code) = run_cli(&["config", "set", "durations.work_secs", "3000", "--file", file]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");

    let (stdout, _, code) = run_cli(&["config", "get", "durations.work_secs", "--file", file]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "3000");
}

#[test]
fn test_config_set_rejects_zero_duration() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("config.toml");
    let (_, stderr, code) = run_cli(&["config", "set", "durations.work_secs", "0", "--file", path_arg(&file)]);
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error:"));
    assert!(!file.exists());
}

#[test]
fn test_config_unknown_key() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("config.toml");
    let (_, stderr, code) = run_cli(&["config", "get", "timing.nope", "--file", path_arg(&file)]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_config_list_and_reset() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("config.toml");
    let file = path_arg(&file);

    let (stdout, _, code) = run_cli(&["config", "list", "--file", file]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["timing"]["double_click_ms"], 350);
    assert_eq!(parsed["settings"]["work_max_minutes"], 90);

    let (stdout, _, code) = run_cli(&["config", "reset", "--file", file]);
    assert_eq!(code, 0);
    assert!(stdout.contains("reset"));
    assert!(Path::new(file).exists());
}

#[test]
fn test_config_path_honours_file() {
    let (stdout, _, code) = run_cli(&["config", "path", "--file", "/tmp/pomodesk-test.toml"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "/tmp/pomodesk-test.toml");
}

#[test]
fn test_menu_show() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("menu.json");
    std::fs::write(
        &file,
        r#"[{"title": "Pasta", "price_chf": "8.50"}, {"title": "Curry", "price_chf": 9.2}]"#,
    )
    .unwrap();

    let (stdout, _, code) = run_cli(&["menu", "show", path_arg(&file)]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed.as_array().map(Vec::len), Some(2));
    assert_eq!(parsed[1]["price_chf"], "9.2");

    let (stdout, _, code) = run_cli(&["menu", "show", path_arg(&file), "--index", "0"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["title"], "Pasta");

    let (_, stderr, code) = run_cli(&["menu", "show", path_arg(&file), "--index", "5"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("no menu item"));
}

#[test]
fn test_menu_show_invalid_json() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("menu.json");
    std::fs::write(&file, "not json").unwrap();
    let (_, stderr, code) = run_cli(&["menu", "show", path_arg(&file)]);
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error:"));
}

#[test]
fn test_simulate_work_session() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[durations]\nwork_secs = 2\n").unwrap();
    let script = dir.path().join("scenario.toml");
    std::fs::write(
        &script,
        r#"
until_ms = 6000

[[step]]
at_ms = 0
action = "distance"
cm = 40.0

[[step]]
at_ms = 100
action = "tap"
button = "primary"
"#,
    )
    .unwrap();

    let (stdout, stderr, code) = run_cli(&[
        "simulate",
        path_arg(&script),
        "--config",
        path_arg(&config),
        "--seed",
        "1",
    ]);
    assert_eq!(code, 0, "stderr: {stderr}");
    let lines = json_lines(&stdout);

    assert_eq!(lines[0]["at_ms"], 0);
    assert_eq!(lines[0]["effect"]["kind"], "cue");
    assert_eq!(lines[0]["effect"]["value"], "turn_on");
    assert!(lines
        .iter()
        .any(|l| l["event"]["type"] == "TimerCompleted" && l["at_ms"] == 2100));
    assert!(lines
        .iter()
        .any(|l| l["effect"]["value"]["screen"] == "finished"));

    let summary = &lines[lines.len() - 1]["summary"];
    assert_eq!(summary["mode"], "normal");
    assert_eq!(summary["at_ms"], 6000);
    assert_eq!(summary["timer"]["state"], "idle");
    assert_eq!(summary["timer"]["completed_work_sessions"], 1);
}

#[test]
fn test_simulate_menu_and_gamble() {
    let dir = tempfile::tempdir().unwrap();
    let menu = dir.path().join("menu.json");
    std::fs::write(&menu, r#"[{"title": "A"}, {"title": "B"}]"#).unwrap();
    let script = dir.path().join("scenario.toml");
    std::fs::write(
        &script,
        r#"
[[step]]
at_ms = 0
action = "shake"

[[step]]
at_ms = 300
action = "tap"
button = "secondary"

[[step]]
at_ms = 2500
action = "shake"

[[step]]
at_ms = 2800
action = "tap"
button = "secondary"
"#,
    )
    .unwrap();

    let (stdout, stderr, code) = run_cli(&[
        "simulate",
        path_arg(&script),
        "--menu",
        path_arg(&menu),
        "--seed",
        "9",
    ]);
    assert_eq!(code, 0, "stderr: {stderr}");
    let lines = json_lines(&stdout);
    assert!(lines
        .iter()
        .any(|l| l["effect"]["value"]["screen"] == "gambling_intro"));
    assert!(lines.iter().any(|l| {
        l["effect"]["value"]["screen"] == "gambling_result"
            && l["effect"]["value"]["choice"] == "black"
    }));

    let summary = &lines[lines.len() - 1]["summary"];
    assert_eq!(summary["mode"], "menu_browse");
    assert_eq!(summary["cursor"]["index"], 1);
    assert_eq!(summary["cursor"]["total"], 2);
}

#[test]
fn test_simulate_missing_script() {
    let (_, stderr, code) = run_cli(&["simulate", "/nonexistent/scenario.toml"]);
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error:"));
}
