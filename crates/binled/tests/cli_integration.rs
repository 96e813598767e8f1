//! Integration tests for the `binled-cli` binary.
//!
//! Hardware commands run against a temp config with `transport = "none"`,
//! so every write goes to the no-op bus.

use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

fn cli() -> assert_cmd::Command {
    cargo_bin_cmd!("binled-cli")
}

/// Write a dry-run config and return (guard, path).
fn dry_config(extra: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, format!("transport = \"none\"\n{extra}")).unwrap();
    (dir, path)
}

fn stdout_json(cmd: &mut assert_cmd::Command) -> serde_json::Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("command should produce valid JSON")
}

#[test]
fn cli_help_succeeds() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("binled-cli"));
}

#[test]
fn cli_version_prints_version() {
    cli()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

// ── Lookup (no hardware) ──

#[test]
fn resolve_prints_index_and_mask() {
    let (_dir, path) = dry_config("");
    cli()
        .arg("--config")
        .arg(&path)
        .args(["resolve", "Drinks", "Wyoming"])
        .assert()
        .success()
        .stdout(predicate::str::contains("20"))
        .stdout(predicate::str::contains("0x00100000"));
}

#[test]
fn resolve_json_matches_front_end_shape() {
    let (_dir, path) = dry_config("");
    let json = stdout_json(cli().arg("--config").arg(&path).args([
        "--json",
        "resolve",
        "backstock",
        "south gr",
    ]));
    assert_eq!(json["deviceId"], 24);
    assert_eq!(json["maskHex"], "01000000");
    assert_eq!(json["category"], "BACKSTOCK");
}

#[test]
fn resolve_unknown_address_fails() {
    cli()
        .args(["resolve", "Frozen", "Wyoming"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: Unknown store/category"));
}

#[test]
fn frame_for_index() {
    let (_dir, path) = dry_config("");
    cli()
        .arg("--config")
        .arg(&path)
        .args(["frame", "20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("00 10 00 00"));
}

#[test]
fn frame_honors_inverted_config() {
    let (_dir, path) = dry_config("invert = true\n");
    let json = stdout_json(cli().arg("--config").arg(&path).args(["--json", "frame", "0"]));
    assert_eq!(json["hex"], "01 FF FF FE");
    assert_eq!(json["invert"], true);
}

#[test]
fn frame_mask_out_of_range_fails() {
    let (_dir, path) = dry_config("");
    cli()
        .arg("--config")
        .arg(&path)
        .args(["frame", "--mask", "0x02000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn grid_lists_all_bins() {
    let json = stdout_json(cli().args(["--json", "grid"]));
    assert_eq!(json["count"], 25);
    assert_eq!(json["bins"][20]["category"], "DRINKS");
    assert_eq!(json["bins"][20]["store"], "WYOMING");
}

// ── Config ──

#[test]
fn config_json_produces_valid_json() {
    let (_dir, path) = dry_config("");
    let json = stdout_json(cli().arg("--config").arg(&path).args(["--json", "config"]));
    assert!(json["settings"].is_object());
    assert_eq!(json["config_file_exists"], true);
    assert_eq!(json["settings"]["transport"], "none");
    assert_eq!(json["settings"]["led_count"], 25);
}

#[test]
fn config_reports_short_array_warning() {
    let (_dir, path) = dry_config("led_count = 16\n");
    let json = stdout_json(cli().arg("--config").arg(&path).args(["--json", "config"]));
    assert_eq!(json["problems"].as_array().unwrap().len(), 0);
    let warnings = json["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].as_str().unwrap().contains("needs 25"));
}

#[test]
fn config_init_writes_loadable_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fresh").join("config.toml");
    let json = stdout_json(cli().arg("--config").arg(&path).args(["--json", "config", "--init"]));
    assert_eq!(json["ok"], true);
    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with("# binled LED controller settings."));
    assert!(contents.contains("led_count = 25"));

    // The written file is what `config` then reports as loaded.
    let json = stdout_json(cli().arg("--config").arg(&path).args(["--json", "config"]));
    assert_eq!(json["config_file_exists"], true);
    assert_eq!(json["settings"]["hold_ms"], 10_000);
}

#[test]
fn config_init_keeps_existing_file_without_force() {
    let (_dir, path) = dry_config("invert = true\n");
    cli()
        .arg("--config")
        .arg(&path)
        .args(["config", "--init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "transport = \"none\"\ninvert = true\n"
    );

    cli()
        .arg("--config")
        .arg(&path)
        .args(["config", "--init", "--force"])
        .assert()
        .success();
    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("transport = \"none\""));
    assert!(contents.contains("invert = true"));
}

#[test]
fn verbose_flag_accepted() {
    let (_dir, path) = dry_config("");
    cli()
        .arg("--config")
        .arg(&path)
        .args(["-v", "config"])
        .assert()
        .success();
}

// ── Control (no-op bus) ──

#[test]
fn light_dry_run_reports_without_waiting() {
    let (_dir, path) = dry_config("");
    let json = stdout_json(cli().arg("--config").arg(&path).args([
        "--json",
        "light",
        "Pet Supplies",
        "Muskegon",
        "--dry-run",
    ]));
    assert_eq!(json["ok"], true);
    assert_eq!(json["deviceId"], 9);
    assert_eq!(json["mode"], "timed");
    assert_eq!(json["hold_ms"], 10_000);
}

#[test]
fn light_timed_waits_for_auto_off() {
    let (_dir, path) = dry_config("");
    let start = std::time::Instant::now();
    let json = stdout_json(cli().arg("--config").arg(&path).args([
        "--json",
        "light",
        "Drinks",
        "Wyoming",
        "--hold-ms",
        "200",
    ]));
    assert!(start.elapsed() >= std::time::Duration::from_millis(200));
    assert_eq!(json["hold_ms"], 200);
}

#[test]
fn index_out_of_range_fails() {
    let (_dir, path) = dry_config("");
    cli()
        .arg("--config")
        .arg(&path)
        .args(["index", "25", "--sticky"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn off_succeeds_without_hardware() {
    let (_dir, path) = dry_config("");
    let json = stdout_json(cli().arg("--config").arg(&path).args(["--json", "off"]));
    assert_eq!(json["ok"], true);
}

#[test]
fn test_sweep_runs_every_led() {
    let (_dir, path) = dry_config("sweep_step_ms = 1\n");
    let json = stdout_json(cli().arg("--config").arg(&path).args(["--json", "test"]));
    assert_eq!(json["lit"], 25);
    assert_eq!(json["count"], 25);
}

#[test]
fn invalid_config_is_rejected_for_control() {
    let (_dir, path) = dry_config("led_count = 0\n");
    cli()
        .arg("--config")
        .arg(&path)
        .arg("off")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config error"));
}

#[test]
fn listen_replies_per_line() {
    let (_dir, path) = dry_config("");
    let output = cli()
        .arg("--config")
        .arg(&path)
        .arg("listen")
        .write_stdin("sticky Drinks|Wyoming\nbogus\nindex 99\nquit\n")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let replies: Vec<serde_json::Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(replies.len(), 3);
    assert_eq!(replies[0]["deviceId"], 20);
    assert_eq!(replies[0]["mode"], "sticky");
    assert_eq!(replies[1]["ok"], false);
    assert_eq!(replies[2]["ok"], false);
}
