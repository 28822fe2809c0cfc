//! Integration tests for patchbay-cli.
//!
//! Tests invoke the built binary on patches written to a temporary
//! directory.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// Helper to get the path to the `patchbay` binary built by cargo.
fn patchbay_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_patchbay"))
}

const SIGNAL_PATCH: &str = r#"{
  "page": {
    "boxes": [
      {"box": {"name": "sig~", "id": 1, "text": "sig~ 0.25"}},
      {"box": {"name": "*~", "id": 2, "text": "*~ 2"}},
      {"box": {"name": "peak~", "id": 3, "text": "peak~"}},
      {"box": {"name": "print", "id": 4, "text": "print"}}
    ],
    "links": [
      {"link": {"from": [1, 0], "to": [2, 0]}},
      {"link": {"from": [2, 0], "to": [3, 0]}},
      {"link": {"from": [3, 0], "to": [4, 0]}}
    ]
  }
}"#;

const FEEDBACK_PATCH: &str = r#"{
  "page": {
    "boxes": [
      {"box": {"name": "+~", "id": 1, "text": "+~"}},
      {"box": {"name": "+~", "id": 2, "text": "+~"}}
    ],
    "links": [
      {"link": {"from": [1, 0], "to": [2, 0]}},
      {"link": {"from": [2, 0], "to": [1, 1]}}
    ]
  }
}"#;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("failed to write fixture");
    path
}

/// An explicit settings file keeps the tests independent of the user's config.
fn engine_config(dir: &Path) -> PathBuf {
    write(
        dir,
        "engine.toml",
        "sample_rate = 48000\nblock_size = 16\nlog_level = \"warn\"\nticks = 4\n",
    )
}

// ---------------------------------------------------------------------------
// `patchbay boxes`
// ---------------------------------------------------------------------------

#[test]
fn cli_boxes_lists_standard_boxes() {
    let output = patchbay_bin()
        .arg("boxes")
        .output()
        .expect("failed to run patchbay boxes");
    assert!(output.status.success(), "patchbay boxes failed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Available Boxes"));
    for name in ["sig~", "peak~", "print", "toggle", "receive", "newbox"] {
        assert!(stdout.contains(name), "listing should contain '{name}'");
    }
    assert!(stdout.contains("Signal:"));
}

#[test]
fn cli_boxes_detail_shows_sockets() {
    let output = patchbay_bin()
        .args(["boxes", "+", "1"])
        .output()
        .expect("failed to run patchbay boxes +");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Inlets:"));
    assert!(stdout.contains("hot"));
    assert!(stdout.contains("cold"));
    assert!(stdout.contains("Outlets:"));
}

#[test]
fn cli_boxes_unknown_box_fails() {
    let output = patchbay_bin()
        .args(["boxes", "no-such-box"])
        .output()
        .expect("failed to run patchbay boxes");
    assert!(!output.status.success());
}

// ---------------------------------------------------------------------------
// `patchbay info`
// ---------------------------------------------------------------------------

#[test]
fn cli_info_prints_boxes_and_links() {
    let dir = TempDir::new().unwrap();
    let patch = write(dir.path(), "signal.json", SIGNAL_PATCH);
    let config = engine_config(dir.path());

    let output = patchbay_bin()
        .arg("info")
        .arg(&patch)
        .arg("--config")
        .arg(&config)
        .output()
        .expect("failed to run patchbay info");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Boxes (4):"), "got: {stdout}");
    assert!(stdout.contains("Links (3):"), "got: {stdout}");
    assert!(stdout.contains("sig~ 0.25"));
    assert!(stdout.contains("1:0 -> 2:0"));
}

#[test]
fn cli_info_missing_patch_fails() {
    let output = patchbay_bin()
        .args(["info", "/definitely/not/a/patch.json"])
        .output()
        .expect("failed to run patchbay info");
    assert!(!output.status.success());
}

// ---------------------------------------------------------------------------
// `patchbay run`
// ---------------------------------------------------------------------------

#[test]
fn cli_run_reports_peaks() {
    let dir = TempDir::new().unwrap();
    let patch = write(dir.path(), "signal.json", SIGNAL_PATCH);
    let config = engine_config(dir.path());

    let output = patchbay_bin()
        .arg("run")
        .arg(&patch)
        .arg("--config")
        .arg(&config)
        .output()
        .expect("failed to run patchbay run");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("peak 0.500000"), "got: {stdout}");
    assert!(stdout.contains("blocks 4"), "got: {stdout}");
}

#[test]
fn cli_run_flags_override_config() {
    let dir = TempDir::new().unwrap();
    let patch = write(dir.path(), "signal.json", SIGNAL_PATCH);
    let config = engine_config(dir.path());

    let output = patchbay_bin()
        .arg("run")
        .arg(&patch)
        .args(["--ticks", "7", "--block-size", "8"])
        .arg("--config")
        .arg(&config)
        .output()
        .expect("failed to run patchbay run");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("blocks 7"), "got: {stdout}");
}

#[test]
fn cli_run_feedback_fails() {
    let dir = TempDir::new().unwrap();
    let patch = write(dir.path(), "feedback.json", FEEDBACK_PATCH);
    let config = engine_config(dir.path());

    let output = patchbay_bin()
        .arg("run")
        .arg(&patch)
        .arg("--config")
        .arg(&config)
        .output()
        .expect("failed to run patchbay run");
    assert!(!output.status.success());
}

#[test]
fn cli_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let patch = write(dir.path(), "signal.json", SIGNAL_PATCH);
    let config = write(dir.path(), "bad.toml", "block_size = 0\n");

    let output = patchbay_bin()
        .arg("run")
        .arg(&patch)
        .arg("--config")
        .arg(&config)
        .output()
        .expect("failed to run patchbay run");
    assert!(!output.status.success());
}

#[test]
fn cli_help_works() {
    let output = patchbay_bin()
        .arg("--help")
        .output()
        .expect("failed to run patchbay --help");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("run"));
    assert!(stdout.contains("info"));
}
