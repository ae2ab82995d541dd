// Bench65 - 6502 Firmware Simulation Platform
// Copyright (C) 2026 The Bench65 Team
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

/// Hand-assembled test program, loaded at $0200:
///
/// ```text
/// 0200  LDA #$45      enable the console
/// 0202  STA $600A
/// 0205  LDX #$00
/// 0207  LDA $0218,X   copy the zero-terminated message
/// 020A  BEQ $0213
/// 020C  STA $6001
/// 020F  INX
/// 0210  JMP $0207
/// 0213  LDA #$79      pause the clock
/// 0215  STA $6005
/// 0218  "OK\n", $00
/// ```
const SMOKE_PROGRAM: &[u8] = &[
    0xA9, 0x45, 0x8D, 0x0A, 0x60, // LDA #$45; STA $600A
    0xA2, 0x00, // LDX #$00
    0xBD, 0x18, 0x02, // LDA $0218,X
    0xF0, 0x07, // BEQ $0213
    0x8D, 0x01, 0x60, // STA $6001
    0xE8, // INX
    0x4C, 0x07, 0x02, // JMP $0207
    0xA9, 0x79, 0x8D, 0x05, 0x60, // LDA #$79; STA $6005
    0x4F, 0x4B, 0x0A, 0x00, // "OK\n", terminator
];

fn temp_dir(prefix: &str) -> PathBuf {
    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut dir = std::env::temp_dir();
    dir.push(format!("bench65-tests-{}-{}", prefix, nonce));
    std::fs::create_dir_all(&dir).expect("Failed to create temp dir");
    dir
}

fn write_smoke_prg(dir: &PathBuf) -> PathBuf {
    let mut bytes = vec![0x00, 0x02]; // .prg load-address header: $0200
    bytes.extend_from_slice(SMOKE_PROGRAM);
    let path = dir.join("smoke.prg");
    std::fs::write(&path, bytes).expect("Failed to write image");
    path
}

#[test]
fn test_cli_runs_image_and_echoes_console() {
    let dir = temp_dir("run");
    let image = write_smoke_prg(&dir);

    let output = Command::new(env!("CARGO_BIN_EXE_bench65"))
        .args(["--image", image.to_str().unwrap(), "--max-steps", "500"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("OK"), "stdout was: {stdout}");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_missing_image_is_config_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_bench65"))
        .args(["--image", "does-not-exist.prg"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(2)); // EXIT_CONFIG_ERROR
}

#[test]
fn test_cli_test_mode_outputs() {
    let dir = temp_dir("outputs");
    write_smoke_prg(&dir);

    let script_path = dir.join("script.yaml");
    let script_content = r#"
schema_version: "1.0"
inputs:
  image: "smoke.prg"
limits:
  max_steps: 500
assertions:
  - console_contains: "OK"
  - console_regex: "^OK"
  - expected_stop_reason: paused
"#;
    std::fs::write(&script_path, script_content).expect("Failed to write script");

    let output_dir = dir.join("artifacts");

    let output = Command::new(env!("CARGO_BIN_EXE_bench65"))
        .args([
            "test",
            "--script",
            script_path.to_str().unwrap(),
            "--no-console-stdout",
            "--output-dir",
            output_dir.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());

    let result_path = output_dir.join("result.json");
    assert!(result_path.exists());

    let result_content = std::fs::read_to_string(&result_path).unwrap();
    let result: serde_json::Value = serde_json::from_str(&result_content).unwrap();

    assert_eq!(result["status"], "pass");
    assert_eq!(result["stop_reason"], "paused");
    assert!(result["image_hash"].as_str().is_some());
    assert!(result["config"]["image"]
        .as_str()
        .unwrap()
        .contains("smoke.prg"));
    assert_eq!(result["assertions"].as_array().unwrap().len(), 3);

    let console_log = std::fs::read_to_string(output_dir.join("console.log")).unwrap();
    assert_eq!(console_log, "OK\n");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_test_mode_assertion_failure() {
    let dir = temp_dir("assert-fail");
    write_smoke_prg(&dir);

    let script_path = dir.join("script.yaml");
    let script_content = r#"
schema_version: "1.0"
inputs:
  image: "smoke.prg"
limits:
  max_steps: 500
assertions:
  - console_contains: "ThisTextWillNeverBeFound"
"#;
    std::fs::write(&script_path, script_content).expect("Failed to write script");

    let output = Command::new(env!("CARGO_BIN_EXE_bench65"))
        .args([
            "test",
            "--script",
            script_path.to_str().unwrap(),
            "--no-console-stdout",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1)); // EXIT_ASSERT_FAIL

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_test_mode_invalid_script() {
    let dir = temp_dir("bad-script");

    let script_path = dir.join("script.yaml");
    let script_content = r#"
schema_version: "1.0"
inputs:
  image: "smoke.prg"
limits:
  max_steps: 0
"#;
    std::fs::write(&script_path, script_content).expect("Failed to write script");

    let output = Command::new(env!("CARGO_BIN_EXE_bench65"))
        .args(["test", "--script", script_path.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(2)); // EXIT_CONFIG_ERROR

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_test_mode_max_steps_stop() {
    let dir = temp_dir("max-steps");

    // JMP $0200 spins forever; the step budget has to cut it off
    let mut bytes = vec![0x00, 0x02];
    bytes.extend_from_slice(&[0x4C, 0x00, 0x02]);
    let image = dir.join("spin.prg");
    std::fs::write(&image, bytes).expect("Failed to write image");

    let script_path = dir.join("script.yaml");
    let script_content = r#"
schema_version: "1.0"
inputs:
  image: "spin.prg"
limits:
  max_steps: 25
assertions:
  - expected_stop_reason: max_steps
"#;
    std::fs::write(&script_path, script_content).expect("Failed to write script");

    let output = Command::new(env!("CARGO_BIN_EXE_bench65"))
        .args([
            "test",
            "--script",
            script_path.to_str().unwrap(),
            "--no-console-stdout",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_test_mode_with_machine_descriptor() {
    let dir = temp_dir("machine");
    write_smoke_prg(&dir);

    let machine_path = dir.join("machine.yaml");
    let machine_content = r#"
name: "breadboard-6502"
cpu: "mos6502"
ram:
  base: 0
  size: "64KiB"
peripherals:
  - id: "console0"
    type: "console"
    base_address: 24576
"#;
    std::fs::write(&machine_path, machine_content).expect("Failed to write machine file");

    let script_path = dir.join("script.yaml");
    let script_content = r#"
schema_version: "1.0"
inputs:
  image: "smoke.prg"
  machine: "machine.yaml"
limits:
  max_steps: 500
assertions:
  - console_contains: "OK"
  - expected_stop_reason: paused
"#;
    std::fs::write(&script_path, script_content).expect("Failed to write script");

    let output = Command::new(env!("CARGO_BIN_EXE_bench65"))
        .args([
            "test",
            "--script",
            script_path.to_str().unwrap(),
            "--no-console-stdout",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());

    let _ = std::fs::remove_dir_all(&dir);
}
