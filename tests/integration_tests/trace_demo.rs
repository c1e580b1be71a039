//! Integration tests for the trace-demo binary.

use std::process::Command;

use serde_json::Value;

/// Test that the binary writes a merged, loadable trace.
#[test]
fn test_trace_demo_writes_trace() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("trace.json");

    let output = Command::new(env!("CARGO_BIN_EXE_trace-demo"))
        .args(["--workers", "2", "--tasks", "9", "--output"])
        .arg(&output_path)
        .output()
        .expect("Failed to run trace-demo");

    assert!(output.status.success(), "trace-demo should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Wrote"), "Should report the written file");

    let document: Value =
        serde_json::from_str(&std::fs::read_to_string(&output_path).unwrap()).unwrap();
    let events = document["traceEvents"].as_array().unwrap();

    assert_eq!(events[0]["name"], "process_name");
    assert_eq!(events[1]["name"], "process_labels");

    let captured: Vec<&Value> = events.iter().filter(|e| e["ph"] != "M").collect();
    // Per pool: pool span (2) + per task span (2) and compute (1), plus 2 checkpoints
    assert_eq!(captured.len(), 2 * (2 + 9 * 3 + 2));

    let timestamps: Vec<i64> = captured.iter().map(|e| e["ts"].as_i64().unwrap()).collect();
    assert!(
        timestamps.windows(2).all(|w| w[0] <= w[1]),
        "Merged events should be sorted"
    );

    let thread_names: Vec<&str> = events
        .iter()
        .filter(|e| e["name"] == "thread_name")
        .map(|e| e["args"]["name"].as_str().unwrap())
        .collect();
    assert!(thread_names.iter().any(|n| n.starts_with("io-")));
    assert!(thread_names.iter().any(|n| n.starts_with("compute-")));
}

/// Test the summary report and config file handling.
#[test]
fn test_trace_demo_summary_with_config() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("trace.toml");
    std::fs::write(
        &config_path,
        "process-identifier = \"demo\"\nprocess-version = \"9.9\"\ncontext-label = \"bench\"\n",
    )
    .unwrap();
    let output_path = dir.path().join("trace.json");

    let output = Command::new(env!("CARGO_BIN_EXE_trace-demo"))
        .args(["--workers", "1", "--tasks", "2", "--summary", "--config"])
        .arg(&config_path)
        .arg("--output")
        .arg(&output_path)
        .output()
        .expect("Failed to run trace-demo");

    assert!(output.status.success(), "trace-demo should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("TRACE SPAN SUMMARY"), "Should print summary");
    assert!(stdout.contains("compute"), "Should list compute spans");

    let document: Value =
        serde_json::from_str(&std::fs::read_to_string(&output_path).unwrap()).unwrap();
    assert!(
        document["traceEvents"][0]["args"]["name"]
            .as_str()
            .unwrap()
            .starts_with("demo/9.9 - trace-recorder/")
    );
    assert_eq!(document["traceEvents"][1]["args"]["labels"], "bench");
}

/// Test that a missing config file is reported.
#[test]
fn test_trace_demo_missing_config() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_trace-demo"))
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("--output")
        .arg(dir.path().join("trace.json"))
        .output()
        .expect("Failed to run trace-demo");

    assert!(!output.status.success(), "Should fail without config");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Config file not found"),
        "Should explain the failure"
    );
}

/// Test that an unwritable destination fails cleanly.
#[test]
fn test_trace_demo_unwritable_output() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_trace-demo"))
        .args(["--tasks", "1", "--output"])
        .arg(dir.path().join("missing").join("trace.json"))
        .output()
        .expect("Failed to run trace-demo");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to write"), "Should show error message");
}
