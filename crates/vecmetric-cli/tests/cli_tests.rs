//! End-to-end tests for the `vecmetric` binary.

use assert_cmd::Command;
use predicates::prelude::*;

/// The binary with no dispatch configuration inherited from the environment.
fn vecmetric() -> Command {
    let mut cmd = Command::cargo_bin("vecmetric").expect("binary builds");
    cmd.env_remove("VECMETRIC_CONFIG")
        .env_remove("VECMETRIC_ALLOWED")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_compute_orthogonal_cosine_on_serial() {
    vecmetric()
        .args(["--allow", "serial", "compute", "cos", "f32", "1,0,0,0", "0,1,0,0"])
        .assert()
        .success()
        .stdout("0\n");
}

#[test]
fn test_compute_squared_euclidean_with_brackets() {
    vecmetric()
        .args(["compute", "l2sq", "f64", "[1, 2, 3]", "[4, 6, 3]"])
        .assert()
        .success()
        .stdout("25\n");
}

#[test]
fn test_compute_hamming_json() {
    let output = vecmetric()
        .args(["--json", "compute", "hamming", "b1", "0b11110000", "0b00001111"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""score": 8"#))
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).expect("valid JSON");
    assert_eq!(report["metric"], "hamming");
    assert_eq!(report["datatype"], "b1");
    assert_eq!(report["dimension"], 1);
}

#[test]
fn test_compute_dimension_mismatch_fails() {
    vecmetric()
        .args(["compute", "dot", "f32", "1,2,3", "1,2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("3 vs 2"));
}

#[test]
fn test_compute_unsupported_pair_fails() {
    vecmetric()
        .args(["compute", "hamming", "f32", "1", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no kernel implements hamming over f32"));
}

#[test]
fn test_caps_with_serial_only_table() {
    let output = vecmetric()
        .args(["--allow", "serial", "caps"])
        .assert()
        .success()
        .stdout(predicate::str::contains("viable:   none"))
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf-8 output");

    let rows: Vec<&str> = text
        .lines()
        .skip_while(|line| !line.starts_with("metric"))
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .collect();
    assert_eq!(rows.len(), 5, "{text}");
    for row in rows {
        for cell in row.split_whitespace().skip(1) {
            assert!(cell == "serial" || cell == "-", "unexpected cell {cell:?} in {row:?}");
        }
    }
}

#[test]
fn test_caps_json_respects_allow() {
    let output = vecmetric()
        .args(["--json", "--allow", "none", "caps"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&output).expect("valid JSON");

    assert_eq!(report["allowed"], serde_json::json!([]));
    let kernels = report["kernels"].as_array().expect("kernel list");
    assert_eq!(kernels.len(), 14);
    assert!(kernels.iter().all(|k| k["tier"] == "serial"));
}

#[test]
fn test_allow_flag_overrides_environment() {
    vecmetric()
        .env("VECMETRIC_ALLOWED", "avx2,avx512,neon")
        .args(["--json", "--allow", "serial", "compute", "dot", "i8", "1,2", "3,4"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""tier": "serial""#))
        .stdout(predicate::str::contains(r#""score": 11.0"#));
}

#[test]
fn test_invalid_environment_capability_exits_non_zero() {
    vecmetric()
        .env("VECMETRIC_ALLOWED", "bogus")
        .arg("caps")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load configuration"));
}

#[test]
fn test_unknown_allow_value_is_usage_error() {
    vecmetric()
        .args(["--allow", "3dnow", "caps"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown capability"));
}
