mod common;

use assert_cmd::Command;
use common::{broadcast_camera, fragmented_segments};
use court_calib::{write_segments, CourtCalibReport, LineSegment};
use predicates::prelude::*;
use std::{fs, path::Path};

fn write_config(dir: &Path, segments: &[LineSegment]) -> std::path::PathBuf {
    write_segments(dir.join("segments.json"), segments).unwrap();
    let config = r#"{
        "segments_path": "segments.json",
        "image_size": { "width": 1392, "height": 550 },
        "line_samples": 20
    }"#;
    let path = dir.join("config.json");
    fs::write(&path, config).unwrap();
    path
}

#[test]
fn writes_report_and_line_csvs() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &fragmented_segments(&broadcast_camera()));
    let report_path = dir.path().join("out").join("report.json");
    fs::create_dir_all(report_path.parent().unwrap()).unwrap();
    let lines_dir = dir.path().join("lines");

    Command::cargo_bin("court-calib")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .arg("--output")
        .arg(&report_path)
        .arg("--lines-dir")
        .arg(&lines_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote report JSON"));

    let report = CourtCalibReport::load_json(&report_path).unwrap();
    assert!(report.error.is_none());
    assert_eq!(report.rule_type, "ITF");
    let calib = report.calib.expect("calibration");
    assert!((calib.fy() - 800.0).abs() < 0.1);

    for name in ["baseline", "serveline", "netline", "left_single_sideline"] {
        let csv = fs::read_to_string(lines_dir.join(format!("{name}.csv"))).unwrap();
        assert!(csv.starts_with("x,y\n"), "{name}");
    }
}

#[test]
fn failed_calibration_exits_nonzero_with_error_in_report() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &[LineSegment::new(0.0, 10.0, 100.0, 10.0)]);
    let report_path = dir.path().join("report.json");

    Command::cargo_bin("court-calib")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .arg("--output")
        .arg(&report_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("insufficient line detections"));

    let report = CourtCalibReport::load_json(&report_path).unwrap();
    assert!(report.calib.is_none());
    assert!(report.error.is_some());
}

#[test]
fn missing_config_fails() {
    Command::cargo_bin("court-calib")
        .unwrap()
        .arg("--config")
        .arg("/nonexistent/court_calib_config.json")
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error:"));
}

#[test]
fn debug_stage_raises_only_that_stage() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &fragmented_segments(&broadcast_camera()));

    Command::cargo_bin("court-calib")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .arg("--output")
        .arg(dir.path().join("report.json"))
        .arg("--debug-stage")
        .arg("solve")
        .assert()
        .success()
        .stderr(predicate::str::contains("DEBUG solve] refined f"))
        .stderr(predicate::str::contains("DEBUG cluster]").not());
}

#[test]
fn unknown_debug_stage_is_rejected() {
    Command::cargo_bin("court-calib")
        .unwrap()
        .args(["--config", "config.json", "--debug-stage", "render"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("render"));
}
