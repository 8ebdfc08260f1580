use std::fs::{self, File};
use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn burn_writes_history_and_summary() {
    let dir = tempfile::tempdir().expect("tempdir");
    let csv_path = dir.path().join("pe.csv");
    let saved = dir.path().join("saved").join("pe_small.toml");

    Command::cargo_bin("burn")
        .expect("burn bin")
        .args([
            "--name",
            "pe_small",
            "--output",
            csv_path.to_str().unwrap(),
            "--save-engine",
            saved.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Engine: pe_small"))
        .stdout(predicate::str::contains("Status: completed"))
        .stdout(predicate::str::contains("Wall safety factor"));

    let history = fs::read_to_string(&csv_path).expect("history csv");
    let mut lines = history.lines();
    assert!(lines.next().unwrap().starts_with("time_s,dt_s,chamber_pressure_pa"));
    assert!(lines.count() > 7000);

    let sidecar = fs::read_to_string(dir.path().join("pe_summary.json")).expect("sidecar");
    let doc: serde_json::Value = serde_json::from_str(&sidecar).unwrap();
    assert_eq!(doc["status"], "completed");
    assert!(doc["total_impulse_n_s"].as_f64().unwrap() > 600.0);
    assert!(saved.exists());
}

#[test]
fn burn_replays_measured_oxidizer_flow() {
    let dir = tempfile::tempdir().expect("tempdir");
    let feed_path = dir.path().join("feed.csv");
    let mut file = File::create(&feed_path).expect("feed create");
    writeln!(file, "time_s,mass_flow_kg_s").unwrap();
    for i in 0..=10 {
        let t = i as f64 * 0.1;
        let flow = if i == 10 { -0.002 } else { 0.06 };
        writeln!(file, "{t},{flow}").unwrap();
    }
    drop(file);

    Command::cargo_bin("burn")
        .expect("burn bin")
        .args([
            "--engine",
            "data/engines/paraffin_small.toml",
            "--ox-flow-csv",
            feed_path.to_str().unwrap(),
            "--output",
            dir.path().join("replay.csv").to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Burn time: 1.00"));
}

#[test]
fn burn_exits_nonzero_after_strict_fault() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = fs::read_to_string("data/engines/paraffin_small.toml")
        .unwrap()
        .replace("thermo_gamma = 1.1573", "thermo_gamma = 1.0");
    let engine_path = dir.path().join("flat.toml");
    fs::write(&engine_path, engine).unwrap();
    let csv_path = dir.path().join("flat.csv");

    Command::cargo_bin("burn")
        .expect("burn bin")
        .args([
            "--engine",
            engine_path.to_str().unwrap(),
            "--output",
            csv_path.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Status: fault"));

    let history = fs::read_to_string(&csv_path).expect("history written before exit");
    assert!(history.contains("gamma_out_of_range"));
}

#[test]
fn burn_rejects_unknown_engine() {
    Command::cargo_bin("burn")
        .expect("burn bin")
        .args(["--name", "no_such_motor", "--output", "-"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no_such_motor"));
}

#[test]
fn sweep_then_plot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let csv_path = dir.path().join("sweep.csv");
    let png_path = dir.path().join("sweep.png");

    Command::cargo_bin("sweep")
        .expect("sweep bin")
        .args([
            "--name",
            "pe_small",
            "--x-param",
            "throat_radius_m",
            "--x-start",
            "0.0028",
            "--x-end",
            "0.0034",
            "--x-steps",
            "3",
            "--y-param",
            "oxidizer_volume_l",
            "--y-start",
            "0.05",
            "--y-end",
            "0.1",
            "--y-steps",
            "3",
            "--threads",
            "2",
            "--output",
            csv_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    let text = fs::read_to_string(&csv_path).expect("sweep csv");
    let mut lines = text.lines();
    assert!(
        lines
            .next()
            .unwrap()
            .starts_with("throat_radius_m,oxidizer_volume_l,status,")
    );
    assert_eq!(lines.clone().count(), 9);
    assert!(lines.all(|l| l.contains(",completed,")));

    Command::cargo_bin("sweep_plot")
        .expect("sweep_plot bin")
        .args([
            "--input",
            csv_path.to_str().unwrap(),
            "--output",
            png_path.to_str().unwrap(),
            "--metric",
            "peak_pressure_bar",
            "--width",
            "400",
            "--height",
            "300",
        ])
        .assert()
        .success();

    let metadata = fs::metadata(png_path).expect("png metadata");
    assert!(metadata.len() > 0, "PNG output should not be empty");
}

#[test]
fn sweep_rejects_unknown_parameter() {
    Command::cargo_bin("sweep")
        .expect("sweep bin")
        .args([
            "--name", "pe_small", "--x-param", "colour", "--x-start", "0", "--x-end", "1",
            "--y-param", "area_ratio", "--y-start", "5", "--y-end", "10", "--output", "-",
        ])
        .assert()
        .failure();
}

#[test]
fn size_reports_json() {
    let output = Command::cargo_bin("size")
        .expect("size bin")
        .arg("--json")
        .output()
        .expect("run size");
    assert!(output.status.success());

    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let throat = doc["motor"]["throat_area_m2"].as_f64().unwrap();
    assert!((throat - 2.6329678e-4).abs() < 1e-9);
    assert!(doc["injector"]["hole_count"].as_f64().unwrap() > 0.0);
}

#[test]
fn burn_rejects_negative_deadline() {
    let dir = tempfile::tempdir().expect("tempdir");
    let csv_path = dir.path().join("pe.csv");

    Command::cargo_bin("burn")
        .expect("burn bin")
        .args([
            "--name",
            "pe_small",
            "--output",
            csv_path.to_str().unwrap(),
            "--deadline-s=-1",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid --deadline-s"));
    assert!(!csv_path.exists());
}
