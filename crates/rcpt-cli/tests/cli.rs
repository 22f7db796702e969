use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const ACME: &str = "ACME STORE\n2024-01-15\nCoffee 2 3.50 7.00\nSubtotal: 7.00\nTax: 0.70\nTotal: 7.70\n";

/// A command with no ambient API key and an empty config file.
fn rcpt(dir: &Path) -> Command {
    let config = dir.join("config.json");
    if !config.exists() {
        fs::write(&config, "{}").unwrap();
    }

    let mut cmd = Command::cargo_bin("rcpt").unwrap();
    cmd.env_remove("GEMINI_API_KEY")
        .arg("--config")
        .arg(&config);
    cmd
}

fn parse_stdout(output: &[u8]) -> serde_json::Value {
    serde_json::from_slice(output).unwrap()
}

#[test]
fn test_process_fallback_json() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("acme.txt");
    fs::write(&input, ACME).unwrap();

    let output = rcpt(dir.path())
        .args(["process", "--no-ai"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json = parse_stdout(&output.stdout);
    assert_eq!(json["extraction_method"], "FALLBACK");
    assert_eq!(json["merchant_name"], "ACME STORE");
    assert_eq!(json["purchased_at"], "2024-01-15T00:00:00");
    assert_eq!(json["total_amount"], "7.70");
    assert_eq!(json["subtotal"], "7.00");
    assert_eq!(json["tax_amount"], "0.70");
    assert_eq!(json["items"][0]["item_name"], "Coffee");
    assert_eq!(json["items"][0]["quantity"], "2");
    assert_eq!(json["raw_text"], ACME);
}

#[test]
fn test_process_without_key_uses_fallback() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("acme.txt");
    fs::write(&input, ACME).unwrap();

    let output = rcpt(dir.path())
        .arg("process")
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(parse_stdout(&output.stdout)["extraction_method"], "FALLBACK");
}

#[test]
fn test_process_stdin() {
    let dir = TempDir::new().unwrap();

    rcpt(dir.path())
        .args(["process", "-", "--no-ai", "-f", "text"])
        .write_stdin(ACME)
        .assert()
        .success()
        .stdout(predicate::str::contains("Merchant: ACME STORE"))
        .stdout(predicate::str::contains("Extracted by: FALLBACK"));
}

#[test]
fn test_process_csv_to_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("acme.txt");
    let out = dir.path().join("acme.csv");
    fs::write(&input, ACME).unwrap();

    rcpt(dir.path())
        .args(["process", "--no-ai", "-f", "csv", "-o"])
        .arg(&out)
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Output written to"));

    let csv = fs::read_to_string(&out).unwrap();
    assert!(csv.starts_with("merchant_name,purchased_at,total_amount"));
    assert!(csv.contains("ACME STORE,2024-01-15 00:00:00,7.70,7.00,0.70"));
}

#[test]
fn test_process_empty_input_fails() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("blank.txt");
    fs::write(&input, "  \n\t\n").unwrap();

    rcpt(dir.path())
        .args(["process", "--no-ai"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("raw text is empty"));
}

#[test]
fn test_process_missing_file_fails() {
    let dir = TempDir::new().unwrap();

    rcpt(dir.path())
        .args(["process", "--no-ai"])
        .arg(dir.path().join("nope.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_process_validate_reports_issues() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("off.txt");
    fs::write(&input, "SHOP\nSubtotal: 10.00\nTax: 1.00\nTotal: 15.00\n").unwrap();

    rcpt(dir.path())
        .args(["process", "--no-ai", "--validate"])
        .arg(&input)
        .assert()
        .success()
        .stderr(predicate::str::contains("Validation issues:"))
        .stderr(predicate::str::contains("differs from total"));
}

#[test]
fn test_batch_with_summary() {
    let dir = TempDir::new().unwrap();
    let inbox = dir.path().join("inbox");
    let out = dir.path().join("out");
    fs::create_dir_all(&inbox).unwrap();
    fs::write(inbox.join("acme.txt"), ACME).unwrap();
    fs::write(inbox.join("cafe.txt"), "CORNER CAFE\nLatte 4.50\nTotal: 4.50\n").unwrap();
    fs::write(inbox.join("blank.txt"), "   \n").unwrap();

    rcpt(dir.path())
        .args(["batch", "--no-ai", "--summary", "--continue-on-error", "-j", "2"])
        .arg(format!("{}/*.txt", inbox.display()))
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 3 files"))
        .stdout(predicate::str::contains("Failed files:"));

    let acme: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("acme.json")).unwrap()).unwrap();
    assert_eq!(acme["merchant_name"], "ACME STORE");
    assert!(out.join("cafe.json").exists());
    assert!(!out.join("blank.json").exists());

    let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("filename,status,merchant_name"));
    assert!(lines[1].starts_with("acme.txt,success,ACME STORE"));
    assert!(lines[2].starts_with("blank.txt,error"));
    assert!(lines[3].starts_with("cafe.txt,success,CORNER CAFE"));
}

#[test]
fn test_batch_stops_on_error() {
    let dir = TempDir::new().unwrap();
    let inbox = dir.path().join("inbox");
    fs::create_dir_all(&inbox).unwrap();
    fs::write(inbox.join("blank.txt"), "").unwrap();

    rcpt(dir.path())
        .args(["batch", "--no-ai"])
        .arg(format!("{}/*.txt", inbox.display()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Processing failed"));
}

#[test]
fn test_batch_no_matches() {
    let dir = TempDir::new().unwrap();

    rcpt(dir.path())
        .args(["batch", "--no-ai"])
        .arg(format!("{}/*.txt", dir.path().join("empty").display()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching files"));
}

#[test]
fn test_config_init_set_get() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("settings").join("config.json");

    let mut cmd = Command::cargo_bin("rcpt").unwrap();
    cmd.args(["config", "init", "--output"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration file"));

    let mut cmd = Command::cargo_bin("rcpt").unwrap();
    cmd.arg("--config")
        .arg(&config)
        .args(["config", "set", "fallback.totals_tie_break", "first"])
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("rcpt").unwrap();
    cmd.arg("--config")
        .arg(&config)
        .args(["config", "get", "fallback.totals_tie_break"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"first\""));

    let mut cmd = Command::cargo_bin("rcpt").unwrap();
    cmd.arg("--config")
        .arg(&config)
        .args(["config", "set", "fallback.totals_tie_break", "middle"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid value"));
}

#[test]
fn test_config_tie_break_applies_to_process() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("twice.txt");
    fs::write(&input, "Total: 10.00\nTotal: 12.50\n").unwrap();
    fs::write(
        dir.path().join("config.json"),
        r#"{"fallback": {"totals_tie_break": "first"}}"#,
    )
    .unwrap();

    let output = rcpt(dir.path())
        .args(["process", "--no-ai"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(parse_stdout(&output.stdout)["total_amount"], "10.00");
}

#[test]
fn test_malformed_config_is_reported() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("acme.txt");
    fs::write(&input, ACME).unwrap();
    fs::write(dir.path().join("config.json"), "{ not json").unwrap();

    rcpt(dir.path())
        .args(["process", "--no-ai"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration error"));
}

#[test]
fn test_config_path() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");

    let mut cmd = Command::cargo_bin("rcpt").unwrap();
    cmd.arg("--config")
        .arg(&config)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file:"))
        .stdout(predicate::str::contains("not created"));
}
