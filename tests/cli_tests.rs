//! # CLI Tests
//!
//! Smoke tests for the `openai-script` binary: validate and run
//! subcommands, error reporting with fix suggestions.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

fn write_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("openai-script").unwrap();
    // Steps under test carry their own credentials
    cmd.env_remove("OPENAI_API_KEY");
    cmd
}

#[test]
fn validate_accepts_a_well_formed_step() {
    let step = write_file(
        r##"
credentials:
  api_key: test-key
mode: per-record
script: "#{ok: true}"
"##,
    );

    cli()
        .arg("validate")
        .arg(step.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"))
        .stdout(predicate::str::contains("PerRecord"));
}

#[test]
fn validate_rejects_a_missing_api_key() {
    let step = write_file(
        r##"
script: "#{ok: true}"
"##,
    );

    cli()
        .arg("validate")
        .arg(step.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("OAS-001"))
        .stderr(predicate::str::contains("Fix:"));
}

#[test]
fn validate_rejects_an_empty_script() {
    let step = write_file(
        r##"
credentials:
  api_key: test-key
script: "  "
"##,
    );

    cli()
        .arg("validate")
        .arg(step.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("OAS-002"));
}

#[test]
fn validate_reports_compile_errors_without_executing() {
    let step = write_file(
        r##"
credentials:
  api_key: test-key
script: "#{"
"##,
    );

    cli()
        .arg("validate")
        .arg(step.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("OAS-010"));
}

#[test]
fn run_emits_normalized_records_as_json() {
    let step = write_file(
        r##"
credentials:
  api_key: test-key
script: "#{ok: true}"
"##,
    );

    cli()
        .arg("run")
        .arg(step.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"[{"json":{"ok":true}}]"#));
}

#[test]
fn run_reads_records_from_a_file() {
    let step = write_file(
        r##"
credentials:
  api_key: test-key
mode: per-record
script: "#{idx: item.json.index}"
"##,
    );
    let records = write_file(r#"[{"json": {"index": 0}}, {"json": {"index": 1}}]"#);

    cli()
        .arg("run")
        .arg(step.path())
        .arg("--records")
        .arg(records.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            r#"[{"json":{"idx":0}},{"json":{"idx":1}}]"#,
        ));
}

#[test]
fn run_reports_script_errors_with_the_record_index() {
    let step = write_file(
        r##"
credentials:
  api_key: test-key
mode: per-record
script: "throw \"boom\""
"##,
    );
    let records = write_file(r#"[{"json": {}}]"#);

    cli()
        .arg("run")
        .arg(step.path())
        .arg("--records")
        .arg(records.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("OAS-020"))
        .stderr(predicate::str::contains("[item 0]"));
}
