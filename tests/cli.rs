mod common;

use assert_cmd::Command;
use common::TestWorkspace;
use predicates::prelude::*;
use predicates::str::contains;

fn rowglaze() -> Command {
    Command::cargo_bin("rowglaze").expect("binary exists")
}

const PEOPLE_CSV: &str = "name,age,city\nada,36,london\ngrace,85,nyc\nalan,41,wilmslow\n";

#[test]
fn process_csv_to_csv_with_sort_and_fields() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("people.csv", PEOPLE_CSV);
    rowglaze()
        .args([
            "process",
            "-i",
            input.to_str().unwrap(),
            "--",
            "--fields",
            "age,name",
            "--sort-by",
            "-age",
            "-o",
            "csv",
        ])
        .assert()
        .success()
        .stdout("age,name\n85,grace\n41,alan\n36,ada\n");
}

#[test]
fn process_reads_stdin_json_and_writes_json() {
    rowglaze()
        .args(["process", "--input-format", "json", "--", "--output", "json", "--limit", "1"])
        .write_stdin(r#"[{"id":1,"tags":{"a":true}},{"id":2}]"#)
        .assert()
        .success()
        .stdout(contains("\"id\": 1").and(contains("\"tags\"")).and(contains("\"id\": 2").not()));
}

#[test]
fn table_output_flattens_nested_records() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("nested.jsonl", "{\"user\":{\"name\":\"ada\"},\"n\":1}\n");
    rowglaze()
        .args(["process", "-i", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("user.name").and(contains("ada")));
}

#[test]
fn config_values_sit_between_defaults_and_flags() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("people.csv", PEOPLE_CSV);
    let config = workspace.write("config.yaml", "output: csv\nfields: [name]\nlimit: 2\n");
    rowglaze()
        .args([
            "process",
            "-i",
            input.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
            "--",
            "--limit",
            "1",
        ])
        .assert()
        .success()
        .stdout("name\nada\n");
}

#[test]
fn bad_pipeline_values_fail_with_context() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("people.csv", PEOPLE_CSV);
    rowglaze()
        .args(["process", "-i", input.to_str().unwrap(), "--", "--limit", "many"])
        .assert()
        .failure()
        .stderr(contains("error: Parsing pipeline flags"));

    rowglaze()
        .args(["process", "-i", input.to_str().unwrap(), "--", "--no-such-flag"])
        .assert()
        .failure()
        .stderr(contains("Unknown flag: --no-such-flag"));
}

#[test]
fn extra_definitions_are_accepted_after_the_terminator() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("people.csv", PEOPLE_CSV);
    let definitions = workspace.write(
        "extra.yaml",
        "- name: region\n  type: choice\n  choices: [eu, us]\n  default: eu\n",
    );
    rowglaze()
        .args([
            "process",
            "-i",
            input.to_str().unwrap(),
            "--definitions",
            definitions.to_str().unwrap(),
            "--",
            "--region",
            "us",
            "-o",
            "tsv",
            "--fields",
            "city",
        ])
        .assert()
        .success()
        .stdout("city\nlondon\nnyc\nwilmslow\n");
}

#[test]
fn params_lists_builtin_and_document_definitions() {
    rowglaze()
        .arg("params")
        .assert()
        .success()
        .stdout(contains("replace-file").and(contains("stringFromFile")));

    let workspace = TestWorkspace::new();
    let document = workspace.write(
        "defs.yaml",
        "flags:\n  - name: count\n    type: int\n    default: 5\n    help: How many\n",
    );
    rowglaze()
        .args(["params", document.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("count").and(contains("integer")).and(contains("How many")));
}
