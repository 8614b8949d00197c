//! End-to-end scenarios run through the actual `charis` binary, driving
//! file-mode interpretation the way a user would invoke it.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn script(source: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp script");
    write!(file, "{source}").expect("write temp script");
    file
}

fn charis() -> Command {
    Command::cargo_bin("charis").expect("find charis binary")
}

#[test]
fn arithmetic_with_negation_and_precedence() {
    let file = script("(-1 + 2) * 3 - -4");
    charis()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("7"));
}

#[test]
fn logical_not_on_null() {
    let file = script("!null");
    charis()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("true"));
}

#[test]
fn equality_coerces_booleans_to_numbers() {
    let file = script("1 == true");
    charis()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("true"));
}

#[test]
fn chained_comparison_and_equality() {
    let file = script("1 < 2 == true");
    charis()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("true"));
}

#[test]
fn negating_a_boolean_is_a_runtime_error() {
    let file = script("-true");
    charis()
        .arg(file.path())
        .assert()
        .code(70)
        .stderr(predicate::str::contains("Operand must be a number."))
        .stderr(predicate::str::contains("[line 1]"));
}

#[test]
fn unclosed_grouping_is_a_compile_error() {
    let file = script("(");
    charis()
        .arg(file.path())
        .assert()
        .code(65)
        .stderr(predicate::str::contains("Expect expression."));
}

#[test]
fn ternary_parses_without_error() {
    let file = script("true ? 1 : 2");
    charis().arg(file.path()).assert().success();
}

#[test]
fn missing_file_is_a_file_io_failure() {
    charis().arg("/no/such/file.cha").assert().code(74);
}
