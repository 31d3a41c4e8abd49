use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn platforms_lists_supported_sources() {
    Command::cargo_bin("linkscribe")
        .unwrap()
        .arg("platforms")
        .assert()
        .success()
        .stdout(predicate::str::contains("YouTube"))
        .stdout(predicate::str::contains("Podcasts"));
}

#[test]
fn help_shows_resolve_command() {
    Command::cargo_bin("linkscribe")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("platforms"));
}

#[test]
fn unknown_subcommand_fails() {
    Command::cargo_bin("linkscribe")
        .unwrap()
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}
