//! Smoke tests -- verify the binary runs and key subcommands exist.

use assert_cmd::Command;

#[test]
fn test_cli_help() {
    Command::cargo_bin("offboardd")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains(
            "Multi-tenant scheduled identity-lifecycle action engine",
        ));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("offboardd")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains("offboardd"));
}

#[test]
fn test_serve_subcommand_exists() {
    Command::cargo_bin("offboardd")
        .unwrap()
        .args(["serve", "--help"])
        .assert()
        .success();
}

#[test]
fn test_schedule_list_subcommand_exists() {
    Command::cargo_bin("offboardd")
        .unwrap()
        .args(["schedule", "list", "--help"])
        .assert()
        .success();
}

#[test]
fn test_configured_log_level_is_accepted() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("offboardd.toml");
    std::fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();

    Command::cargo_bin("offboardd")
        .unwrap()
        .env("OFFBOARDD_CONFIG", &path)
        .env_remove("RUST_LOG")
        .arg("templates")
        .assert()
        .success()
        .stdout(predicates::str::contains("standard-offboard"));
}

#[test]
fn test_templates_lists_builtin_catalog() {
    Command::cargo_bin("offboardd")
        .unwrap()
        .arg("templates")
        .assert()
        .success()
        .stdout(predicates::str::contains("standard-offboard"));
}
