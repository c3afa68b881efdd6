use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Helper to create a test command isolated from the caller's environment
fn msspctl() -> Command {
    let mut cmd = Command::cargo_bin("msspctl").unwrap();
    cmd.env_remove("MSSPCTL_PROFILE")
        .env_remove("MSSPCTL_CONFIG_FILE")
        .env_remove("SCCFM_API_TOKEN")
        .env_remove("SCCFM_REGION")
        .env_remove("RUST_LOG");
    cmd
}

/// Command with `--config-file` pointing into a fresh temp dir
fn msspctl_with_config(dir: &TempDir) -> Command {
    let mut cmd = msspctl();
    cmd.arg("--config-file").arg(dir.path().join("config.toml"));
    cmd
}

#[test]
fn test_help_flag() {
    msspctl()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("MSSP tenant operations"))
        .stdout(predicate::str::contains("EXAMPLES:"));
}

#[test]
fn test_help_short_flag() {
    msspctl()
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn test_version_flag() {
    msspctl()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("msspctl"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_version_command_json() {
    let dir = TempDir::new().unwrap();
    msspctl_with_config(&dir)
        .args(["version", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"version\""));
}

#[test]
fn test_no_args_shows_help() {
    msspctl()
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_invalid_subcommand() {
    msspctl()
        .arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_tenant_help() {
    msspctl()
        .args(["tenant", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("provision-cdfmc"))
        .stdout(predicate::str::contains("add-users"));
}

#[test]
fn test_upgrade_start_requires_version() {
    msspctl()
        .args(["upgrade", "start", "--device-uid", "d-1"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--version"));
}

#[test]
fn test_profile_lifecycle() {
    let dir = TempDir::new().unwrap();

    msspctl_with_config(&dir)
        .args(["profile", "set", "acme", "--region", "eu", "--api-token", "abcd1234secret"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Profile 'acme' created"))
        .stdout(predicate::str::contains("Set as default profile"));

    msspctl_with_config(&dir)
        .args(["profile", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("acme"))
        .stdout(predicate::str::contains("https://api.eu.security.cisco.com/firewall"));

    msspctl_with_config(&dir)
        .args(["profile", "show", "acme"])
        .assert()
        .success()
        .stdout(predicate::str::contains("abcd..."))
        .stdout(predicate::str::contains("secret").not());

    msspctl_with_config(&dir)
        .args(["profile", "remove", "acme"])
        .assert()
        .success();

    msspctl_with_config(&dir)
        .args(["profile", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No profiles configured"));
}

#[test]
fn test_profile_set_keeps_existing_token() {
    let dir = TempDir::new().unwrap();

    msspctl_with_config(&dir)
        .args(["profile", "set", "lab", "--region", "us", "--api-token", "tok-1"])
        .assert()
        .success();
    msspctl_with_config(&dir)
        .args(["profile", "set", "lab", "--region", "eu"])
        .assert()
        .success()
        .stdout(predicate::str::contains("updated"));

    let contents = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(contents.contains("tok-1"));
    assert!(contents.contains("eu"));
}

#[test]
fn test_profile_list_json() {
    let dir = TempDir::new().unwrap();
    msspctl_with_config(&dir)
        .args(["profile", "set", "a", "--region", "us"])
        .assert()
        .success();

    let output = msspctl_with_config(&dir)
        .args(["profile", "list", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["count"], 1);
    assert_eq!(json["profiles"][0]["name"], "a");
    assert_eq!(json["profiles"][0]["token_configured"], false);
}

#[test]
fn test_show_missing_profile_exits_with_config_code() {
    let dir = TempDir::new().unwrap();
    msspctl_with_config(&dir)
        .args(["profile", "show", "nope"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Profile 'nope' not found"));
}

#[test]
fn test_command_without_profile_exits_with_config_code() {
    let dir = TempDir::new().unwrap();
    msspctl_with_config(&dir)
        .args(["transaction", "wait", "tx-1"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("No profile configured"));
}

#[test]
fn test_config_file_ignores_token_env_var() {
    let dir = TempDir::new().unwrap();
    msspctl_with_config(&dir)
        .args(["profile", "set", "notoken", "--region", "us"])
        .assert()
        .success();

    msspctl_with_config(&dir)
        .env("SCCFM_API_TOKEN", "from-env")
        .args(["transaction", "wait", "tx-1"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Missing API token"));
}

#[test]
fn test_corrupt_config_file_is_reported() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.toml"), "this is [not toml").unwrap();

    msspctl_with_config(&dir)
        .args(["profile", "list"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("could not load configuration"));
}
