use std::process::{Command, Output};

use graft_test_utils::*;

fn graft(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_graft"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("spawn graft")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_install_then_verify() {
    let fixture = ProjectFixture::new();
    fixture.write_extension_sources(EXTENSION_NAME);
    let project = fixture.bundle().to_str().unwrap().to_string();

    let output = graft(&["install", "--project", &project, "--host", HOST_TARGET, "--json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["extension"], EXTENSION_NAME);
    assert_eq!(report["target"]["created"], true);
    assert_eq!(report["graph_written"], true);

    let output = graft(&["verify", "--project", &project]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Integrity: VALID"));
}

#[test]
fn test_second_install_reports_unchanged() {
    let fixture = ProjectFixture::new();
    fixture.write_extension_sources(EXTENSION_NAME);
    let project = fixture.bundle().to_str().unwrap().to_string();

    assert!(graft(&["install", "-p", &project, "--host", HOST_TARGET]).status.success());
    let before = fixture.read_pbxproj();
    let output = graft(&["install", "-p", &project, "--host", HOST_TARGET, "--mode", "full"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Project: unchanged"));
    assert_eq!(fixture.read_pbxproj(), before);
}

#[test]
fn test_dry_run_leaves_project_alone() {
    let fixture = ProjectFixture::new();
    fixture.write_extension_sources(EXTENSION_NAME);
    let project = fixture.bundle().to_str().unwrap().to_string();

    let output = graft(&["install", "-p", &project, "--host", HOST_TARGET, "--dry-run"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Project: would be written"));
    assert_eq!(fixture.read_pbxproj(), HOST_APP_PBXPROJ);
}

#[test]
fn test_missing_host_fails() {
    let fixture = ProjectFixture::new();
    let project = fixture.bundle().to_str().unwrap().to_string();

    let output = graft(&["install", "-p", &project, "--host", "Nope"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("host target 'Nope' not found"));
    assert_eq!(fixture.read_pbxproj(), HOST_APP_PBXPROJ);
}

#[test]
fn test_config_file_supplies_host() {
    let fixture = ProjectFixture::new();
    fixture.write_extension_sources(EXTENSION_NAME);
    fixture.write(
        "graft.toml",
        &format!(
            "project = {:?}\nhost_target = \"{HOST_TARGET}\"\nmode = \"full\"\n\n[capabilities]\ngroups = [\"group.a\"]\n",
            fixture.bundle()
        ),
    );
    let config = fixture.root().join("graft.toml");

    let output = graft(&["install", "--config", config.to_str().unwrap(), "--json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["mode"], "full");
    assert_eq!(report["capability"]["groups"], serde_json::json!(["group.a"]));
}
