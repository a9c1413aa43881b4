use assert_cmd::Command;

#[test]
fn cli_help_smoke() {
    let mut cmd = Command::cargo_bin("kira-deadlineqc").unwrap();
    cmd.arg("--help");
    cmd.assert().success();
}

#[test]
fn config_show_prints_builtin_defaults() {
    let mut cmd = Command::cargo_bin("kira-deadlineqc").unwrap();
    cmd.arg("config").arg("show");
    let output = cmd.assert().success().get_output().stdout.clone();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["day_threshold"], 30);
    assert_eq!(value["checkpoint_interval"], 10);
    assert_eq!(value["terminal_phases"][0], "integrado");
}
