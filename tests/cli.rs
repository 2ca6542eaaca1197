use assert_cmd::Command;
use std::io::Write;

fn exporter() -> Command {
    let mut cmd = Command::cargo_bin("unvr-exporter").unwrap();
    cmd.env_remove("UNVR_EXPORTER_CONFIG")
        .env_remove("UNVR_EXPORTER_ADDRESS")
        .env_remove("UNVR_EXPORTER_PORT");
    cmd
}

fn stderr_of(cmd: &mut Command) -> String {
    let output = cmd.assert().failure().get_output().clone();
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_help_lists_options() {
    let output = exporter().arg("--help").assert().success().get_output().clone();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--config"));
    assert!(stdout.contains("--staleness-secs"));
}

#[test]
fn test_missing_config_file_fails() {
    let stderr = stderr_of(exporter().args(["--config", "/nonexistent/unvr.toml"]));
    assert!(stderr.contains("failed to read /nonexistent/unvr.toml"), "{stderr}");
}

#[test]
fn test_config_without_devices_fails() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "port = 9999").unwrap();

    let path = file.path().to_str().unwrap().to_string();
    let stderr = stderr_of(exporter().args(["--config", &path]));
    assert!(stderr.contains("no devices configured"), "{stderr}");
}

#[test]
fn test_invalid_toml_fails() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[devices.office\nhost = ").unwrap();

    let path = file.path().to_str().unwrap().to_string();
    let stderr = stderr_of(exporter().args(["--config", &path]));
    assert!(stderr.contains("failed to parse"), "{stderr}");
}
