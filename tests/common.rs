use assert_cmd::cargo_bin_cmd;

/// Run the program with the given arguments and check that it succeeds
pub fn assert_heatcommit_runs(args: &[&str]) {
    cargo_bin_cmd!("heatcommit")
        .env("HEATCOMMIT_USE_DEFAULT_SETTINGS", "1")
        .args(args)
        .assert()
        .success();
}

/// Run the program with the given arguments and return what it wrote to stdout
#[allow(dead_code)]
pub fn get_heatcommit_stdout(args: &[&str]) -> String {
    let output = cargo_bin_cmd!("heatcommit")
        .env("HEATCOMMIT_USE_DEFAULT_SETTINGS", "1")
        .env("HEATCOMMIT_LOG_LEVEL", "off")
        .args(args)
        .output()
        .unwrap();
    assert!(output.status.success());

    String::from_utf8(output.stdout).unwrap()
}
