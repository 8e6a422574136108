#![allow(missing_docs)]

use std::fs;
use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

fn write_config(contents: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("filter.toml");
    fs::write(&path, contents).expect("write config");
    (dir, path)
}

fn command(config_home: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("sombra-filter");
    cmd.env_remove("SOMBRA_FILTER_CONFIG")
        .env_remove("SOMBRA_FILTER_LOG")
        .env("XDG_CONFIG_HOME", config_home.path())
        .env("HOME", config_home.path());
    cmd
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn translate_prints_fragment() {
    let home = TempDir::new().expect("tempdir");
    let output = command(&home)
        .args(["--collection", "addresses", "translate"])
        .arg(r#"p => p.firstName.equals("yaser") && p.addresses.any(a => a.city == p.lastName)"#)
        .assert()
        .success()
        .get_output()
        .clone();
    assert_eq!(
        stdout_of(&output),
        "(p.firstName = 'yaser' and size([a in p.addresses where (a.city = p.lastName)]) > 0)\n"
    );
}

#[test]
fn translate_json_format() {
    let home = TempDir::new().expect("tempdir");
    let output = command(&home)
        .args(["--format", "json", "translate", "p.grade > 3"])
        .assert()
        .success()
        .get_output()
        .clone();
    let parsed: serde_json::Value =
        serde_json::from_str(stdout_of(&output).trim()).expect("json output");
    assert_eq!(parsed, serde_json::json!({"query": "(p.grade > 3)"}));
}

#[test]
fn config_supplies_subject_captures_and_collections() {
    let (_dir, path) = write_config(
        r#"
[subject]
param = "u"
collections = ["tags"]

[captures]
user = { id = 7, name = "sara" }

[context]
current_user = "sara"
"#,
    );
    let home = TempDir::new().expect("tempdir");
    let output = command(&home)
        .arg("--config")
        .arg(&path)
        .args(["translate", "u.tags.contains($user.id) && u.owner == $user.name"])
        .assert()
        .success()
        .get_output()
        .clone();
    assert_eq!(stdout_of(&output), "(7 In u.tags and (u.owner = 'sara'))\n");
}

#[test]
fn config_path_from_environment() {
    let (_dir, path) = write_config("[subject]\nparam = \"x\"\n");
    let home = TempDir::new().expect("tempdir");
    let output = command(&home)
        .env("SOMBRA_FILTER_CONFIG", &path)
        .args(["translate", "x.a == 1"])
        .assert()
        .success()
        .get_output()
        .clone();
    assert_eq!(stdout_of(&output), "(x.a = 1)\n");
}

#[test]
fn missing_explicit_config_fails() {
    let home = TempDir::new().expect("tempdir");
    let output = command(&home)
        .arg("--config")
        .arg(home.path().join("absent.toml"))
        .args(["translate", "p.a == 1"])
        .assert()
        .failure()
        .get_output()
        .clone();
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
}

#[test]
fn parse_errors_exit_non_zero() {
    let home = TempDir::new().expect("tempdir");
    let output = command(&home)
        .args(["translate", "q.a == 1"])
        .assert()
        .failure()
        .get_output()
        .clone();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown identifier 'q'"), "stderr: {stderr}");
}

#[test]
fn translation_errors_carry_code() {
    let home = TempDir::new().expect("tempdir");
    let output = command(&home)
        .args(["translate", "p.name.toUpper() == 'X'"])
        .assert()
        .failure()
        .get_output()
        .clone();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[UnsupportedOperator]"), "stderr: {stderr}");
}

#[test]
fn repl_translates_until_quit() {
    let home = TempDir::new().expect("tempdir");
    let output = command(&home)
        .arg("repl")
        .write_stdin("p.grade > 3\n\np.grade ==\npdate('1400/01/01') == p.d\nq\np.never == 1\n")
        .assert()
        .success()
        .get_output()
        .clone();
    assert_eq!(
        stdout_of(&output),
        "query is: (p.grade > 3)\nquery is: ('2021-03-21T00:00:00' = p.d)\n"
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: expected expression"), "stderr: {stderr}");
}

#[test]
fn deeply_nested_input_is_rejected() {
    let home = TempDir::new().expect("tempdir");
    let expr = format!("{}p.a == 1{}", "(".repeat(20_000), ")".repeat(20_000));
    let output = command(&home)
        .args(["translate", &expr])
        .assert()
        .failure()
        .get_output()
        .clone();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("nests deeper than"), "stderr: {stderr}");
}
