use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn format_respects_markdown_config() {
    let dir = tempdir().unwrap();
    let input_path = dir.path().join("list.md");
    fs::write(&input_path, "* a\n* b\n").unwrap();

    let config_path = dir.path().join("vmark.toml");
    fs::write(
        &config_path,
        r#"[pipeline]
use_ast_pipeline = true

[markdown]
bullet_marker = "+"
"#,
    )
    .unwrap();

    let mut cmd = cargo_bin_cmd!("vmark");
    cmd.arg("format")
        .arg(input_path.as_os_str())
        .arg("--config")
        .arg(config_path.as_os_str());

    cmd.assert().success().stdout("+ a\n+ b\n");
}

#[test]
fn format_extra_params_override_config() {
    let dir = tempdir().unwrap();
    let input_path = dir.path().join("doc.md");
    fs::write(&input_path, "*a*\n\n---\n").unwrap();

    let mut cmd = cargo_bin_cmd!("vmark");
    cmd.arg("format")
        .arg(input_path.as_os_str())
        .arg("--ast-pipeline")
        .arg("--extra-emphasis-marker")
        .arg("_");

    cmd.assert().success().stdout("_a_\n\n***\n");
}

#[test]
fn format_rejects_invalid_config() {
    let dir = tempdir().unwrap();
    let input_path = dir.path().join("doc.md");
    fs::write(&input_path, "text\n").unwrap();
    let config_path = dir.path().join("vmark.toml");
    fs::write(&config_path, "[markdown]\nbullet_marker = \"x\"\n").unwrap();

    let mut cmd = cargo_bin_cmd!("vmark");
    cmd.arg("format")
        .arg(input_path.as_os_str())
        .arg("--config")
        .arg(config_path.as_os_str());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}
