//! End-to-end tests of the addonpm binary
//!
//! Every command runs against a fresh temp project with its own config
//! directory, so no user configuration leaks in. Nothing here needs git or
//! network access.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn setup_test_project() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

fn addonpm_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_addonpm"));
    cmd.current_dir(dir);
    cmd.env("ADDONPM_CONFIG_DIR", dir.join(".addonpm-config"));
    cmd.env_remove("ADDONPM_GIT");
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let temp = setup_test_project();

    addonpm_cmd(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("cache"));
}

#[test]
fn test_init_creates_template() {
    let temp = setup_test_project();

    addonpm_cmd(temp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    let manifest = temp.path().join("addons.jsonc");
    assert!(manifest.exists());
    assert!(fs::read_to_string(manifest).unwrap().contains("\"addons\""));
}

#[test]
fn test_init_keeps_existing_manifest() {
    let temp = setup_test_project();
    let manifest = temp.path().join("addons.json");
    fs::write(&manifest, r#"{ "addons": {} }"#).unwrap();

    addonpm_cmd(temp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    assert_eq!(fs::read_to_string(&manifest).unwrap(), r#"{ "addons": {} }"#);
    assert!(!temp.path().join("addons.jsonc").exists());
}

#[test]
fn test_install_without_addons() {
    let temp = setup_test_project();
    fs::write(temp.path().join("addons.json"), r#"{ "addons": {} }"#).unwrap();

    addonpm_cmd(temp.path())
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("No addons to install"));

    // Directories are created even when there is nothing to install
    assert!(temp.path().join(".addons").is_dir());
    assert!(temp.path().join("addons").is_dir());
}

#[test]
fn test_install_after_init() {
    let temp = setup_test_project();

    addonpm_cmd(temp.path()).arg("init").assert().success();
    addonpm_cmd(temp.path())
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("No addons to install"));
}

#[test]
fn test_install_with_path_argument() {
    let temp = setup_test_project();
    let project = temp.path().join("game");
    fs::create_dir_all(&project).unwrap();
    fs::write(
        project.join("addons.json"),
        r#"{ "addons": {}, "cache": "deps-cache", "path": "deps" }"#,
    )
    .unwrap();

    addonpm_cmd(temp.path())
        .args(["install", "--path", "game"])
        .assert()
        .success();

    assert!(project.join("deps-cache").is_dir());
    assert!(project.join("deps").is_dir());
}

#[test]
fn test_install_invalid_manifest_fails() {
    let temp = setup_test_project();
    fs::write(temp.path().join("addons.json"), "{ \"addons\": ").unwrap();

    addonpm_cmd(temp.path())
        .arg("install")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_install_missing_override_manifest() {
    let temp = setup_test_project();
    fs::write(
        temp.path().join("addons.json"),
        r#"{ "addons": { "x": { "url": "../x", "source": "symlink" } } }"#,
    )
    .unwrap();

    // The override is the only candidate, so addons.json is ignored
    addonpm_cmd(temp.path())
        .args(["install", "--file", "other.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No addons to install"));
}

#[cfg(unix)]
#[test]
fn test_install_symlink_addon() {
    let temp = setup_test_project();
    let project = temp.path().join("game");
    let local = temp.path().join("shared").join("ui");
    fs::create_dir_all(&project).unwrap();
    fs::create_dir_all(&local).unwrap();
    fs::write(local.join("plugin.cfg"), "[plugin]").unwrap();
    fs::write(
        project.join("addons.json"),
        r#"{ "addons": { "ui": { "url": "../shared/ui", "source": "symlink" } } }"#,
    )
    .unwrap();

    addonpm_cmd(&project)
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("Addons installed successfully"));

    let link = project.join("addons").join("ui");
    assert!(fs::symlink_metadata(&link)
        .unwrap()
        .file_type()
        .is_symlink());
    assert_eq!(
        fs::read_to_string(link.join("plugin.cfg")).unwrap(),
        "[plugin]"
    );

    // Reinstalling replaces the link
    addonpm_cmd(&project).arg("install").assert().success();
    assert!(link.join("plugin.cfg").exists());
}

#[cfg(unix)]
#[test]
fn test_install_name_collision_exits_with_code_2() {
    let temp = setup_test_project();
    let project = temp.path().join("game");
    let first = temp.path().join("first");
    let second = temp.path().join("second");
    fs::create_dir_all(&project).unwrap();
    fs::create_dir_all(&first).unwrap();
    fs::create_dir_all(&second).unwrap();
    fs::write(
        project.join("addons.json"),
        r#"{ "addons": { "lib": { "url": "../first", "source": "symlink" } } }"#,
    )
    .unwrap();
    fs::write(
        first.join("addons.json"),
        r#"{ "addons": { "lib": { "url": "../second", "source": "symlink" } } }"#,
    )
    .unwrap();

    addonpm_cmd(&project)
        .arg("install")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Cannot resolve"))
        .stdout(predicate::str::contains("nothing was installed"));

    assert!(!project.join("addons").join("lib").exists());
}

#[test]
fn test_cache_path_uses_manifest_setting() {
    let temp = setup_test_project();
    fs::write(
        temp.path().join("addons.json"),
        r#"{ "addons": {}, "cache": "vendor/cache" }"#,
    )
    .unwrap();

    addonpm_cmd(temp.path())
        .args(["cache", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cache"))
        .stdout(predicate::str::contains("vendor"));
}

#[test]
fn test_cache_clean_removes_cache() {
    let temp = setup_test_project();
    let slot = temp.path().join(".addons").join("some-addon");
    fs::create_dir_all(&slot).unwrap();
    fs::write(slot.join("README.md"), "cached").unwrap();

    addonpm_cmd(temp.path())
        .args(["cache", "clean"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed"));

    assert!(!temp.path().join(".addons").exists());

    addonpm_cmd(temp.path())
        .args(["cache", "clean"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already empty"));
}

#[test]
fn test_completions() {
    let temp = setup_test_project();

    addonpm_cmd(temp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("addonpm"));
}
