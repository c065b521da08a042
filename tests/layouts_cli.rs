// `dmap layouts` and `dmap init` round trips.
use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::process::Command;

use datamap::core::layout::{Layout, builtin_names};

mod util;

fn dmap(dir: &assert_fs::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("dmap").expect("bin");
    cmd.current_dir(dir.path());
    cmd
}

#[test]
fn test_layouts_lists_every_builtin() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let mut assert = dmap(&tmp).arg("layouts").assert().success();
    for name in builtin_names() {
        assert = assert.stdout(predicate::str::contains(name));
    }
}

#[test]
fn test_layouts_show_emits_loadable_toml() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let out = dmap(&tmp)
        .args(["layouts", "--show", "land-da-v1.2"])
        .output()
        .expect("run");
    assert!(out.status.success());

    let text = String::from_utf8(out.stdout).expect("utf8");
    tmp.child("v12.toml").write_str(&text).expect("write");

    let loaded = Layout::from_file(tmp.child("v12.toml").path()).expect("load");
    assert_eq!(loaded, Layout::builtin("land-da-v1.2").expect("builtin"));
}

#[test]
fn test_init_writes_config_once() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    dmap(&tmp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("datamap.toml"));
    tmp.child("datamap.toml")
        .assert(predicate::str::contains("missing_marker").and(predicate::str::contains("[consolidate]")));

    dmap(&tmp)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    dmap(&tmp).args(["init", "--force"]).assert().success();
}

#[test]
fn test_env_overrides_config_file() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    tmp.child("datamap.toml")
        .write_str("output_dir = \"from-file\"\n")
        .expect("write config");
    let tar = util::make_v1_archive(&tmp);

    dmap(&tmp)
        .env("DATAMAP_OUTPUT_DIR", "from-env")
        .args(["map", "--tar"])
        .arg(&tar)
        .args(["--layout", "land-da-v1.0.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("from-env"));

    tmp.child("from-file").assert(predicate::path::missing());
}
