// End-to-end runs of `dmap map` and `dmap keys` against local
// fixtures: tar archives on disk and a directory mirror of a bucket.
use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::process::Command;

mod util;
use util::{INPUT_DATE, make_rt_mirror, make_v1_archive};

fn dmap(dir: &assert_fs::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("dmap").expect("bin");
    cmd.current_dir(dir.path()).env_remove("DATAMAP_LOG");
    cmd
}

#[test]
fn test_map_local_tar_writes_data_map() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let tar = make_v1_archive(&tmp);

    dmap(&tmp)
        .args(["map", "--tar"])
        .arg(&tar)
        .args(["--bucket", "land-da", "--layout", "land-da-v1.0.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Data map saved to"));

    let out = tmp.child("results/landda_test_comps.tar.gz_land-da_data_map.csv");
    out.assert(predicate::path::exists());
    out.assert(
        "Data File,Category,Sub-Category 1,Resolution (C),Ocean Resolution (mx),Data Format,File Size (Bytes)\n\
         C96.mx100.nc,v1,FV3_fix,96,100,.nc,1024\n",
    );

    // listing the archive also records its members
    tmp.child("results/noaa-ufs-land-da-pds_all_keys.csv")
        .assert("v1\nv1/FV3_fix\nv1/FV3_fix/C96.mx100.nc\nv1/FV3_fix/README\n");
}

#[test]
fn test_map_dry_run_writes_nothing() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let tar = make_v1_archive(&tmp);

    dmap(&tmp)
        .args(["--dry-run", "map", "--tar"])
        .arg(&tar)
        .args(["--layout", "land-da-v1.0.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DRY RUN").and(predicate::str::contains("local_all_keys.csv")));

    tmp.child("results").assert(predicate::path::missing());
}

#[test]
fn test_map_rejects_mode_mismatch() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let tar = make_v1_archive(&tmp);

    dmap(&tmp)
        .args(["map", "--tar"])
        .arg(&tar)
        .args(["--layout", "rt-input"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expects a bucket prefix"));
}

#[test]
fn test_map_unknown_layout_fails_before_listing() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    dmap(&tmp)
        .args(["map", "--tar", "does-not-exist.tar", "--layout", "land-da-v9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown layout"));
}

#[test]
fn test_map_local_mirror_prefix() {
    let tmp = make_rt_mirror();
    let prefix = format!("input-data-{INPUT_DATE}");

    dmap(&tmp)
        .args(["map", "--bucket", "rt", "--local", "noaa-ufs-regtests-pds", "--prefix", &prefix])
        .args(["--layout", "rt-input", "--output-dir", "out", "--missing-marker", "NA"])
        .assert()
        .success();

    let out = tmp.child(format!("out/rt_{prefix}_data_map.csv"));
    tmp.child("out/noaa-ufs-regtests-pds_all_keys.csv").assert(predicate::path::missing());
    out.assert(predicate::str::starts_with(
        "Data File,UFS Component,Resolution (C),Ocean Resolution (o),Ocean Resolution (mx),\
         Ocean Resolution (w/o symbol),Data Format,File Size (Bytes),Category,Sub-Category,Dataset",
    ));
    // eight input files, no baseline rows
    let text = std::fs::read_to_string(out.path()).expect("read map");
    assert_eq!(text.lines().count(), 1 + 8);
    assert!(!text.contains("develop-"));
    assert!(text.contains("C192.maximum_snow_albedo.tile1.nc,FV3_fix_tiled,192,"));
}

#[test]
fn test_map_layout_file_and_preview() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let tar = make_v1_archive(&tmp);
    tmp.child("custom.toml")
        .write_str(
            r#"
name = "custom"
mode = "archive"
columns = [{ position = 0, name = "Release" }]

[[steps]]
extract = "grid-resolution-short"
from = ["Data File"]
as = "Grid"
"#,
        )
        .expect("write layout");

    dmap(&tmp)
        .args(["map", "--tar"])
        .arg(&tar)
        .args(["--layout-file", "custom.toml", "--preview", "3", "-o", "custom.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Grid").and(predicate::str::contains("C96.mx100.nc")));

    tmp.child("custom.csv")
        .assert(predicate::str::starts_with("Release,1,File Size (Bytes),Data File,Data Format,Grid\n"));
    tmp.child("local_all_keys.csv").assert(predicate::path::is_file());
}

#[test]
fn test_keys_lists_archive_members() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let tar = make_v1_archive(&tmp);

    dmap(&tmp)
        .args(["keys", "--bucket", "land-da", "--tar"])
        .arg(&tar)
        .assert()
        .success()
        .stdout(predicate::str::contains("noaa-ufs-land-da-pds"));

    tmp.child("results/noaa-ufs-land-da-pds_all_keys.csv")
        .assert("v1\nv1/FV3_fix\nv1/FV3_fix/C96.mx100.nc\nv1/FV3_fix/README\n");
}
