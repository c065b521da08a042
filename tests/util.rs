//! Shared test utilities for integration tests
//!
//! Builds on-disk fixtures: a local mirror of the regression-test bucket
//! and small tar archives shaped like the application's input archives.

#![allow(dead_code)]

use assert_fs::prelude::*;

pub const INPUT_DATE: &str = "20240501";
pub const BASELINE_DATE: &str = "20240610";

/// Regression-test bucket mirror with one input-data and one baseline prefix.
/// Every file is tiny; sizes are the byte length of the contents.
pub fn make_rt_mirror() -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let input = format!("noaa-ufs-regtests-pds/input-data-{INPUT_DATE}");
    let baseline = format!("noaa-ufs-regtests-pds/develop-{BASELINE_DATE}");

    let files = [
        // initial conditions
        format!("{input}/NOAHMP_IC/INPUT/ufs-land_C96_init_fields.tile1.nc"),
        format!("{input}/DATM_GSWP3_input_data/clmforc.GSWP3.c2011.0.5x0.5.Prec.1999-12.nc"),
        // staged grid
        format!("{input}/FV3_input_data/INPUT/grid_spec.nc"),
        format!("{input}/FV3_input_data/INPUT/C96_grid.tile1.nc"),
        format!("{input}/FV3_input_data/INPUT/gfs_ctrl.nc"),
        // fixed files, two resolutions
        format!("{input}/FV3_fix_tiled/C96/C96.maximum_snow_albedo.tile1.nc"),
        format!("{input}/FV3_fix_tiled/C192/C192.maximum_snow_albedo.tile1.nc"),
        // deep tree so every positional column exists
        format!("{input}/WW3_input_data_20240214/createmoddefs/a/b/c/2024-02/mod_def.nc"),
        // baselines
        format!("{baseline}/datm_cdeps_lnd_gswp3_intel/RESTART/ufs.cpld.lnd.out.tile1.nc"),
        format!("{baseline}/datm_cdeps_lnd_gswp3_gnu/RESTART/ufs.cpld.lnd.out.tile1.nc"),
        format!("{baseline}/control_c48_intel/sfcf000.nc"),
    ];

    for f in &files
    {
        tmp.child(f)
            .write_str("data")
            .expect("write mirror file");
    }

    tmp
}

/// Tar bytes laid out like `tar -C dir .`, with a root entry and explicit
/// directory members.
pub fn tar_bytes(files: &[(&str, &[u8])]) -> Vec<u8>
{
    let mut builder = tar::Builder::new(Vec::new());
    let mut seen_dirs: Vec<String> = Vec::new();

    let mut root = tar::Header::new_gnu();
    root.set_entry_type(tar::EntryType::Directory);
    root.set_size(0);
    root.set_mode(0o755);
    root.set_cksum();
    builder
        .append_data(&mut root, "./", std::io::empty())
        .expect("root");

    for (path, body) in files
    {
        // parent directories first, once each
        let parts: Vec<&str> = path.split('/').collect();
        for depth in 1..parts.len()
        {
            let dir = parts[..depth].join("/");
            if seen_dirs.contains(&dir)
            {
                continue;
            }
            let mut h = tar::Header::new_gnu();
            h.set_entry_type(tar::EntryType::Directory);
            h.set_size(0);
            h.set_mode(0o755);
            h.set_cksum();
            builder
                .append_data(&mut h, format!("./{dir}/"), std::io::empty())
                .expect("dir");
            seen_dirs.push(dir);
        }

        let mut h = tar::Header::new_gnu();
        h.set_size(body.len() as u64);
        h.set_mode(0o644);
        h.set_cksum();
        builder
            .append_data(&mut h, format!("./{path}"), *body)
            .expect("file");
    }

    builder
        .into_inner()
        .expect("finish tar")
}

/// Write a gzip-compressed archive into `dir` and return its path.
pub fn write_tar_gz(
    dir: &assert_fs::TempDir,
    name: &str,
    files: &[(&str, &[u8])],
) -> std::path::PathBuf
{
    use std::io::Write;

    let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
    enc.write_all(&tar_bytes(files))
        .expect("gzip");
    let bytes = enc
        .finish()
        .expect("gzip finish");

    let child = dir.child(name);
    child
        .write_binary(&bytes)
        .expect("write tar");
    child
        .path()
        .to_path_buf()
}

/// A v1.0.0-style archive: `v1/FV3_fix/C96.mx100.nc` (1024 bytes) plus a
/// `README` without extension.
pub fn make_v1_archive(dir: &assert_fs::TempDir) -> std::path::PathBuf
{
    let nc = vec![0u8; 1024];
    write_tar_gz(
        dir,
        "landda_test_comps.tar.gz",
        &[("v1/FV3_fix/C96.mx100.nc", &nc), ("v1/FV3_fix/README", b"readme")],
    )
}
