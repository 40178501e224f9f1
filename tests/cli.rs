extern crate assert_cmd;
extern crate image;
extern crate predicates;
extern crate tempfile;

use assert_cmd::prelude::*;
use image::GenericImageView;
use predicates::prelude::*;
use std::fs;
use std::process::Command;

fn fractal_aa() -> Command {
    Command::cargo_bin("fractal-aa").unwrap()
}

#[test]
fn renders_a_png_of_the_requested_size() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("mandel.png");
    fractal_aa()
        .args(&["--output", out.to_str().unwrap()])
        .args(&["--size", "32x24", "--passes", "4", "--threads", "2"])
        .args(&["--param", "maxIter=100"])
        .assert()
        .success();
    let img = image::open(&out).unwrap();
    assert_eq!(img.dimensions(), (32, 24));
}

#[test]
fn the_heart_of_the_set_is_black() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("heart.ppm");
    fractal_aa()
        .args(&["-o", out.to_str().unwrap()])
        .args(&["-s", "4x4", "-c", "-0.1,0", "--span", "0.05", "-p", "3"])
        .assert()
        .success();
    let bytes = fs::read(&out).unwrap();
    assert!(bytes.len() > 48);
    assert!(bytes[bytes.len() - 48..].iter().all(|&b| b == 0));
}

#[test]
fn julia_and_grid_accept_their_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("julia.png");
    fractal_aa()
        .args(&["-o", out.to_str().unwrap(), "-s", "16x16", "-p", "2"])
        .args(&["-f", "JuliaSet", "-P", "seed=-0.8,0.156", "-P", "maxIter=200"])
        .args(&["-g", "volcano", "-c", "0,0"])
        .assert()
        .success();
    let out = dir.path().join("grid.png");
    fractal_aa()
        .args(&["-o", out.to_str().unwrap(), "-s", "16x16", "-p", "2"])
        .args(&["-f", "grid", "-P", "GridWidth=0.05", "-r", "30"])
        .assert()
        .success();
}

#[test]
fn unknown_fractal_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nope.png");
    fractal_aa()
        .args(&["-o", out.to_str().unwrap(), "-s", "8x8", "-f", "Newton"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown fractal \"Newton\"").from_utf8());
    assert!(!out.exists());
}

#[test]
fn misspelt_parameter_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nope.png");
    fractal_aa()
        .args(&["-o", out.to_str().unwrap(), "-s", "8x8", "-P", "maxiter=10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no parameter named \"maxiter\"").from_utf8());
}

#[test]
fn zero_passes_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nope.png");
    fractal_aa()
        .args(&["-o", out.to_str().unwrap(), "-s", "8x8", "-p", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pass count").from_utf8());
}

#[test]
fn malformed_size_is_rejected_by_the_parser() {
    fractal_aa()
        .args(&["-o", "unused.png", "-s", "big"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not parse output image size").from_utf8());
}

#[test]
fn cubic_julia_needs_a_seed() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nope.png");
    fractal_aa()
        .args(&["-o", out.to_str().unwrap(), "-s", "8x8", "-f", "JuliaSet", "-P", "exponent=3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("JuliaSet requires the parameter \"seed\"").from_utf8());
}

#[test]
fn non_finite_seed_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nope.png");
    fractal_aa()
        .args(&["-o", out.to_str().unwrap(), "-s", "8x8", "-f", "JuliaSet", "-P", "seed=nan,0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("parameter \"seed\" is invalid").from_utf8());
    assert!(!out.exists());
}
