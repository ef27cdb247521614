//! Conformance tests that run YAML fixtures against agentwalk
//!
//! Run with: cargo test -p agentwalk-test --test conformance

#![cfg(feature = "fixtures")]

use agentwalk_test::fixture::Fixture;
use std::fs;
use std::path::{Path, PathBuf};

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Load and run every fixture in one file.
fn run_fixture_file(name: &str) {
    let path = fixtures_dir().join(name);
    let yaml = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()));

    let fixtures = Fixture::from_yaml_multi(&yaml).unwrap_or_else(|e| {
        panic!("Failed to parse {}: {e}", path.display());
    });
    assert!(!fixtures.is_empty(), "{} holds no fixtures", path.display());

    for fixture in fixtures {
        println!("  Running: {}", fixture.name);
        fixture.run_and_assert();
    }
}

#[test]
fn test_paths() {
    run_fixture_file("paths.yaml");
}

#[test]
fn test_functions() {
    run_fixture_file("functions.yaml");
}

#[test]
fn test_rules() {
    run_fixture_file("rules.yaml");
}

#[test]
fn test_errors() {
    run_fixture_file("errors.yaml");
}

#[test]
fn every_fixture_file_is_covered() {
    let mut files: Vec<String> = fs::read_dir(fixtures_dir())
        .expect("read fixtures dir")
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".yaml"))
        .collect();
    files.sort();
    assert_eq!(
        files,
        vec!["errors.yaml", "functions.yaml", "paths.yaml", "rules.yaml"]
    );
}
