//! Multi-file integration tests
//!
//! Each scenario writes a small PHP workspace with a `phpack.toml`, builds
//! every unit and compares the written bundles or the build error.

#![allow(clippy::panic, reason = "a failed scenario fails its test")]

use expect_test::expect;
use integration_tests::multi_file::{self, MultiFileProject, TestResult};

fn assert_passes(project: &MultiFileProject) {
    match project.run() {
        TestResult::Pass => {}
        TestResult::Fail { reason } => panic!("{} failed: {}", project.name, reason),
    }
}

/// A library importing another library's class under an alias
#[test]
fn test_library_imports() {
    assert_passes(&multi_file::library_imports());
}

/// Shared dependency built and inlined once
#[test]
fn test_diamond_dependencies() {
    assert_passes(&multi_file::diamond_dependencies());
}

/// Function and constant imports with an inlined library
#[test]
fn test_inline_project() {
    assert_passes(&multi_file::inline_project());
}

#[test]
fn test_dependency_cycle() {
    assert_passes(&multi_file::dependency_cycle());
}

/// Duplicate class names across modules
#[test]
fn test_last_write_wins() {
    assert_passes(&multi_file::last_write_wins());
}

#[test]
fn test_namespace_case_folding() {
    assert_passes(&multi_file::namespace_case_folding());
}

#[test]
fn test_rejected_magic_constant() {
    assert_passes(&multi_file::rejected_magic_constant());
}

#[test]
fn test_cycle_error_message() {
    let Err(error) = multi_file::dependency_cycle().build() else {
        panic!("cycle should fail the build");
    };
    expect![["dependency cycle: a -> b -> a"]].assert_eq(&error);
}

#[test]
fn test_diamond_session_order() {
    let built = multi_file::diamond_dependencies().build().unwrap();

    assert_eq!(
        built.session.built().collect::<Vec<_>>(),
        vec!["core", "http", "cli", "app"]
    );
    assert_eq!(built.session.reports().len(), 4);
    assert!(built.read("build/core.php").is_some());
}

#[test]
fn test_entry_is_not_bundled_as_a_source() {
    let built = multi_file::inline_project().build().unwrap();
    let app = built.read("build/app.php").unwrap();

    assert_eq!(app.matches("echo App\\run();").count(), 1);
    let report = built.session.reports().iter().find(|report| report.name == "app").unwrap();
    assert_eq!(report.compiled, 2);
}

#[test]
fn test_unknown_dependency_fails_before_building() {
    let mut project = MultiFileProject::new("unknown_dependency");
    project.add_file("lib/A.php", "<?php\nclass A {}\n");
    project.set_manifest(
        "[library.lib]\nsource = \"lib\"\noutput = \"build/lib.php\"\ndependencies = [\"missing\"]\n",
    );
    project.expect_errors(vec!["[lib]".to_string(), "`missing`".to_string()]);

    assert_passes(&project);
}

#[test]
fn test_missing_entry_is_a_configuration_error() {
    let mut project = MultiFileProject::new("missing_entry");
    project.add_file("app/App.php", "<?php\nnamespace App;\nclass App {}\n");
    project.set_manifest(
        "[project.app]\nsource = \"app\"\noutput = \"build/app.php\"\nentry = \"index.php\"\n",
    );
    project.expect_errors(vec!["[app]".to_string(), "index.php".to_string()]);

    assert_passes(&project);
}
