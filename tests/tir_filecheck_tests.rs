//! FileCheck-style tests for TIR files
//!
//! Each fixture in `tests/filetest` carries its own RUN flags and CHECK
//! directives; the runner feeds it through the fence pass and matches the
//! rendered reports.

use std::fs;
use std::path::{Path, PathBuf};
use tsofence::test_ir::{TestRunner, TestSpec};

fn filetest_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("filetest")
}

/// Test helper that runs a TIR file through FileCheck validation
fn run_filecheck_test(tir_file: &str) {
    let _ = env_logger::builder().is_test(true).try_init();

    let path = filetest_dir().join(tir_file);
    let contents = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));

    let spec = TestSpec::parse(&contents)
        .unwrap_or_else(|e| panic!("Failed to parse test spec from {}: {}", tir_file, e));
    assert!(!spec.run_directives.is_empty(), "{} has no RUN line", tir_file);

    let runner = TestRunner::new(false);
    runner
        .run_test(&spec)
        .unwrap_or_else(|e| panic!("Test {} failed: {}", tir_file, e));
}

#[test]
fn test_store_load_store_filecheck() {
    run_filecheck_test("store_load_store.tir");
}

#[test]
fn test_cross_function_filecheck() {
    run_filecheck_test("cross_function.tir");
}

#[test]
fn test_relaxed_reads_filecheck() {
    run_filecheck_test("relaxed_reads.tir");
}

#[test]
fn test_events_filecheck() {
    run_filecheck_test("events.tir");
}

#[test]
fn test_no_alias_info_filecheck() {
    run_filecheck_test("no_alias_info.tir");
}

#[test]
fn test_block_scope_filecheck() {
    run_filecheck_test("block_scope.tir");
}

#[test]
fn test_already_fenced_filecheck() {
    run_filecheck_test("already_fenced.tir");
}

#[test]
fn test_fenced_output_filecheck() {
    run_filecheck_test("fenced_output.tir");
}

#[test]
fn test_print_ir_filecheck() {
    run_filecheck_test("print_ir.tir");
}

#[test]
fn test_stats_filecheck() {
    run_filecheck_test("stats.tir");
}

/// Every fixture in the directory, so new files are picked up without a new test.
#[test]
fn test_all_filetests() {
    let mut files: Vec<PathBuf> = fs::read_dir(filetest_dir())
        .expect("filetest directory")
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("tir"))
        .collect();
    files.sort();
    assert!(!files.is_empty());

    let mut failures = Vec::new();
    for path in &files {
        let contents = fs::read_to_string(path).unwrap();
        let result = TestSpec::parse(&contents).and_then(|spec| TestRunner::new(false).run_test(&spec));
        if let Err(e) = result {
            failures.push(format!("{}: {}", path.display(), e));
        }
    }
    assert!(failures.is_empty(), "Failing filetests:\n{}", failures.join("\n"));
}
