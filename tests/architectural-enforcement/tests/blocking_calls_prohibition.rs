//! Integration Test: Blocking Call Prohibition
//!
//! **Policy**: Production code in studio-core and studio-daemon MUST NOT
//! block a tokio worker thread.
//! **Required**: async reqwest, `tokio::time::sleep`, `.await` instead of
//! `block_on`.

use architectural_enforcement::{production_source_dirs, scan_directory, BLOCKING_CALLS};

#[test]
fn test_production_sources_exist() {
    for dir in production_source_dirs() {
        assert!(dir.is_dir(), "missing source directory {}", dir.display());
    }
}

#[test]
fn test_no_blocking_calls_in_production_code() {
    let violations: Vec<_> = production_source_dirs()
        .iter()
        .flat_map(|dir| scan_directory(dir, BLOCKING_CALLS))
        .collect();

    if !violations.is_empty() {
        eprintln!("\nBlocking calls found in production code:\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        panic!(
            "\nFound {} blocking call(s) in production code.",
            violations.len()
        );
    }
}
