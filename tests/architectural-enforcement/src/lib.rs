//! Architectural Enforcement Integration Tests
//!
//! Source scanners backing the tests in `tests/`. The daemon serves every
//! request on the tokio runtime, so production code must never block a
//! worker thread.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// A forbidden pattern and the reason it is forbidden
#[derive(Clone, Copy, Debug)]
pub struct Rule {
    /// Substring matched against code (comments stripped)
    pub pattern: &'static str,
    /// What to use instead
    pub reason: &'static str,
}

/// Calls that block a runtime worker
pub const BLOCKING_CALLS: &[Rule] = &[
    Rule {
        pattern: "reqwest::blocking",
        reason: "use the async reqwest client",
    },
    Rule {
        pattern: "std::thread::sleep",
        reason: "use tokio::time::sleep",
    },
    Rule {
        pattern: "thread::sleep(",
        reason: "use tokio::time::sleep",
    },
    Rule {
        pattern: "block_on(",
        reason: "await the future instead",
    },
];

/// One rule match in a source file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// File the match is in
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// The matched pattern
    pub pattern: &'static str,
    /// Suggested replacement
    pub reason: &'static str,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} - `{}`: {}",
            self.path.display(),
            self.line,
            self.pattern,
            self.reason
        )
    }
}

/// Production source directories of the workspace
#[must_use]
pub fn production_source_dirs() -> Vec<PathBuf> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
    ["studio/core/src", "studio/daemon/src"]
        .iter()
        .map(|dir| root.join(dir))
        .collect()
}

/// Scan source text, ignoring comments and everything from the first
/// `#[cfg(test)]` on
#[must_use]
pub fn scan_source(path: &Path, content: &str, rules: &[Rule]) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("#[cfg(test)]") {
            break;
        }
        if trimmed.starts_with("//") {
            continue;
        }
        let code = line.split("//").next().unwrap_or(line);

        for rule in rules {
            if code.contains(rule.pattern) {
                violations.push(Violation {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    pattern: rule.pattern,
                    reason: rule.reason,
                });
            }
        }
    }

    violations
}

/// Scan every `.rs` file under `dir`
#[must_use]
pub fn scan_directory(dir: &Path, rules: &[Rule]) -> Vec<Violation> {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .flat_map(|entry| {
            fs::read_to_string(entry.path())
                .map(|content| scan_source(entry.path(), &content, rules))
                .unwrap_or_default()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comments_and_test_modules_are_ignored() {
        let source = "\
fn ok() {}
// std::thread::sleep(d) in a comment
let x = 1; // block_on( trailing comment
#[cfg(test)]
mod tests { fn t() { std::thread::sleep(d); } }
";
        assert!(scan_source(Path::new("a.rs"), source, BLOCKING_CALLS).is_empty());
    }

    #[test]
    fn test_blocking_call_is_reported_with_line() {
        let source = "fn main() {}\nasync fn f() { futures::executor::block_on(g()); }\n";
        let violations = scan_source(Path::new("b.rs"), source, BLOCKING_CALLS);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, 2);
        assert!(violations[0].to_string().starts_with("b.rs:2"));
    }
}
