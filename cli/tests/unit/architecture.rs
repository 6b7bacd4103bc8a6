//! Structural tests for architectural boundary enforcement.
//!
//! These tests scan source files to verify that the layer boundaries hold:
//! domain is pure, application talks only to ports, infra never prints.

use std::path::Path;

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

/// Read a file and strip comment lines to avoid false positives.
fn read_non_comment_lines(path: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    content
        .lines()
        .filter(|l| {
            let trimmed = l.trim();
            !trimmed.starts_with("//") && !trimmed.starts_with("/*") && !trimmed.starts_with('*')
        })
        .map(String::from)
        .collect()
}

/// Track brace depth and return whether a line is inside a `#[cfg(test)]` block.
struct CfgTestTracker {
    in_test_block: bool,
    brace_depth: i32,
    test_block_start_depth: i32,
}

impl CfgTestTracker {
    fn new() -> Self {
        Self {
            in_test_block: false,
            brace_depth: 0,
            test_block_start_depth: 0,
        }
    }

    /// Process a line and return `true` if it's inside a `#[cfg(test)]` block.
    fn process_line(&mut self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.contains("#[cfg(test)]") {
            self.in_test_block = true;
            self.test_block_start_depth = self.brace_depth;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_test_block && self.brace_depth <= self.test_block_start_depth {
                        self.in_test_block = false;
                    }
                }
                _ => {}
            }
        }
        self.in_test_block
    }
}

fn src_dir() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src")
}

fn rel(file: &Path) -> String {
    file.strip_prefix(env!("CARGO_MANIFEST_DIR"))
        .unwrap_or(file)
        .display()
        .to_string()
        .replace('\\', "/")
}

/// Lines outside `#[cfg(test)]` blocks that contain any of `needles`.
fn forbidden_lines(dir: &Path, needles: &[&str]) -> Vec<String> {
    let mut violations = Vec::new();
    for file in collect_rs_files(dir) {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        let mut tracker = CfgTestTracker::new();
        for (i, line) in content.lines().enumerate() {
            let in_test = tracker.process_line(line);
            let trimmed = line.trim();
            if in_test || trimmed.starts_with("//") {
                continue;
            }
            for needle in needles {
                if line.contains(needle) {
                    violations.push(format!("{}:{}: `{needle}`: {line}", rel(&file), i + 1));
                }
            }
        }
    }
    violations
}

// ── Layering ──────────────────────────────────────────────────────────────────

#[test]
fn domain_is_free_of_io_and_outer_layers() {
    let violations = forbidden_lines(
        &src_dir().join("domain"),
        &[
            "crate::infra",
            "crate::application",
            "crate::commands",
            "crate::output",
            "tokio::",
            "std::fs",
            "std::process",
            "std::net",
        ],
    );
    assert!(
        violations.is_empty(),
        "domain/ must stay pure:\n{}",
        violations.join("\n")
    );
}

#[test]
fn application_depends_only_on_domain_and_ports() {
    let violations = forbidden_lines(
        &src_dir().join("application"),
        &["crate::infra", "crate::commands", "crate::output"],
    );
    assert!(
        violations.is_empty(),
        "application/ must not import outer layers:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_uses_only_the_application_ports() {
    let violations = forbidden_lines(&src_dir().join("infra"), &["crate::application::services"]);
    assert!(
        violations.is_empty(),
        "infra/ may import application::ports but not services:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_has_no_imports_from_commands_or_output() {
    let violations = forbidden_lines(&src_dir().join("infra"), &["crate::commands", "crate::output"]);
    assert!(
        violations.is_empty(),
        "infra/ must not import from commands/ or output/:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_has_no_print_macros_outside_tests() {
    let violations = forbidden_lines(&src_dir().join("infra"), &["println!", "eprintln!"]);
    assert!(
        violations.is_empty(),
        "infra/ must not use println!/eprintln! outside #[cfg(test)]:\n{}",
        violations.join("\n")
    );
}

// ── Trait bounds over concrete adapters ───────────────────────────────────────

#[test]
fn services_take_ports_not_adapters() {
    let adapters = [
        "TokioCommandRunner",
        "LocalFs",
        "SystemAccounts",
        "AptInstaller",
        "SystemdSupervisor",
        "ReqwestProbe",
        "YamlConfigStore",
    ];
    let violations = forbidden_lines(&src_dir().join("application").join("services"), &adapters);
    assert!(
        violations.is_empty(),
        "application services must be generic over ports:\n{}",
        violations.join("\n")
    );
}

// ── Commands ──────────────────────────────────────────────────────────────────

#[test]
fn no_inline_json_branching_in_commands() {
    let commands_dir = src_dir().join("commands");
    let mut violations: Vec<String> = Vec::new();

    for file in collect_rs_files(&commands_dir) {
        for (i, line) in read_non_comment_lines(&file).iter().enumerate() {
            let trimmed = line.trim();
            if line.contains("json: bool")
                || trimmed.starts_with("if json")
                || trimmed.starts_with("if !json")
            {
                violations.push(format!("{}:{}: {line}", rel(&file), i + 1));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Commands must take the mode from AppContext, not a json flag:\n{}",
        violations.join("\n")
    );
}

#[test]
fn command_handlers_accept_app_context() {
    let mut violations: Vec<String> = Vec::new();
    for file in collect_rs_files(&src_dir().join("commands")) {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        if file.ends_with("mod.rs") {
            continue;
        }
        if !content.contains("fn run(app: &AppContext") {
            violations.push(rel(&file));
        }
    }
    assert!(
        violations.is_empty(),
        "command handlers must take `app: &AppContext` first:\n{}",
        violations.join("\n")
    );
}
