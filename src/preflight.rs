//! Preflight checks for host tools.
//!
//! Every build needs the container engine; `export` also needs `tar`.
//! Run with `penguin preflight` to check everything is ready.

use std::path::PathBuf;

use crate::config::Config;
use crate::error::{Error, Result};

/// Result of a single preflight check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed.
    Pass,
    /// Check failed - build will fail.
    Fail,
    /// Tool missing, but only some commands need it.
    Warn,
}

impl CheckResult {
    fn pass_with(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Pass,
            details: Some(details.to_string()),
        }
    }

    fn fail(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Fail,
            details: Some(details.to_string()),
        }
    }

    fn warn(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warn,
            details: Some(details.to_string()),
        }
    }
}

/// Results of all preflight checks.
pub struct PreflightReport {
    pub checks: Vec<CheckResult>,
}

impl PreflightReport {
    /// Returns true if all checks passed (no failures).
    pub fn all_passed(&self) -> bool {
        !self.checks.iter().any(|c| c.status == CheckStatus::Fail)
    }

    /// Count of failed checks.
    pub fn fail_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.status == CheckStatus::Fail)
            .count()
    }

    /// Print the report to stdout.
    pub fn print(&self) {
        println!("=== Preflight Check Results ===\n");

        for check in &self.checks {
            let status_str = match check.status {
                CheckStatus::Pass => "PASS",
                CheckStatus::Fail => "FAIL",
                CheckStatus::Warn => "WARN",
            };

            print!("  [{}] {}", status_str, check.name);
            if let Some(details) = &check.details {
                println!(": {}", details);
            } else {
                println!();
            }
        }

        println!();
        let passed = self
            .checks
            .iter()
            .filter(|c| c.status == CheckStatus::Pass)
            .count();
        println!("Summary: {}/{} passed", passed, self.checks.len());
        if self.fail_count() > 0 {
            println!("         {} FAILED - build will not succeed", self.fail_count());
        }
    }
}

/// Check the host tools penguin shells out to.
pub fn run_preflight(config: &Config) -> PreflightReport {
    let tools = [
        (config.engine.as_str(), true, "Required to build recipes in sandboxes"),
        ("tar", false, "Required for `penguin export`"),
    ];

    let checks = tools
        .iter()
        .map(|(tool, required, purpose)| check_tool_exists(tool, *required, purpose))
        .collect();

    PreflightReport { checks }
}

fn check_tool_exists(tool: &str, required: bool, purpose: &str) -> CheckResult {
    match which::which(tool) {
        Ok(path) => CheckResult::pass_with(tool, &path.display().to_string()),
        Err(_) if required => CheckResult::fail(tool, &format!("Not found. {}", purpose)),
        Err(_) => CheckResult::warn(tool, &format!("Not found. {}", purpose)),
    }
}

/// Resolve the configured engine on `PATH`, before any recipe runs.
pub fn require_engine(config: &Config) -> Result<PathBuf> {
    which::which(&config.engine).map_err(|_| Error::EngineNotFound(config.engine.clone()))
}
