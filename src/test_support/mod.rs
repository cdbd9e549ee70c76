//! Test utilities and mocks for gex unit tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use gex::test_support::{MockExecutor, MockProcessOutput};
//!
//! #[test]
//! fn test_example() {
//!     let exec = MockExecutor::new().with_build_outputs();
//!     exec.expect_prefix("go env GOMOD", MockProcessOutput::success("\n"));
//!     // Hand `Arc::new(exec)` to the code under test, then inspect `exec.calls()`.
//! }
//! ```

pub mod fixtures;

use std::fs;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use crate::util::cancel::CancelToken;
use crate::util::process::{Executor, ProcessError};

pub use fixtures::*;

/// Mock process output for testing command execution.
#[derive(Debug, Clone)]
pub struct MockProcessOutput {
    /// Exit status code (0 = success).
    pub status: i32,
    /// Standard output.
    pub stdout: String,
}

impl MockProcessOutput {
    /// Create a successful output with the given stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        MockProcessOutput {
            status: 0,
            stdout: stdout.into(),
        }
    }

    /// Create a failure output with the given status code.
    pub fn failure(status: i32) -> Self {
        MockProcessOutput {
            status,
            stdout: String::new(),
        }
    }

    pub fn success_status(&self) -> bool {
        self.status == 0
    }
}

impl Default for MockProcessOutput {
    fn default() -> Self {
        MockProcessOutput::success("")
    }
}

/// Pattern for matching commands in MockExecutor.
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Match if command starts with prefix.
    StartsWith(String),
    /// Match if command contains substring.
    Contains(String),
}

impl CommandPattern {
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::StartsWith(s) => cmd.starts_with(s),
            CommandPattern::Contains(s) => cmd.contains(s),
        }
    }
}

#[derive(Debug, Clone)]
struct CommandExpectation {
    pattern: CommandPattern,
    output: MockProcessOutput,
}

#[derive(Debug, Default)]
struct MockState {
    expectations: Vec<CommandExpectation>,
    calls: Vec<String>,
}

/// Mock process executor.
///
/// Every command is recorded as one `program arg...` string. Commands match
/// the first expectation whose pattern fits; unmatched commands succeed with
/// empty output. With [`MockExecutor::with_build_outputs`], a successful
/// `go build -o <path>` creates an executable file at `<path>`.
#[derive(Debug, Default)]
pub struct MockExecutor {
    state: Mutex<MockState>,
    build_outputs: bool,
}

impl MockExecutor {
    pub fn new() -> Self {
        MockExecutor::default()
    }

    /// Materialize `go build -o` outputs on disk.
    pub fn with_build_outputs(mut self) -> Self {
        self.build_outputs = true;
        self
    }

    fn push(&self, pattern: CommandPattern, output: MockProcessOutput) {
        self.lock()
            .expectations
            .push(CommandExpectation { pattern, output });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an expectation for a command starting with a prefix.
    pub fn expect_prefix(&self, prefix: &str, output: MockProcessOutput) {
        self.push(CommandPattern::StartsWith(prefix.to_string()), output);
    }

    /// Add an expectation for a command containing a substring.
    pub fn expect_contains(&self, substring: &str, output: MockProcessOutput) {
        self.push(CommandPattern::Contains(substring.to_string()), output);
    }

    /// Commands starting with `prefix` print `stdout` and succeed.
    pub fn respond(&self, prefix: &str, stdout: &str) {
        self.expect_prefix(prefix, MockProcessOutput::success(stdout));
    }

    /// Commands containing `substring` exit with `status`.
    pub fn fail_on(&self, substring: &str, status: i32) {
        self.expect_contains(substring, MockProcessOutput::failure(status));
    }

    /// Get all commands that were called, in order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Number of recorded commands containing `substring`.
    pub fn count(&self, substring: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.contains(substring))
            .count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn run(&self, program: &str, args: &[String]) -> Result<MockProcessOutput, ProcessError> {
        let command = std::iter::once(program)
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");

        let output = {
            let mut state = self.lock();
            state.calls.push(command.clone());
            state
                .expectations
                .iter()
                .find(|exp| exp.pattern.matches(&command))
                .map(|exp| exp.output.clone())
                .unwrap_or_default()
        };

        if !output.success_status() {
            return Err(ProcessError::Failed {
                command,
                code: Some(output.status),
            });
        }

        let is_build = program == "go" && args.first().map(String::as_str) == Some("build");
        if self.build_outputs && is_build {
            if let Some(out) = args.iter().skip_while(|a| *a != "-o").nth(1) {
                write_fake_binary(Path::new(out));
            }
        }

        Ok(output)
    }
}

impl Executor for MockExecutor {
    fn exec(
        &self,
        _cancel: &CancelToken,
        program: &str,
        args: &[String],
    ) -> Result<(), ProcessError> {
        self.run(program, args).map(|_| ())
    }

    fn output(
        &self,
        _cancel: &CancelToken,
        program: &str,
        args: &[String],
    ) -> Result<Vec<u8>, ProcessError> {
        self.run(program, args).map(|out| out.stdout.into_bytes())
    }
}

fn write_fake_binary(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create bin dir");
    }
    fs::write(path, b"#!/bin/sh\n").expect("write fake binary");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod fake binary");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mock_executor_records_and_matches() {
        let exec = MockExecutor::new();
        exec.respond("go env GOMOD", "/app/go.mod\n");
        exec.fail_on("mod tidy", 2);
        let cancel = CancelToken::new();

        let out = exec
            .output(&cancel, "go", &["env".to_string(), "GOMOD".to_string()])
            .unwrap();
        assert_eq!(out, b"/app/go.mod\n");

        let err = exec
            .exec(&cancel, "go", &["mod".to_string(), "tidy".to_string()])
            .unwrap_err();
        assert_eq!(err.exit_code(), Some(2));

        exec.exec(&cancel, "dep", &["ensure".to_string()]).unwrap();
        assert_eq!(exec.calls(), vec!["go env GOMOD", "go mod tidy", "dep ensure"]);
        assert_eq!(exec.count("go "), 2);
    }

    #[test]
    fn test_mock_executor_build_outputs() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("bin").join("golint");
        let exec = MockExecutor::new().with_build_outputs();

        let args = ["build", "-o", out.to_str().unwrap(), "golang.org/x/lint/golint"]
            .map(str::to_string);
        exec.exec(&CancelToken::new(), "go", &args).unwrap();

        assert!(out.is_file());
    }
}
