//! Subprocess execution utilities.

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::util::cancel::CancelToken;

/// How often a running child is polled for exit or cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Failure to run an external command.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("`{program}` was not found in PATH")]
    NotFound { program: String },

    #[error("failed to spawn `{command}`: {err}")]
    Spawn { command: String, err: io::Error },

    #[error("failed to wait for `{command}`: {err}")]
    Wait { command: String, err: io::Error },

    #[error("`{command}` {}", describe_exit(*code))]
    Failed { command: String, code: Option<i32> },

    #[error("`{command}` was cancelled")]
    Cancelled { command: String },
}

impl ProcessError {
    /// Exit code of a child that ran to completion unsuccessfully.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ProcessError::Failed { code, .. } => *code,
            _ => None,
        }
    }
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("failed with exit code {}", code),
        None => "was terminated by a signal".to_string(),
    }
}

/// Runs commands on behalf of package managers and the tool runner.
///
/// Every command runs in the project working directory with the tool binary
/// directory first on `PATH`, so built tools can invoke each other.
pub trait Executor: Send + Sync {
    /// Run a command with inherited stdio and require success.
    fn exec(&self, cancel: &CancelToken, program: &str, args: &[String])
        -> Result<(), ProcessError>;

    /// Run a command and capture its stdout. Stderr stays attached.
    fn output(
        &self,
        cancel: &CancelToken,
        program: &str,
        args: &[String],
    ) -> Result<Vec<u8>, ProcessError>;
}

/// [`Executor`] backed by real child processes.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    cwd: PathBuf,
    path: OsString,
}

impl CommandExecutor {
    /// Create an executor running in `cwd` with `bin_dir` prepended to `PATH`.
    pub fn new(cwd: impl Into<PathBuf>, bin_dir: &Path) -> Self {
        let current = std::env::var_os("PATH").unwrap_or_default();
        let path = prepend_path(bin_dir, &current);
        CommandExecutor {
            cwd: cwd.into(),
            path,
        }
    }

    fn builder(&self, program: &str, args: &[String]) -> ProcessBuilder {
        ProcessBuilder::new(program)
            .args(args)
            .env("PATH", &self.path)
            .cwd(&self.cwd)
    }
}

impl Executor for CommandExecutor {
    fn exec(
        &self,
        cancel: &CancelToken,
        program: &str,
        args: &[String],
    ) -> Result<(), ProcessError> {
        self.builder(program, args).run(cancel)
    }

    fn output(
        &self,
        cancel: &CancelToken,
        program: &str,
        args: &[String],
    ) -> Result<Vec<u8>, ProcessError> {
        self.builder(program, args).output(cancel)
    }
}

/// Prepend `dir` to a `PATH`-style list.
pub fn prepend_path(dir: &Path, path: &OsStr) -> OsString {
    let mut dirs = vec![dir.to_path_buf()];
    dirs.extend(std::env::split_paths(path));
    std::env::join_paths(dirs).unwrap_or_else(|_| {
        let mut joined = dir.as_os_str().to_os_string();
        if !path.is_empty() {
            joined.push(if cfg!(windows) { ";" } else { ":" });
            joined.push(path);
        }
        joined
    })
}

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: HashMap<String, OsString>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
        }
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<OsStr>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_os_string());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    fn spawn(&self, mut cmd: Command) -> Result<Child, ProcessError> {
        tracing::debug!("execute {}", self.display_command());
        cmd.spawn().map_err(|err| {
            let bare = self.program.components().count() == 1;
            if err.kind() == io::ErrorKind::NotFound
                && bare
                && find_executable(&self.program).is_none()
            {
                ProcessError::NotFound {
                    program: self.program.display().to_string(),
                }
            } else {
                ProcessError::Spawn {
                    command: self.display_command(),
                    err,
                }
            }
        })
    }

    /// Run with inherited stdio until exit or cancellation.
    pub fn run(&self, cancel: &CancelToken) -> Result<(), ProcessError> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let mut child = self.spawn(cmd)?;
        let status = self.wait(&mut child, cancel)?;
        self.check(status)
    }

    /// Run and capture stdout until exit or cancellation.
    pub fn output(&self, cancel: &CancelToken) -> Result<Vec<u8>, ProcessError> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        let mut child = self.spawn(cmd)?;

        // Drain stdout on its own thread so a chatty child cannot block on a
        // full pipe while we poll.
        let reader = child.stdout.take().map(|mut stdout| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                stdout.read_to_end(&mut buf).map(|_| buf)
            })
        });

        let status = self.wait(&mut child, cancel)?;

        let stdout = match reader {
            Some(handle) => match handle.join() {
                Ok(Ok(buf)) => buf,
                Ok(Err(err)) => {
                    return Err(ProcessError::Wait {
                        command: self.display_command(),
                        err,
                    })
                }
                Err(_) => {
                    return Err(ProcessError::Wait {
                        command: self.display_command(),
                        err: io::Error::other("stdout reader panicked"),
                    })
                }
            },
            None => Vec::new(),
        };

        self.check(status)?;
        Ok(stdout)
    }

    fn wait(&self, child: &mut Child, cancel: &CancelToken) -> Result<ExitStatus, ProcessError> {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {
                    if cancel.is_cancelled() {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(ProcessError::Cancelled {
                            command: self.display_command(),
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(err) => {
                    let _ = child.kill();
                    return Err(ProcessError::Wait {
                        command: self.display_command(),
                        err,
                    });
                }
            }
        }
    }

    fn check(&self, status: ExitStatus) -> Result<(), ProcessError> {
        if status.success() {
            Ok(())
        } else {
            Err(ProcessError::Failed {
                command: self.display_command(),
                code: status.code(),
            })
        }
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: impl AsRef<OsStr>) -> Option<PathBuf> {
    which::which(name).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_display_command() {
        let pb = ProcessBuilder::new("go").args([
            "build",
            "-o",
            "bin/golint",
            "golang.org/x/lint/golint",
        ]);

        assert_eq!(pb.display_command(), "go build -o bin/golint golang.org/x/lint/golint");
    }

    #[test]
    fn test_prepend_path() {
        let joined = prepend_path(Path::new("/work/bin"), OsStr::new("/usr/bin"));
        let dirs: Vec<PathBuf> = std::env::split_paths(&joined).collect();
        assert_eq!(dirs, vec![PathBuf::from("/work/bin"), PathBuf::from("/usr/bin")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_output() {
        let tmp = TempDir::new().unwrap();
        let exec = CommandExecutor::new(tmp.path(), &tmp.path().join("bin"));

        let out = exec
            .output(&CancelToken::new(), "echo", &["hello".to_string()])
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&out).trim(), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn test_bin_dir_is_first_on_path() {
        let tmp = TempDir::new().unwrap();
        let bin = tmp.path().join("bin");
        let exec = CommandExecutor::new(tmp.path(), &bin);

        let out = exec
            .output(&CancelToken::new(), "sh", &["-c".to_string(), "echo $PATH".to_string()])
            .unwrap();
        let path = String::from_utf8_lossy(&out);
        assert!(path.trim().starts_with(&bin.display().to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_code_propagates() {
        let tmp = TempDir::new().unwrap();
        let exec = CommandExecutor::new(tmp.path(), &tmp.path().join("bin"));

        let err = exec
            .exec(&CancelToken::new(), "sh", &["-c".to_string(), "exit 3".to_string()])
            .unwrap_err();
        assert_eq!(err.exit_code(), Some(3));
        assert!(err.to_string().contains("failed with exit code 3"));
    }

    #[cfg(unix)]
    #[test]
    fn test_cancel_kills_child() {
        let tmp = TempDir::new().unwrap();
        let exec = CommandExecutor::new(tmp.path(), &tmp.path().join("bin"));
        let cancel = CancelToken::new();

        let trigger = cancel.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            trigger.cancel();
        });

        let start = std::time::Instant::now();
        let err = exec
            .exec(&cancel, "sleep", &["10".to_string()])
            .unwrap_err();
        handle.join().unwrap();

        assert!(matches!(err, ProcessError::Cancelled { .. }));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_missing_program() {
        let tmp = TempDir::new().unwrap();
        let exec = CommandExecutor::new(tmp.path(), &tmp.path().join("bin"));

        let err = exec
            .exec(&CancelToken::new(), "gex-definitely-not-installed", &[])
            .unwrap_err();
        assert!(matches!(err, ProcessError::NotFound { .. }));
    }
}
