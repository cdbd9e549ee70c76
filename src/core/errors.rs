//! Error types shared by the manifest, manager and orchestration layers.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use crate::core::Tool;
use crate::util::process::ProcessError;

/// Errors surfaced by gex operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {}: {err}", path.display())]
    Read { path: PathBuf, err: io::Error },

    #[error("failed to parse {}:{line}:{column}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("{} does not exist", path.display())]
    ManifestNotFound { path: PathBuf },

    #[error("{} already exists", path.display())]
    ManifestExists { path: PathBuf },

    #[error("failed to write {}: {err}", path.display())]
    Write { path: PathBuf, err: io::Error },

    #[error("failed to find the tool {name:?}")]
    ToolNotFound { name: String },

    #[error("invalid tool {spec:?}: {reason}")]
    InvalidSpec { spec: String, reason: String },

    #[error("{} is a directory", path.display())]
    InvalidCacheEntry { path: PathBuf },

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("{}", summarize(errors))]
    BuildAll { errors: Vec<BuildError> },

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("failed to decode `dep status` output: {err}")]
    Status { err: serde_json::Error },

    #[error("failed to detect a dependencies management tool")]
    UnknownManager,

    #[error("failed to set up build workers: {err}")]
    Workers { err: rayon::ThreadPoolBuildError },

    #[error("{context}: {err}")]
    Io { context: String, err: io::Error },

    #[error("failed to {context}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap this error with the operation that was being performed.
    pub fn context(self, context: impl Into<String>) -> Error {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The underlying error, with any `Context` layers removed.
    pub fn root_cause(&self) -> &Error {
        let mut err = self;
        while let Error::Context { source, .. } = err {
            err = source;
        }
        err
    }

    /// The exit code of a child process that ran and failed, if that is what
    /// this error is.
    pub fn exit_code(&self) -> Option<i32> {
        match self.root_cause() {
            Error::Process(err) => err.exit_code(),
            _ => None,
        }
    }
}

/// A single tool that failed to build.
#[derive(Debug, Error)]
#[error("failed to build {}: {error}", tool.name())]
pub struct BuildError {
    pub tool: Tool,
    pub error: Box<Error>,
}

impl BuildError {
    pub fn new(tool: Tool, error: Error) -> Self {
        BuildError {
            tool,
            error: Box::new(error),
        }
    }
}

fn summarize(errors: &[BuildError]) -> String {
    match errors.split_first() {
        None => "failed to build tools".to_string(),
        Some((first, [])) => first.to_string(),
        Some((first, rest)) => format!(
            "failed to build {} (and {} other tool(s)): {}",
            first.tool.name(),
            rest.len(),
            first.error
        ),
    }
}

/// Collects build failures from concurrent workers.
///
/// Appends are serialized; entries keep their arrival order.
#[derive(Debug, Default)]
pub struct BuildErrors {
    errors: Mutex<Vec<BuildError>>,
}

impl BuildErrors {
    pub fn new() -> Self {
        BuildErrors::default()
    }

    /// Record a failure for `tool`.
    ///
    /// An error that already names its tool is stored as is.
    pub fn append(&self, tool: &Tool, error: Error) {
        let entry = match error {
            Error::Build(build) => build,
            other => BuildError::new(tool.clone(), other),
        };
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    pub fn len(&self) -> usize {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `Ok` when nothing failed, otherwise the aggregate error.
    pub fn into_result(self) -> Result<(), Error> {
        let errors = self
            .errors
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::BuildAll { errors })
        }
    }
}

impl fmt::Display for BuildErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors = self.errors.lock().unwrap_or_else(PoisonError::into_inner);
        f.write_str(&summarize(&errors))
    }
}
