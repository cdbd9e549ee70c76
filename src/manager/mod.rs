//! Dependency manager back ends.
//!
//! A [`PackageManager`] knows how to fetch, build and run tool packages for
//! one dependency management tool. The active implementation is chosen once
//! per run from the detected [`ManagerType`].

pub mod detect;
pub mod modules;
pub mod vendored;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::errors::Error;
use crate::core::ManagerType;
use crate::util::cancel::CancelToken;
use crate::util::process::Executor;

pub use detect::{detect, Detection};
pub use modules::ModulesManager;
pub use vendored::VendoredManager;

/// Operations a dependency manager provides for tool packages.
pub trait PackageManager: Send + Sync {
    /// The manager type this implementation handles.
    fn kind(&self) -> ManagerType;

    /// Fetch packages and record them in the project's dependency files.
    fn add(&self, cancel: &CancelToken, pkgs: &[String], verbose: bool) -> Result<(), Error>;

    /// Compile `pkg` into an executable at `output`.
    fn build(
        &self,
        cancel: &CancelToken,
        output: &Path,
        pkg: &str,
        verbose: bool,
    ) -> Result<(), Error>;

    /// Compile and run `pkg` without keeping the executable.
    fn run_in_place(
        &self,
        cancel: &CancelToken,
        pkg: &str,
        args: &[String],
        verbose: bool,
    ) -> Result<(), Error>;

    /// Reconcile the dependency files with the imports in the source tree.
    fn sync(&self, cancel: &CancelToken, verbose: bool) -> Result<(), Error>;
}

/// Create the manager for `kind`.
///
/// `root_dir` is the project root and `working_dir` the directory commands
/// run in.
pub fn create(
    kind: ManagerType,
    executor: Arc<dyn Executor>,
    root_dir: impl Into<PathBuf>,
    working_dir: impl Into<PathBuf>,
) -> Result<Box<dyn PackageManager>, Error> {
    match kind {
        ManagerType::Modules => Ok(Box::new(ModulesManager::new(executor))),
        ManagerType::Vendored => Ok(Box::new(VendoredManager::new(
            executor,
            root_dir,
            working_dir,
        ))),
        ManagerType::Unknown => Err(Error::UnknownManager),
    }
}

/// Build an argument list, inserting `-v` after `head` when verbose.
fn command_args<'a>(
    head: &[&str],
    verbose: bool,
    rest: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let mut args: Vec<String> = head.iter().map(|s| s.to_string()).collect();
    if verbose {
        args.push("-v".to_string());
    }
    args.extend(rest.into_iter().map(str::to_string));
    args
}
