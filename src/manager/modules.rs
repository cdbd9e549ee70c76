//! Go modules back end.

use std::path::Path;
use std::sync::Arc;

use crate::core::errors::Error;
use crate::core::ManagerType;
use crate::manager::{command_args, PackageManager};
use crate::util::cancel::CancelToken;
use crate::util::process::Executor;

/// Manages tools through `go get`, `go build` and `go mod tidy`.
pub struct ModulesManager {
    executor: Arc<dyn Executor>,
}

impl ModulesManager {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        ModulesManager { executor }
    }

    fn go(&self, cancel: &CancelToken, args: Vec<String>) -> Result<(), Error> {
        self.executor.exec(cancel, "go", &args)?;
        Ok(())
    }
}

impl PackageManager for ModulesManager {
    fn kind(&self) -> ManagerType {
        ManagerType::Modules
    }

    fn add(&self, cancel: &CancelToken, pkgs: &[String], verbose: bool) -> Result<(), Error> {
        self.go(
            cancel,
            command_args(&["get"], verbose, pkgs.iter().map(String::as_str)),
        )
    }

    fn build(
        &self,
        cancel: &CancelToken,
        output: &Path,
        pkg: &str,
        verbose: bool,
    ) -> Result<(), Error> {
        let output = output.to_string_lossy();
        let mut args = vec!["build".to_string(), "-o".to_string(), output.into_owned()];
        if verbose {
            args.push("-v".to_string());
        }
        args.push(pkg.to_string());
        self.go(cancel, args)
    }

    fn run_in_place(
        &self,
        cancel: &CancelToken,
        pkg: &str,
        args: &[String],
        verbose: bool,
    ) -> Result<(), Error> {
        let rest = std::iter::once(pkg).chain(args.iter().map(String::as_str));
        self.go(cancel, command_args(&["run"], verbose, rest))
    }

    fn sync(&self, cancel: &CancelToken, verbose: bool) -> Result<(), Error> {
        self.go(cancel, command_args(&["mod", "tidy"], verbose, []))
    }
}
