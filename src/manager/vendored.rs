//! dep back end.
//!
//! Tools are recorded with `dep ensure -add` and built from the project's
//! `vendor/` directory. Adding a package whose project root is already
//! resolved would make dep fail, so [`VendoredManager::add`] filters those
//! out first.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::core::errors::Error;
use crate::core::tool::strip_version;
use crate::core::ManagerType;
use crate::manager::{command_args, PackageManager};
use crate::util::cancel::CancelToken;
use crate::util::fs::relative_path;
use crate::util::process::Executor;

/// One entry of `dep status -json`.
#[derive(Debug, Deserialize)]
struct ProjectStatus {
    #[serde(rename = "ProjectRoot")]
    project_root: String,
}

/// Manages tools vendored with dep.
pub struct VendoredManager {
    executor: Arc<dyn Executor>,
    root_dir: PathBuf,
    working_dir: PathBuf,
}

impl VendoredManager {
    pub fn new(
        executor: Arc<dyn Executor>,
        root_dir: impl Into<PathBuf>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        VendoredManager {
            executor,
            root_dir: root_dir.into(),
            working_dir: working_dir.into(),
        }
    }

    /// The package path to hand to `go build`, relative to the working dir.
    fn target(&self, pkg: &str) -> String {
        vendor_target(&self.working_dir, &self.root_dir, pkg)
    }

    /// Project roots dep has already resolved.
    ///
    /// A failing status query means nothing is resolved yet.
    fn resolved_roots(&self, cancel: &CancelToken) -> Result<HashSet<String>, Error> {
        let out = match self
            .executor
            .output(cancel, "dep", &["status".to_string(), "-json".to_string()])
        {
            Ok(out) => out,
            Err(err) => {
                tracing::debug!("dep status failed, assuming no resolved projects: {}", err);
                return Ok(HashSet::new());
            }
        };
        let projects: Vec<ProjectStatus> =
            serde_json::from_slice(&out).map_err(|err| Error::Status { err })?;
        Ok(projects.into_iter().map(|p| p.project_root).collect())
    }
}

impl PackageManager for VendoredManager {
    fn kind(&self) -> ManagerType {
        ManagerType::Vendored
    }

    fn add(&self, cancel: &CancelToken, pkgs: &[String], verbose: bool) -> Result<(), Error> {
        let roots = self.resolved_roots(cancel)?;
        let pkgs = filter_new_roots(pkgs, &roots);
        if pkgs.is_empty() {
            tracing::debug!("all packages are already resolved by dep");
            return Ok(());
        }

        let args = command_args(&["ensure"], verbose, ["-add"])
            .into_iter()
            .chain(pkgs.into_iter().map(str::to_string))
            .collect::<Vec<_>>();
        self.executor.exec(cancel, "dep", &args)?;
        Ok(())
    }

    fn build(
        &self,
        cancel: &CancelToken,
        output: &Path,
        pkg: &str,
        verbose: bool,
    ) -> Result<(), Error> {
        let mut args = vec![
            "build".to_string(),
            "-o".to_string(),
            output.to_string_lossy().into_owned(),
        ];
        if verbose {
            args.push("-v".to_string());
        }
        args.push(self.target(pkg));
        self.executor.exec(cancel, "go", &args)?;
        Ok(())
    }

    fn run_in_place(
        &self,
        cancel: &CancelToken,
        pkg: &str,
        args: &[String],
        verbose: bool,
    ) -> Result<(), Error> {
        let target = self.target(pkg);
        let rest = std::iter::once(target.as_str()).chain(args.iter().map(String::as_str));
        self.executor
            .exec(cancel, "go", &command_args(&["run"], verbose, rest))?;
        Ok(())
    }

    fn sync(&self, cancel: &CancelToken, verbose: bool) -> Result<(), Error> {
        self.executor
            .exec(cancel, "dep", &command_args(&["ensure"], verbose, []))?;
        Ok(())
    }
}

/// Drop packages that live under an already resolved project root.
///
/// Each package is checked against the roots at every level of its path;
/// `@version` suffixes are ignored for the check but kept in the result.
pub fn filter_new_roots<'a>(pkgs: &'a [String], roots: &HashSet<String>) -> Vec<&'a str> {
    if roots.is_empty() {
        return pkgs.iter().map(String::as_str).collect();
    }
    pkgs.iter()
        .map(String::as_str)
        .filter(|pkg| {
            let path = strip_version(pkg);
            let resolved = path
                .match_indices('/')
                .map(|(i, _)| &path[..i])
                .chain(std::iter::once(path))
                .any(|prefix| roots.contains(prefix));
            if resolved {
                tracing::debug!("skipping {}: its project is already resolved", pkg);
            }
            !resolved
        })
        .collect()
}

/// Path of `pkg` inside the root's `vendor/` directory, relative to
/// `working_dir`.
///
/// Relative paths that stay below the working directory get a `./` prefix so
/// `go` treats them as directories rather than import paths.
pub fn vendor_target(working_dir: &Path, root_dir: &Path, pkg: &str) -> String {
    let target = relative_path(working_dir, root_dir)
        .join("vendor")
        .join(pkg);
    let target = target.to_string_lossy();
    if target.starts_with("..") || Path::new(target.as_ref()).is_absolute() {
        target.into_owned()
    } else {
        format!(".{}{}", std::path::MAIN_SEPARATOR, target)
    }
}
