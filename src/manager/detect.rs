//! Detection of the dependency manager in use.

use std::path::{Path, PathBuf};

use crate::core::ManagerType;
use crate::util::cancel::CancelToken;
use crate::util::fs::find_ancestor_with;
use crate::util::process::Executor;

const DEP_MANIFEST: &str = "Gopkg.toml";
const GO_MOD: &str = "go.mod";

/// The detected manager and the project root it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub manager_type: ManagerType,
    /// `None` when no manager was detected.
    pub root_dir: Option<PathBuf>,
}

impl Detection {
    fn found(manager_type: ManagerType, root_dir: impl Into<PathBuf>) -> Self {
        Detection {
            manager_type,
            root_dir: Some(root_dir.into()),
        }
    }

    fn unknown() -> Self {
        Detection {
            manager_type: ManagerType::Unknown,
            root_dir: None,
        }
    }

    /// Move the root down to the directory holding `manifest_name` when that
    /// directory lies deeper than the detected root.
    pub fn adjust_root(mut self, working_dir: &Path, manifest_name: &str) -> Self {
        if let Some(dir) = find_ancestor_with(working_dir, manifest_name) {
            let deeper = match &self.root_dir {
                Some(root) => dir.components().count() > root.components().count(),
                None => true,
            };
            if deeper {
                tracing::debug!("using {} as the project root", dir.display());
                self.root_dir = Some(dir);
            }
        }
        self
    }
}

/// Decide which manager governs `working_dir`.
///
/// dep wins when a `Gopkg.toml` is found; otherwise modules are used when
/// `go env GOMOD` names a module file, a `go.mod` exists above the working
/// directory, or `force_modules` is set.
pub fn detect(
    working_dir: &Path,
    executor: &dyn Executor,
    cancel: &CancelToken,
    force_modules: bool,
) -> Detection {
    if let Some(root) = find_ancestor_with(working_dir, DEP_MANIFEST) {
        tracing::debug!("found {} in {}", DEP_MANIFEST, root.display());
        return Detection::found(ManagerType::Vendored, root);
    }

    if let Some(root) = go_env_gomod(executor, cancel) {
        tracing::debug!("go env GOMOD reports a module at {}", root.display());
        return Detection::found(ManagerType::Modules, root);
    }

    if let Some(root) = find_ancestor_with(working_dir, GO_MOD) {
        tracing::debug!("found {} in {}", GO_MOD, root.display());
        return Detection::found(ManagerType::Modules, root);
    }

    if force_modules {
        tracing::debug!("module mode is forced");
        return Detection::found(ManagerType::Modules, working_dir);
    }

    Detection::unknown()
}

/// Directory of the module file reported by `go env GOMOD`.
fn go_env_gomod(executor: &dyn Executor, cancel: &CancelToken) -> Option<PathBuf> {
    let out = match executor.output(cancel, "go", &["env".to_string(), "GOMOD".to_string()]) {
        Ok(out) => out,
        Err(err) => {
            tracing::debug!("go env GOMOD failed: {}", err);
            return None;
        }
    };
    let gomod = String::from_utf8_lossy(&out);
    let gomod = gomod.trim_end_matches(['\r', '\n']);
    if gomod.is_empty() || gomod == "/dev/null" || gomod == "NUL" {
        return None;
    }
    Path::new(gomod).parent().map(Path::to_path_buf)
}
