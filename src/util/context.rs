//! Global context for gex operations.
//!
//! Gathers the working directory, environment, configuration files and the
//! detected dependency manager into the values a [`Repository`] is built
//! from.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::core::errors::Error;
use crate::core::ManagerType;
use crate::manager::{self, detect};
use crate::ops::repository::{Repository, RepositoryConfig};
use crate::util::cancel::CancelToken;
use crate::util::config::{self, Config, PROJECT_CONFIG};
use crate::util::fs::find_ancestor_with;
use crate::util::process::{CommandExecutor, Executor};
use crate::util::shell::Shell;

/// A project as seen from the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub manager_type: ManagerType,
    pub config: Config,
    pub repository: RepositoryConfig,
}

#[derive(Debug, Clone)]
pub struct GlobalContext {
    cwd: PathBuf,

    /// Global config file, if the platform has a config directory.
    global_config: Option<PathBuf>,

    /// `GO111MODULE=on` in the environment.
    modules_env: bool,

    verbose: bool,

    /// Job count from the command line; overrides config files.
    jobs: Option<usize>,
}

impl GlobalContext {
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        let modules_env = std::env::var("GO111MODULE").is_ok_and(|v| v == "on");
        Ok(GlobalContext {
            cwd,
            global_config: config::global_config_path(),
            modules_env,
            verbose: false,
            jobs: None,
        })
    }

    /// A context rooted at `cwd` that ignores the environment and the
    /// global config file.
    pub fn with_cwd(cwd: impl Into<PathBuf>) -> Self {
        GlobalContext {
            cwd: cwd.into(),
            global_config: None,
            modules_env: false,
            verbose: false,
            jobs: None,
        }
    }

    pub fn with_modules_env(mut self, on: bool) -> Self {
        self.modules_env = on;
        self
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn set_jobs(&mut self, jobs: Option<usize>) {
        self.jobs = jobs;
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Merged configuration for the project containing the working directory.
    pub fn load_config(&self) -> Config {
        let project_dir =
            find_ancestor_with(&self.cwd, PROJECT_CONFIG).unwrap_or_else(|| self.cwd.clone());
        config::load_config(
            self.global_config.as_deref(),
            &config::project_config_path(&project_dir),
        )
    }

    /// Detect the manager and project root and resolve all settings.
    pub fn resolve_project(&self, executor: &dyn Executor, cancel: &CancelToken) -> Project {
        let config = self.load_config();
        let force_modules = self.modules_env || config.force_modules();
        let detection = detect(&self.cwd, executor, cancel, force_modules)
            .adjust_root(&self.cwd, config.manifest_name());
        tracing::debug!(
            "detected manager {} with root {:?}",
            detection.manager_type,
            detection.root_dir
        );

        let root_dir = detection.root_dir.unwrap_or_else(|| self.cwd.clone());
        let repository = RepositoryConfig {
            working_dir: self.cwd.clone(),
            root_dir,
            manifest_name: config.manifest_name().to_string(),
            bin_dir_name: config.bin_dir_name().to_string(),
            verbose: self.verbose,
            jobs: self.jobs.unwrap_or_else(|| config.jobs()).max(1),
        };
        Project {
            manager_type: detection.manager_type,
            config,
            repository,
        }
    }

    /// Create a repository that runs real commands.
    pub fn create_repository(
        &self,
        cancel: &CancelToken,
        shell: Shell,
    ) -> Result<Repository, Error> {
        let detect_exec = CommandExecutor::new(&self.cwd, &self.cwd.join(config::DEFAULT_BIN_DIR));
        let project = self.resolve_project(&detect_exec, cancel);
        if project.manager_type == ManagerType::Unknown {
            return Err(Error::UnknownManager);
        }

        let executor: Arc<dyn Executor> = Arc::new(CommandExecutor::new(
            &self.cwd,
            &project.repository.bin_dir(),
        ));
        self.build_repository(project, executor, shell)
    }

    /// Create a repository for a resolved project on top of `executor`.
    pub fn build_repository(
        &self,
        project: Project,
        executor: Arc<dyn Executor>,
        shell: Shell,
    ) -> Result<Repository, Error> {
        let manager = manager::create(
            project.manager_type,
            Arc::clone(&executor),
            &project.repository.root_dir,
            &project.repository.working_dir,
        )?;
        Ok(Repository::new(project.repository, manager, executor, shell))
    }
}
