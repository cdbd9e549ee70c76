//! The tool repository: list, add, build and run the tools of a project.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use rayon::prelude::*;

use crate::core::errors::{BuildError, BuildErrors, Error};
use crate::core::tool::has_version;
use crate::core::{BuildMode, Manifest, Tool};
use crate::manager::PackageManager;
use crate::toolfile::{ManifestParser, ManifestWriter};
use crate::util::cancel::CancelToken;
use crate::util::config::{DEFAULT_BIN_DIR, DEFAULT_JOBS, DEFAULT_MANIFEST};
use crate::util::fs::ensure_dir;
use crate::util::process::Executor;
use crate::util::shell::{format_duration, Progress, Shell, Status};

/// Locations and options for a [`Repository`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Directory commands run in.
    pub working_dir: PathBuf,
    /// Project root holding the manifest and the binary cache.
    pub root_dir: PathBuf,
    pub manifest_name: String,
    pub bin_dir_name: String,
    pub verbose: bool,
    /// Maximum number of concurrent builds.
    pub jobs: usize,
}

impl RepositoryConfig {
    /// A config with default names rooted at `root_dir`.
    pub fn new(working_dir: impl Into<PathBuf>, root_dir: impl Into<PathBuf>) -> Self {
        RepositoryConfig {
            working_dir: working_dir.into(),
            root_dir: root_dir.into(),
            manifest_name: DEFAULT_MANIFEST.to_string(),
            bin_dir_name: DEFAULT_BIN_DIR.to_string(),
            verbose: false,
            jobs: DEFAULT_JOBS,
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root_dir.join(&self.manifest_name)
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root_dir.join(&self.bin_dir_name)
    }

    /// Cache location of the executable called `name`.
    pub fn bin_path(&self, name: &str) -> PathBuf {
        self.bin_dir().join(name)
    }
}

/// Manages the tools declared in a project's manifest.
///
/// Every operation re-reads the manifest; the binary cache directory is the
/// only state kept between runs. A cached binary is never rebuilt: delete it
/// to force a rebuild.
pub struct Repository {
    config: RepositoryConfig,
    manager: Box<dyn PackageManager>,
    executor: Arc<dyn Executor>,
    parser: ManifestParser,
    writer: ManifestWriter,
    shell: Shell,
    build_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Repository {
    pub fn new(
        config: RepositoryConfig,
        manager: Box<dyn PackageManager>,
        executor: Arc<dyn Executor>,
        shell: Shell,
    ) -> Self {
        let parser = ManifestParser::new(manager.kind());
        let writer = ManifestWriter::new(&config.manifest_name, &config.bin_dir_name);
        Repository {
            config,
            manager,
            executor,
            parser,
            writer,
            shell,
            build_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    fn load_manifest(&self) -> Result<Manifest, Error> {
        self.parser.parse(&self.config.manifest_path())
    }

    /// The tools declared in the manifest.
    pub fn list(&self) -> Result<Vec<Tool>, Error> {
        let manifest = self.load_manifest().map_err(|e| e.context("list tools"))?;
        Ok(manifest.tools().cloned().collect())
    }

    /// Add tools to the manifest and build the ones that produce binaries.
    ///
    /// `specs` are import paths, optionally pinned as `path@version`. Pinned
    /// batches are fetched through the package manager before the manifest
    /// changes. A failure part way through leaves earlier steps in place.
    pub fn add(&self, cancel: &CancelToken, specs: &[String]) -> Result<(), Error> {
        self.add_tools(cancel, specs)
            .map_err(|e| e.context(format!("add {}", specs.join(", "))))
    }

    fn add_tools(&self, cancel: &CancelToken, specs: &[String]) -> Result<(), Error> {
        let tools = specs
            .iter()
            .map(|spec| Tool::from_spec(spec))
            .collect::<Result<Vec<_>, _>>()?;

        if specs.iter().any(|s| has_version(s)) {
            self.shell.status(Status::Fetching, specs.join(" "));
            self.manager.add(cancel, specs, self.config.verbose)?;
        }

        let path = self.config.manifest_path();
        let mut manifest = match self.parser.parse(&path) {
            Ok(manifest) => manifest,
            Err(Error::ManifestNotFound { .. }) => {
                tracing::debug!("{} does not exist, starting an empty manifest", path.display());
                Manifest::empty(self.manager.kind())
            }
            Err(err) => return Err(err),
        };

        let mut added = Vec::with_capacity(tools.len());
        for tool in tools {
            match manifest.find_tool(tool.name()) {
                Some(existing) if existing.import_path == tool.import_path => {
                    tracing::debug!("{} is already in the manifest", tool);
                    added.push(existing.clone());
                }
                _ => {
                    manifest.add_tool(tool.clone());
                    self.shell.status(Status::Added, &tool);
                    added.push(tool);
                }
            }
        }

        self.writer.write(&path, &manifest)?;
        self.manager.sync(cancel, self.config.verbose)?;

        let bins: Vec<Tool> = added
            .into_iter()
            .filter(|t| manifest.effective_mode(t).is_bin())
            .collect();
        self.build_tools(cancel, &bins)?;
        Ok(())
    }

    /// Make sure the binary for `tool` is in the cache and return its path.
    ///
    /// Concurrent calls for the same name build at most once.
    pub fn build(&self, cancel: &CancelToken, tool: &Tool) -> Result<PathBuf, Error> {
        self.build_tool(cancel, tool, None)
    }

    fn build_lock(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .build_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(name.to_string()).or_default())
    }

    fn build_tool(
        &self,
        cancel: &CancelToken,
        tool: &Tool,
        progress: Option<&Progress>,
    ) -> Result<PathBuf, Error> {
        let name = tool.name();
        let lock = self.build_lock(name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let bin_path = self.config.bin_path(name);
        match fs::metadata(&bin_path) {
            Ok(meta) if meta.is_dir() => Err(Error::InvalidCacheEntry { path: bin_path }),
            Ok(_) => {
                tracing::debug!("{} is cached at {}", name, bin_path.display());
                Ok(bin_path)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                self.report(progress, Status::Building, tool);
                tracing::info!("building {} into {}", tool, bin_path.display());
                self.compile(cancel, tool, &bin_path)?;
                Ok(bin_path)
            }
            Err(err) => Err(Error::Io {
                context: format!("failed to inspect {}", bin_path.display()),
                err,
            }),
        }
    }

    fn compile(&self, cancel: &CancelToken, tool: &Tool, bin_path: &Path) -> Result<(), Error> {
        let bin_dir = self.config.bin_dir();
        ensure_dir(&bin_dir).map_err(|err| Error::Io {
            context: format!("failed to create {}", bin_dir.display()),
            err,
        })?;
        self.manager
            .build(cancel, bin_path, &tool.import_path, self.config.verbose)
            .map_err(|e| Error::Build(BuildError::new(tool.clone(), e)))
    }

    fn report(&self, progress: Option<&Progress>, status: Status, msg: impl std::fmt::Display) {
        match progress {
            Some(progress) => progress.println(&self.shell, status, msg),
            None => self.shell.status(status, msg),
        }
    }

    /// Build every tool in the manifest that produces a binary.
    ///
    /// All builds run to completion; failures are collected into
    /// [`Error::BuildAll`].
    pub fn build_all(&self, cancel: &CancelToken) -> Result<Vec<PathBuf>, Error> {
        let manifest = self.load_manifest().map_err(|e| e.context("build tools"))?;
        let (bins, skipped): (Vec<Tool>, Vec<Tool>) = manifest
            .tools()
            .cloned()
            .partition(|t| manifest.effective_mode(t).is_bin());
        for tool in &skipped {
            tracing::debug!("{} is not prebuilt ({})", tool, BuildMode::NoBin);
        }
        self.build_tools(cancel, &bins)
    }

    /// Build `tools` concurrently, bounded by the configured job count.
    fn build_tools(&self, cancel: &CancelToken, tools: &[Tool]) -> Result<Vec<PathBuf>, Error> {
        if tools.is_empty() {
            return Ok(Vec::new());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.jobs.max(1))
            .build()
            .map_err(|err| Error::Workers { err })?;

        let errors = BuildErrors::new();
        let progress = self.shell.progress(tools.len() as u64, "Building tools");

        let paths: Vec<PathBuf> = pool.install(|| {
            tools
                .par_iter()
                .filter_map(|tool| {
                    let result = self.build_tool(cancel, tool, Some(&progress));
                    progress.inc();
                    match result {
                        Ok(path) => Some(path),
                        Err(err) => {
                            tracing::debug!("{} failed: {}", tool, err);
                            errors.append(tool, err);
                            None
                        }
                    }
                })
                .collect()
        });
        progress.finish();

        errors.into_result()?;
        self.shell.status(
            Status::Finished,
            format!(
                "{} tool(s) in {}",
                paths.len(),
                format_duration(progress.elapsed())
            ),
        );
        Ok(paths)
    }

    /// Run the tool called `name` with `args`.
    ///
    /// Binary tools are built on first use and run from the cache. Tools
    /// marked `nobin` are compiled and run in place each time.
    pub fn run(&self, cancel: &CancelToken, name: &str, args: &[String]) -> Result<(), Error> {
        self.run_tool(cancel, name, args)
            .map_err(|e| e.context(format!("run {}", name)))
    }

    fn run_tool(&self, cancel: &CancelToken, name: &str, args: &[String]) -> Result<(), Error> {
        let manifest = self.load_manifest()?;
        let tool = manifest.find_tool(name).ok_or_else(|| Error::ToolNotFound {
            name: name.to_string(),
        })?;

        match manifest.effective_mode(tool) {
            BuildMode::NoBin => {
                tracing::debug!("running {} in place", tool);
                self.manager
                    .run_in_place(cancel, &tool.import_path, args, self.config.verbose)
            }
            _ => {
                let bin_path = self.build(cancel, tool)?;
                self.executor
                    .exec(cancel, &bin_path.to_string_lossy(), args)?;
                Ok(())
            }
        }
    }

    /// Create an empty manifest.
    pub fn init(&self) -> Result<PathBuf, Error> {
        let path = self.config.manifest_path();
        if path.exists() {
            return Err(Error::ManifestExists { path }.context("initialize the manifest"));
        }
        self.writer
            .write(&path, &Manifest::empty(self.manager.kind()))
            .map_err(|e| e.context("initialize the manifest"))?;
        self.shell.status(Status::Created, path.display());
        Ok(path)
    }

    /// Rewrite the manifest in canonical form and sync dependencies.
    pub fn regenerate(&self, cancel: &CancelToken) -> Result<(), Error> {
        let path = self.config.manifest_path();
        let regenerate = || -> Result<(), Error> {
            let manifest = self.parser.parse(&path)?;
            self.writer.write(&path, &manifest)?;
            self.manager.sync(cancel, self.config.verbose)?;
            self.shell.status(Status::Updated, path.display());
            Ok(())
        };
        regenerate().map_err(|e| e.context("regenerate the manifest"))
    }
}
