//! Configuration file support for gex.
//!
//! gex reads two optional configuration files:
//! - Global: `<config dir>/gex/config.toml` - User-wide defaults
//! - Project: `<root>/.gex.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config. Unset keys fall back
//! to the built-in defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default manifest file name.
pub const DEFAULT_MANIFEST: &str = "tools.go";
/// Default binary cache directory name.
pub const DEFAULT_BIN_DIR: &str = "bin";
/// Default number of concurrent builds.
pub const DEFAULT_JOBS: usize = 4;

/// Project config file name.
pub const PROJECT_CONFIG: &str = ".gex.toml";

/// gex configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub build: BuildConfig,
    pub manager: ManagerConfig,
}

/// Manifest and binary cache locations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Manifest file name, relative to the project root
    pub manifest: Option<String>,

    /// Binary cache directory name, relative to the project root
    pub bin_dir: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Number of tools built concurrently
    pub jobs: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Use Go modules even when no `go.mod` is found
    pub force_modules: Option<bool>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Load configuration, falling back to defaults when the file is
    /// missing or broken.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("ignoring config {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.tools.manifest.is_some() {
            self.tools.manifest = other.tools.manifest;
        }
        if other.tools.bin_dir.is_some() {
            self.tools.bin_dir = other.tools.bin_dir;
        }
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if other.manager.force_modules.is_some() {
            self.manager.force_modules = other.manager.force_modules;
        }
    }

    pub fn manifest_name(&self) -> &str {
        self.tools.manifest.as_deref().unwrap_or(DEFAULT_MANIFEST)
    }

    pub fn bin_dir_name(&self) -> &str {
        self.tools.bin_dir.as_deref().unwrap_or(DEFAULT_BIN_DIR)
    }

    /// Concurrent builds, at least one.
    pub fn jobs(&self) -> usize {
        self.build.jobs.unwrap_or(DEFAULT_JOBS).max(1)
    }

    pub fn force_modules(&self) -> bool {
        self.manager.force_modules.unwrap_or(false)
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.gex.toml)
/// 2. Global config (<config dir>/gex/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }
    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global gex config directory.
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.config_dir().join("gex"))
}

/// Get the global config path.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path.
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(PROJECT_CONFIG)
}
