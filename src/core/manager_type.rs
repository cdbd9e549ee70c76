//! Dependency manager kinds.

use std::fmt;

/// The dependency management tool a project uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ManagerType {
    #[default]
    Unknown,
    /// Go modules (`go.mod`).
    Modules,
    /// dep (`Gopkg.toml` + `vendor/`).
    Vendored,
}

impl ManagerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManagerType::Unknown => "unknown",
            ManagerType::Modules => "mod",
            ManagerType::Vendored => "dep",
        }
    }
}

impl fmt::Display for ManagerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
