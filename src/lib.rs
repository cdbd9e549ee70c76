//! gex - tool dependency manager for Go projects
//!
//! Development tools (linters, code generators, mock generators) are declared
//! as blank imports in a `tools.go` manifest, pinned through the project's
//! dependency manager (Go modules or dep) and built into a local binary
//! cache.

pub mod core;
pub mod manager;
pub mod ops;
pub mod toolfile;
pub mod util;

/// Test utilities and mocks for gex unit tests.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{BuildMode, Error, ManagerType, Manifest, Tool};
pub use ops::{Repository, RepositoryConfig};
pub use util::context::GlobalContext;
