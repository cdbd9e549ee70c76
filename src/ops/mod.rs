//! High-level operations.

pub mod repository;

pub use repository::{Repository, RepositoryConfig};
