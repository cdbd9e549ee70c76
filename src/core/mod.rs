//! Core data structures for gex.
//!
//! This module contains the foundational types used throughout gex:
//! - Tools and their build modes
//! - The tool manifest
//! - Dependency manager kinds
//! - The error taxonomy

pub mod errors;
pub mod manager_type;
pub mod manifest;
pub mod tool;

pub use errors::{BuildError, BuildErrors, Error};
pub use manager_type::ManagerType;
pub use manifest::Manifest;
pub use tool::{BuildMode, Tool};
