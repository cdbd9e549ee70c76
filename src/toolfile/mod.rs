//! Reading and writing the `tools.go` manifest file.

pub mod lexer;
pub mod parser;
pub mod writer;

pub use parser::ManifestParser;
pub use writer::ManifestWriter;
