//! Test fixtures for common test scenarios.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A Go project laid out on disk.
#[derive(Debug, Clone)]
pub struct ProjectFixture {
    /// Project directory name.
    pub name: String,
    /// Files relative to the project root.
    pub files: BTreeMap<PathBuf, String>,
}

impl ProjectFixture {
    /// Create a new empty project fixture.
    pub fn new(name: impl Into<String>) -> Self {
        ProjectFixture {
            name: name.into(),
            files: BTreeMap::new(),
        }
    }

    /// A modules project with a `go.mod`.
    pub fn modules(name: impl Into<String>) -> Self {
        let name = name.into();
        let go_mod = format!("module example.com/{}\n\ngo 1.21\n", name);
        ProjectFixture::new(name).with_file("go.mod", go_mod)
    }

    /// A dep project with a `Gopkg.toml`.
    pub fn dep(name: impl Into<String>) -> Self {
        ProjectFixture::new(name).with_file("Gopkg.toml", "# dep manifest\n")
    }

    /// Add a `tools.go` manifest.
    pub fn with_manifest(self, manifest: impl Into<String>) -> Self {
        self.with_file("tools.go", manifest)
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Write the project under `base_path`, returning its root.
    pub fn write_to(&self, base_path: &Path) -> std::io::Result<PathBuf> {
        let project_path = base_path.join(&self.name);
        std::fs::create_dir_all(&project_path)?;

        for (rel_path, content) in &self.files {
            let full_path = project_path.join(rel_path);
            if let Some(parent) = full_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&full_path, content)?;
        }

        Ok(project_path)
    }
}

/// Manifest sources.
pub mod manifests {
    /// A manifest importing `paths`, without directives.
    pub fn tools(paths: &[&str]) -> String {
        let mut src = String::from("// +build tools\n\npackage tools\n\nimport (\n");
        for path in paths {
            src.push_str(&format!("\t_ \"{}\"\n", path));
        }
        src.push_str(")\n");
        src
    }

    /// A manifest with one regular tool and one `gex:nobin` tool.
    pub fn with_nobin(bin: &str, nobin: &str) -> String {
        format!(
            "package tools\n\nimport (\n\t_ \"{}\"\n\t// gex:nobin\n\t_ \"{}\"\n)\n",
            bin, nobin
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_project() {
        let tmp = TempDir::new().unwrap();
        let root = ProjectFixture::modules("app")
            .with_manifest(manifests::tools(&["golang.org/x/lint/golint"]))
            .write_to(tmp.path())
            .unwrap();

        assert!(root.join("go.mod").is_file());
        let manifest = std::fs::read_to_string(root.join("tools.go")).unwrap();
        assert!(manifest.contains("_ \"golang.org/x/lint/golint\""));
    }
}
