//! The in-memory tool manifest.
//!
//! A manifest holds at most one [`Tool`] per executable name. Iteration is
//! always ordered by import path so that serialized output is stable.

use std::collections::HashMap;

use crate::core::{BuildMode, ManagerType, Tool};

/// A set of tools keyed by executable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    tools: HashMap<String, Tool>,
    manager_type: ManagerType,
    default_build_mode: BuildMode,
}

impl Manifest {
    /// Create a manifest from a list of tools.
    ///
    /// Later tools replace earlier ones with the same name.
    pub fn new(tools: impl IntoIterator<Item = Tool>, manager_type: ManagerType) -> Self {
        let mut manifest = Manifest {
            tools: HashMap::new(),
            manager_type,
            default_build_mode: BuildMode::Bin,
        };
        for tool in tools {
            manifest.add_tool(tool);
        }
        manifest
    }

    /// Create an empty manifest.
    pub fn empty(manager_type: ManagerType) -> Self {
        Manifest::new(Vec::new(), manager_type)
    }

    /// Set the default build mode. `Unknown` falls back to `Bin`.
    pub fn with_default_build_mode(mut self, mode: BuildMode) -> Self {
        self.default_build_mode = BuildMode::resolve(mode, BuildMode::Bin);
        self
    }

    pub fn manager_type(&self) -> ManagerType {
        self.manager_type
    }

    pub fn default_build_mode(&self) -> BuildMode {
        self.default_build_mode
    }

    /// Insert or replace a tool by name.
    pub fn add_tool(&mut self, tool: Tool) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Look up a tool by executable name.
    pub fn find_tool(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Tools ordered by import path (byte-wise).
    pub fn tools(&self) -> impl Iterator<Item = &Tool> + '_ {
        let mut tools: Vec<&Tool> = self.tools.values().collect();
        tools.sort_by(|a, b| a.import_path.as_bytes().cmp(b.import_path.as_bytes()));
        tools.into_iter()
    }

    /// The mode a tool is actually built with.
    pub fn effective_mode(&self, tool: &Tool) -> BuildMode {
        BuildMode::resolve(tool.build_mode, self.default_build_mode)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(m: &Manifest) -> Vec<&str> {
        m.tools().map(|t| t.import_path.as_str()).collect()
    }

    #[test]
    fn test_tools_sorted_by_import_path() {
        let m = Manifest::new(
            vec![
                Tool::new("golang.org/x/lint/golint"),
                Tool::new("github.com/srvc/wraperr/cmd/wraperr"),
                Tool::new("github.com/golang/mock/mockgen"),
                Tool::new("github.com/Masterminds/glide"),
            ],
            ManagerType::Modules,
        );

        // Byte-wise: uppercase sorts before lowercase.
        assert_eq!(
            paths(&m),
            vec![
                "github.com/Masterminds/glide",
                "github.com/golang/mock/mockgen",
                "github.com/srvc/wraperr/cmd/wraperr",
                "golang.org/x/lint/golint",
            ]
        );
    }

    #[test]
    fn test_tools_is_restartable() {
        let m = Manifest::new(
            vec![Tool::new("b/tool2"), Tool::new("a/tool1")],
            ManagerType::Modules,
        );
        assert_eq!(paths(&m), paths(&m));
        assert_eq!(m.tools().count(), 2);
    }

    #[test]
    fn test_same_name_last_write_wins() {
        let mut m = Manifest::new(
            vec![Tool::new("github.com/a/lint"), Tool::new("github.com/b/lint")],
            ManagerType::Modules,
        );
        assert_eq!(m.len(), 1);
        assert_eq!(m.find_tool("lint").unwrap().import_path, "github.com/b/lint");

        m.add_tool(Tool::new("github.com/c/lint/v3"));
        assert_eq!(m.len(), 1);
        assert_eq!(paths(&m), vec!["github.com/c/lint/v3"]);
    }

    #[test]
    fn test_add_tool_is_idempotent() {
        let mut m = Manifest::empty(ManagerType::Modules);
        m.add_tool(Tool::new("pkg/tool1"));
        let before = m.clone();
        m.add_tool(Tool::new("pkg/tool1"));
        assert_eq!(m, before);
    }

    #[test]
    fn test_find_tool() {
        let m = Manifest::new(
            vec![Tool::new("github.com/volatiletech/sqlboiler/v4")],
            ManagerType::Modules,
        );
        assert!(m.find_tool("sqlboiler").is_some());
        assert!(m.find_tool("v4").is_none());
        assert!(m.find_tool("missing").is_none());
    }

    #[test]
    fn test_default_build_mode_never_unknown() {
        let m = Manifest::empty(ManagerType::Modules);
        assert_eq!(m.default_build_mode(), BuildMode::Bin);

        let m = Manifest::empty(ManagerType::Modules).with_default_build_mode(BuildMode::Unknown);
        assert_eq!(m.default_build_mode(), BuildMode::Bin);

        let m = Manifest::empty(ManagerType::Vendored).with_default_build_mode(BuildMode::NoBin);
        assert_eq!(m.default_build_mode(), BuildMode::NoBin);
    }

    #[test]
    fn test_effective_mode() {
        let m = Manifest::empty(ManagerType::Modules).with_default_build_mode(BuildMode::NoBin);
        assert_eq!(m.effective_mode(&Tool::new("a/b")), BuildMode::NoBin);
        assert_eq!(
            m.effective_mode(&Tool::new("a/c").with_build_mode(BuildMode::Bin)),
            BuildMode::Bin
        );
    }
}
