//! Tool entities and build modes.

use std::fmt;

use crate::core::errors::Error;

/// How a tool is materialized.
///
/// `Unknown` means "no directive was given"; it only exists on individual
/// entries and is resolved against the manifest default before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BuildMode {
    #[default]
    Unknown,
    /// Pre-built into the binary cache.
    Bin,
    /// Tracked only; compiled on demand and never cached.
    NoBin,
}

impl BuildMode {
    /// Resolve an entry's mode against a default.
    pub fn resolve(entry: BuildMode, default: BuildMode) -> BuildMode {
        match entry {
            BuildMode::Unknown => default,
            mode => mode,
        }
    }

    /// The directive token that selects this mode in a manifest comment.
    pub fn directive(&self) -> Option<&'static str> {
        match self {
            BuildMode::Unknown => None,
            BuildMode::Bin => Some("gex:bin"),
            BuildMode::NoBin => Some("gex:nobin"),
        }
    }

    pub fn is_bin(&self) -> bool {
        matches!(self, BuildMode::Bin)
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildMode::Unknown => "unknown",
            BuildMode::Bin => "bin",
            BuildMode::NoBin => "nobin",
        };
        f.write_str(s)
    }
}

/// A Go package providing a development tool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tool {
    pub import_path: String,
    pub build_mode: BuildMode,
}

impl Tool {
    /// Create a tool without a build mode directive.
    pub fn new(import_path: impl Into<String>) -> Self {
        Tool {
            import_path: import_path.into(),
            build_mode: BuildMode::Unknown,
        }
    }

    /// Set an explicit build mode.
    pub fn with_build_mode(mut self, build_mode: BuildMode) -> Self {
        self.build_mode = build_mode;
        self
    }

    /// Create a tool from an `add` spec, dropping any `@version` pin.
    ///
    /// The import path must be non-empty, relative, free of whitespace,
    /// control characters and quotes, and must not end in `/`. A pin, when
    /// present, must not be empty.
    pub fn from_spec(spec: &str) -> Result<Self, Error> {
        let invalid = |reason: String| Error::InvalidSpec {
            spec: spec.to_string(),
            reason,
        };
        let path = strip_version(spec);
        if path.is_empty() {
            return Err(invalid("empty import path".to_string()));
        }
        if path.starts_with('/') {
            return Err(invalid("import path must not be absolute".to_string()));
        }
        if path.ends_with('/') {
            return Err(invalid("import path ends with '/'".to_string()));
        }
        if let Some(c) = path
            .chars()
            .find(|&c| c.is_whitespace() || c.is_control() || matches!(c, '"' | '\\' | '`'))
        {
            return Err(invalid(format!("import path contains {:?}", c)));
        }
        if spec.ends_with('@') {
            return Err(invalid("empty version".to_string()));
        }
        Ok(Tool::new(path))
    }

    /// The executable name.
    ///
    /// This is the last path element, unless that element is a major version
    /// suffix (`/v2`, `/v4`, ...), in which case the element above it is used.
    pub fn name(&self) -> &str {
        let path = self.import_path.trim_end_matches('/');
        let mut segments = path.rsplit('/');
        let last = segments.next().unwrap_or(path);
        if is_major_version(last) {
            if let Some(parent) = segments.next() {
                return parent;
            }
        }
        last
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.import_path)
    }
}

/// Split `path@version` into its path part.
pub fn strip_version(spec: &str) -> &str {
    spec.split_once('@').map_or(spec, |(path, _)| path)
}

/// Whether a spec carries an explicit `@version` pin.
pub fn has_version(spec: &str) -> bool {
    spec.contains('@')
}

fn is_major_version(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name() {
        assert_eq!(Tool::new("github.com/reviewdog/reviewdog").name(), "reviewdog");
        assert_eq!(Tool::new("github.com/org/pkg").name(), "pkg");
        assert_eq!(Tool::new("golang.org/x/lint/golint").name(), "golint");
    }

    #[test]
    fn test_name_skips_major_version() {
        assert_eq!(Tool::new("github.com/volatiletech/sqlboiler/v4").name(), "sqlboiler");
        assert_eq!(Tool::new("github.com/org/pkg/v12").name(), "pkg");
    }

    #[test]
    fn test_name_keeps_version_like_names() {
        // Not a bare major version.
        assert_eq!(Tool::new("github.com/org/tool/v2beta").name(), "v2beta");
        assert_eq!(Tool::new("github.com/org/tool/v").name(), "v");
        assert_eq!(Tool::new("v2").name(), "v2");
    }

    #[test]
    fn test_from_spec_strips_version() {
        let tool = Tool::from_spec("github.com/golang/mock/mockgen@v1.6.0").unwrap();
        assert_eq!(tool.import_path, "github.com/golang/mock/mockgen");
        assert_eq!(tool.build_mode, BuildMode::Unknown);
        assert!(has_version("github.com/golang/mock/mockgen@v1.6.0"));
        assert!(!has_version("github.com/golang/mock/mockgen"));
    }

    #[test]
    fn test_from_spec_rejects_unusable_paths() {
        for spec in [
            "",
            "@v1.0.0",
            "github.com/a/",
            "github.com/a/@v1",
            "/abs/tool",
            "a b",
            "a\"b",
            "pkg@",
        ] {
            let err = Tool::from_spec(spec).unwrap_err();
            assert!(
                matches!(&err, Error::InvalidSpec { spec: s, .. } if s == spec),
                "{:?} gave {}",
                spec,
                err
            );
        }
        assert!(Tool::from_spec("example.com/caf\u{e9}").is_ok());
    }

    #[test]
    fn test_build_mode_resolve() {
        assert_eq!(BuildMode::resolve(BuildMode::Unknown, BuildMode::Bin), BuildMode::Bin);
        assert_eq!(BuildMode::resolve(BuildMode::Unknown, BuildMode::NoBin), BuildMode::NoBin);
        assert_eq!(BuildMode::resolve(BuildMode::NoBin, BuildMode::Bin), BuildMode::NoBin);
        assert_eq!(BuildMode::resolve(BuildMode::Bin, BuildMode::NoBin), BuildMode::Bin);
    }
}
