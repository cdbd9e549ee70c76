//! Manifest writer.

use std::fmt::Write as _;
use std::path::{Component, Path};

use crate::core::errors::Error;
use crate::core::{BuildMode, Manifest};
use crate::util::config::{DEFAULT_BIN_DIR, DEFAULT_MANIFEST};
use crate::util::fs::{relative_path, write_atomic};

const HEADER: &str = "// Code generated by github.com/izumin5210/gex. DO NOT EDIT.";

/// Serializes manifests to Go source.
///
/// `manifest_name` and `bin_dir_name` are both relative to the project root.
/// `go generate` runs in the manifest's directory, so the generated `-o`
/// paths are relative to that directory.
#[derive(Debug, Clone)]
pub struct ManifestWriter {
    manifest_name: String,
    bin_dir_name: String,
}

impl ManifestWriter {
    pub fn new(manifest_name: impl Into<String>, bin_dir_name: impl Into<String>) -> Self {
        ManifestWriter {
            manifest_name: manifest_name.into(),
            bin_dir_name: bin_dir_name.into(),
        }
    }

    /// The binary cache as seen from the manifest's directory.
    fn generate_output_dir(&self) -> String {
        let manifest_dir = Path::new(&self.manifest_name)
            .parent()
            .unwrap_or_else(|| Path::new(""));
        let dir = slash_path(&relative_path(manifest_dir, Path::new(&self.bin_dir_name)));
        if dir.is_empty() {
            ".".to_string()
        } else if dir == ".." || dir.starts_with("../") || Path::new(&dir).is_absolute() {
            dir
        } else {
            format!("./{}", dir)
        }
    }

    /// Render the manifest source.
    ///
    /// Output depends only on the manifest contents, never on insertion order.
    pub fn render(&self, manifest: &Manifest) -> String {
        let mut out = String::new();
        out.push_str(HEADER);
        out.push('\n');
        if manifest.default_build_mode() == BuildMode::NoBin {
            out.push_str("// gex:nobin\n");
        }
        out.push('\n');
        out.push_str("//go:build tools\n// +build tools\n\n");
        out.push_str("package tools\n");

        if manifest.is_empty() {
            return out;
        }

        out.push_str("\n// tool dependencies\nimport (\n");
        for tool in manifest.tools() {
            if let Some(directive) = tool.build_mode.directive() {
                let _ = writeln!(out, "\t// {}", directive);
            }
            let _ = writeln!(out, "\t_ {}", quote(&tool.import_path));
        }
        out.push_str(")\n");

        let bins: Vec<_> = manifest
            .tools()
            .filter(|t| manifest.effective_mode(t).is_bin())
            .collect();
        if !bins.is_empty() {
            out.push_str("\n// If you want to use tools, please run the following command:\n");
            let _ = writeln!(
                out,
                "//  go generate ./{}\n//",
                slash_path(Path::new(&self.manifest_name))
            );
            let output_dir = self.generate_output_dir();
            for tool in bins {
                let _ = writeln!(
                    out,
                    "//go:generate go build -v -o={}/{} {}",
                    output_dir,
                    tool.name(),
                    tool.import_path
                );
            }
        }
        out
    }

    /// Render the manifest and atomically replace the file at `path`.
    pub fn write(&self, path: &Path, manifest: &Manifest) -> Result<(), Error> {
        let contents = self.render(manifest);
        write_atomic(path, contents.as_bytes()).map_err(|err| Error::Write {
            path: path.to_path_buf(),
            err,
        })?;
        tracing::debug!("wrote {} tool(s) to {}", manifest.len(), path.display());
        Ok(())
    }
}

/// `path` with `/` separators and without `.` components.
fn slash_path(path: &Path) -> String {
    let mut out = String::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::RootDir => out.push('/'),
            Component::Prefix(prefix) => out.push_str(&prefix.as_os_str().to_string_lossy()),
            other => {
                if !out.is_empty() && !out.ends_with('/') {
                    out.push('/');
                }
                out.push_str(&other.as_os_str().to_string_lossy());
            }
        }
    }
    out
}

/// Quote `s` as a Go interpreted string literal.
///
/// Printable characters are kept as is; `"`, `\\` and anything Go would not
/// print get the escapes `strconv.Quote` uses.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\x07' => out.push_str("\\a"),
            '\x08' => out.push_str("\\b"),
            '\x0c' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x0b' => out.push_str("\\v"),
            c if is_printable(c) => out.push(c),
            c if (c as u32) < 0x80 => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c if (c as u32) < 0x10000 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => {
                let _ = write!(out, "\\U{:08x}", c as u32);
            }
        }
    }
    out.push('"');
    out
}

/// Go's notion of a printable rune: no controls, no spacing other than the
/// ASCII space, no invisible format characters.
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    if c.is_control() || c.is_whitespace() {
        return false;
    }
    !matches!(
        c,
        '\u{ad}'
            | '\u{600}'..='\u{605}'
            | '\u{61c}'
            | '\u{6dd}'
            | '\u{70f}'
            | '\u{180e}'
            | '\u{200b}'..='\u{200f}'
            | '\u{202a}'..='\u{202e}'
            | '\u{2060}'..='\u{206f}'
            | '\u{e000}'..='\u{f8ff}'
            | '\u{feff}'
            | '\u{fff9}'..='\u{fffb}'
            | '\u{fffe}'..='\u{ffff}'
            | '\u{f0000}'..='\u{10ffff}'
    )
}

impl Default for ManifestWriter {
    fn default() -> Self {
        ManifestWriter::new(DEFAULT_MANIFEST, DEFAULT_BIN_DIR)
    }
}
