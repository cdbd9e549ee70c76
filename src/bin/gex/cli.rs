//! CLI definitions using clap.

use clap::Parser;

/// Pin, build and run the tools a Go project depends on.
///
/// Tools are declared as blank imports in a `tools.go` manifest and built
/// into the project's `bin/` directory.
#[derive(Parser)]
#[command(name = "gex")]
#[command(author, version, about, long_about = None)]
#[command(override_usage = "gex [OPTIONS] [TOOL] [ARGS]...\n       gex --add <PKG>...")]
pub struct Cli {
    /// Add new tools (`path` or `path@version`)
    #[arg(long = "add", value_name = "PKG")]
    pub add: Vec<String>,

    /// Create an empty manifest
    #[arg(long)]
    pub init: bool,

    /// Build all tools
    #[arg(long)]
    pub build: bool,

    /// Regenerate the manifest and sync dependencies
    #[arg(long)]
    pub regen: bool,

    /// List the tools in the manifest
    #[arg(long)]
    pub list: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Number of tools to build in parallel
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Tool to run, followed by its arguments
    #[arg(
        value_name = "TOOL",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

/// What a single invocation does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Add(Vec<String>),
    Init,
    Build,
    Regenerate,
    List,
    Run { tool: String, args: Vec<String> },
    Help,
}

impl Cli {
    /// The action selected by the flags, in precedence order.
    pub fn action(&self) -> Action {
        if !self.add.is_empty() {
            Action::Add(self.add.clone())
        } else if self.init {
            Action::Init
        } else if self.build {
            Action::Build
        } else if self.regen {
            Action::Regenerate
        } else if self.list {
            Action::List
        } else if let Some((tool, args)) = self.command.split_first() {
            Action::Run {
                tool: tool.clone(),
                args: args.to_vec(),
            }
        } else {
            Action::Help
        }
    }
}
