//! Shell output and progress reporting.
//!
//! All user-facing status lines go through [`Shell`] so that verbosity and
//! color handling live in one place. Diagnostics for developers go through
//! `tracing` instead.

use std::fmt::Display;
use std::io::{self, IsTerminal};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// No output at all
    Quiet,
    /// Status messages + progress bars
    #[default]
    Normal,
    /// Status lines for every step, no progress bars
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    Always,
    Never,
}

/// Status types for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // Success statuses (green)
    Added,
    Created,
    Finished,
    Updated,

    // In-progress statuses (cyan)
    Building,
    Fetching,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Added => "Added",
            Status::Created => "Created",
            Status::Finished => "Finished",
            Status::Updated => "Updated",
            Status::Building => "Building",
            Status::Fetching => "Fetching",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            Status::Added | Status::Created | Status::Finished | Status::Updated => "\x1b[1;32m",
            Status::Building | Status::Fetching => "\x1b[1;36m",
        }
    }
}

/// Status column width.
const STATUS_WIDTH: usize = 12;

/// Central shell for all CLI output.
#[derive(Debug)]
pub struct Shell {
    verbosity: Verbosity,
    use_color: bool,
}

impl Shell {
    pub fn new(verbosity: Verbosity, color: ColorChoice) -> Self {
        let use_color = match color {
            ColorChoice::Auto => io::stderr().is_terminal(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        };
        Shell {
            verbosity,
            use_color,
        }
    }

    /// Create a shell from the `--verbose` and `--no-color` flags.
    pub fn from_flags(verbose: bool, no_color: bool) -> Self {
        let verbosity = if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };
        let color = if no_color {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        };
        Shell::new(verbosity, color)
    }

    /// A shell that prints nothing.
    pub fn quiet() -> Self {
        Shell::new(Verbosity::Quiet, ColorChoice::Never)
    }

    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Print a status message as `{status:>12} {message}` on stderr.
    ///
    /// Quiet shells print nothing.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_quiet() {
            return;
        }
        eprintln!("{} {}", self.format_status(status), msg);
    }

    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();
        if self.use_color {
            format!("{}{:>width$}\x1b[0m", status.color_code(), text, width = STATUS_WIDTH)
        } else {
            format!("{:>width$}", text, width = STATUS_WIDTH)
        }
    }

    /// Create a progress bar over `total` items.
    ///
    /// Quiet and verbose shells, and single-item work, get no bar.
    pub fn progress(&self, total: u64, msg: impl Display) -> Progress {
        let pb = if self.is_quiet() || self.is_verbose() || total <= 1 {
            None
        } else {
            let pb = ProgressBar::new(total);
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-");
            pb.set_style(style);
            pb.set_message(msg.to_string());
            Some(pb)
        };
        Progress {
            pb,
            start: Instant::now(),
        }
    }
}

/// Progress bar wrapper that respects shell verbosity.
///
/// Safe to share between worker threads.
pub struct Progress {
    pb: Option<ProgressBar>,
    start: Instant,
}

impl Progress {
    /// Advance by one finished item.
    pub fn inc(&self) {
        if let Some(pb) = &self.pb {
            pb.inc(1);
        }
    }

    /// Print a line without tearing the bar.
    pub fn println(&self, shell: &Shell, status: Status, msg: impl Display) {
        match &self.pb {
            Some(pb) => pb.suspend(|| shell.status(status, msg)),
            None => shell.status(status, msg),
        }
    }

    /// Remove the bar.
    pub fn finish(&self) {
        if let Some(pb) = &self.pb {
            pb.finish_and_clear();
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Format a duration in a human-readable way.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}
