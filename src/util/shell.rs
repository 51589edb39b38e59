//! Shell output for the CLI.
//!
//! Every user-facing line goes through [`Shell`]:
//! - status lines with a right-aligned, colored status word
//! - a progress bar for long-running restores (via indicatif)
//! - JSON output for machine-readable listings
//!
//! Human and JSON output are mutually exclusive. Diagnostics for
//! developers go through `tracing`, not through the shell.

use std::fmt::Display;
use std::io::{self, IsTerminal, Write};

use indicatif::{ProgressBar, ProgressStyle};

/// Shell output mode - Human and Json are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellMode {
    /// Human-readable output with optional colors and progress bars.
    Human {
        verbosity: Verbosity,
        color: ColorChoice,
    },
    /// Machine-readable JSON output only.
    Json,
}

impl Default for ShellMode {
    fn default() -> Self {
        ShellMode::Human {
            verbosity: Verbosity::Normal,
            color: ColorChoice::Auto,
        }
    }
}

/// Output verbosity level (Human mode only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Status lines and progress bars
    #[default]
    Normal,
    /// --verbose: plain progress lines instead of bars
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    /// Never use ANSI colors.
    Never,
}

/// Status words for output lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // Success statuses (green)
    Added,
    Removed,
    Restored,
    Enabled,
    Disabled,

    // In-progress statuses (cyan)
    Restoring,

    // Info statuses (blue)
    Info,

    // Warning statuses (yellow)
    Missing,
    Warning,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Added => "Added",
            Status::Removed => "Removed",
            Status::Restored => "Restored",
            Status::Enabled => "Enabled",
            Status::Disabled => "Disabled",
            Status::Restoring => "Restoring",
            Status::Info => "Info",
            Status::Missing => "Missing",
            Status::Warning => "Warning",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            Status::Added
            | Status::Removed
            | Status::Restored
            | Status::Enabled
            | Status::Disabled => "\x1b[1;32m",
            Status::Restoring => "\x1b[1;36m",
            Status::Info => "\x1b[1;34m",
            Status::Missing | Status::Warning => "\x1b[1;33m",
        }
    }
}

/// Width of the status column.
const STATUS_WIDTH: usize = 12;

/// Central shell for all CLI output.
#[derive(Debug)]
pub struct Shell {
    mode: ShellMode,
    use_color: bool,
}

impl Shell {
    /// Create a new shell with the given mode.
    pub fn new(mode: ShellMode) -> Self {
        let use_color = match &mode {
            ShellMode::Json => false,
            ShellMode::Human { color, .. } => match color {
                ColorChoice::Auto => io::stderr().is_terminal(),
                ColorChoice::Never => false,
            },
        };

        Shell { mode, use_color }
    }

    /// Create a shell from CLI flags. JSON wins over verbosity.
    pub fn from_flags(verbose: bool, color: bool, json: bool) -> Self {
        if json {
            return Shell::new(ShellMode::Json);
        }

        Shell::new(ShellMode::Human {
            verbosity: if verbose {
                Verbosity::Verbose
            } else {
                Verbosity::Normal
            },
            color: if color {
                ColorChoice::Auto
            } else {
                ColorChoice::Never
            },
        })
    }

    /// Check if shell is in verbose mode.
    pub fn is_verbose(&self) -> bool {
        matches!(
            self.mode,
            ShellMode::Human {
                verbosity: Verbosity::Verbose,
                ..
            }
        )
    }

    /// Check if shell is in JSON mode.
    pub fn is_json(&self) -> bool {
        matches!(self.mode, ShellMode::Json)
    }

    /// Print a status line to stderr: `{status:>12} {message}`.
    ///
    /// Ignored in JSON mode.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_json() {
            return;
        }
        eprintln!("{} {}", self.format_status(status), msg);
    }

    /// Print an info message.
    pub fn note(&self, msg: impl Display) {
        self.status(Status::Info, msg);
    }

    /// Print a warning message.
    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    /// Print a line of regular output to stdout.
    pub fn print(&self, msg: impl Display) {
        if !self.is_json() {
            println!("{}", msg);
        }
    }

    /// Print a JSON value to stdout. Ignored in human mode.
    pub fn json(&self, value: &serde_json::Value) {
        if !self.is_json() {
            return;
        }

        let mut stdout = io::stdout().lock();
        let _ = serde_json::to_writer_pretty(&mut stdout, value);
        let _ = writeln!(stdout);
    }

    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();
        if self.use_color {
            format!(
                "{}{:>width$}\x1b[0m",
                status.color_code(),
                text,
                width = STATUS_WIDTH
            )
        } else {
            format!("{:>width$}", text, width = STATUS_WIDTH)
        }
    }

    /// Create a progress bar over `total` items.
    ///
    /// Verbose and JSON modes get no bar.
    pub fn progress(&self, total: u64, msg: impl Display) -> Progress {
        let bar = if self.is_verbose() || self.is_json() || total < 2 {
            None
        } else {
            let bar = ProgressBar::new(total);
            if let Ok(style) =
                ProgressStyle::default_bar().template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}")
            {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar.set_message(msg.to_string());
            Some(bar)
        };

        Progress {
            bar,
            verbose: self.is_verbose(),
            message: msg.to_string(),
            current: 0,
            total,
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(ShellMode::default())
    }
}

/// Progress bar wrapper that respects the shell mode.
pub struct Progress {
    bar: Option<ProgressBar>,
    verbose: bool,
    message: String,
    current: u64,
    total: u64,
}

impl Progress {
    /// Advance by one item.
    pub fn inc(&mut self) {
        self.current += 1;
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
        if self.verbose {
            eprintln!("  {} [{}/{}]", self.message, self.current, self.total);
        }
    }

    /// Get the current position.
    pub fn position(&self) -> u64 {
        self.current
    }

    /// Clear the bar.
    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flags() {
        let shell = Shell::from_flags(false, true, false);
        assert!(!shell.is_verbose());
        assert!(!shell.is_json());

        let shell = Shell::from_flags(true, false, false);
        assert!(shell.is_verbose());

        // JSON takes precedence
        let shell = Shell::from_flags(true, true, true);
        assert!(shell.is_json());
        assert!(!shell.is_verbose());
    }

    #[test]
    fn test_status_formatting() {
        let shell = Shell::new(ShellMode::Human {
            verbosity: Verbosity::Normal,
            color: ColorChoice::Never,
        });

        let formatted = shell.format_status(Status::Restored);
        assert_eq!(formatted.trim(), "Restored");
        assert_eq!(formatted.len(), 12); // Right-aligned to 12 chars
    }

    #[test]
    fn test_progress_counts_without_bar() {
        let shell = Shell::from_flags(true, false, false);
        let mut progress = shell.progress(3, "restoring");
        progress.inc();
        progress.inc();
        assert_eq!(progress.position(), 2);
        progress.finish();
    }
}
