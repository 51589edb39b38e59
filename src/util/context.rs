//! Global context for Wharf operations.
//!
//! Provides centralized access to the working directory, the enclosing
//! workspace, the global home directory and the merged configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::workspace::{Workspace, CONFIG_FILE};
use crate::util::config::{global_config_dir, load_config, Config};

/// Environment variable overriding the global home directory.
pub const HOME_ENV: &str = "WHARF_HOME";

/// Global context shared by every command.
#[derive(Debug)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global Wharf data (~/.wharf/)
    home: PathBuf,

    /// Workspace enclosing the working directory
    workspace: Workspace,

    /// Whether to use verbose output
    verbose: bool,

    /// Whether to use colors in output
    color: bool,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        let home = std::env::var_os(HOME_ENV)
            .map(PathBuf::from)
            .or_else(global_config_dir)
            .unwrap_or_else(|| PathBuf::from(".wharf"));

        GlobalContext {
            workspace: Workspace::discover(&cwd),
            cwd,
            home,
            verbose: false,
            color: true,
        }
    }

    /// Use a different global home directory.
    pub fn with_home(mut self, home: PathBuf) -> Self {
        self.home = home;
        self
    }

    /// Set verbose mode.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Set color output.
    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the Wharf home directory (~/.wharf/).
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Get the workspace enclosing the working directory.
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join(CONFIG_FILE)
    }

    /// Load the merged global and workspace configuration.
    pub fn config(&self) -> Config {
        load_config(&self.config_path(), &self.workspace.config_path())
    }

    /// Check if verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if color output is enabled.
    pub fn color(&self) -> bool {
        self.color
    }
}
