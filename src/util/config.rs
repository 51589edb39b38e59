//! Configuration file support for Wharf.
//!
//! Wharf supports two configuration file locations:
//! - Global: `~/.wharf/config.toml` - User-wide defaults
//! - Workspace: `.wharf/config.toml` - Workspace-specific overrides
//!
//! Workspace config takes precedence over global config.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::package_id::ids_match;
use crate::core::{PackageSource, SourceList};

/// Default store path, relative to the workspace root.
pub const DEFAULT_STORE_PATH: &str = "packages";

/// Wharf configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shared store settings
    pub repository: RepositoryConfig,

    /// Restore settings
    pub restore: RestoreConfig,

    /// Package sources
    #[serde(rename = "source", skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<PackageSource>,
}

/// Shared store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Store path; relative paths are resolved against the workspace root
    pub path: Option<PathBuf>,

    /// Keep the store out of source control
    pub disable_source_control: Option<bool>,
}

/// Restore configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RestoreConfig {
    /// Whether `wharf restore` may fetch packages
    pub enabled: Option<bool>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    ///
    /// Sources concatenate with `other`'s first; a source in `other`
    /// replaces one with the same name here.
    pub fn merge(&mut self, other: Config) {
        if other.repository.path.is_some() {
            self.repository.path = other.repository.path;
        }
        if other.repository.disable_source_control.is_some() {
            self.repository.disable_source_control = other.repository.disable_source_control;
        }
        if other.restore.enabled.is_some() {
            self.restore.enabled = other.restore.enabled;
        }

        let overridden: Vec<String> = other.sources.iter().map(|s| s.name.clone()).collect();
        let mut sources = other.sources;
        sources.extend(
            self.sources
                .drain(..)
                .filter(|s| !overridden.iter().any(|name| ids_match(name, &s.name))),
        );
        self.sources = sources;
    }

    /// Store path as configured, defaulting to `packages`.
    pub fn store_path(&self) -> PathBuf {
        self.repository
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH))
    }

    /// Whether the store should be bound to source control when possible.
    pub fn use_source_control(&self) -> bool {
        !self.repository.disable_source_control.unwrap_or(false)
    }

    /// Whether restore is enabled.
    pub fn restore_enabled(&self) -> bool {
        self.restore.enabled.unwrap_or(true)
    }

    /// The configured sources in priority order.
    pub fn source_list(&self) -> SourceList {
        SourceList::from_sources(self.sources.clone())
    }
}

/// Load merged configuration from global and workspace locations.
///
/// Order of precedence (highest to lowest):
/// 1. Workspace config (.wharf/config.toml)
/// 2. Global config (~/.wharf/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    // Load global config first
    if global_path.exists() {
        let global = Config::load_or_default(global_path);
        config.merge(global);
    }

    // Workspace config overrides global
    if project_path.exists() {
        let project = Config::load_or_default(project_path);
        config.merge(project);
    }

    config
}

/// Get the global wharf config directory (~/.wharf).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".wharf"))
}
