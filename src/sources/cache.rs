//! Source repository factory.
//!
//! Turns configured sources into repositories, creating each one at most
//! once per factory.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;

use crate::core::package_id::id_key;
use crate::core::source::SourceLocation;
use crate::core::{PackageSource, Repository, RepositoryError, RepositoryFactory};
use crate::sources::LocalRepository;
use crate::util::fs::PhysicalFileSystem;

/// Creates and memoizes one repository per source string.
pub struct SourceRepositoryFactory {
    /// Directory relative folder sources are resolved against
    base_dir: PathBuf,

    /// Repositories created so far, by normalized source string
    repositories: Mutex<HashMap<String, Arc<dyn Repository>>>,
}

impl SourceRepositoryFactory {
    /// Create a factory resolving relative sources against `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        SourceRepositoryFactory {
            base_dir: base_dir.into(),
            repositories: Mutex::new(HashMap::new()),
        }
    }

    fn cache_key(source: &PackageSource) -> String {
        id_key(source.source.trim_end_matches(['/', '\\']))
    }

    fn create_repository(&self, source: &PackageSource) -> Result<Arc<dyn Repository>> {
        if source.is_aggregate() {
            return Err(RepositoryError::unavailable(
                &source.name,
                "the aggregate source is virtual and has no repository of its own",
            )
            .into());
        }

        match source.location(&self.base_dir) {
            SourceLocation::Local(path) => {
                tracing::debug!("opening folder source `{}` at {}", source.name, path.display());
                Ok(Arc::new(LocalRepository::new(
                    source.source.clone(),
                    Arc::new(PhysicalFileSystem::new(path)),
                )))
            }
            SourceLocation::Remote(url) => Err(RepositoryError::unavailable(
                &source.name,
                format!("remote feeds are not supported ({})", url),
            )
            .into()),
        }
    }
}

impl RepositoryFactory for SourceRepositoryFactory {
    fn create(&self, source: &PackageSource) -> Result<Arc<dyn Repository>> {
        let key = Self::cache_key(source);
        let mut repositories = self
            .repositories
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(repo) = repositories.get(&key) {
            return Ok(Arc::clone(repo));
        }

        let repo = self.create_repository(source)?;
        repositories.insert(key, Arc::clone(&repo));
        Ok(repo)
    }
}

impl std::fmt::Debug for SourceRepositoryFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRepositoryFactory")
            .field("base_dir", &self.base_dir)
            .finish()
    }
}
