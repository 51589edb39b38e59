//! Local folder repository.
//!
//! Packages live one directory per identity under the root:
//!
//! ```text
//! <root>/Foo.1.2.0/package.toml
//! <root>/Bar.0.3.0/package.toml
//! ```
//!
//! Directory names are only a hint. The descriptor inside is the source
//! of truth for the identity, so lookups stay case-insensitive even on
//! case-sensitive filesystems.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::core::{
    ids_match, Package, PackageDescriptor, PackageVersion, Repository, RepositoryError,
};
use crate::util::fs::{read_to_string, write_string, FileSystem, PhysicalFileSystem};
use crate::util::hash::sha256_str;

/// Descriptor file name inside each package directory.
pub const DESCRIPTOR_NAME: &str = "package.toml";

/// A repository backed by a folder.
pub struct LocalRepository {
    /// Source string reported for every package served from here
    source: String,

    fs: Arc<dyn FileSystem>,
}

impl LocalRepository {
    /// Create a repository over an existing filesystem.
    pub fn new(source: impl Into<String>, fs: Arc<dyn FileSystem>) -> Self {
        LocalRepository {
            source: source.into(),
            fs,
        }
    }

    /// Create a repository for a folder on disk, using the path as its source.
    pub fn at(path: &Path) -> Self {
        LocalRepository::new(
            path.display().to_string(),
            Arc::new(PhysicalFileSystem::new(path)),
        )
    }

    /// Get the filesystem the repository writes through.
    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Get the root directory.
    pub fn root(&self) -> &Path {
        self.fs.root()
    }

    fn load(&self, dir: &Path) -> Result<Option<Package>> {
        let path = dir.join(DESCRIPTOR_NAME);
        if !self.fs.file_exists(&path) {
            return Ok(None);
        }

        let content = read_to_string(self.fs.as_ref(), &path)?;
        let descriptor: PackageDescriptor =
            toml::from_str(&content).map_err(|e| RepositoryError::InvalidDocument {
                path: self.fs.full_path(&path),
                message: e.to_string(),
            })?;

        Ok(Some(
            Package::from_descriptor(descriptor)
                .with_checksum(sha256_str(&content))
                .with_source(self.source.clone()),
        ))
    }

    /// Every readable package with the directory it was found in.
    fn entries(&self) -> Result<Vec<(PathBuf, Package)>> {
        let mut entries = Vec::new();

        for dir in self.fs.directories(Path::new(""))? {
            match self.load(&dir) {
                Ok(Some(package)) => entries.push((dir, package)),
                Ok(None) => tracing::debug!(
                    "skipping {}: no {}",
                    self.fs.full_path(&dir).display(),
                    DESCRIPTOR_NAME
                ),
                Err(e) => tracing::debug!(
                    "skipping {}: {:#}",
                    self.fs.full_path(&dir).display(),
                    e
                ),
            }
        }

        Ok(entries)
    }

    fn locate(&self, id: &str, version: &PackageVersion) -> Result<Option<(PathBuf, Package)>> {
        Ok(self
            .entries()?
            .into_iter()
            .find(|(_, p)| p.identity().matches(id, version)))
    }
}

impl Repository for LocalRepository {
    fn source(&self) -> &str {
        &self.source
    }

    fn find_package(&self, id: &str, version: &PackageVersion) -> Result<Option<Package>> {
        // Try the conventional directory name before scanning.
        let guess = PathBuf::from(format!("{}.{}", id, version));
        if let Ok(Some(package)) = self.load(&guess) {
            if package.identity().matches(id, version) {
                return Ok(Some(package));
            }
        }

        Ok(self.locate(id, version)?.map(|(_, p)| p))
    }

    fn find_packages_by_id(&self, id: &str) -> Result<Vec<Package>> {
        Ok(self
            .entries()?
            .into_iter()
            .map(|(_, p)| p)
            .filter(|p| ids_match(p.id(), id))
            .collect())
    }

    fn list_packages(&self) -> Result<Vec<Package>> {
        Ok(self.entries()?.into_iter().map(|(_, p)| p).collect())
    }

    fn add_package(&self, package: &Package) -> Result<()> {
        if self.find_package(package.id(), package.version())?.is_some() {
            tracing::debug!("{} already in {}", package.identity(), self.source);
            return Ok(());
        }

        let content = toml::to_string_pretty(&package.to_descriptor())?;
        let path = PathBuf::from(package.identity().dir_name()).join(DESCRIPTOR_NAME);
        write_string(self.fs.as_ref(), &path, &content)?;

        tracing::debug!(
            "stored {} in {} (sha256 {})",
            package.identity(),
            self.source,
            sha256_str(&content)
        );
        Ok(())
    }

    fn remove_package(&self, package: &Package) -> Result<()> {
        let Some((dir, _)) = self.locate(package.id(), package.version())? else {
            tracing::debug!("{} not in {}, nothing to remove", package.identity(), self.source);
            return Ok(());
        };

        self.fs.delete_file(&dir.join(DESCRIPTOR_NAME))?;
        self.fs.delete_directory(&dir)?;
        tracing::debug!("removed {} from {}", package.identity(), self.source);
        Ok(())
    }
}

impl std::fmt::Debug for LocalRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalRepository")
            .field("source", &self.source)
            .field("root", &self.fs.root())
            .finish()
    }
}
