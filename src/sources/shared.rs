//! Shared on-disk package store.
//!
//! One store serves every project in a workspace. Next to the packages,
//! the config folder keeps `repositories.toml`: the list of project
//! manifests that currently reference the store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::{Package, PackageVersion, Repository, RepositoryError};
use crate::sources::LocalRepository;
use crate::util::fs::{clean_path, paths_match, read_to_string, write_string, FileSystem};

/// Registry file name inside the config folder.
pub const REGISTRY_FILE: &str = "repositories.toml";

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryDocument {
    #[serde(rename = "repository", default)]
    repositories: Vec<RegistryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistryEntry {
    path: String,
}

/// The shared store plus its registry of referencing manifests.
pub struct SharedRepository {
    store: LocalRepository,
    config_fs: Arc<dyn FileSystem>,
}

impl SharedRepository {
    /// Bind a store filesystem and a config-folder filesystem.
    pub fn new(store_fs: Arc<dyn FileSystem>, config_fs: Arc<dyn FileSystem>) -> Self {
        let source = store_fs.root().display().to_string();
        SharedRepository {
            store: LocalRepository::new(source, store_fs),
            config_fs,
        }
    }

    /// Get the store filesystem.
    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        self.store.file_system()
    }

    /// Get the config-folder filesystem.
    pub fn config_file_system(&self) -> &Arc<dyn FileSystem> {
        &self.config_fs
    }

    /// Manifests currently registered, as absolute paths.
    pub fn registered_manifests(&self) -> Result<Vec<PathBuf>> {
        Ok(self
            .load_registry()?
            .repositories
            .into_iter()
            .map(|entry| clean_path(&self.config_fs.full_path(Path::new(&entry.path))))
            .collect())
    }

    /// Register a project manifest. Registering twice is a no-op.
    pub fn register_manifest(&self, manifest: &Path) -> Result<()> {
        let mut registry = self.load_registry()?;
        if self.position(&registry, manifest).is_some() {
            return Ok(());
        }

        registry.repositories.push(RegistryEntry {
            path: self.relative(manifest),
        });
        self.save_registry(&registry)?;
        tracing::debug!("registered {} with the shared store", manifest.display());
        Ok(())
    }

    /// Unregister a project manifest, deleting the registry when it empties.
    pub fn unregister_manifest(&self, manifest: &Path) -> Result<()> {
        let mut registry = self.load_registry()?;
        let Some(index) = self.position(&registry, manifest) else {
            return Ok(());
        };

        registry.repositories.remove(index);
        self.save_registry(&registry)?;
        tracing::debug!("unregistered {} from the shared store", manifest.display());
        Ok(())
    }

    fn position(&self, registry: &RegistryDocument, manifest: &Path) -> Option<usize> {
        let relative = self.relative(manifest);
        registry
            .repositories
            .iter()
            .position(|entry| paths_match(Path::new(&entry.path), Path::new(&relative)))
    }

    /// Path of `manifest` relative to the config folder, when one exists.
    fn relative(&self, manifest: &Path) -> String {
        pathdiff::diff_paths(manifest, self.config_fs.root())
            .unwrap_or_else(|| manifest.to_path_buf())
            .to_string_lossy()
            .replace('\\', "/")
    }

    fn load_registry(&self) -> Result<RegistryDocument> {
        let path = Path::new(REGISTRY_FILE);
        if !self.config_fs.file_exists(path) {
            return Ok(RegistryDocument::default());
        }

        let content = read_to_string(self.config_fs.as_ref(), path)?;
        let registry = toml::from_str(&content).map_err(|e| RepositoryError::InvalidDocument {
            path: self.config_fs.full_path(path),
            message: e.to_string(),
        })?;
        Ok(registry)
    }

    fn save_registry(&self, registry: &RegistryDocument) -> Result<()> {
        let path = Path::new(REGISTRY_FILE);
        if registry.repositories.is_empty() {
            return self.config_fs.delete_file(path);
        }

        let content = toml::to_string_pretty(registry)?;
        write_string(self.config_fs.as_ref(), path, &content)
    }
}

impl Repository for SharedRepository {
    fn source(&self) -> &str {
        self.store.source()
    }

    fn find_package(&self, id: &str, version: &PackageVersion) -> Result<Option<Package>> {
        self.store.find_package(id, version)
    }

    fn find_packages_by_id(&self, id: &str) -> Result<Vec<Package>> {
        self.store.find_packages_by_id(id)
    }

    fn list_packages(&self) -> Result<Vec<Package>> {
        self.store.list_packages()
    }

    fn add_package(&self, package: &Package) -> Result<()> {
        self.store.add_package(package)
    }

    fn remove_package(&self, package: &Package) -> Result<()> {
        self.store.remove_package(package)
    }
}

impl std::fmt::Debug for SharedRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRepository")
            .field("store", &self.store.root())
            .field("config", &self.config_fs.root())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{pkg, MockFileSystem};

    fn shared() -> (Arc<MockFileSystem>, SharedRepository) {
        let store = Arc::new(MockFileSystem::new("/work/packages"));
        let config = Arc::new(MockFileSystem::new("/work/.wharf"));
        (config.clone(), SharedRepository::new(store, config))
    }

    #[test]
    fn test_delegates_to_store() {
        let (_config, repo) = shared();
        repo.add_package(&pkg("Foo", "1.0")).unwrap();

        let found = repo.list_packages().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].source(), Some("/work/packages"));
    }

    #[test]
    fn test_register_relative_path() {
        let (config, repo) = shared();
        let manifest = Path::new("/work/app/wharf.packages.toml");

        repo.register_manifest(manifest).unwrap();
        repo.register_manifest(manifest).unwrap();

        let content = config.read_to_string(REGISTRY_FILE).unwrap();
        assert!(content.contains("path = \"../app/wharf.packages.toml\""));
        assert_eq!(content.matches("[[repository]]").count(), 1);
        assert_eq!(
            repo.registered_manifests().unwrap(),
            vec![PathBuf::from("/work/app/wharf.packages.toml")]
        );
    }

    #[test]
    fn test_unregister_last_deletes_registry() {
        let (config, repo) = shared();
        let a = Path::new("/work/a/wharf.packages.toml");
        let b = Path::new("/work/b/wharf.packages.toml");
        repo.register_manifest(a).unwrap();
        repo.register_manifest(b).unwrap();

        repo.unregister_manifest(a).unwrap();
        assert!(config.file_exists(Path::new(REGISTRY_FILE)));

        repo.unregister_manifest(b).unwrap();
        assert!(!config.file_exists(Path::new(REGISTRY_FILE)));
    }
}
