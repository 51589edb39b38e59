//! Project-level package references.
//!
//! A project references packages through its manifest; the package content
//! lives in the shared store.

pub mod manifest;

pub use manifest::{ManifestEntry, ManifestPackages, ReferenceManifest};

use anyhow::Result;

use crate::core::{Package, PackageVersion};
use crate::ops::package_manager::PackageManager;

/// Adds and removes a project's package references.
#[derive(Debug)]
pub struct ProjectManager {
    package_manager: PackageManager,
    manifest: ReferenceManifest,
}

impl ProjectManager {
    /// Create a project manager.
    pub fn new(package_manager: PackageManager, manifest: ReferenceManifest) -> Self {
        ProjectManager {
            package_manager,
            manifest,
        }
    }

    /// Get the package manager.
    pub fn package_manager(&self) -> &PackageManager {
        &self.package_manager
    }

    /// Get the project's manifest.
    pub fn manifest(&self) -> &ReferenceManifest {
        &self.manifest
    }

    /// The project's references, resolved through the store.
    pub fn list_references(&self) -> Result<ManifestPackages> {
        self.manifest.list()
    }

    /// Install a package and reference it along with its dependencies.
    ///
    /// Returns the packages that were newly referenced, dependencies first.
    pub fn add_reference(&self, id: &str, version: Option<&PackageVersion>) -> Result<Vec<Package>> {
        let installation = self.package_manager.install(id, version)?;

        let mut referenced = Vec::new();
        for package in installation.resolution.install_order() {
            if self.manifest.contains(package.id(), package.version())? {
                tracing::debug!("{} is already referenced", package.identity());
                continue;
            }
            self.manifest.add(&package)?;
            referenced.push(package);
        }
        Ok(referenced)
    }

    /// Drop a reference and remove the package from the store.
    ///
    /// Without a version the id must be referenced exactly once.
    pub fn remove_reference(&self, id: &str, version: Option<&PackageVersion>) -> Result<Package> {
        self.manifest.remove_reference(id, version)
    }
}
