//! Package - identity plus the metadata repositories carry around.
//!
//! A Package is what repositories hand back from `find` and `list`.
//! It is Arc-wrapped internally so composites can clone results freely.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{Dependency, PackageIdentity, PackageVersion};

/// A package as seen through a repository.
#[derive(Clone)]
pub struct Package {
    inner: Arc<PackageInner>,
}

#[derive(Clone)]
struct PackageInner {
    identity: PackageIdentity,
    dependencies: Vec<Dependency>,
    description: Option<String>,
    checksum: Option<String>,
    source: Option<String>,
}

/// On-disk package descriptor.
///
/// Folder repositories store one descriptor per package; this is the
/// serialized form of a Package minus its provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageDescriptor {
    pub id: String,
    pub version: PackageVersion,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "dependency", default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
}

impl Package {
    /// Create a package with no dependencies.
    pub fn new(identity: PackageIdentity) -> Self {
        Package {
            inner: Arc::new(PackageInner {
                identity,
                dependencies: Vec::new(),
                description: None,
                checksum: None,
                source: None,
            }),
        }
    }

    /// Set the dependencies.
    pub fn with_dependencies(mut self, dependencies: Vec<Dependency>) -> Self {
        Arc::make_mut(&mut self.inner).dependencies = dependencies;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.inner).description = Some(description.into());
        self
    }

    /// Set the content checksum.
    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.inner).checksum = Some(checksum.into());
        self
    }

    /// Record the source this package was served from.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.inner).source = Some(source.into());
        self
    }

    /// Build a package from a descriptor.
    pub fn from_descriptor(descriptor: PackageDescriptor) -> Self {
        let mut package = Package::new(PackageIdentity::new(descriptor.id, descriptor.version))
            .with_dependencies(descriptor.dependencies);
        if let Some(description) = descriptor.description {
            package = package.with_description(description);
        }
        package
    }

    /// Convert to an on-disk descriptor.
    pub fn to_descriptor(&self) -> PackageDescriptor {
        PackageDescriptor {
            id: self.id().to_string(),
            version: self.version().clone(),
            description: self.inner.description.clone(),
            dependencies: self.inner.dependencies.clone(),
        }
    }

    /// Get the identity.
    pub fn identity(&self) -> &PackageIdentity {
        &self.inner.identity
    }

    /// Get the package id.
    pub fn id(&self) -> &str {
        self.inner.identity.id()
    }

    /// Get the package version.
    pub fn version(&self) -> &PackageVersion {
        self.inner.identity.version()
    }

    /// Get the dependencies.
    pub fn dependencies(&self) -> &[Dependency] {
        &self.inner.dependencies
    }

    /// Get the description.
    pub fn description(&self) -> Option<&str> {
        self.inner.description.as_deref()
    }

    /// Get the checksum.
    pub fn checksum(&self) -> Option<&str> {
        self.inner.checksum.as_deref()
    }

    /// Get the source this package was served from, if known.
    pub fn source(&self) -> Option<&str> {
        self.inner.source.as_deref()
    }

    /// Check if this package has the same identity as another.
    pub fn same_identity(&self, other: &Package) -> bool {
        self.identity() == other.identity()
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.same_identity(other)
    }
}

impl Eq for Package {}

impl std::fmt::Debug for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Package")
            .field("id", &self.id())
            .field("version", &self.version().to_string())
            .field("deps", &self.inner.dependencies.len())
            .field("source", &self.inner.source)
            .finish()
    }
}

impl std::fmt::Display for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.inner.identity, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_builder() {
        let pkg = Package::new(PackageIdentity::parse("Foo", "1.0").unwrap())
            .with_dependencies(vec![Dependency::new("Bar")])
            .with_description("foo library")
            .with_source("/feeds/local");

        assert_eq!(pkg.id(), "Foo");
        assert_eq!(pkg.version().to_string(), "1.0.0");
        assert_eq!(pkg.dependencies().len(), 1);
        assert_eq!(pkg.description(), Some("foo library"));
        assert_eq!(pkg.source(), Some("/feeds/local"));
    }

    #[test]
    fn test_clone_shares_inner() {
        let pkg = Package::new(PackageIdentity::parse("Foo", "1.0").unwrap());
        let cloned = pkg.clone();
        assert!(Arc::ptr_eq(&pkg.inner, &cloned.inner));
    }

    #[test]
    fn test_equality_ignores_provenance() {
        let a = Package::new(PackageIdentity::parse("Foo", "1.0").unwrap()).with_source("a");
        let b = Package::new(PackageIdentity::parse("foo", "1.0.0").unwrap()).with_source("b");
        assert_eq!(a, b);
    }

    #[test]
    fn test_descriptor_round_trip() {
        let content = r#"
id = "Foo"
version = "1.2"
description = "foo"

[[dependency]]
id = "Bar"
version = "^2.0"
"#;
        let descriptor: PackageDescriptor = toml::from_str(content).unwrap();
        let pkg = Package::from_descriptor(descriptor);

        assert_eq!(pkg.identity().display_name(), "Foo 1.2.0");
        assert_eq!(pkg.dependencies()[0].id(), "Bar");

        let written = toml::to_string_pretty(&pkg.to_descriptor()).unwrap();
        assert!(written.contains("version = \"1.2.0\""));
        assert!(written.contains("[[dependency]]"));
    }
}
