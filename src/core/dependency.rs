//! Dependency specification.
//!
//! A Dependency names another package by id and constrains its version.
//! Where the dependency is found is decided by the repository doing the
//! resolving, never by the dependency itself.

use std::fmt;

use semver::VersionReq;
use serde::{Deserialize, Serialize};

use crate::core::error::RepositoryError;
use crate::core::package_id::{ids_match, validate_package_id};
use crate::core::version::PackageVersion;

/// A dependency on another package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Package id
    id: String,

    /// Version requirement
    #[serde(rename = "version", default = "any_version")]
    version_req: VersionReq,
}

fn any_version() -> VersionReq {
    VersionReq::STAR
}

impl Dependency {
    /// Create a dependency that accepts any version.
    pub fn new(id: impl Into<String>) -> Self {
        Dependency {
            id: id.into(),
            version_req: VersionReq::STAR,
        }
    }

    /// Parse a dependency from an id and a requirement string.
    ///
    /// An empty requirement accepts any version.
    pub fn parse(id: &str, req: &str) -> Result<Self, RepositoryError> {
        validate_package_id(id)?;

        let req = req.trim();
        let version_req = if req.is_empty() {
            VersionReq::STAR
        } else {
            VersionReq::parse(req).map_err(|e| RepositoryError::InvalidVersion {
                version: req.to_string(),
                message: e.to_string(),
            })?
        };

        Ok(Dependency {
            id: id.to_string(),
            version_req,
        })
    }

    /// Create a dependency with a version requirement.
    pub fn with_version_req(mut self, req: VersionReq) -> Self {
        self.version_req = req;
        self
    }

    /// Create a dependency pinned to exactly one version.
    pub fn exact(id: impl Into<String>, version: &PackageVersion) -> Self {
        let v = version.as_semver();
        let comparator = semver::Comparator {
            op: semver::Op::Exact,
            major: v.major,
            minor: Some(v.minor),
            patch: Some(v.patch),
            pre: v.pre.clone(),
        };

        Dependency {
            id: id.into(),
            version_req: VersionReq {
                comparators: vec![comparator],
            },
        }
    }

    /// Get the package id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the version requirement.
    pub fn version_req(&self) -> &VersionReq {
        &self.version_req
    }

    /// Check if a package id is the one this dependency names.
    pub fn matches_id(&self, id: &str) -> bool {
        ids_match(&self.id, id)
    }

    /// Check if a version matches this dependency's requirement.
    pub fn matches_version(&self, version: &PackageVersion) -> bool {
        self.version_req.matches(version.as_semver())
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version_req == VersionReq::STAR {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} {}", self.id, self.version_req)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_default_accepts_anything() {
        let dep = Dependency::new("Foo");
        assert!(dep.matches_version(&PackageVersion::new(0, 1, 0)));
        assert!(dep.matches_version(&PackageVersion::new(9, 0, 0)));
        assert_eq!(dep.to_string(), "Foo");
    }

    #[test]
    fn test_dependency_requirement() {
        let dep = Dependency::parse("Foo", "^1.2").unwrap();
        assert!(dep.matches_version(&PackageVersion::new(1, 4, 0)));
        assert!(!dep.matches_version(&PackageVersion::new(2, 0, 0)));
        assert!(dep.matches_id("foo"));
    }

    #[test]
    fn test_dependency_exact() {
        let dep = Dependency::exact("Foo", &PackageVersion::new(1, 2, 0));
        assert!(dep.matches_version(&PackageVersion::new(1, 2, 0)));
        assert!(!dep.matches_version(&PackageVersion::new(1, 2, 1)));
    }

    #[test]
    fn test_dependency_parse_errors() {
        assert!(Dependency::parse("", "1.0").is_err());
        assert!(Dependency::parse("Foo", "not a version").is_err());
    }
}
