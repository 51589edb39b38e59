//! Package versions.
//!
//! Versions are structured and totally ordered. Parsing is lenient about the
//! number of numeric components so that `1.2` and `1.2.0` name the same
//! version, but the canonical rendering is always full semver. A fourth
//! numeric component is kept as a revision and only rendered when non-zero,
//! so `1.2.0.0` is `1.2.0`.
//!
//! Dependency requirements are matched against the semver part only.

use std::fmt;
use std::str::FromStr;

use semver::Version;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::error::RepositoryError;

/// A structured package version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageVersion {
    inner: Version,

    /// Fourth numeric component; orders after patch
    revision: u64,
}

impl PackageVersion {
    /// Create a release version from its numeric components.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        PackageVersion {
            inner: Version::new(major, minor, patch),
            revision: 0,
        }
    }

    /// Set the revision component.
    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    /// Parse a version string.
    ///
    /// Accepts one to four numeric components, an optional leading `v`,
    /// and an optional `-prerelease` / `+build` suffix.
    pub fn parse(s: &str) -> Result<Self, RepositoryError> {
        let invalid = |message: &str| RepositoryError::InvalidVersion {
            version: s.to_string(),
            message: message.to_string(),
        };

        let trimmed = s.trim();
        let trimmed = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        if trimmed.is_empty() {
            return Err(invalid("version is empty"));
        }

        let split_at = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
        let (numbers, suffix) = trimmed.split_at(split_at);

        let parts: Vec<&str> = numbers.split('.').collect();
        if parts.len() > 4 {
            return Err(invalid("at most four numeric components are supported"));
        }

        let mut components = [0u64; 4];
        for (slot, part) in components.iter_mut().zip(&parts) {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid("numeric components must be non-negative integers"));
            }
            *slot = part
                .parse()
                .map_err(|_| invalid("numeric component is out of range"))?;
        }

        let normalized = format!(
            "{}.{}.{}{}",
            components[0], components[1], components[2], suffix
        );
        let inner = Version::parse(&normalized).map_err(|e| invalid(&e.to_string()))?;

        Ok(PackageVersion {
            inner,
            revision: components[3],
        })
    }

    /// Get the underlying semver version.
    ///
    /// The revision is not part of it.
    pub fn as_semver(&self) -> &Version {
        &self.inner
    }

    /// Check if this is a pre-release version.
    pub fn is_prerelease(&self) -> bool {
        !self.inner.pre.is_empty()
    }

    /// Get the revision component, zero when absent.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl From<Version> for PackageVersion {
    fn from(inner: Version) -> Self {
        PackageVersion { inner, revision: 0 }
    }
}

impl FromStr for PackageVersion {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PackageVersion::parse(s)
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.revision == 0 {
            return fmt::Display::fmt(&self.inner, f);
        }

        let v = &self.inner;
        write!(f, "{}.{}.{}.{}", v.major, v.minor, v.patch, self.revision)?;
        if !v.pre.is_empty() {
            write!(f, "-{}", v.pre)?;
        }
        if !v.build.is_empty() {
            write!(f, "+{}", v.build)?;
        }
        Ok(())
    }
}

impl Serialize for PackageVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PackageVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PackageVersion::parse(&s).map_err(serde::de::Error::custom)
    }
}
