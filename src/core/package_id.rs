//! Package identity - WHICH package (id + version).
//!
//! Package ids compare case-insensitively and versions compare structurally.
//! Both comparisons are spelled out as functions instead of relying on
//! string equality, so every caller agrees on what "the same package" means.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::core::error::RepositoryError;
use crate::core::version::PackageVersion;

/// Compare two package ids, ignoring case.
pub fn ids_match(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Compare two versions for exact structural equality.
pub fn versions_match(a: &PackageVersion, b: &PackageVersion) -> bool {
    a.as_semver() == b.as_semver() && a.revision() == b.revision()
}

/// The case-folded form of an id, used as a map key.
pub fn id_key(id: &str) -> String {
    id.chars().flat_map(char::to_lowercase).collect()
}

/// Validate a package id.
///
/// Ids start with an ASCII letter or digit and contain only `[A-Za-z0-9._-]`.
pub fn validate_package_id(id: &str) -> Result<(), RepositoryError> {
    let invalid = |message: String| RepositoryError::InvalidPackageId {
        id: id.to_string(),
        message,
    };

    let Some(first) = id.chars().next() else {
        return Err(invalid("package id cannot be empty".to_string()));
    };

    if !first.is_ascii_alphanumeric() {
        return Err(invalid("must start with a letter or digit".to_string()));
    }

    for c in id.chars() {
        if !matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '-') {
            return Err(invalid(format!("only [A-Za-z0-9._-] allowed, found '{}'", c)));
        }
    }

    Ok(())
}

/// A package identity: id plus version.
///
/// The id keeps the casing it was created with; equality, hashing and
/// ordering all go through the case-folded id.
#[derive(Clone, Serialize, Deserialize)]
pub struct PackageIdentity {
    id: String,
    version: PackageVersion,
}

impl PackageIdentity {
    /// Create a new identity.
    pub fn new(id: impl Into<String>, version: PackageVersion) -> Self {
        PackageIdentity {
            id: id.into(),
            version,
        }
    }

    /// Parse an identity from an id and a version string.
    pub fn parse(id: &str, version: &str) -> Result<Self, RepositoryError> {
        validate_package_id(id)?;
        Ok(PackageIdentity::new(id, PackageVersion::parse(version)?))
    }

    /// Get the package id as originally written.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the version.
    pub fn version(&self) -> &PackageVersion {
        &self.version
    }

    /// Check if this identity names the given id and version.
    pub fn matches(&self, id: &str, version: &PackageVersion) -> bool {
        ids_match(&self.id, id) && versions_match(&self.version, version)
    }

    /// Get a display string like "Foo 1.2.0".
    pub fn display_name(&self) -> String {
        format!("{} {}", self.id, self.version)
    }

    /// Directory name used by folder repositories ("Foo.1.2.0").
    pub fn dir_name(&self) -> String {
        format!("{}.{}", self.id, self.version)
    }
}

impl PartialEq for PackageIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.id, &other.version)
    }
}

impl Eq for PackageIdentity {}

impl Hash for PackageIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        id_key(&self.id).hash(state);
        self.version.hash(state);
    }
}

impl PartialOrd for PackageIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageIdentity {
    fn cmp(&self, other: &Self) -> Ordering {
        id_key(&self.id)
            .cmp(&id_key(&other.id))
            .then_with(|| self.version.cmp(&other.version))
    }
}

impl fmt::Debug for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageIdentity")
            .field("id", &self.id)
            .field("version", &self.version.to_string())
            .finish()
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.id, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn ident(id: &str, version: &str) -> PackageIdentity {
        PackageIdentity::parse(id, version).unwrap()
    }

    #[test]
    fn test_ids_match_ignores_case() {
        assert!(ids_match("Newtonsoft.Json", "newtonsoft.json"));
        assert!(ids_match("FOO", "foo"));
        assert!(!ids_match("foo", "foobar"));
    }

    #[test]
    fn test_identity_equality() {
        assert_eq!(ident("Foo", "1.0"), ident("foo", "1.0.0"));
        assert_ne!(ident("Foo", "1.0"), ident("Foo", "1.0.1"));
        assert_eq!(ident("Foo", "1.0.0.0"), ident("Foo", "1.0"));
        assert_ne!(ident("Foo", "1.0.0.1"), ident("Foo", "1.0"));
    }

    #[test]
    fn test_identity_hash_consistent_with_eq() {
        let mut set = HashSet::new();
        set.insert(ident("Foo", "1.0.0"));
        assert!(set.contains(&ident("FOO", "1.0.0")));
    }

    #[test]
    fn test_identity_ordering() {
        let a = ident("alpha", "2.0.0");
        let b = ident("Beta", "1.0.0");
        let c = ident("alpha", "10.0.0");

        assert!(a < b);
        assert!(a < c);
    }

    #[test]
    fn test_validate_package_id() {
        assert!(validate_package_id("Foo.Bar-baz_2").is_ok());
        assert!(validate_package_id("").is_err());
        assert!(validate_package_id(".hidden").is_err());
        assert!(validate_package_id("with space").is_err());
    }

    #[test]
    fn test_display() {
        let id = ident("Foo", "1.2");
        assert_eq!(id.display_name(), "Foo 1.2.0");
        assert_eq!(id.dir_name(), "Foo.1.2.0");
    }
}
