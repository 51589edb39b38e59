//! Repository trait - the uniform contract over packages.
//!
//! Every concrete source (local folder, shared store, test doubles) and
//! every composite (aggregate, fallback, restore) implements this trait
//! identically, so callers never care which one they hold.

use std::sync::Arc;

use anyhow::Result;

use crate::core::{Dependency, Package, PackageSource, PackageVersion};

/// What a repository is, queried directly instead of by type inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryKind {
    /// A single concrete source
    Simple,
    /// A merged view over several members.
    ///
    /// `all_sources` is set when the members are every enabled source.
    Aggregate { all_sources: bool },
    /// Primary first, secondary for unmet dependencies
    Fallback,
    /// Authoritative primary, peers fill gaps
    Restore,
}

impl RepositoryKind {
    /// Check if this repository already is the union of every source.
    pub fn is_aggregate_of_all(&self) -> bool {
        matches!(self, RepositoryKind::Aggregate { all_sources: true })
    }
}

/// A repository of packages.
///
/// Absence is never an error: `find_package` returns `None` and the list
/// operations return empty vectors. Mutations take `&self`; implementations
/// synchronize internally so repositories can be shared as `Arc<dyn Repository>`.
pub trait Repository: Send + Sync {
    /// Source string identifying this repository.
    fn source(&self) -> &str;

    /// What kind of repository this is.
    fn kind(&self) -> RepositoryKind {
        RepositoryKind::Simple
    }

    /// Find a package by id (case-insensitive) and exact version.
    fn find_package(&self, id: &str, version: &PackageVersion) -> Result<Option<Package>>;

    /// Find every version of a package id.
    fn find_packages_by_id(&self, id: &str) -> Result<Vec<Package>>;

    /// List every package in the repository.
    fn list_packages(&self) -> Result<Vec<Package>>;

    /// Store a package.
    fn add_package(&self, package: &Package) -> Result<()>;

    /// Remove a package.
    fn remove_package(&self, package: &Package) -> Result<()>;

    /// Check if a package exists.
    fn exists(&self, id: &str, version: &PackageVersion) -> Result<bool> {
        Ok(self.find_package(id, version)?.is_some())
    }

    /// Resolve a dependency to a concrete package.
    ///
    /// `origin` is the source of the package declaring the dependency, if
    /// known. The default picks the highest version satisfying the
    /// requirement.
    fn resolve_dependency(&self, dep: &Dependency, origin: Option<&str>) -> Result<Option<Package>> {
        let _ = origin;
        let candidates = self.find_packages_by_id(dep.id())?;
        Ok(best_match(dep, candidates))
    }
}

/// Pick the highest version among candidates that satisfies a dependency.
///
/// On equal versions the earliest candidate wins.
pub fn best_match(dep: &Dependency, candidates: impl IntoIterator<Item = Package>) -> Option<Package> {
    let mut best: Option<Package> = None;

    for candidate in candidates {
        if !dep.matches_id(candidate.id()) || !dep.matches_version(candidate.version()) {
            continue;
        }
        match &best {
            Some(current) if current.version() >= candidate.version() => {}
            _ => best = Some(candidate),
        }
    }

    best
}

/// Turns a configured source into a repository.
pub trait RepositoryFactory: Send + Sync {
    /// Create (or reuse) the repository for a source.
    fn create(&self, source: &PackageSource) -> Result<Arc<dyn Repository>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PackageIdentity;

    fn pkg(id: &str, version: &str) -> Package {
        Package::new(PackageIdentity::parse(id, version).unwrap())
    }

    #[test]
    fn test_best_match_picks_highest() {
        let dep = Dependency::parse("Foo", "^1.0").unwrap();
        let best = best_match(
            &dep,
            vec![pkg("Foo", "1.0"), pkg("Foo", "1.5"), pkg("Foo", "2.0")],
        )
        .unwrap();

        assert_eq!(best.version().to_string(), "1.5.0");
    }

    #[test]
    fn test_best_match_first_wins_on_tie() {
        let dep = Dependency::new("Foo");
        let best = best_match(
            &dep,
            vec![
                pkg("Foo", "1.0").with_source("first"),
                pkg("foo", "1.0").with_source("second"),
            ],
        )
        .unwrap();

        assert_eq!(best.source(), Some("first"));
    }

    #[test]
    fn test_best_match_none() {
        let dep = Dependency::parse("Foo", ">=3.0").unwrap();
        assert!(best_match(&dep, vec![pkg("Foo", "1.0"), pkg("Bar", "3.0")]).is_none());
    }

    #[test]
    fn test_kind_aggregate_of_all() {
        assert!(RepositoryKind::Aggregate { all_sources: true }.is_aggregate_of_all());
        assert!(!RepositoryKind::Aggregate { all_sources: false }.is_aggregate_of_all());
        assert!(!RepositoryKind::Fallback.is_aggregate_of_all());
    }
}
