//! Fallback repository - a primary source with a secondary for dependencies.
//!
//! Everything is served by the primary. The secondary is only asked for
//! dependencies the primary cannot resolve, which lets a package installed
//! from one source pull its transitive dependencies from the others.

use std::sync::Arc;

use anyhow::Result;

use crate::core::{Dependency, Package, PackageVersion, Repository, RepositoryKind};

/// Two-tier repository.
pub struct FallbackRepository {
    primary: Arc<dyn Repository>,
    secondary: Arc<dyn Repository>,
}

impl FallbackRepository {
    /// Wrap `primary` so unmet dependencies fall back to `secondary`.
    ///
    /// A primary that already is the aggregate of every source is returned
    /// as is, since there is nothing left to fall back to.
    pub fn wrap(primary: Arc<dyn Repository>, secondary: Arc<dyn Repository>) -> Arc<dyn Repository> {
        if primary.kind().is_aggregate_of_all() {
            tracing::debug!("{} already covers every source, not wrapping", primary.source());
            return primary;
        }

        Arc::new(FallbackRepository { primary, secondary })
    }

    /// Get the primary repository.
    pub fn primary(&self) -> &Arc<dyn Repository> {
        &self.primary
    }

    /// Get the secondary repository.
    pub fn secondary(&self) -> &Arc<dyn Repository> {
        &self.secondary
    }
}

impl Repository for FallbackRepository {
    fn source(&self) -> &str {
        self.primary.source()
    }

    fn kind(&self) -> RepositoryKind {
        RepositoryKind::Fallback
    }

    fn find_package(&self, id: &str, version: &PackageVersion) -> Result<Option<Package>> {
        self.primary.find_package(id, version)
    }

    fn find_packages_by_id(&self, id: &str) -> Result<Vec<Package>> {
        self.primary.find_packages_by_id(id)
    }

    fn list_packages(&self) -> Result<Vec<Package>> {
        self.primary.list_packages()
    }

    fn add_package(&self, package: &Package) -> Result<()> {
        self.primary.add_package(package)
    }

    fn remove_package(&self, package: &Package) -> Result<()> {
        self.primary.remove_package(package)
    }

    fn resolve_dependency(&self, dep: &Dependency, origin: Option<&str>) -> Result<Option<Package>> {
        if let Some(found) = self.primary.resolve_dependency(dep, origin)? {
            return Ok(Some(found));
        }

        tracing::debug!(
            "{} not in {}, trying {}",
            dep,
            self.primary.source(),
            self.secondary.source()
        );
        self.secondary.resolve_dependency(dep, origin)
    }
}

impl std::fmt::Debug for FallbackRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackRepository")
            .field("primary", &self.primary.source())
            .field("secondary", &self.secondary.source())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::AggregateRepository;
    use crate::test_support::{pkg, MockRepository};

    fn secondary_with(package: Package) -> (Arc<MockRepository>, Arc<dyn Repository>) {
        let member = Arc::new(MockRepository::new("other").with_package(package));
        let aggregate: Arc<dyn Repository> =
            Arc::new(AggregateRepository::new(vec![member.clone()]));
        (member, aggregate)
    }

    #[test]
    fn test_primary_copy_wins() {
        let primary = Arc::new(MockRepository::new("a").with_package(pkg("P", "1.0")));
        let (_member, secondary) = secondary_with(pkg("P", "1.0"));
        let repo = FallbackRepository::wrap(primary, secondary);

        let found = repo
            .resolve_dependency(&Dependency::new("P"), None)
            .unwrap()
            .unwrap();
        assert_eq!(found.source(), Some("a"));
    }

    #[test]
    fn test_falls_through_to_secondary() {
        let primary = Arc::new(MockRepository::new("a"));
        let (_member, secondary) = secondary_with(pkg("P", "1.0"));
        let repo = FallbackRepository::wrap(primary, secondary);

        let found = repo
            .resolve_dependency(&Dependency::new("P"), None)
            .unwrap()
            .unwrap();
        assert_eq!(found.source(), Some("other"));
    }

    #[test]
    fn test_find_and_list_stay_on_primary() {
        let primary = Arc::new(MockRepository::new("a"));
        let (member, secondary) = secondary_with(pkg("P", "1.0"));
        let repo = FallbackRepository::wrap(primary, secondary);

        assert!(repo
            .find_package("P", &PackageVersion::new(1, 0, 0))
            .unwrap()
            .is_none());
        assert!(repo.list_packages().unwrap().is_empty());
        assert_eq!(member.calls(), 0);
        assert_eq!(repo.kind(), RepositoryKind::Fallback);
    }

    #[test]
    fn test_aggregate_of_all_is_not_wrapped() {
        let inner = Arc::new(MockRepository::new("a").with_package(pkg("P", "1.0")));
        let primary: Arc<dyn Repository> =
            Arc::new(AggregateRepository::new(vec![inner]).of_all_sources());
        let (member, secondary) = secondary_with(pkg("Q", "1.0"));

        let repo = FallbackRepository::wrap(primary.clone(), secondary);
        assert!(Arc::ptr_eq(&repo, &primary));

        assert!(repo
            .resolve_dependency(&Dependency::new("Q"), None)
            .unwrap()
            .is_none());
        assert_eq!(member.calls(), 0);
    }
}
