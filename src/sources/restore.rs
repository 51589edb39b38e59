//! Package-restore repository.
//!
//! Restoring a project means fetching every referenced package that is
//! missing locally. One source is authoritative; the other enabled sources
//! fill the gaps, and every package they serve is remembered with the
//! source it came from.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;

use crate::core::{
    ids_match, Dependency, Package, PackageIdentity, PackageSource, PackageVersion, Repository,
    RepositoryFactory, RepositoryKind, SourceProvider,
};
use crate::sources::aggregate::merge_first_wins;
use crate::sources::AggregateRepository;

/// Primary source backed by an aggregate of its peers.
pub struct PackageRestoreRepository {
    primary: Arc<dyn Repository>,
    peers: AggregateRepository,

    /// Which peer served each package
    provenance: Mutex<HashMap<PackageIdentity, String>>,
}

impl PackageRestoreRepository {
    /// Create a restore repository. Failing peers are skipped.
    pub fn new(primary: Arc<dyn Repository>, peers: Vec<Arc<dyn Repository>>) -> Self {
        PackageRestoreRepository {
            primary,
            peers: AggregateRepository::new(peers).ignore_failing(true),
            provenance: Mutex::new(HashMap::new()),
        }
    }

    /// Build the restore repository for `primary`.
    ///
    /// The peers are every other enabled source. With no peers, the primary
    /// repository itself is returned.
    pub fn for_source(
        primary: &PackageSource,
        sources: &dyn SourceProvider,
        factory: &dyn RepositoryFactory,
    ) -> Result<Arc<dyn Repository>> {
        let primary_repo = factory.create(primary)?;

        let peer_sources: Vec<PackageSource> = sources
            .enabled_sources()
            .into_iter()
            .filter(|s| !s.matches_source(&primary.source) && !ids_match(&s.name, &primary.name))
            .collect();
        if peer_sources.is_empty() {
            tracing::debug!("no peers for {}, restoring from it alone", primary.name);
            return Ok(primary_repo);
        }

        let mut peers = Vec::with_capacity(peer_sources.len());
        for source in &peer_sources {
            match factory.create(source) {
                Ok(repo) => peers.push(repo),
                Err(e) => tracing::warn!("skipping package source `{}`: {:#}", source.name, e),
            }
        }
        if peers.is_empty() {
            return Ok(primary_repo);
        }

        Ok(Arc::new(PackageRestoreRepository::new(primary_repo, peers)))
    }

    /// Get the authoritative repository.
    pub fn primary(&self) -> &Arc<dyn Repository> {
        &self.primary
    }

    /// The peer source a package was served from, if a peer served it.
    pub fn provenance(&self, identity: &PackageIdentity) -> Option<String> {
        self.provenance
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identity)
            .cloned()
    }

    fn record(&self, package: Package) -> Package {
        if let Some(source) = package.source() {
            tracing::info!("{} served by {}", package.identity(), source);
            self.provenance
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(package.identity().clone(), source.to_string());
        }
        package
    }
}

impl Repository for PackageRestoreRepository {
    fn source(&self) -> &str {
        self.primary.source()
    }

    fn kind(&self) -> RepositoryKind {
        RepositoryKind::Restore
    }

    fn find_package(&self, id: &str, version: &PackageVersion) -> Result<Option<Package>> {
        if let Some(found) = self.primary.find_package(id, version)? {
            return Ok(Some(found));
        }
        Ok(self
            .peers
            .find_package(id, version)?
            .map(|p| self.record(p)))
    }

    fn find_packages_by_id(&self, id: &str) -> Result<Vec<Package>> {
        let own = self.primary.find_packages_by_id(id)?;
        let from_peers: Vec<Package> = self
            .peers
            .find_packages_by_id(id)?
            .into_iter()
            .filter(|p| !own.iter().any(|o| o.same_identity(p)))
            .map(|p| self.record(p))
            .collect();
        Ok(merge_first_wins([own, from_peers]))
    }

    fn list_packages(&self) -> Result<Vec<Package>> {
        let own = self.primary.list_packages()?;
        let from_peers = self.peers.list_packages()?;
        Ok(merge_first_wins([own, from_peers]))
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
        Ok(self
            .peers
            .resolve_dependency(dep, origin)?
            .map(|p| self.record(p)))
    }
}

impl std::fmt::Debug for PackageRestoreRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageRestoreRepository")
            .field("primary", &self.primary.source())
            .field("peers", &self.peers)
            .finish()
    }
}
