//! Aggregate repository - one view over many.
//!
//! Queries fan out to every member in order and the results are merged by
//! identity. When two members hold the same identity, the first member's
//! copy wins.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;

use crate::core::{
    best_match, sources_match, Dependency, Package, PackageIdentity, PackageVersion,
    Repository, RepositoryError, RepositoryKind, AGGREGATE_SOURCE,
};

/// A read-only union of member repositories.
pub struct AggregateRepository {
    members: Vec<Arc<dyn Repository>>,

    /// Skip members that error instead of failing the call
    ignore_failing: bool,

    /// Resolve a package's dependencies from its own member first
    resolve_vertically: bool,

    /// The members are every enabled source
    all_sources: bool,
}

impl AggregateRepository {
    /// Create an aggregate over `members`, queried in order.
    pub fn new(members: Vec<Arc<dyn Repository>>) -> Self {
        AggregateRepository {
            members,
            ignore_failing: false,
            resolve_vertically: false,
            all_sources: false,
        }
    }

    /// Skip failing members for the rest of a call instead of propagating.
    pub fn ignore_failing(mut self, ignore: bool) -> Self {
        self.ignore_failing = ignore;
        self
    }

    /// Resolve dependencies from the dependent's own member first.
    pub fn resolve_vertically(mut self, vertical: bool) -> Self {
        self.resolve_vertically = vertical;
        self
    }

    /// Mark this aggregate as the union of every enabled source.
    pub fn of_all_sources(mut self) -> Self {
        self.all_sources = true;
        self
    }

    /// Get the members in query order.
    pub fn members(&self) -> &[Arc<dyn Repository>] {
        &self.members
    }

    fn fanout(&self) -> Fanout<'_> {
        Fanout {
            aggregate: self,
            failed: vec![false; self.members.len()],
        }
    }
}

/// Per-call view of the members.
///
/// A member that fails while failures are ignored is skipped by every
/// later query made through the same Fanout.
struct Fanout<'a> {
    aggregate: &'a AggregateRepository,
    failed: Vec<bool>,
}

impl Fanout<'_> {
    /// Run `op` against one member.
    ///
    /// Returns `Ok(None)` when the member was skipped.
    fn member<T>(
        &mut self,
        index: usize,
        op: &mut impl FnMut(&dyn Repository) -> Result<T>,
    ) -> Result<Option<T>> {
        if self.failed[index] {
            return Ok(None);
        }

        let member = &self.aggregate.members[index];
        match op(member.as_ref()) {
            Ok(value) => Ok(Some(value)),
            Err(e) if self.aggregate.ignore_failing => {
                tracing::warn!("skipping package source `{}`: {:#}", member.source(), e);
                self.failed[index] = true;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Run `op` against every member and collect the answers.
    fn all<T>(&mut self, mut op: impl FnMut(&dyn Repository) -> Result<T>) -> Result<Vec<T>> {
        let mut results = Vec::with_capacity(self.failed.len());
        for index in 0..self.failed.len() {
            if let Some(value) = self.member(index, &mut op)? {
                results.push(value);
            }
        }
        Ok(results)
    }

    /// Return the first member answer that is `Some`, skipping `except`.
    fn first<T>(
        &mut self,
        except: Option<usize>,
        mut op: impl FnMut(&dyn Repository) -> Result<Option<T>>,
    ) -> Result<Option<T>> {
        for index in 0..self.failed.len() {
            if Some(index) == except {
                continue;
            }
            if let Some(Some(value)) = self.member(index, &mut op)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

/// Merge package lists by identity, keeping the first occurrence.
pub(crate) fn merge_first_wins(lists: impl IntoIterator<Item = Vec<Package>>) -> Vec<Package> {
    let mut seen: HashMap<PackageIdentity, Option<String>> = HashMap::new();
    let mut merged = Vec::new();

    for package in lists.into_iter().flatten() {
        match seen.get(package.identity()) {
            Some(kept) => {
                if let (Some(kept), Some(other)) = (kept.as_deref(), package.checksum()) {
                    if kept != other {
                        tracing::debug!(
                            "{} from {} differs from an earlier source; keeping the first",
                            package.identity(),
                            package.source().unwrap_or("unknown source")
                        );
                    }
                }
            }
            None => {
                seen.insert(
                    package.identity().clone(),
                    package.checksum().map(str::to_string),
                );
                merged.push(package);
            }
        }
    }

    merged
}

impl Repository for AggregateRepository {
    fn source(&self) -> &str {
        AGGREGATE_SOURCE
    }

    fn kind(&self) -> RepositoryKind {
        RepositoryKind::Aggregate {
            all_sources: self.all_sources,
        }
    }

    fn find_package(&self, id: &str, version: &PackageVersion) -> Result<Option<Package>> {
        self.fanout().first(None, |r| r.find_package(id, version))
    }

    fn find_packages_by_id(&self, id: &str) -> Result<Vec<Package>> {
        let lists = self.fanout().all(|r| r.find_packages_by_id(id))?;
        Ok(merge_first_wins(lists))
    }

    fn list_packages(&self) -> Result<Vec<Package>> {
        let lists = self.fanout().all(|r| r.list_packages())?;
        Ok(merge_first_wins(lists))
    }

    fn add_package(&self, _package: &Package) -> Result<()> {
        Err(RepositoryError::ReadOnly {
            source_name: AGGREGATE_SOURCE.to_string(),
        }
        .into())
    }

    fn remove_package(&self, _package: &Package) -> Result<()> {
        Err(RepositoryError::ReadOnly {
            source_name: AGGREGATE_SOURCE.to_string(),
        }
        .into())
    }

    fn resolve_dependency(&self, dep: &Dependency, origin: Option<&str>) -> Result<Option<Package>> {
        let mut fanout = self.fanout();

        // Stay within the dependent's member when it can satisfy the dependency.
        let home = origin
            .filter(|_| self.resolve_vertically)
            .and_then(|origin| {
                self.members
                    .iter()
                    .position(|m| sources_match(m.source(), origin))
            });
        if let Some(index) = home {
            if let Some(Some(found)) =
                fanout.member(index, &mut |r: &dyn Repository| r.resolve_dependency(dep, origin))?
            {
                return Ok(Some(found));
            }
        }

        let lists = fanout.all(|r| r.find_packages_by_id(dep.id()))?;
        Ok(best_match(dep, merge_first_wins(lists)))
    }
}

impl std::fmt::Debug for AggregateRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sources: Vec<&str> = self.members.iter().map(|m| m.source()).collect();
        f.debug_struct("AggregateRepository")
            .field("members", &sources)
            .field("ignore_failing", &self.ignore_failing)
            .field("resolve_vertically", &self.resolve_vertically)
            .field("all_sources", &self.all_sources)
            .finish()
    }
}
