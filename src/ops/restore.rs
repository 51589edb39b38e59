//! Implementation of `wharf restore`.
//!
//! Every package the project references but the shared store lacks is
//! fetched from a restore repository and added to the store.

use anyhow::Result;
use serde::Serialize;

use crate::core::{PackageIdentity, PackageSource, Repository};
use crate::ops::package_manager::PackageManagerFactory;
use crate::project::ReferenceManifest;

/// A package put back into the store.
#[derive(Debug, Clone, Serialize)]
pub struct RestoredPackage {
    pub id: String,
    pub version: String,

    /// Source the package was fetched from
    pub source: Option<String>,
}

/// Outcome of a restore.
#[derive(Debug, Default, Serialize)]
pub struct RestoreReport {
    pub restored: Vec<RestoredPackage>,

    /// References no source could provide
    pub missing: Vec<String>,

    /// References that were already in the store
    pub present: usize,
}

impl RestoreReport {
    /// Whether every reference is now in the store.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Progress notifications during a restore.
#[derive(Debug)]
pub enum RestoreEvent<'a> {
    /// Restoring is about to fetch `total` packages
    Started { total: usize },
    Restored(&'a RestoredPackage),
    Missing(&'a PackageIdentity),
}

/// Restore the references of `manifest` missing from `store`, fetching
/// them from `from`.
pub fn restore_references(
    manifest: &ReferenceManifest,
    store: &dyn Repository,
    from: &dyn Repository,
    on_progress: &mut dyn FnMut(RestoreEvent<'_>),
) -> Result<RestoreReport> {
    let references = manifest.references()?;

    let mut missing = Vec::new();
    for entry in &references {
        if !store.exists(entry.id(), entry.version())? {
            missing.push(entry.identity());
        }
    }

    let mut report = RestoreReport {
        present: references.len() - missing.len(),
        ..Default::default()
    };
    tracing::debug!(
        "{} of {} reference(s) missing from {}",
        missing.len(),
        references.len(),
        store.source()
    );
    on_progress(RestoreEvent::Started {
        total: missing.len(),
    });

    for identity in missing {
        match from.find_package(identity.id(), identity.version())? {
            Some(package) => {
                store.add_package(&package)?;
                let restored = RestoredPackage {
                    id: package.id().to_string(),
                    version: package.version().to_string(),
                    source: package.source().map(str::to_string),
                };
                on_progress(RestoreEvent::Restored(&restored));
                report.restored.push(restored);
            }
            None => {
                tracing::warn!("unable to find {} in any source", identity);
                on_progress(RestoreEvent::Missing(&identity));
                report.missing.push(identity.display_name());
            }
        }
    }

    Ok(report)
}

/// Restore a project's missing references into the shared store, with
/// `primary` as the authoritative source.
pub fn restore(
    factory: &PackageManagerFactory,
    manifest: &ReferenceManifest,
    primary: &PackageSource,
    on_progress: &mut dyn FnMut(RestoreEvent<'_>),
) -> Result<RestoreReport> {
    let from = factory.create_restore_repository(primary)?;
    let info = factory.repository_info();
    restore_references(manifest, info.repository().as_ref(), from.as_ref(), on_progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::core::{Package, PackageVersion};
    use crate::sources::{PackageRestoreRepository, SharedRepository};
    use crate::test_support::{pkg, MockFileSystem, MockRepository};

    struct Fixture {
        manifest: ReferenceManifest,
        store: Arc<SharedRepository>,
    }

    /// A project referencing `packages`, none of which are in the store.
    fn fixture(packages: &[Package]) -> Fixture {
        let store = Arc::new(SharedRepository::new(
            Arc::new(MockFileSystem::new("/w/packages")),
            Arc::new(MockFileSystem::new("/w/.wharf")),
        ));
        let manifest = ReferenceManifest::new(Arc::new(MockFileSystem::new("/w/app")), store.clone());
        for package in packages {
            manifest.add(package).unwrap();
        }
        for package in packages {
            store.remove_package(package).unwrap();
        }
        Fixture { manifest, store }
    }

    #[test]
    fn test_restore_from_primary_and_peer() {
        let f = fixture(&[pkg("Foo", "1.0"), pkg("Bar", "2.0")]);
        let primary: Arc<dyn Repository> =
            Arc::new(MockRepository::new("/feeds/a").with_package(pkg("Foo", "1.0")));
        let peer: Arc<dyn Repository> =
            Arc::new(MockRepository::new("/feeds/b").with_package(pkg("Bar", "2.0")));
        let from = PackageRestoreRepository::new(primary, vec![peer]);

        let mut events = Vec::new();
        let report = restore_references(&f.manifest, f.store.as_ref(), &from, &mut |event| {
            events.push(format!("{:?}", event))
        })
        .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.restored.len(), 2);
        assert_eq!(report.restored[0].source.as_deref(), Some("/feeds/a"));
        assert_eq!(report.restored[1].source.as_deref(), Some("/feeds/b"));
        assert_eq!(events.len(), 3);
        assert!(events[0].contains("Started"));

        let bar = crate::core::PackageIdentity::parse("Bar", "2.0").unwrap();
        assert_eq!(from.provenance(&bar).as_deref(), Some("/feeds/b"));
        assert!(f.store.exists("Bar", &PackageVersion::new(2, 0, 0)).unwrap());
    }

    #[test]
    fn test_restore_reports_missing() {
        let f = fixture(&[pkg("Foo", "1.0"), pkg("Gone", "1.0")]);
        let from = MockRepository::new("/feeds/a").with_package(pkg("Foo", "1.0"));

        let report = restore_references(&f.manifest, f.store.as_ref(), &from, &mut |_| {}).unwrap();
        assert!(!report.is_complete());
        assert_eq!(report.missing, vec!["Gone 1.0.0"]);
        assert_eq!(report.restored.len(), 1);
    }

    #[test]
    fn test_restore_skips_present_packages() {
        let f = fixture(&[pkg("Foo", "1.0")]);
        f.store.add_package(&pkg("Foo", "1.0")).unwrap();
        let from = MockRepository::new("/feeds/a");

        let report = restore_references(&f.manifest, f.store.as_ref(), &from, &mut |_| {}).unwrap();
        assert_eq!(report.present, 1);
        assert!(report.restored.is_empty());
        assert_eq!(from.calls(), 0);
    }

    #[test]
    fn test_primary_failure_propagates() {
        let f = fixture(&[pkg("Foo", "1.0")]);
        let from = MockRepository::new("/feeds/a").failing();

        assert!(restore_references(&f.manifest, f.store.as_ref(), &from, &mut |_| {}).is_err());
    }
}
