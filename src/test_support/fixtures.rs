//! Test fixtures for common test scenarios.

use std::path::Path;

use crate::core::{Dependency, Package, PackageIdentity, PackageSource};

/// Create a package with no dependencies.
pub fn pkg(id: &str, version: &str) -> Package {
    Package::new(PackageIdentity::parse(id, version).expect("valid test identity"))
}

/// Create a package with dependencies given as `(id, requirement)` pairs.
pub fn pkg_with_deps(id: &str, version: &str, deps: &[(&str, &str)]) -> Package {
    let dependencies = deps
        .iter()
        .map(|(dep_id, req)| Dependency::parse(dep_id, req).expect("valid test dependency"))
        .collect();
    pkg(id, version).with_dependencies(dependencies)
}

/// Create an enabled folder source.
pub fn folder_source(name: &str, path: &Path) -> PackageSource {
    PackageSource::new(name, path.to_string_lossy().into_owned())
}

/// Write a package descriptor into a folder feed, the way a publisher would.
pub fn publish(feed: &Path, package: &Package) {
    let dir = feed.join(package.identity().dir_name());
    std::fs::create_dir_all(&dir).unwrap();
    let content = toml::to_string_pretty(&package.to_descriptor()).unwrap();
    std::fs::write(dir.join("package.toml"), content).unwrap();
}
