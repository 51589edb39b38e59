//! Wharf - package-repository composition for a package manager client
//!
//! This crate composes package sources (local folders, the shared on-disk
//! store and a per-project reference manifest) into single repository
//! views, and drives installs and restores through them.

pub mod core;
pub mod ops;
pub mod project;
pub mod sources;
pub mod util;

/// Test utilities and mocks for Wharf unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides in-memory filesystems, repositories and
/// package fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{
    Dependency, Package, PackageIdentity, PackageSource, PackageVersion, Repository,
    RepositoryError, RepositoryKind, Workspace, WorkspaceLifecycle,
};
pub use ops::{PackageManager, PackageManagerFactory, RepositoryInfoCache};
pub use project::{ProjectManager, ReferenceManifest};
pub use util::context::GlobalContext;
