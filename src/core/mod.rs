//! Core data structures for Wharf.
//!
//! This module contains the foundational types used throughout Wharf:
//! - Package identities, versions and dependencies
//! - Package sources and the source enumeration capability
//! - The Repository contract every source and composite implements
//! - Workspace paths and the workspace lifecycle

pub mod dependency;
pub mod error;
pub mod package;
pub mod package_id;
pub mod repository;
pub mod source;
pub mod version;
pub mod workspace;

pub use dependency::Dependency;
pub use error::RepositoryError;
pub use package::{Package, PackageDescriptor};
pub use package_id::{ids_match, versions_match, PackageIdentity};
pub use repository::{best_match, Repository, RepositoryFactory, RepositoryKind};
pub use source::{sources_match, PackageSource, SourceList, SourceProvider, AGGREGATE_SOURCE};
pub use version::PackageVersion;
pub use workspace::{
    Subscription, Workspace, WorkspaceLifecycle, WorkspaceListener, CONFIG_DIR, CONFIG_FILE,
    MANIFEST_NAME,
};
