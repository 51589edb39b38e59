//! High-level operations.
//!
//! This module contains the orchestration behind Wharf commands.

pub mod package_manager;
pub mod repository_info;
pub mod resolve;
pub mod restore;
pub mod source_config;

pub use package_manager::{Installation, PackageManager, PackageManagerFactory, StoreSettings};
pub use repository_info::{RepositoryInfo, RepositoryInfoCache};
pub use resolve::{resolve_closure, Resolution, ResolveError};
pub use restore::{restore, restore_references, RestoreEvent, RestoreReport, RestoredPackage};
pub use source_config::{add_source, remove_source, set_source_enabled};
