//! Package repositories.
//!
//! Concrete repositories (local folders, the shared store) and the
//! composites built on top of them (aggregate, fallback, restore).

pub mod aggregate;
pub mod cache;
pub mod fallback;
pub mod local;
pub mod restore;
pub mod shared;

pub use aggregate::AggregateRepository;
pub use cache::SourceRepositoryFactory;
pub use fallback::FallbackRepository;
pub use local::LocalRepository;
pub use restore::PackageRestoreRepository;
pub use shared::SharedRepository;
