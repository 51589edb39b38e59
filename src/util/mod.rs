//! Shared utilities

pub mod config;
pub mod context;
pub mod fs;
pub mod hash;
pub mod shell;

pub use config::Config;
pub use context::GlobalContext;
