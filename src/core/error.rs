//! Repository error taxonomy.
//!
//! NotFound is never an error here: `find` and `list` report absence as
//! `None` or an empty list. Everything below is a real failure.

use std::io;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised by repositories, composites and the reference manifest.
#[derive(Debug, Error, Diagnostic)]
pub enum RepositoryError {
    /// A source could not be reached or created.
    #[error("package source `{source_name}` is unavailable: {message}")]
    #[diagnostic(
        code(wharf::source_unavailable),
        help("check the source with `wharf source list`, or disable it")
    )]
    SourceUnavailable {
        source_name: String,
        message: String,
    },

    /// The reference manifest and its backing repository disagree.
    #[error("reference manifest {manifest} has no entry for {id} {version}")]
    #[diagnostic(
        code(wharf::consistency_fault),
        help("the manifest and the package store are out of sync; restore the manifest from source control")
    )]
    ConsistencyFault {
        id: String,
        version: String,
        manifest: PathBuf,
    },

    /// A document could not be read or written.
    #[error("failed to persist {}", path.display())]
    #[diagnostic(code(wharf::persistence))]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A persisted document exists but cannot be parsed.
    #[error("invalid document {}: {message}", path.display())]
    #[diagnostic(code(wharf::invalid_document))]
    InvalidDocument { path: PathBuf, message: String },

    #[error("invalid version `{version}`: {message}")]
    #[diagnostic(
        code(wharf::invalid_version),
        help("versions have one to three numeric components, e.g. `1.2.0` or `1.0-beta`")
    )]
    InvalidVersion { version: String, message: String },

    #[error("invalid package id `{id}`: {message}")]
    #[diagnostic(code(wharf::invalid_package_id))]
    InvalidPackageId { id: String, message: String },

    /// The repository is a view and cannot be written to.
    #[error("repository `{source_name}` is read-only")]
    #[diagnostic(code(wharf::read_only))]
    ReadOnly { source_name: String },
}

impl RepositoryError {
    /// Create a `SourceUnavailable` error.
    pub fn unavailable(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        RepositoryError::SourceUnavailable {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a `Persistence` error.
    pub fn persistence(path: impl Into<PathBuf>, source: io::Error) -> Self {
        RepositoryError::Persistence {
            path: path.into(),
            source,
        }
    }

    /// Check if this is a consistency fault between a manifest and its store.
    pub fn is_consistency_fault(&self) -> bool {
        matches!(self, RepositoryError::ConsistencyFault { .. })
    }
}
