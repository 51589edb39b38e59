//! Test utilities and mocks for Wharf unit tests.
//!
//! This module provides in-memory implementations of the two seams the
//! composition layer is built on: [`FileSystem`] and [`Repository`].
//!
//! # Example
//!
//! ```rust,ignore
//! use wharf::test_support::{pkg, MockFileSystem, MockRepository};
//!
//! #[test]
//! fn test_example() {
//!     let fs = MockFileSystem::new("/project");
//!     let repo = MockRepository::new("feed").with_package(pkg("Foo", "1.0"));
//!
//!     // Use mocks in tests...
//! }
//! ```

pub mod fixtures;

use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::core::error::RepositoryError;
use crate::core::package_id::ids_match;
use crate::core::{
    sources_match, Package, PackageSource, PackageVersion, Repository, RepositoryFactory,
    RepositoryKind,
};
use crate::util::fs::{FileSystem, WriteFn};

pub use fixtures::*;

/// Mock filesystem for testing without real I/O.
///
/// Files live in a map keyed by root-relative path. Directories are
/// implied by the files inside them.
#[derive(Debug, Default)]
pub struct MockFileSystem {
    root: PathBuf,
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
    source_control: bool,
}

impl MockFileSystem {
    /// Create a new empty mock filesystem.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        MockFileSystem {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Pretend to be bound to source control.
    pub fn source_controlled(mut self) -> Self {
        self.source_control = true;
        self
    }

    /// Add a file with the given content.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        self.files
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf(), content.into());
    }

    /// Read a file as a string.
    pub fn read_to_string(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(path.as_ref())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Make every subsequent write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Get all file paths (for debugging).
    pub fn all_files(&self) -> Vec<PathBuf> {
        self.files.lock().unwrap().keys().cloned().collect()
    }
}

impl FileSystem for MockFileSystem {
    fn root(&self) -> &Path {
        &self.root
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn directory_exists(&self, path: &Path) -> bool {
        self.files
            .lock()
            .unwrap()
            .keys()
            .any(|p| p.starts_with(path) && p != path)
    }

    fn open_file(&self, path: &Path) -> Result<Box<dyn Read>> {
        let bytes = self.files.lock().unwrap().get(path).cloned().ok_or_else(|| {
            RepositoryError::persistence(
                self.full_path(path),
                io::Error::new(io::ErrorKind::NotFound, "file not found"),
            )
        })?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn write_file(&self, path: &Path, write: WriteFn<'_>) -> Result<()> {
        let mut buffer = Vec::new();
        write(&mut buffer).map_err(|e| RepositoryError::persistence(self.full_path(path), e))?;

        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::persistence(
                self.full_path(path),
                io::Error::new(io::ErrorKind::Other, "simulated write failure"),
            )
            .into());
        }

        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), buffer);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn delete_file(&self, path: &Path) -> Result<()> {
        self.files.lock().unwrap().remove(path);
        Ok(())
    }

    fn directories(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.files.lock().unwrap();
        let mut dirs: Vec<PathBuf> = files
            .keys()
            .filter_map(|p| p.strip_prefix(path).ok())
            .filter(|rest| rest.components().count() > 1)
            .filter_map(|rest| rest.components().next())
            .map(|first| path.join(first))
            .collect();
        dirs.sort();
        dirs.dedup();
        Ok(dirs)
    }

    fn delete_directory(&self, path: &Path) -> Result<()> {
        self.files
            .lock()
            .unwrap()
            .retain(|p, _| !p.starts_with(path));
        Ok(())
    }

    fn is_source_control_bound(&self) -> bool {
        self.source_control
    }
}

/// In-memory repository with failure injection and call counting.
#[derive(Debug)]
pub struct MockRepository {
    source: String,
    kind: RepositoryKind,
    packages: Mutex<Vec<Package>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl MockRepository {
    /// Create a new empty repository.
    pub fn new(source: impl Into<String>) -> Self {
        MockRepository {
            source: source.into(),
            kind: RepositoryKind::Simple,
            packages: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Add a package (builder style).
    pub fn with_package(self, package: Package) -> Self {
        self.insert(package);
        self
    }

    /// Report a different kind.
    pub fn with_kind(mut self, kind: RepositoryKind) -> Self {
        self.kind = kind;
        self
    }

    /// Make every call fail with `SourceUnavailable`.
    pub fn failing(self) -> Self {
        self.set_failing(true);
        self
    }

    /// Toggle failure injection.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Insert a package directly, bypassing call counting.
    pub fn insert(&self, package: Package) {
        let package = package.with_source(self.source.clone());
        self.packages.lock().unwrap().push(package);
    }

    /// Number of repository calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Snapshot of the stored packages.
    pub fn packages(&self) -> Vec<Package> {
        self.packages.lock().unwrap().clone()
    }

    fn enter(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::unavailable(&self.source, "mock failure").into());
        }
        Ok(())
    }
}

impl Repository for MockRepository {
    fn source(&self) -> &str {
        &self.source
    }

    fn kind(&self) -> RepositoryKind {
        self.kind
    }

    fn find_package(&self, id: &str, version: &PackageVersion) -> Result<Option<Package>> {
        self.enter()?;
        Ok(self
            .packages
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.identity().matches(id, version))
            .cloned())
    }

    fn find_packages_by_id(&self, id: &str) -> Result<Vec<Package>> {
        self.enter()?;
        Ok(self
            .packages
            .lock()
            .unwrap()
            .iter()
            .filter(|p| ids_match(p.id(), id))
            .cloned()
            .collect())
    }

    fn list_packages(&self) -> Result<Vec<Package>> {
        self.enter()?;
        Ok(self.packages())
    }

    fn add_package(&self, package: &Package) -> Result<()> {
        self.enter()?;
        let mut packages = self.packages.lock().unwrap();
        if !packages.iter().any(|p| p.same_identity(package)) {
            packages.push(package.clone().with_source(self.source.clone()));
        }
        Ok(())
    }

    fn remove_package(&self, package: &Package) -> Result<()> {
        self.enter()?;
        self.packages
            .lock()
            .unwrap()
            .retain(|p| !p.same_identity(package));
        Ok(())
    }
}

/// Factory handing out pre-built repositories by source string.
#[derive(Default)]
pub struct MockRepositoryFactory {
    repositories: Vec<Arc<dyn Repository>>,
    created: AtomicUsize,
}

impl MockRepositoryFactory {
    /// Create a factory that knows no sources.
    pub fn new() -> Self {
        MockRepositoryFactory::default()
    }

    /// Serve `repo` for its own source string.
    pub fn with(mut self, repo: Arc<dyn Repository>) -> Self {
        self.repositories.push(repo);
        self
    }

    /// Number of successful `create` calls.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl RepositoryFactory for MockRepositoryFactory {
    fn create(&self, source: &PackageSource) -> Result<Arc<dyn Repository>> {
        let repo = self
            .repositories
            .iter()
            .find(|r| sources_match(r.source(), &source.source))
            .cloned()
            .ok_or_else(|| RepositoryError::unavailable(&source.name, "unknown mock source"))?;
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_fs_directories() {
        let fs = MockFileSystem::new("/root");
        fs.add_file("packages/Foo.1.0.0/package.toml", "x");
        fs.add_file("packages/Bar.2.0.0/package.toml", "y");
        fs.add_file("packages/readme.txt", "z");

        let dirs = fs.directories(Path::new("packages")).unwrap();
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("packages/Bar.2.0.0"),
                PathBuf::from("packages/Foo.1.0.0")
            ]
        );
    }

    #[test]
    fn test_mock_fs_write_failure() {
        let fs = MockFileSystem::new("/root");
        fs.fail_writes(true);

        let result = fs.write_file(Path::new("a.toml"), &mut |w: &mut dyn Write| w.write_all(b"x"));
        assert!(result.is_err());
        assert!(!fs.file_exists(Path::new("a.toml")));
    }

    #[test]
    fn test_mock_repository_failure() {
        let repo = MockRepository::new("feed").failing();
        assert!(repo.list_packages().is_err());
        assert_eq!(repo.calls(), 1);

        repo.set_failing(false);
        assert!(repo.list_packages().unwrap().is_empty());
    }

    #[test]
    fn test_mock_repository_stamps_source() {
        let repo = MockRepository::new("feed").with_package(pkg("Foo", "1.0"));
        let found = repo
            .find_package("foo", &PackageVersion::new(1, 0, 0))
            .unwrap()
            .unwrap();
        assert_eq!(found.source(), Some("feed"));
    }
}
