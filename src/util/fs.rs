//! Filesystem abstraction.
//!
//! Repositories and manifests never touch `std::fs` directly; they go
//! through a [`FileSystem`] rooted at some directory. Paths passed to a
//! FileSystem are relative to its root.
//!
//! Two implementations exist:
//! - [`PhysicalFileSystem`] - plain disk access with atomic file replacement
//! - [`SourceControlFileSystem`] - the same, plus keeping a git index in step
//!   with every write and delete

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use git2::Repository as GitRepository;
use tempfile::NamedTempFile;

use crate::core::error::RepositoryError;

/// Callback that produces file content.
pub type WriteFn<'a> = &'a mut dyn FnMut(&mut dyn Write) -> io::Result<()>;

/// A filesystem rooted at a directory.
pub trait FileSystem: Send + Sync {
    /// The root directory.
    fn root(&self) -> &Path;

    /// Check if a file exists.
    fn file_exists(&self, path: &Path) -> bool;

    /// Check if a directory exists.
    fn directory_exists(&self, path: &Path) -> bool;

    /// Open a file for reading.
    fn open_file(&self, path: &Path) -> Result<Box<dyn Read>>;

    /// Replace a file's content with whatever `write` produces.
    ///
    /// The replacement is atomic: if `write` fails, the previous content
    /// is left untouched.
    fn write_file(&self, path: &Path, write: WriteFn<'_>) -> Result<()>;

    /// Delete a file. Deleting a missing file is not an error.
    fn delete_file(&self, path: &Path) -> Result<()>;

    /// List the subdirectories of a directory, as root-relative paths.
    ///
    /// A missing directory has no subdirectories.
    fn directories(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Delete a directory and everything in it, if it exists.
    fn delete_directory(&self, path: &Path) -> Result<()>;

    /// Whether changes made through this filesystem are tracked by source control.
    fn is_source_control_bound(&self) -> bool {
        false
    }

    /// Get the full path of a root-relative path.
    fn full_path(&self, path: &Path) -> PathBuf {
        self.root().join(path)
    }
}

/// Read a whole file as a string.
pub fn read_to_string(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut content = String::new();
    fs.open_file(path)?
        .read_to_string(&mut content)
        .map_err(|e| RepositoryError::persistence(fs.full_path(path), e))?;
    Ok(content)
}

/// Write a string to a file, replacing it atomically.
pub fn write_string(fs: &dyn FileSystem, path: &Path, contents: &str) -> Result<()> {
    fs.write_file(path, &mut |w: &mut dyn Write| w.write_all(contents.as_bytes()))
}

/// Filesystem backed by the real disk.
#[derive(Debug, Clone)]
pub struct PhysicalFileSystem {
    root: PathBuf,
}

impl PhysicalFileSystem {
    /// Create a filesystem rooted at `root`. The root need not exist yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        PhysicalFileSystem { root: root.into() }
    }
}

impl FileSystem for PhysicalFileSystem {
    fn root(&self) -> &Path {
        &self.root
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.full_path(path).is_file()
    }

    fn directory_exists(&self, path: &Path) -> bool {
        self.full_path(path).is_dir()
    }

    fn open_file(&self, path: &Path) -> Result<Box<dyn Read>> {
        let full = self.full_path(path);
        let file = fs::File::open(&full).map_err(|e| RepositoryError::persistence(&full, e))?;
        Ok(Box::new(io::BufReader::new(file)))
    }

    fn write_file(&self, path: &Path, write: WriteFn<'_>) -> Result<()> {
        let full = self.full_path(path);
        let parent = full.parent().unwrap_or(&self.root).to_path_buf();
        ensure_dir(&parent)?;

        // Write next to the target so the final rename stays on one filesystem.
        let mut tmp =
            NamedTempFile::new_in(&parent).map_err(|e| RepositoryError::persistence(&full, e))?;
        write(&mut tmp)
            .and_then(|_| tmp.flush())
            .map_err(|e| RepositoryError::persistence(&full, e))?;
        tmp.persist(&full)
            .map_err(|e| RepositoryError::persistence(&full, e.error))?;

        tracing::debug!("wrote {}", full.display());
        Ok(())
    }

    fn delete_file(&self, path: &Path) -> Result<()> {
        let full = self.full_path(path);
        match fs::remove_file(&full) {
            Ok(()) => {
                tracing::debug!("deleted {}", full.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RepositoryError::persistence(&full, e).into()),
        }
    }

    fn directories(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let full = self.full_path(path);
        if !full.is_dir() {
            return Ok(Vec::new());
        }

        let mut dirs = Vec::new();
        for entry in fs::read_dir(&full)
            .with_context(|| format!("failed to read directory: {}", full.display()))?
        {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                dirs.push(path.join(entry.file_name()));
            }
        }

        dirs.sort();
        Ok(dirs)
    }

    fn delete_directory(&self, path: &Path) -> Result<()> {
        let full = self.full_path(path);
        if full.exists() {
            fs::remove_dir_all(&full)
                .with_context(|| format!("failed to remove directory: {}", full.display()))?;
        }
        Ok(())
    }
}

/// Filesystem whose changes are staged in a git index.
pub struct SourceControlFileSystem {
    inner: PhysicalFileSystem,
    repo: Mutex<GitRepository>,
    workdir: PathBuf,
}

impl SourceControlFileSystem {
    /// Wrap `root` in a filesystem bound to the git work tree `repo`.
    ///
    /// Returns `None` for bare repositories.
    pub fn new(root: impl Into<PathBuf>, repo: GitRepository) -> Option<Self> {
        let workdir = normalize_path(repo.workdir()?);
        Some(SourceControlFileSystem {
            inner: PhysicalFileSystem::new(root),
            repo: Mutex::new(repo),
            workdir,
        })
    }

    /// Path relative to the work tree, if the file lives inside it.
    ///
    /// Only the parent is canonicalized, so this also works for deleted files.
    fn tracked_path(&self, path: &Path) -> Option<PathBuf> {
        let full = self.inner.full_path(path);
        let full = match (full.parent(), full.file_name()) {
            (Some(parent), Some(name)) => normalize_path(parent).join(name),
            _ => normalize_path(&full),
        };
        full.strip_prefix(&self.workdir).ok().map(Path::to_path_buf)
    }

    fn update_index(
        &self,
        path: &Path,
        op: impl FnOnce(&mut git2::Index, &Path) -> Result<(), git2::Error>,
    ) -> Result<()> {
        let Some(relative) = self.tracked_path(path) else {
            tracing::debug!(
                "{} is outside the work tree {}",
                path.display(),
                self.workdir.display()
            );
            return Ok(());
        };

        let repo = self
            .repo
            .lock()
            .map_err(|_| anyhow::anyhow!("git repository lock poisoned"))?;
        let mut index = repo.index().context("failed to open git index")?;
        op(&mut index, &relative)
            .with_context(|| format!("failed to update git index for {}", relative.display()))?;
        index.write().context("failed to write git index")?;
        Ok(())
    }
}

impl FileSystem for SourceControlFileSystem {
    fn root(&self) -> &Path {
        self.inner.root()
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.inner.file_exists(path)
    }

    fn directory_exists(&self, path: &Path) -> bool {
        self.inner.directory_exists(path)
    }

    fn open_file(&self, path: &Path) -> Result<Box<dyn Read>> {
        self.inner.open_file(path)
    }

    fn write_file(&self, path: &Path, write: WriteFn<'_>) -> Result<()> {
        self.inner.write_file(path, write)?;
        self.update_index(path, |index, rel| index.add_path(rel))
    }

    fn delete_file(&self, path: &Path) -> Result<()> {
        let existed = self.inner.file_exists(path);
        self.inner.delete_file(path)?;
        if existed {
            self.update_index(path, |index, rel| index.remove_path(rel))?;
        }
        Ok(())
    }

    fn directories(&self, path: &Path) -> Result<Vec<PathBuf>> {
        self.inner.directories(path)
    }

    fn delete_directory(&self, path: &Path) -> Result<()> {
        let existed = self.inner.directory_exists(path);
        if existed {
            self.update_index(path, |index, rel| index.remove_dir(rel, 0))?;
        }
        self.inner.delete_directory(path)
    }

    fn is_source_control_bound(&self) -> bool {
        true
    }
}

/// Find the git work tree containing `path`, if any.
///
/// `path` need not exist; the nearest existing ancestor is probed.
pub fn probe_source_control(path: &Path) -> Option<GitRepository> {
    let existing = path.ancestors().find(|p| p.exists())?;
    match GitRepository::discover(existing) {
        Ok(repo) if repo.workdir().is_some() => Some(repo),
        _ => None,
    }
}

/// Create the filesystem for a directory.
///
/// With `use_source_control`, the directory is probed for a git work tree
/// and the filesystem is bound to it when one is found.
pub fn create_file_system(root: &Path, use_source_control: bool) -> Arc<dyn FileSystem> {
    if use_source_control {
        if let Some(fs) =
            probe_source_control(root).and_then(|repo| SourceControlFileSystem::new(root, repo))
        {
            tracing::debug!("{} is under source control", root.display());
            return Arc::new(fs);
        }
    }
    Arc::new(PhysicalFileSystem::new(root))
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Canonicalize a path, but don't fail if it doesn't exist yet.
/// Returns the path as-is if canonicalization fails.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Resolve `.` and `..` components without touching the disk.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !cleaned.pop() {
                    cleaned.push(component);
                }
            }
            other => cleaned.push(other),
        }
    }
    cleaned
}

/// Compare two paths the way the workspace cache does: case-insensitively.
pub fn paths_match(a: &Path, b: &Path) -> bool {
    a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let fs = PhysicalFileSystem::new(tmp.path());

        write_string(&fs, Path::new("nested/file.txt"), "content").unwrap();

        assert!(fs.file_exists(Path::new("nested/file.txt")));
        assert!(fs.directory_exists(Path::new("nested")));
        assert_eq!(read_to_string(&fs, Path::new("nested/file.txt")).unwrap(), "content");
    }

    #[test]
    fn test_failed_write_keeps_previous_content() {
        let tmp = TempDir::new().unwrap();
        let fs = PhysicalFileSystem::new(tmp.path());
        write_string(&fs, Path::new("doc.toml"), "original").unwrap();

        let result = fs.write_file(Path::new("doc.toml"), &mut |w: &mut dyn Write| {
            w.write_all(b"partial")?;
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        });

        assert!(result.is_err());
        assert_eq!(read_to_string(&fs, Path::new("doc.toml")).unwrap(), "original");
    }

    #[test]
    fn test_delete_missing_file_is_ok() {
        let tmp = TempDir::new().unwrap();
        let fs = PhysicalFileSystem::new(tmp.path());
        assert!(fs.delete_file(Path::new("missing.toml")).is_ok());
    }

    #[test]
    fn test_directories() {
        let tmp = TempDir::new().unwrap();
        let fs = PhysicalFileSystem::new(tmp.path());
        std::fs::create_dir_all(tmp.path().join("b")).unwrap();
        std::fs::create_dir_all(tmp.path().join("a")).unwrap();
        std::fs::write(tmp.path().join("file.txt"), "x").unwrap();

        let dirs = fs.directories(Path::new("")).unwrap();
        assert_eq!(dirs, vec![PathBuf::from("a"), PathBuf::from("b")]);

        assert!(fs.directories(Path::new("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_create_file_system_without_git() {
        let tmp = TempDir::new().unwrap();
        let fs = create_file_system(tmp.path(), true);
        assert!(!fs.is_source_control_bound());
    }

    #[test]
    fn test_source_control_stages_writes() {
        let tmp = TempDir::new().unwrap();
        GitRepository::init(tmp.path()).unwrap();

        let fs = create_file_system(&tmp.path().join(".wharf"), true);
        assert!(fs.is_source_control_bound());

        write_string(fs.as_ref(), Path::new("repositories.toml"), "x = 1\n").unwrap();

        let repo = GitRepository::open(tmp.path()).unwrap();
        let index = repo.index().unwrap();
        assert!(index
            .get_path(Path::new(".wharf/repositories.toml"), 0)
            .is_some());

        fs.delete_file(Path::new("repositories.toml")).unwrap();
        let repo = GitRepository::open(tmp.path()).unwrap();
        let index = repo.index().unwrap();
        assert!(index
            .get_path(Path::new(".wharf/repositories.toml"), 0)
            .is_none());
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(
            clean_path(Path::new("/work/.wharf/../app/./wharf.packages.toml")),
            PathBuf::from("/work/app/wharf.packages.toml")
        );
        assert_eq!(clean_path(Path::new("../a")), PathBuf::from("../a"));
    }

    #[test]
    fn test_paths_match() {
        assert!(paths_match(Path::new("/Work/Packages"), Path::new("/work/packages")));
        assert!(!paths_match(Path::new("/work/a"), Path::new("/work/b")));
    }
}
