//! Repository-info cache.
//!
//! Building the shared store means probing the store path and the config
//! folder for source control and binding a filesystem to each. The result
//! is cached per workspace session and rebuilt only when the store path,
//! the config folder or the source-control request changes. Closing the
//! workspace empties the cache.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::core::WorkspaceListener;
use crate::sources::SharedRepository;
use crate::util::fs::{create_file_system, paths_match, FileSystem};

/// Builds the filesystem for a directory, probing source control on request.
pub type FileSystemBuilder = dyn Fn(&Path, bool) -> Arc<dyn FileSystem> + Send + Sync;

/// The shared store as built for one (path, config folder, source control) key.
pub struct RepositoryInfo {
    path: PathBuf,
    config_folder: PathBuf,

    /// Whether source control was requested for the store
    source_control_requested: bool,

    file_system: Arc<dyn FileSystem>,
    repository: Arc<SharedRepository>,
}

impl RepositoryInfo {
    /// Get the store path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the config folder path.
    pub fn config_folder(&self) -> &Path {
        &self.config_folder
    }

    /// Get the store filesystem.
    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.file_system
    }

    /// Get the shared repository.
    pub fn repository(&self) -> &Arc<SharedRepository> {
        &self.repository
    }

    /// Whether the store filesystem really is bound to source control.
    pub fn is_source_control_bound(&self) -> bool {
        self.file_system.is_source_control_bound()
    }

    fn matches(&self, path: &Path, config_folder: &Path, use_source_control: bool) -> bool {
        paths_match(&self.path, path)
            && paths_match(&self.config_folder, config_folder)
            && self.source_control_requested == use_source_control
    }
}

impl std::fmt::Debug for RepositoryInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryInfo")
            .field("path", &self.path)
            .field("config_folder", &self.config_folder)
            .field("source_control_requested", &self.source_control_requested)
            .field("source_control_bound", &self.is_source_control_bound())
            .finish()
    }
}

/// Workspace-scoped cache of the shared store.
pub struct RepositoryInfoCache {
    /// Empty or built; locked for the whole build
    state: Mutex<Option<Arc<RepositoryInfo>>>,

    builder: Box<FileSystemBuilder>,
}

impl RepositoryInfoCache {
    /// Create an empty cache that builds physical filesystems.
    pub fn new() -> Self {
        Self::with_builder(create_file_system)
    }

    /// Create an empty cache with a custom filesystem builder.
    pub fn with_builder(
        builder: impl Fn(&Path, bool) -> Arc<dyn FileSystem> + Send + Sync + 'static,
    ) -> Self {
        RepositoryInfoCache {
            state: Mutex::new(None),
            builder: Box::new(builder),
        }
    }

    /// Get the shared store for a key, building it when the key changed.
    pub fn get(
        &self,
        path: &Path,
        config_folder: &Path,
        use_source_control: bool,
    ) -> Arc<RepositoryInfo> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(info) = state.as_ref() {
            if info.matches(path, config_folder, use_source_control) {
                return Arc::clone(info);
            }
        }

        let info = Arc::new(self.build(path, config_folder, use_source_control));
        *state = Some(Arc::clone(&info));
        info
    }

    /// Get the current entry without building.
    pub fn current(&self) -> Option<Arc<RepositoryInfo>> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forget the current entry. Handles already given out stay valid.
    pub fn clear(&self) {
        let previous = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(info) = previous {
            tracing::debug!("dropped cached store {}", info.path.display());
        }
    }

    fn build(&self, path: &Path, config_folder: &Path, use_source_control: bool) -> RepositoryInfo {
        let file_system = (self.builder)(path, use_source_control);
        // The config folder is shared, so it always follows source control.
        let config_fs = (self.builder)(config_folder, true);
        let repository = Arc::new(SharedRepository::new(
            Arc::clone(&file_system),
            config_fs,
        ));

        tracing::debug!(
            "built shared store {} (config {}, source control {})",
            path.display(),
            config_folder.display(),
            if file_system.is_source_control_bound() {
                "bound"
            } else {
                "off"
            }
        );

        RepositoryInfo {
            path: path.to_path_buf(),
            config_folder: config_folder.to_path_buf(),
            source_control_requested: use_source_control,
            file_system,
            repository,
        }
    }
}

impl Default for RepositoryInfoCache {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkspaceListener for RepositoryInfoCache {
    fn workspace_closed(&self) {
        self.clear();
    }
}

impl std::fmt::Debug for RepositoryInfoCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryInfoCache")
            .field("current", &self.current())
            .finish()
    }
}
