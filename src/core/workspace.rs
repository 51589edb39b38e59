//! Workspace - the enclosing multi-project context.
//!
//! A Workspace knows where its root, config folder and reference manifest
//! live. Its lifecycle is a separate object: caches that must be dropped
//! when the workspace closes subscribe to a [`WorkspaceLifecycle`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Config folder name, relative to the workspace root.
pub const CONFIG_DIR: &str = ".wharf";

/// Reference manifest file name, relative to the project root.
pub const MANIFEST_NAME: &str = "wharf.packages.toml";

/// Config file name inside the config folder.
pub const CONFIG_FILE: &str = "config.toml";

/// A workspace rooted at a directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    config_dir: PathBuf,
}

impl Workspace {
    /// Create a workspace rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let config_dir = root.join(CONFIG_DIR);
        Workspace { root, config_dir }
    }

    /// Find the workspace containing `cwd`.
    ///
    /// The root is the nearest ancestor with a config folder, or `cwd`
    /// itself when there is none.
    pub fn discover(cwd: &Path) -> Self {
        let root = cwd
            .ancestors()
            .find(|dir| dir.join(CONFIG_DIR).is_dir())
            .unwrap_or(cwd);
        tracing::debug!("workspace root: {}", root.display());
        Workspace::new(root)
    }

    /// Get the workspace root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the config folder.
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get the workspace config file path.
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Resolve a store path from configuration against the root.
    pub fn store_path(&self, configured: &Path) -> PathBuf {
        if configured.is_absolute() {
            configured.to_path_buf()
        } else {
            self.root.join(configured)
        }
    }
}

/// Something that must react when the workspace closes.
pub trait WorkspaceListener: Send + Sync {
    /// Called once per close, on the closing thread.
    fn workspace_closed(&self);
}

/// Handle returned by [`WorkspaceLifecycle::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

/// Owner of the workspace-closed signal.
#[derive(Default)]
pub struct WorkspaceLifecycle {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(Subscription, Arc<dyn WorkspaceListener>)>>,
}

impl WorkspaceLifecycle {
    /// Create a lifecycle with no listeners.
    pub fn new() -> Self {
        WorkspaceLifecycle::default()
    }

    /// Register a listener for the close signal.
    pub fn subscribe(&self, listener: Arc<dyn WorkspaceListener>) -> Subscription {
        let subscription = Subscription(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((subscription, listener));
        subscription
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(s, _)| *s != subscription);
        listeners.len() != before
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Signal that the workspace closed.
    ///
    /// Listeners are called outside the lock, so a listener may unsubscribe
    /// itself.
    pub fn close(&self) {
        let listeners: Vec<Arc<dyn WorkspaceListener>> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        tracing::debug!("workspace closed, notifying {} listener(s)", listeners.len());
        for listener in listeners {
            listener.workspace_closed();
        }
    }
}

impl std::fmt::Debug for WorkspaceLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceLifecycle")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
