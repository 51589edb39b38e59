//! Package manager orchestration.
//!
//! `PackageManagerFactory` decides which repository serves a request: the
//! chosen source alone, the source with a fallback to every other source,
//! or a restore composite. The result is a `PackageManager` that installs
//! from that repository into the shared store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};

use crate::core::{
    ids_match, Dependency, Package, PackageSource, PackageVersion, Repository, RepositoryFactory,
    SourceProvider, Workspace,
};
use crate::ops::repository_info::{RepositoryInfo, RepositoryInfoCache};
use crate::ops::resolve::{resolve_closure, Resolution};
use crate::project::{ProjectManager, ReferenceManifest};
use crate::sources::{
    AggregateRepository, FallbackRepository, PackageRestoreRepository, SharedRepository,
    SourceRepositoryFactory,
};
use crate::util::config::Config;
use crate::util::fs::{create_file_system, FileSystem};

/// Where the shared store lives.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// Store path
    pub path: PathBuf,

    /// Config folder holding the store registry
    pub config_folder: PathBuf,

    /// Bind the store to source control when possible
    pub use_source_control: bool,
}

impl StoreSettings {
    /// Store settings for a workspace under a configuration.
    pub fn for_workspace(workspace: &Workspace, config: &Config) -> Self {
        StoreSettings {
            path: workspace.store_path(&config.store_path()),
            config_folder: workspace.config_dir().to_path_buf(),
            use_source_control: config.use_source_control(),
        }
    }
}

/// Builds package managers and the composite repositories behind them.
pub struct PackageManagerFactory {
    sources: Arc<dyn SourceProvider>,
    factory: Arc<dyn RepositoryFactory>,
    cache: Arc<RepositoryInfoCache>,
    settings: StoreSettings,
}

impl PackageManagerFactory {
    /// Create a factory.
    pub fn new(
        sources: Arc<dyn SourceProvider>,
        factory: Arc<dyn RepositoryFactory>,
        cache: Arc<RepositoryInfoCache>,
        settings: StoreSettings,
    ) -> Self {
        PackageManagerFactory {
            sources,
            factory,
            cache,
            settings,
        }
    }

    /// Create a factory for a workspace, with folder sources resolved
    /// against the workspace root.
    pub fn for_workspace(
        workspace: &Workspace,
        config: &Config,
        cache: Arc<RepositoryInfoCache>,
    ) -> Self {
        Self::new(
            Arc::new(config.source_list()),
            Arc::new(SourceRepositoryFactory::new(workspace.root())),
            cache,
            StoreSettings::for_workspace(workspace, config),
        )
    }

    /// Get the store settings.
    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Get the source provider.
    pub fn sources(&self) -> &Arc<dyn SourceProvider> {
        &self.sources
    }

    /// Get the shared store, building it if the settings changed.
    pub fn repository_info(&self) -> Arc<RepositoryInfo> {
        self.cache.get(
            &self.settings.path,
            &self.settings.config_folder,
            self.settings.use_source_control,
        )
    }

    /// Create an aggregate over every enabled source.
    ///
    /// With `ignore_failing`, sources that cannot be opened are skipped
    /// here and failing members are skipped per call later.
    pub fn create_aggregate(
        &self,
        ignore_failing: bool,
        resolve_vertically: bool,
    ) -> Result<AggregateRepository> {
        let members = self.open_sources(self.sources.enabled_sources(), ignore_failing)?;
        tracing::debug!("aggregate over {} source(s)", members.len());

        Ok(AggregateRepository::new(members)
            .ignore_failing(ignore_failing)
            .resolve_vertically(resolve_vertically)
            .of_all_sources())
    }

    /// Create a package manager serving `source`.
    ///
    /// With `use_fallback`, dependencies the source cannot satisfy are
    /// looked up in every other enabled source.
    pub fn create_package_manager(
        &self,
        source: &PackageSource,
        use_fallback: bool,
    ) -> Result<PackageManager> {
        let primary = self.open_primary(source)?;

        let repository = if use_fallback {
            self.with_fallback(source, primary)?
        } else {
            primary
        };

        Ok(PackageManager::new(repository, self.repository_info()))
    }

    /// Create the repository used to restore packages for `primary`.
    pub fn create_restore_repository(&self, primary: &PackageSource) -> Result<Arc<dyn Repository>> {
        if primary.is_aggregate() {
            return Ok(Arc::new(self.create_aggregate(true, false)?));
        }
        PackageRestoreRepository::for_source(primary, self.sources.as_ref(), self.factory.as_ref())
    }

    /// Create a project manager for the project at `project_root`.
    ///
    /// The project's manifest resolves references against the shared store.
    pub fn create_project_manager(
        &self,
        project_root: &Path,
        source: &PackageSource,
        use_fallback: bool,
    ) -> Result<ProjectManager> {
        let package_manager = self.create_package_manager(source, use_fallback)?;
        let manifest = self.create_manifest(project_root);

        Ok(ProjectManager::new(package_manager, manifest))
    }

    /// Open the reference manifest of the project at `project_root`.
    ///
    /// References resolve against the shared store. No package source is
    /// opened, so listing and removing work while every source is down.
    pub fn create_manifest(&self, project_root: &Path) -> ReferenceManifest {
        let project_fs = create_file_system(project_root, self.settings.use_source_control);
        let shared = Arc::clone(self.repository_info().repository());
        ReferenceManifest::new(project_fs, shared.clone() as Arc<dyn Repository>)
            .with_shared_repository(shared)
    }

    fn open_primary(&self, source: &PackageSource) -> Result<Arc<dyn Repository>> {
        if source.is_aggregate() {
            return Ok(Arc::new(self.create_aggregate(false, true)?));
        }
        self.factory.create(source)
    }

    fn with_fallback(
        &self,
        source: &PackageSource,
        primary: Arc<dyn Repository>,
    ) -> Result<Arc<dyn Repository>> {
        if primary.kind().is_aggregate_of_all() {
            return Ok(primary);
        }

        let others: Vec<PackageSource> = self
            .sources
            .enabled_sources()
            .into_iter()
            .filter(|s| !s.matches_source(&source.source) && !ids_match(&s.name, &source.name))
            .collect();
        if others.is_empty() {
            tracing::debug!("no other sources to fall back to from `{}`", source.name);
            return Ok(primary);
        }

        let secondary = AggregateRepository::new(self.open_sources(others, true)?)
            .ignore_failing(true)
            .resolve_vertically(true);
        Ok(FallbackRepository::wrap(primary, Arc::new(secondary)))
    }

    fn open_sources(
        &self,
        sources: Vec<PackageSource>,
        ignore_failing: bool,
    ) -> Result<Vec<Arc<dyn Repository>>> {
        let mut repositories = Vec::with_capacity(sources.len());
        for source in &sources {
            match self.factory.create(source) {
                Ok(repo) => repositories.push(repo),
                Err(e) if ignore_failing => {
                    tracing::warn!("skipping package source `{}`: {:#}", source.name, e)
                }
                Err(e) => return Err(e),
            }
        }
        Ok(repositories)
    }
}

impl std::fmt::Debug for PackageManagerFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageManagerFactory")
            .field("settings", &self.settings)
            .field("sources", &self.sources.enabled_sources().len())
            .finish()
    }
}

/// Result of an install.
#[derive(Debug)]
pub struct Installation {
    /// The full dependency closure
    pub resolution: Resolution,

    /// Packages that were not in the store before, in install order
    pub added: Vec<Package>,
}

/// Installs packages from a source repository into the shared store.
pub struct PackageManager {
    source_repository: Arc<dyn Repository>,
    info: Arc<RepositoryInfo>,
}

impl PackageManager {
    /// Create a package manager over a built shared store.
    pub fn new(source_repository: Arc<dyn Repository>, info: Arc<RepositoryInfo>) -> Self {
        PackageManager {
            source_repository,
            info,
        }
    }

    /// Get the repository packages are installed from.
    pub fn source_repository(&self) -> &Arc<dyn Repository> {
        &self.source_repository
    }

    /// Get the shared store packages are installed into.
    pub fn local_repository(&self) -> &Arc<SharedRepository> {
        self.info.repository()
    }

    /// Get the store filesystem.
    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        self.info.file_system()
    }

    /// Find a package in the source repository. Without a version, the
    /// highest available version wins.
    pub fn find(&self, id: &str, version: Option<&PackageVersion>) -> Result<Option<Package>> {
        match version {
            Some(version) => self.source_repository.find_package(id, version),
            None => self
                .source_repository
                .resolve_dependency(&Dependency::new(id), None),
        }
    }

    /// Install a package and its dependencies into the shared store.
    pub fn install(&self, id: &str, version: Option<&PackageVersion>) -> Result<Installation> {
        let Some(package) = self.find(id, version)? else {
            match version {
                Some(v) => bail!("package `{} {}` not found in `{}`", id, v, self.source_repository.source()),
                None => bail!("package `{}` not found in `{}`", id, self.source_repository.source()),
            }
        };

        let resolution = resolve_closure(self.source_repository.as_ref(), package)?;
        let store = self.local_repository();

        let mut added = Vec::new();
        for package in resolution.install_order() {
            if store.exists(package.id(), package.version())? {
                tracing::debug!("{} already in the store", package.identity());
                continue;
            }
            store.add_package(&package)?;
            tracing::info!("installed {}", package.identity());
            added.push(package);
        }

        Ok(Installation { resolution, added })
    }

    /// Remove a package from the shared store. Absent packages are ignored.
    pub fn uninstall(&self, package: &Package) -> Result<()> {
        self.local_repository().remove_package(package)?;
        tracing::info!("uninstalled {}", package.identity());
        Ok(())
    }
}

impl std::fmt::Debug for PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageManager")
            .field("source", &self.source_repository.source())
            .field("kind", &self.source_repository.kind())
            .field("store", &self.info.path())
            .finish()
    }
}
