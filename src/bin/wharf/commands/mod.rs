//! Command implementations

pub mod add;
pub mod completions;
pub mod list;
pub mod remove;
pub mod restore;
pub mod source;

use std::sync::Arc;

use anyhow::{bail, Result};

use wharf::core::{PackageSource, PackageVersion, WorkspaceLifecycle};
use wharf::ops::{PackageManagerFactory, RepositoryInfoCache};
use wharf::project::{ProjectManager, ReferenceManifest};
use wharf::util::{Config, GlobalContext};

/// One workspace session: configuration, the store cache and the factory
/// built on them. Dropping the session closes the workspace.
pub struct Session {
    pub ctx: GlobalContext,
    pub config: Config,
    pub factory: PackageManagerFactory,
    lifecycle: WorkspaceLifecycle,
}

impl Session {
    pub fn open(verbose: bool) -> Result<Self> {
        let mut ctx = GlobalContext::new()?;
        ctx.set_verbose(verbose);
        let config = ctx.config();

        let cache = Arc::new(RepositoryInfoCache::new());
        let lifecycle = WorkspaceLifecycle::new();
        lifecycle.subscribe(cache.clone());

        let factory = PackageManagerFactory::for_workspace(ctx.workspace(), &config, cache);
        Ok(Session {
            ctx,
            config,
            factory,
            lifecycle,
        })
    }

    /// The source named on the command line, or the highest-priority one.
    pub fn source(&self, name: Option<&str>) -> Result<PackageSource> {
        match name {
            Some(name) => match self.factory.sources().find_source(name) {
                Some(source) => Ok(source),
                None => bail!("package source `{}` is not configured or is disabled", name),
            },
            None => match self.factory.sources().enabled_sources().into_iter().next() {
                Some(source) => Ok(source),
                None => bail!("no package sources configured; add one with `wharf source add`"),
            },
        }
    }

    /// A project manager for the project in the working directory.
    pub fn project_manager(&self, source: &PackageSource, use_fallback: bool) -> Result<ProjectManager> {
        self.factory
            .create_project_manager(self.ctx.cwd(), source, use_fallback)
    }

    /// The manifest of the project in the working directory.
    pub fn manifest(&self) -> ReferenceManifest {
        self.factory.create_manifest(self.ctx.cwd())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.lifecycle.close();
    }
}

/// Parse an optional `--version` argument.
pub fn parse_version(version: Option<&str>) -> Result<Option<PackageVersion>> {
    Ok(version.map(PackageVersion::parse).transpose()?)
}
