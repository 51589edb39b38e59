//! Reference manifest - which packages a project references.
//!
//! The manifest is a small TOML document in the project root:
//!
//! ```toml
//! [[package]]
//! id = "Foo"
//! version = "1.2.0"
//! ```
//!
//! Entries written as an inline array (`package = [{ id = "Foo", version =
//! "1.2.0" }]`, or `package = []`) are read too; rewrites always use the
//! table form.
//!
//! It stores identities only. Package content lives in the backing
//! repository, and every read resolves entries through it. Entries the
//! backing repository no longer has are left out of `list()` but stay in
//! the document.
//!
//! Every change loads a snapshot, builds a new entry list and replaces the
//! document atomically. Keys other than `id` and `version` survive a
//! rewrite, sorted after the known keys. Unknown top-level keys survive
//! too. Comments do not.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use toml_edit::{value, ArrayOfTables, DocumentMut, Item, Table, TableLike, Value};

use crate::core::{
    ids_match, versions_match, Package, PackageIdentity, PackageVersion, Repository,
    RepositoryError, MANIFEST_NAME,
};
use crate::sources::SharedRepository;
use crate::util::fs::{read_to_string, write_string, FileSystem};

const PACKAGE_KEY: &str = "package";

/// One stored reference.
#[derive(Debug, Clone)]
pub struct ManifestEntry {
    id: String,
    version: PackageVersion,

    /// Unknown keys, kept for the rewrite
    extra: BTreeMap<String, Item>,
}

impl ManifestEntry {
    fn new(id: &str, version: &PackageVersion) -> Self {
        ManifestEntry {
            id: id.to_string(),
            version: version.clone(),
            extra: BTreeMap::new(),
        }
    }

    /// Get the referenced id, as stored.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the referenced version.
    pub fn version(&self) -> &PackageVersion {
        &self.version
    }

    /// Get the referenced identity.
    pub fn identity(&self) -> PackageIdentity {
        PackageIdentity::new(self.id.clone(), self.version.clone())
    }

    fn matches(&self, id: &str, version: &PackageVersion) -> bool {
        ids_match(&self.id, id) && versions_match(&self.version, version)
    }
}

/// Parsed manifest document.
#[derive(Debug, Default)]
struct Snapshot {
    entries: Vec<ManifestEntry>,

    /// Unknown top-level keys
    extra: Vec<(String, Item)>,
}

impl Snapshot {
    fn parse(content: &str, path: &Path) -> Result<Self, RepositoryError> {
        let invalid = |message: String| RepositoryError::InvalidDocument {
            path: path.to_path_buf(),
            message,
        };

        let doc: DocumentMut = content.parse().map_err(|e: toml_edit::TomlError| invalid(e.to_string()))?;
        let mut snapshot = Snapshot::default();

        for (key, item) in doc.iter() {
            if key != PACKAGE_KEY {
                snapshot.extra.push((key.to_string(), item.clone()));
                continue;
            }

            let tables: Vec<&dyn TableLike> = match item {
                Item::ArrayOfTables(tables) => tables.iter().map(|t| t as &dyn TableLike).collect(),
                Item::Value(Value::Array(array)) => array
                    .iter()
                    .map(|v| {
                        v.as_inline_table()
                            .map(|t| t as &dyn TableLike)
                            .ok_or_else(|| invalid("`package` entries must be tables".to_string()))
                    })
                    .collect::<Result<_, _>>()?,
                _ => return Err(invalid("`package` must be an array of tables".to_string())),
            };
            for table in tables {
                snapshot.entries.push(parse_entry(table).map_err(invalid)?);
            }
        }

        Ok(snapshot)
    }

    fn render(&self) -> String {
        let mut doc = DocumentMut::new();
        for (key, item) in &self.extra {
            doc.insert(key, item.clone());
        }

        let mut packages = ArrayOfTables::new();
        for entry in &self.entries {
            let mut table = Table::new();
            table.insert("id", value(entry.id.as_str()));
            table.insert("version", value(entry.version.to_string()));
            for (key, item) in &entry.extra {
                table.insert(key, item.clone());
            }
            packages.push(table);
        }
        doc.insert(PACKAGE_KEY, Item::ArrayOfTables(packages));

        doc.to_string()
    }
}

fn parse_entry(table: &dyn TableLike) -> Result<ManifestEntry, String> {
    let id = table
        .get("id")
        .and_then(Item::as_str)
        .ok_or("package entry is missing a string `id`")?;
    let version = table
        .get("version")
        .and_then(Item::as_str)
        .ok_or_else(|| format!("package `{}` is missing a string `version`", id))?;
    let version = PackageVersion::parse(version).map_err(|e| e.to_string())?;

    let extra = table
        .iter()
        .filter(|(key, _)| *key != "id" && *key != "version")
        .map(|(key, item)| (key.to_string(), detached(item)))
        .collect();

    Ok(ManifestEntry {
        id: id.to_string(),
        version,
        extra,
    })
}

/// Copy of an item without its inline-table spacing.
fn detached(item: &Item) -> Item {
    let mut item = item.clone();
    if let Item::Value(value) = &mut item {
        value.decor_mut().clear();
    }
    item
}

/// A project's reference manifest over a backing repository.
pub struct ReferenceManifest {
    /// Project filesystem
    fs: Arc<dyn FileSystem>,

    /// Document path, relative to the project root
    path: PathBuf,

    repository: Arc<dyn Repository>,

    /// Store to register the document with, if any
    shared: Option<Arc<SharedRepository>>,
}

impl ReferenceManifest {
    /// Create a manifest at the default location in the project root.
    pub fn new(fs: Arc<dyn FileSystem>, repository: Arc<dyn Repository>) -> Self {
        ReferenceManifest {
            fs,
            path: PathBuf::from(MANIFEST_NAME),
            repository,
            shared: None,
        }
    }

    /// Use a different document path, relative to the project root.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Register the document with a shared store while it exists.
    pub fn with_shared_repository(mut self, shared: Arc<SharedRepository>) -> Self {
        self.shared = Some(shared);
        self
    }

    /// Get the full document path.
    pub fn path(&self) -> PathBuf {
        self.fs.full_path(&self.path)
    }

    /// Get the backing repository.
    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repository
    }

    /// Check if the document exists.
    pub fn exists(&self) -> bool {
        self.fs.file_exists(&self.path)
    }

    fn load(&self) -> Result<Snapshot> {
        if !self.exists() {
            return Ok(Snapshot::default());
        }

        let content = read_to_string(self.fs.as_ref(), &self.path)?;
        Ok(Snapshot::parse(&content, &self.path())?)
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if snapshot.entries.is_empty() {
            self.fs.delete_file(&self.path)?;
            tracing::debug!("deleted empty manifest {}", self.path().display());
            if let Some(shared) = &self.shared {
                shared.unregister_manifest(&self.path())?;
            }
            return Ok(());
        }

        let created = !self.exists();
        write_string(self.fs.as_ref(), &self.path, &snapshot.render())?;
        if created {
            if let Some(shared) = &self.shared {
                shared.register_manifest(&self.path())?;
            }
        }
        Ok(())
    }

    /// The referenced packages, resolved through the backing repository.
    ///
    /// Each call reads the document again. References the backing
    /// repository cannot resolve are skipped.
    pub fn list(&self) -> Result<ManifestPackages> {
        Ok(ManifestPackages {
            entries: self.load()?.entries.into_iter(),
            repository: Arc::clone(&self.repository),
        })
    }

    /// The stored references, without resolving them.
    pub fn references(&self) -> Result<Vec<ManifestEntry>> {
        Ok(self.load()?.entries)
    }

    /// Check if an identity is referenced.
    pub fn contains(&self, id: &str, version: &PackageVersion) -> Result<bool> {
        Ok(self.load()?.entries.iter().any(|e| e.matches(id, version)))
    }

    /// Reference a package and store it in the backing repository.
    ///
    /// Other versions of the same id are left alone.
    pub fn add(&self, package: &Package) -> Result<()> {
        let mut snapshot = self.load()?;
        snapshot
            .entries
            .push(ManifestEntry::new(package.id(), package.version()));
        self.save(&snapshot)?;
        tracing::debug!("referenced {} in {}", package.identity(), self.path().display());

        self.repository.add_package(package)
    }

    /// Remove a package from the backing repository and drop its reference.
    ///
    /// A package that is not referenced is a consistency fault between the
    /// manifest and its repository.
    pub fn remove(&self, package: &Package) -> Result<()> {
        self.repository.remove_package(package)?;

        let mut snapshot = self.load()?;
        let Some(index) = snapshot
            .entries
            .iter()
            .position(|e| e.matches(package.id(), package.version()))
        else {
            tracing::error!(
                "{} was removed from {} but {} has no entry for it",
                package.identity(),
                self.repository.source(),
                self.path().display()
            );
            return Err(RepositoryError::ConsistencyFault {
                id: package.id().to_string(),
                version: package.version().to_string(),
                manifest: self.path(),
            }
            .into());
        };

        snapshot.entries.remove(index);
        self.save(&snapshot)?;
        tracing::debug!("dropped {} from {}", package.identity(), self.path().display());
        Ok(())
    }

    /// Remove a reference named by id, and by version when given.
    ///
    /// Without a version the id must be referenced exactly once. Only the
    /// backing repository is consulted.
    pub fn remove_reference(&self, id: &str, version: Option<&PackageVersion>) -> Result<Package> {
        let mut candidates: Vec<_> = self
            .references()?
            .into_iter()
            .filter(|e| ids_match(e.id(), id))
            .filter(|e| version.map_or(true, |v| versions_match(e.version(), v)))
            .collect();

        let entry = match candidates.len() {
            0 => match version {
                Some(v) => bail!("`{} {}` is not referenced by this project", id, v),
                None => bail!("`{}` is not referenced by this project", id),
            },
            1 => candidates.remove(0),
            _ => bail!(
                "`{}` is referenced in {} versions; pick one with --version",
                id,
                candidates.len()
            ),
        };

        let package = self
            .repository
            .find_package(entry.id(), entry.version())?
            .unwrap_or_else(|| Package::new(entry.identity()));

        self.remove(&package)?;
        Ok(package)
    }
}

impl std::fmt::Debug for ReferenceManifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceManifest")
            .field("path", &self.path())
            .field("repository", &self.repository.source())
            .finish()
    }
}

/// Lazily resolved manifest references.
///
/// Yields `Err` when the backing repository fails; references it does not
/// have are skipped.
pub struct ManifestPackages {
    entries: std::vec::IntoIter<ManifestEntry>,
    repository: Arc<dyn Repository>,
}

impl Iterator for ManifestPackages {
    type Item = Result<Package>;

    fn next(&mut self) -> Option<Self::Item> {
        for entry in self.entries.by_ref() {
            match self.repository.find_package(&entry.id, &entry.version) {
                Ok(Some(package)) => return Some(Ok(package)),
                Ok(None) => tracing::debug!(
                    "{} {} is referenced but not in {}",
                    entry.id,
                    entry.version,
                    self.repository.source()
                ),
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}
