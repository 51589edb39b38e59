//! Package sources.
//!
//! A PackageSource is a named location packages can come from: a local
//! folder or a remote feed. Sources are kept in priority order (lower
//! number = higher priority) and only enabled sources take part in
//! aggregation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::package_id::ids_match;

/// Source string of the virtual "every enabled source" aggregate.
pub const AGGREGATE_SOURCE: &str = "(aggregate)";

/// Priority of a source that does not set one.
pub const DEFAULT_PRIORITY: i32 = 100;

/// A configured package source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSource {
    /// Human-readable label (e.g., "local", "nightly")
    pub name: String,

    /// Source string: a folder path or a URL
    #[serde(rename = "url")]
    pub source: String,

    /// Priority for ordering (lower = higher priority)
    #[serde(default = "default_priority")]
    pub priority: i32,

    /// Whether this source is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

fn default_enabled() -> bool {
    true
}

/// Where a source actually lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    /// A folder on the local filesystem
    Local(PathBuf),
    /// A remote feed
    Remote(Url),
}

impl PackageSource {
    /// Create a new enabled source.
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        PackageSource {
            name: name.into(),
            source: source.into(),
            priority: default_priority(),
            enabled: true,
        }
    }

    /// The virtual source standing for all enabled sources at once.
    pub fn aggregate() -> Self {
        PackageSource::new("All", AGGREGATE_SOURCE)
    }

    /// Create a source with a specific priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Disable this source.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Check if this is the virtual aggregate source.
    pub fn is_aggregate(&self) -> bool {
        self.source == AGGREGATE_SOURCE
    }

    /// Check if this source points at the given source string.
    pub fn matches_source(&self, source: &str) -> bool {
        sources_match(&self.source, source)
    }

    /// Classify the source string.
    ///
    /// Relative folder paths are resolved against `base`.
    pub fn location(&self, base: &Path) -> SourceLocation {
        match Url::parse(&self.source) {
            // Single-letter schemes are Windows drive letters, not URLs.
            Ok(url) if url.scheme().len() > 1 => {
                if url.scheme() == "file" {
                    if let Ok(path) = url.to_file_path() {
                        return SourceLocation::Local(path);
                    }
                }
                SourceLocation::Remote(url)
            }
            _ => {
                let path = Path::new(&self.source);
                if path.is_absolute() {
                    SourceLocation::Local(path.to_path_buf())
                } else {
                    SourceLocation::Local(base.join(path))
                }
            }
        }
    }
}

/// Compare two source strings, ignoring case and trailing separators.
pub fn sources_match(a: &str, b: &str) -> bool {
    let trim = |s: &str| s.trim_end_matches(['/', '\\']).to_string();
    ids_match(&trim(a), &trim(b))
}

/// The source enumeration capability.
///
/// Returns the enabled sources in priority order; composites are built
/// from this list.
pub trait SourceProvider: Send + Sync {
    /// Get the currently enabled sources, highest priority first.
    fn enabled_sources(&self) -> Vec<PackageSource>;

    /// Find an enabled source by name or source string.
    fn find_source(&self, name_or_source: &str) -> Option<PackageSource> {
        self.enabled_sources()
            .into_iter()
            .find(|s| ids_match(&s.name, name_or_source) || s.matches_source(name_or_source))
    }
}

/// Ordered list of configured sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceList {
    #[serde(rename = "source", default)]
    pub sources: Vec<PackageSource>,
}

impl SourceList {
    /// Create a new empty source list.
    pub fn new() -> Self {
        SourceList {
            sources: Vec::new(),
        }
    }

    /// Create a source list from existing entries.
    pub fn from_sources(sources: Vec<PackageSource>) -> Self {
        let mut list = SourceList { sources };
        list.sort_by_priority();
        list
    }

    /// Add a source, replacing any existing source with the same name.
    pub fn add(&mut self, entry: PackageSource) {
        self.sources.retain(|s| !ids_match(&s.name, &entry.name));
        self.sources.push(entry);
        self.sort_by_priority();
    }

    /// Remove a source by name. Returns whether anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.sources.len();
        self.sources.retain(|s| !ids_match(&s.name, name));
        self.sources.len() != before
    }

    /// Sort sources by priority (stable, so ties keep insertion order).
    fn sort_by_priority(&mut self) {
        self.sources.sort_by_key(|s| s.priority);
    }

    /// Get enabled sources in priority order.
    pub fn enabled(&self) -> impl Iterator<Item = &PackageSource> {
        self.sources.iter().filter(|s| s.enabled)
    }

    /// Find a source by name.
    pub fn by_name(&self, name: &str) -> Option<&PackageSource> {
        self.sources.iter().find(|s| ids_match(&s.name, name))
    }

    /// Check if a source with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name(name).is_some()
    }

    /// Check if there are no sources at all.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl SourceProvider for SourceList {
    fn enabled_sources(&self) -> Vec<PackageSource> {
        self.enabled().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_entry() {
        let entry = PackageSource::new("local", "/feeds/local").with_priority(50);

        assert_eq!(entry.name, "local");
        assert_eq!(entry.source, "/feeds/local");
        assert_eq!(entry.priority, 50);
        assert!(entry.enabled);
        assert!(!entry.is_aggregate());
        assert!(PackageSource::aggregate().is_aggregate());
    }

    #[test]
    fn test_source_list_priority_sorting() {
        let mut list = SourceList::new();
        list.add(PackageSource::new("low", "/low").with_priority(200));
        list.add(PackageSource::new("high", "/high").with_priority(10));
        list.add(PackageSource::new("mid", "/mid").with_priority(50));

        assert_eq!(list.sources[0].name, "high");
        assert_eq!(list.sources[1].name, "mid");
        assert_eq!(list.sources[2].name, "low");
    }

    #[test]
    fn test_source_list_enabled() {
        let mut list = SourceList::new();
        list.add(PackageSource::new("enabled", "/a"));
        list.add(PackageSource::new("disabled", "/b").disabled());

        let enabled = list.enabled_sources();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].name, "enabled");
    }

    #[test]
    fn test_source_list_add_replaces_by_name() {
        let mut list = SourceList::new();
        list.add(PackageSource::new("local", "/old"));
        list.add(PackageSource::new("LOCAL", "/new"));

        assert_eq!(list.sources.len(), 1);
        assert_eq!(list.by_name("local").unwrap().source, "/new");
        assert!(list.remove("Local"));
        assert!(list.is_empty());
    }

    #[test]
    fn test_find_source_by_name_or_url() {
        let list = SourceList::from_sources(vec![PackageSource::new("nightly", "/feeds/nightly/")]);

        assert!(list.find_source("Nightly").is_some());
        assert!(list.find_source("/feeds/nightly").is_some());
        assert!(list.find_source("stable").is_none());
    }

    #[test]
    fn test_location() {
        let base = Path::new("/workspace");

        let remote = PackageSource::new("feed", "https://feed.example.com/v2");
        assert!(matches!(remote.location(base), SourceLocation::Remote(_)));

        let relative = PackageSource::new("local", "feeds/local");
        assert_eq!(
            relative.location(base),
            SourceLocation::Local(PathBuf::from("/workspace/feeds/local"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_location_file_url() {
        let source = PackageSource::new("file", "file:///srv/packages");
        assert_eq!(
            source.location(Path::new("/")),
            SourceLocation::Local(PathBuf::from("/srv/packages"))
        );
    }

    #[test]
    fn test_sources_match() {
        assert!(sources_match("/Feeds/Local/", "/feeds/local"));
        assert!(!sources_match("/feeds/a", "/feeds/b"));
    }
}
