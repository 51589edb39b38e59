//! Implementation of `wharf source add/remove/enable/disable`.
//!
//! Sources live as `[[source]]` entries in the workspace `config.toml`.
//! Edits go through `toml_edit` so comments and layout survive.

use std::path::Path;

use anyhow::{bail, Context, Result};
use toml_edit::{value, ArrayOfTables, DocumentMut, Item, Table};

use crate::core::source::DEFAULT_PRIORITY;
use crate::core::{ids_match, PackageSource, CONFIG_FILE};
use crate::util::fs::{read_to_string, write_string, FileSystem};

const SOURCE_KEY: &str = "source";

fn load(fs: &dyn FileSystem) -> Result<DocumentMut> {
    let path = Path::new(CONFIG_FILE);
    if !fs.file_exists(path) {
        return Ok(DocumentMut::new());
    }

    let content = read_to_string(fs, path)?;
    content
        .parse()
        .with_context(|| format!("failed to parse {}", fs.full_path(path).display()))
}

fn save(fs: &dyn FileSystem, doc: &DocumentMut) -> Result<()> {
    write_string(fs, Path::new(CONFIG_FILE), &doc.to_string())
}

fn sources_mut(doc: &mut DocumentMut) -> Result<Option<&mut ArrayOfTables>> {
    match doc.get_mut(SOURCE_KEY) {
        None => Ok(None),
        Some(item) => match item.as_array_of_tables_mut() {
            Some(array) => Ok(Some(array)),
            None => bail!("`{}` must be an array of tables", SOURCE_KEY),
        },
    }
}

fn position(sources: &ArrayOfTables, name: &str) -> Option<usize> {
    sources.iter().position(|table| {
        table
            .get("name")
            .and_then(Item::as_str)
            .is_some_and(|n| ids_match(n, name))
    })
}

/// Add a source to the config file in `fs`.
pub fn add_source(fs: &dyn FileSystem, source: &PackageSource) -> Result<()> {
    let mut doc = load(fs)?;

    if let Some(sources) = sources_mut(&mut doc)? {
        if position(sources, &source.name).is_some() {
            bail!("package source `{}` already exists", source.name);
        }
    }

    let mut table = Table::new();
    table.insert("name", value(source.name.as_str()));
    table.insert("url", value(source.source.as_str()));
    if source.priority != DEFAULT_PRIORITY {
        table.insert("priority", value(i64::from(source.priority)));
    }
    if !source.enabled {
        table.insert("enabled", value(false));
    }

    match sources_mut(&mut doc)? {
        Some(sources) => sources.push(table),
        None => {
            let mut sources = ArrayOfTables::new();
            sources.push(table);
            doc.insert(SOURCE_KEY, Item::ArrayOfTables(sources));
        }
    }

    save(fs, &doc)?;
    tracing::debug!("added package source `{}`", source.name);
    Ok(())
}

/// Remove a source from the config file in `fs`.
pub fn remove_source(fs: &dyn FileSystem, name: &str) -> Result<()> {
    let mut doc = load(fs)?;

    let Some(sources) = sources_mut(&mut doc)? else {
        bail!("package source `{}` not found", name);
    };
    let Some(index) = position(sources, name) else {
        bail!("package source `{}` not found", name);
    };

    sources.remove(index);
    if sources.is_empty() {
        doc.remove(SOURCE_KEY);
    }

    save(fs, &doc)?;
    tracing::debug!("removed package source `{}`", name);
    Ok(())
}

/// Enable or disable a source in the config file in `fs`.
pub fn set_source_enabled(fs: &dyn FileSystem, name: &str, enabled: bool) -> Result<()> {
    let mut doc = load(fs)?;

    let Some(sources) = sources_mut(&mut doc)? else {
        bail!("package source `{}` not found", name);
    };
    let Some(index) = position(sources, name) else {
        bail!("package source `{}` not found", name);
    };

    if let Some(table) = sources.get_mut(index) {
        if enabled {
            table.remove("enabled");
        } else {
            table.insert("enabled", value(false));
        }
    }

    save(fs, &doc)
}
