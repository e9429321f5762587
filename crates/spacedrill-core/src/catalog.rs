//! TOML catalog parser.
//!
//! Loads vocabulary and grammar entries from TOML files and validates them.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::ItemEntry;

/// A named collection of catalog entries.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub name: String,
    pub description: String,
    pub items: Vec<ItemEntry>,
}

/// Intermediate TOML structure for parsing catalog files.
#[derive(Debug, Deserialize)]
struct TomlCatalogFile {
    catalog: TomlCatalogHeader,
    #[serde(default)]
    items: Vec<TomlItem>,
}

#[derive(Debug, Deserialize)]
struct TomlCatalogHeader {
    name: String,
    #[serde(default)]
    description: String,
    /// Part of speech for items that don't give one.
    #[serde(default)]
    default_part_of_speech: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TomlItem {
    id: String,
    text: String,
    #[serde(default)]
    romanization: Option<String>,
    #[serde(default, alias = "pos")]
    part_of_speech: Option<String>,
    definition: String,
    #[serde(default)]
    example: Option<String>,
    #[serde(default)]
    example_meaning: Option<String>,
}

/// Parse a single TOML file into a [`Catalog`].
pub fn parse_catalog(path: &Path) -> Result<Catalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog file: {}", path.display()))?;

    parse_catalog_str(&content, path)
}

/// Parse a TOML string into a [`Catalog`] (useful for testing).
pub fn parse_catalog_str(content: &str, source_path: &Path) -> Result<Catalog> {
    let parsed: TomlCatalogFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let default_pos = parsed.catalog.default_part_of_speech.unwrap_or_default();
    let items = parsed
        .items
        .into_iter()
        .map(|i| ItemEntry {
            id: i.id.trim().to_string(),
            text: i.text,
            romanization: i.romanization.filter(|r| !r.trim().is_empty()),
            part_of_speech: i.part_of_speech.unwrap_or_else(|| default_pos.clone()),
            definition: i.definition,
            example: i.example.filter(|e| !e.trim().is_empty()),
            example_meaning: i.example_meaning.filter(|e| !e.trim().is_empty()),
        })
        .collect();

    Ok(Catalog {
        name: parsed.catalog.name,
        description: parsed.catalog.description,
        items,
    })
}

/// A non-fatal problem found in a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    pub item_id: Option<String>,
    pub message: String,
}

/// Check a catalog for problems that would confuse scheduling or display.
pub fn validate_catalog(catalog: &Catalog) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if catalog.items.is_empty() {
        warnings.push(ValidationWarning {
            item_id: None,
            message: "catalog has no items".into(),
        });
    }

    let mut seen = HashSet::new();
    for item in &catalog.items {
        if item.id.is_empty() {
            warnings.push(ValidationWarning {
                item_id: None,
                message: format!("item '{}' has an empty id", item.text),
            });
            continue;
        }
        if !seen.insert(item.id.as_str()) {
            warnings.push(ValidationWarning {
                item_id: Some(item.id.clone()),
                message: "duplicate id; later entry replaces the earlier one on import".into(),
            });
        }
        if item.text.trim().is_empty() {
            warnings.push(ValidationWarning {
                item_id: Some(item.id.clone()),
                message: "empty text".into(),
            });
        }
        if item.definition.trim().is_empty() {
            warnings.push(ValidationWarning {
                item_id: Some(item.id.clone()),
                message: "empty definition".into(),
            });
        }
        if item.example_meaning.is_some() && item.example.is_none() {
            warnings.push(ValidationWarning {
                item_id: Some(item.id.clone()),
                message: "example_meaning without example".into(),
            });
        }
    }

    warnings
}
