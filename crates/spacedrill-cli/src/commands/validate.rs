//! The `spacedrill validate` command.

use std::path::PathBuf;

use anyhow::Result;

use spacedrill_core::catalog::{parse_catalog, validate_catalog};

pub fn execute(catalog_path: PathBuf) -> Result<()> {
    let catalog = parse_catalog(&catalog_path)?;
    println!("Catalog: {} ({} items)", catalog.name, catalog.items.len());
    if !catalog.description.is_empty() {
        println!("  {}", catalog.description);
    }

    let warnings = validate_catalog(&catalog);
    for w in &warnings {
        let prefix = w
            .item_id
            .as_ref()
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Catalog valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
