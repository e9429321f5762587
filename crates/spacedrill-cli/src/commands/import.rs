//! The `spacedrill import` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use spacedrill_core::catalog::{parse_catalog, validate_catalog};

use super::Setup;
use crate::GlobalOpts;

pub async fn execute(global: &GlobalOpts, catalog_path: PathBuf) -> Result<()> {
    let catalog = parse_catalog(&catalog_path)?;
    let warnings = validate_catalog(&catalog);
    if !warnings.is_empty() {
        eprintln!(
            "{} warning(s) in {}; run `spacedrill validate` for details.",
            warnings.len(),
            catalog_path.display()
        );
    }

    let items: Vec<_> = catalog
        .items
        .into_iter()
        .filter(|item| !item.id.is_empty())
        .collect();

    let setup = Setup::load(global)?;
    setup
        .repo
        .upsert_items(&items)
        .await
        .context("failed to store catalog items")?;

    println!(
        "Imported {} items from {}.",
        items.len(),
        catalog.name
    );
    Ok(())
}
