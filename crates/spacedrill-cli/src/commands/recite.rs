//! The `spacedrill recite` command.

use anyhow::Result;

use spacedrill_core::review::record_recitation;

use super::Setup;
use crate::GlobalOpts;

pub async fn execute(global: &GlobalOpts, user_id: &str, item_id: &str) -> Result<()> {
    let setup = Setup::load(global)?;
    let count = record_recitation(setup.repo.as_ref(), user_id, item_id, setup.now()).await?;
    println!("Recited {item_id}: {count} time(s).");
    Ok(())
}
