//! The `spacedrill stats` command.

use anyhow::Result;
use comfy_table::Table;

use spacedrill_core::stats::study_stats;

use super::Setup;
use crate::GlobalOpts;

pub async fn execute(global: &GlobalOpts, user_id: &str) -> Result<()> {
    let setup = Setup::load(global)?;
    let stats = study_stats(setup.repo.as_ref(), &setup.clock, user_id, setup.now()).await?;

    let due_label = if stats.from_plan {
        "Due today"
    } else {
        "Due today (no plan yet)"
    };

    let mut table = Table::new();
    table.set_header(vec!["User", "Learned", due_label]);
    table.add_row(vec![
        user_id.to_string(),
        stats.learned.to_string(),
        stats.due.to_string(),
    ]);
    println!("{table}");
    Ok(())
}
