//! The `spacedrill plan` command.

use std::collections::HashMap;

use anyhow::Result;
use comfy_table::{Cell, Table};

use spacedrill_core::generator::ensure_daily_tasks;

use super::Setup;
use crate::GlobalOpts;

pub async fn execute(
    global: &GlobalOpts,
    user_id: &str,
    target: Option<usize>,
    json: bool,
) -> Result<()> {
    let setup = Setup::load(global)?;
    let plan = ensure_daily_tasks(
        setup.repo.as_ref(),
        &setup.clock,
        user_id,
        setup.now(),
        setup.target(target),
    )
    .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan.tasks)?);
        return Ok(());
    }

    if plan.is_empty() {
        println!("Nothing to study today.");
        return Ok(());
    }

    let ids: Vec<String> = plan.tasks.iter().map(|t| t.item_id.clone()).collect();
    let entries: HashMap<String, String> = setup
        .repo
        .get_items(&ids)
        .await?
        .into_iter()
        .map(|e| (e.id, e.text))
        .collect();

    let mut table = Table::new();
    table.set_header(vec!["#", "Item", "Text", "Kind", "Status"]);
    for (i, task) in plan.tasks.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&task.item_id),
            Cell::new(entries.get(&task.item_id).map(String::as_str).unwrap_or("?")),
            Cell::new(task.kind),
            Cell::new(task.status),
        ]);
    }

    let source = if plan.already_generated {
        "existing plan"
    } else {
        "new plan"
    };
    println!(
        "Study date {} ({source}): {} task(s), {} completed",
        plan.study_date,
        plan.tasks.len(),
        plan.completed_count()
    );
    println!("{table}");
    if plan.discarded_duplicates > 0 {
        eprintln!(
            "Ignored {} duplicate task(s) from a concurrent generation.",
            plan.discarded_duplicates
        );
    }
    Ok(())
}
