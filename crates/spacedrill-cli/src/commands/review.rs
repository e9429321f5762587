//! The `spacedrill review` command.

use anyhow::Result;

use spacedrill_core::model::Quality;
use spacedrill_core::review::record_review;

use super::Setup;
use crate::GlobalOpts;

pub async fn execute(global: &GlobalOpts, user_id: &str, item_id: &str, quality: &str) -> Result<()> {
    let quality: Quality = quality.parse()?;
    let setup = Setup::load(global)?;
    let state = record_review(
        setup.repo.as_ref(),
        &setup.clock,
        user_id,
        item_id,
        quality,
        setup.now(),
    )
    .await?;

    println!("Recorded {quality} for {item_id}.");
    println!(
        "  status {}, interval {} day(s), ease {:.2}, next due {}",
        state.status,
        state.interval_days,
        state.ease_factor,
        state.next_due_at.to_rfc3339()
    );
    Ok(())
}
