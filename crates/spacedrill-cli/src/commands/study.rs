//! The `spacedrill study` command.
//!
//! Reads one grade per line from stdin: `0`-`3` or a tier name. `q` ends the
//! session early; re-queued copies that were not reached are dropped.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use spacedrill_core::error::RepositoryError;
use spacedrill_core::generator::load_study_set;
use spacedrill_core::model::{ItemEntry, Quality};
use spacedrill_core::session::StudySession;
use spacedrill_core::traits::{ProgressEvent, ProgressObserver};

use super::Setup;
use crate::GlobalOpts;

/// Console progress observer.
struct ConsoleObserver;

impl ProgressObserver for ConsoleObserver {
    fn on_progress(&self, event: &ProgressEvent) {
        eprintln!("  Done today: {}", event.completed_today);
    }

    fn on_persist_failed(&self, _user_id: &str, item_id: &str, error: &RepositoryError) {
        eprintln!("  WARNING: review of {item_id} not saved ({error}); progress may be lost");
    }
}

pub async fn execute(global: &GlobalOpts, user_id: &str, target: Option<usize>) -> Result<()> {
    let setup = Setup::load(global)?;
    let study_set = load_study_set(
        setup.repo.as_ref(),
        &setup.clock,
        user_id,
        setup.now(),
        setup.target(target),
    )
    .await?;

    if study_set.items.is_empty() {
        println!("Nothing to study today.");
        return Ok(());
    }
    println!(
        "Study date {}: {} item(s) to go, {} already done",
        study_set.study_date,
        study_set.items.len(),
        study_set.reviewed_today
    );

    let mut session = StudySession::new(
        Arc::clone(&setup.repo),
        setup.clock,
        Arc::new(ConsoleObserver),
        user_id,
        study_set,
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(entry) = session.current().cloned() {
        print_card(&entry, session.queue().cursor() + 1, session.queue().len())?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.eq_ignore_ascii_case("q") {
            break;
        }
        let quality: Quality = match input.parse() {
            Ok(q) => q,
            Err(e) => {
                println!("  {e}");
                continue;
            }
        };

        let outcome = session.answer(quality, setup.now()).await?;
        if let Some(at) = outcome.requeued_at {
            println!("  {quality}: back in {} card(s)", at - session.queue().cursor() + 1);
        } else {
            println!(
                "  {quality}: next review in {} day(s)",
                outcome.state.interval_days
            );
        }
    }

    if session.is_complete() {
        println!(
            "\nSession complete: {} done today.",
            session.completed_today()
        );
    } else {
        println!(
            "\nSession ended early: {} done today, {} card(s) left.",
            session.completed_today(),
            session.queue().remaining()
        );
    }
    Ok(())
}

fn print_card(entry: &ItemEntry, position: usize, total: usize) -> Result<()> {
    let mut out = std::io::stdout().lock();
    writeln!(out, "\n[{position}/{total}] {}", entry.text)?;
    if let Some(rom) = &entry.romanization {
        writeln!(out, "  ({rom})")?;
    }
    if entry.part_of_speech.is_empty() {
        writeln!(out, "  {}", entry.definition)?;
    } else {
        writeln!(out, "  {}: {}", entry.part_of_speech, entry.definition)?;
    }
    if let Some(example) = &entry.example {
        match &entry.example_meaning {
            Some(meaning) => writeln!(out, "  e.g. {example} ({meaning})")?,
            None => writeln!(out, "  e.g. {example}")?,
        }
    }
    write!(out, "grade [0 forgot, 1 hard, 2 good, 3 easy, q quit]> ")?;
    out.flush()?;
    Ok(())
}
