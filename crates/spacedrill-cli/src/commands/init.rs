//! The `spacedrill init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_if_missing("spacedrill.toml", SAMPLE_CONFIG)?;
    write_if_missing("catalog.toml", EXAMPLE_CATALOG)?;

    println!("\nNext steps:");
    println!("  1. Run: spacedrill validate --catalog catalog.toml");
    println!("  2. Run: spacedrill import --catalog catalog.toml");
    println!("  3. Run: spacedrill study --user me");

    Ok(())
}

fn write_if_missing(path: &str, content: &str) -> Result<()> {
    if Path::new(path).exists() {
        println!("{path} already exists, skipping.");
    } else {
        std::fs::write(path, content)?;
        println!("Created {path}");
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# spacedrill configuration

# Upper bound on tasks generated per study day.
daily_target = 100

# The study day starts at this local hour.
day_start_hour = 4
utc_offset_minutes = 0

[store]
type = "json"
path = "./spacedrill-data.json"
"#;

const EXAMPLE_CATALOG: &str = r#"[catalog]
name = "Korean Starter"
description = "A few first words to get started"
default_part_of_speech = "noun"

[[items]]
id = "ko-0001"
text = "사랑"
romanization = "sarang"
definition = "love"
example = "사랑해요."
example_meaning = "I love you."

[[items]]
id = "ko-0002"
text = "물"
romanization = "mul"
definition = "water"
example = "물 주세요."
example_meaning = "Water, please."

[[items]]
id = "ko-0003"
text = "먹다"
romanization = "meokda"
part_of_speech = "verb"
definition = "to eat"
example = "밥을 먹어요."
example_meaning = "I eat rice."

[[items]]
id = "ko-0004"
text = "크다"
romanization = "keuda"
part_of_speech = "adjective"
definition = "to be big"
"#;
