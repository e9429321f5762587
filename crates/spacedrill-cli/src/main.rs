//! spacedrill CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "spacedrill", version, about = "Spaced-repetition study scheduler")]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON data file (overrides the configured store)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Treat this RFC 3339 instant as the current time
    #[arg(long, global = true)]
    now: Option<DateTime<Utc>>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create starter config and example catalog
    Init,

    /// Validate a catalog TOML file
    Validate {
        /// Path to catalog file
        #[arg(long)]
        catalog: PathBuf,
    },

    /// Load catalog entries into the store
    Import {
        /// Path to catalog file
        #[arg(long)]
        catalog: PathBuf,
    },

    /// Generate (or show) today's task list
    Plan {
        #[arg(long)]
        user: String,

        /// Maximum tasks for the day (default from config)
        #[arg(long)]
        target: Option<usize>,

        /// Print tasks as JSON
        #[arg(long)]
        json: bool,
    },

    /// Study today's tasks interactively
    Study {
        #[arg(long)]
        user: String,

        /// Maximum tasks for the day (default from config)
        #[arg(long)]
        target: Option<usize>,
    },

    /// Record a single review outside a session
    Review {
        #[arg(long)]
        user: String,

        #[arg(long)]
        item: String,

        /// 0-3 or forgot, hard, good, easy
        #[arg(long)]
        quality: String,
    },

    /// Count a recitation pass over an item
    Recite {
        #[arg(long)]
        user: String,

        #[arg(long)]
        item: String,
    },

    /// Show learned and due counts
    Stats {
        #[arg(long)]
        user: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("spacedrill=info")),
        )
        .init();

    let cli = Cli::parse();
    let global = cli.global;

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { catalog } => commands::validate::execute(catalog),
        Commands::Import { catalog } => commands::import::execute(&global, catalog).await,
        Commands::Plan { user, target, json } => {
            commands::plan::execute(&global, &user, target, json).await
        }
        Commands::Study { user, target } => commands::study::execute(&global, &user, target).await,
        Commands::Review {
            user,
            item,
            quality,
        } => commands::review::execute(&global, &user, &item, &quality).await,
        Commands::Recite { user, item } => commands::recite::execute(&global, &user, &item).await,
        Commands::Stats { user } => commands::stats::execute(&global, &user).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
