//! # Household Memory CLI (`hm`)
//!
//! Store household notes, receipts and service records, then ask questions
//! answered only from what was stored.
//!
//! ## Usage
//!
//! ```bash
//! hm --config ./config/hm.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `hm init` | Create the SQLite database and schema |
//! | `hm add --title .. --content ..` | Store a record |
//! | `hm get <id>` | Print one record |
//! | `hm search "<query>"` | Direct full-text retrieval |
//! | `hm ask "<question>"` | Grounded answer with citations |
//! | `hm serve` | Start the HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! hm add --title "Boiler service" \
//!        --content "Boiler serviced on 2025-10-12 by ABC Heating" \
//!        --tags boiler,heating --source-kind document --source-ref invoice-1182.pdf
//!
//! hm ask "When was the boiler last serviced?"
//! ```
//!
//! Logs go to stderr; set `RUST_LOG` to change the level.

mod ask;
mod config;
mod db;
mod generation;
mod migrate;
mod records;
mod search;
mod server;
mod sqlite_store;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use household_memory_core::SourceKind;

const DEFAULT_LOG_FILTER: &str = "household_memory=info,household_memory_core=info";

/// Household Memory: grounded answers from your own household records.
#[derive(Parser)]
#[command(
    name = "hm",
    about = "Household Memory: grounded answers from your own household records",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/hm.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Store a new record.
    Add {
        #[arg(long)]
        title: String,

        #[arg(long)]
        content: String,

        /// Comma-separated tags, e.g. `boiler,heating`.
        #[arg(long)]
        tags: Option<String>,

        /// One of: manual, web, document, email, photo.
        #[arg(long, default_value = "manual")]
        source_kind: SourceKind,

        /// Where the record came from (file name, URL, sender).
        #[arg(long)]
        source_ref: Option<String>,
    },

    /// Print a record by id.
    Get { id: String },

    /// Search records directly, without grounding.
    Search {
        query: String,

        /// Maximum number of results (1-20).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Answer a question from stored records.
    Ask {
        question: String,

        /// Print the answer as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Add {
            title,
            content,
            tags,
            source_kind,
            source_ref,
        } => {
            let new = records::NewRecord {
                title,
                content,
                tags: tags.as_deref().map(records::parse_tags).unwrap_or_default(),
                source_kind,
                source_ref,
            };
            records::run_add(&cfg, new).await?;
        }
        Commands::Get { id } => {
            records::run_get(&cfg, &id).await?;
        }
        Commands::Search { query, limit } => {
            search::run_search(&cfg, &query, limit).await?;
        }
        Commands::Ask { question, json } => {
            ask::run_ask(&cfg, &question, json).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
