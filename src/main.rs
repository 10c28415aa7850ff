//! # Mnemo CLI (`mnemo`)
//!
//! The `mnemo` binary is the interface to the personal knowledge
//! assistant: database initialization, document ingestion, retrieval,
//! question answering, and chat-history management.
//!
//! ## Usage
//!
//! ```bash
//! mnemo --config ./config/mnemo.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mnemo init` | Create the SQLite index and run schema migrations |
//! | `mnemo ingest` | Index files under the context root that changed since the last run |
//! | `mnemo ask "<question>"` | Answer a question over the indexed notes |
//! | `mnemo search "<query>"` | Show the raw top-k retrieval results |
//! | `mnemo history` | Show the persisted conversation log |
//! | `mnemo history clear` | Discard all conversation history |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use mnemo::config::load_config;
use mnemo::index::VectorIndex;
use mnemo::ingest::run_ingest;
use mnemo::memory::ChatMemory;
use mnemo::query::{greeting, run_turn, Session};
use mnemo::{db, migrate};

/// Mnemo — a personal knowledge assistant over your own notes.
///
/// All commands accept a `--config` flag pointing to a TOML
/// configuration file with the context root, persona, index, and
/// provider settings.
#[derive(Parser)]
#[command(
    name = "mnemo",
    about = "Mnemo — a personal knowledge assistant over your own notes",
    version,
    long_about = "Mnemo ingests your private documents into a local vector index, keeps the \
    index current as files change, and answers natural-language questions by combining \
    retrieved passages with your configured persona and recent conversation history."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/mnemo.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the index database. Idempotent.
    Init,

    /// Ingest changed files under the context root.
    ///
    /// Scans the context root, fingerprints every supported file, and
    /// (re)indexes those whose content changed since the last run.
    /// Per-file failures are reported at the end without aborting the
    /// batch.
    Ingest {
        /// Ignore the fingerprint cache — reindex every file.
        #[arg(long)]
        full: bool,

        /// Report what would be indexed without writing anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Ask the assistant a question over the indexed notes.
    Ask {
        /// The question text.
        query: String,
    },

    /// Show the raw top-k retrieval results for a query.
    Search {
        /// The search query string.
        query: String,

        /// Number of chunks to retrieve (defaults to retrieval.top_k).
        #[arg(long)]
        k: Option<usize>,
    },

    /// Show or clear the persisted conversation log.
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,

        /// Only show turns with this topic label.
        #[arg(long)]
        topic: Option<String>,

        /// Maximum number of turns to show, most recent last.
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Discard all conversation history in one atomic step.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&config).await?;
            println!("mnemo initialized");
            println!("  db: {}", config.db.path.display());
            println!("  context root: {}", config.ingest.root.display());
        }

        Commands::Ingest { full, dry_run } => {
            let report = run_ingest(&config, full, dry_run).await?;
            report.print(dry_run);
        }

        Commands::Ask { query } => {
            use chrono::Timelike;
            let mut session = Session::load(&config)?;
            let hour = chrono::Local::now().hour();
            println!("{}. {} is listening.", greeting(hour), session.assistant_name);

            let outcome = run_turn(&config, &mut session, &query).await?;
            println!();
            println!("{}: {}", outcome.turn.topic, outcome.response);

            let mut sources: Vec<&str> =
                outcome.retrieved.iter().map(|c| c.source.as_str()).collect();
            sources.sort_unstable();
            sources.dedup();
            if !sources.is_empty() {
                println!();
                println!("  sources: {}", sources.join(", "));
            }
        }

        Commands::Search { query, k } => {
            let pool = db::connect(&config).await?;
            let index = VectorIndex::new(pool);
            let hits = index
                .retrieve(
                    &config.embedding,
                    &query,
                    k.unwrap_or(config.retrieval.top_k),
                )
                .await?;
            index.pool().close().await;

            if hits.is_empty() {
                println!("No results.");
            } else {
                for (i, hit) in hits.iter().enumerate() {
                    println!("{}. [{:.2}] ({}) {}", i + 1, hit.score, hit.tag, hit.source);
                    println!("    excerpt: \"{}\"", excerpt(&hit.text));
                }
            }
        }

        Commands::History {
            action,
            topic,
            limit,
        } => {
            let mut memory = ChatMemory::load(&config.memory.path)?;

            match action {
                Some(HistoryAction::Clear) => {
                    memory.clear()?;
                    println!("history cleared");
                }
                None => {
                    let turns: Vec<_> = memory
                        .turns()
                        .iter()
                        .filter(|t| topic.as_deref().map_or(true, |want| t.topic == want))
                        .collect();
                    let start = limit.map_or(0, |n| turns.len().saturating_sub(n));

                    if turns[start..].is_empty() {
                        println!("No history.");
                    }
                    for turn in &turns[start..] {
                        println!("[{}] ({})", turn.time, turn.topic);
                        println!("  You: {}", turn.query);
                        println!("  {}: {}", config.assistant.name, turn.response);
                    }
                }
            }
        }
    }

    Ok(())
}

/// First line of a chunk, capped for display.
fn excerpt(text: &str) -> String {
    let flat = text.replace('\n', " ");
    let flat = flat.trim();
    if flat.chars().count() <= 160 {
        flat.to_string()
    } else {
        let cut: String = flat.chars().take(160).collect();
        format!("{}...", cut)
    }
}
