//! # Casebook CLI (`casebook`)
//!
//! ```bash
//! casebook --config ./config/casebook.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `casebook check` | Load every case file and report problems |
//! | `casebook list` | List cases, optionally by category or tag |
//! | `casebook search "<query>"` | Hybrid search |
//! | `casebook get <id>` | Print a case, optionally only some sections |
//! | `casebook index rebuild` | Embed and upsert every case |
//! | `casebook index delete <id>` | Remove one vector from the index |
//! | `casebook serve` | Start the HTTP + MCP server |

use casebook::{catalog, config, get, index_cmd, logging, search, server};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Casebook: search implementation case studies by meaning and keywords.
#[derive(Parser)]
#[command(name = "casebook", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/casebook.toml")]
    config: PathBuf,

    /// Debug-level logging on stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every case file and report counts per category and skipped files.
    ///
    /// Exits non-zero when any file failed to load.
    Check,

    /// List cases.
    List {
        /// mobile, web, backend, tools or integrations.
        #[arg(long)]
        category: Option<String>,

        /// Case-insensitive substring of a tag.
        #[arg(long)]
        tag: Option<String>,
    },

    /// Search cases.
    Search {
        query: String,

        #[arg(long)]
        category: Option<String>,

        /// beginner, intermediate or advanced.
        #[arg(long)]
        difficulty: Option<String>,

        /// 1 to 20; defaults to `[search].default_limit`.
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Print a case by id.
    Get {
        id: String,

        /// Keep only sections whose header matches; repeatable.
        #[arg(long = "section")]
        sections: Vec<String>,

        /// Content cap in approximate tokens (500 to 16000).
        #[arg(long)]
        max_tokens: Option<i64>,
    },

    /// Manage the vector index.
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },

    /// Start the HTTP server (REST tools at /tools, MCP at /mcp).
    Serve {
        /// Reset and rebuild the vector index before serving.
        #[arg(long)]
        reindex: bool,
    },
}

#[derive(Subcommand)]
enum IndexAction {
    /// Embed and upsert every case.
    Rebuild {
        /// Clear the index first.
        #[arg(long)]
        reset: bool,
    },
    /// Delete one case's vector.
    Delete { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Check => {
            catalog::run_check(&cfg)?;
        }
        Commands::List { category, tag } => {
            catalog::run_list(&cfg, category, tag)?;
        }
        Commands::Search {
            query,
            category,
            difficulty,
            limit,
        } => {
            search::run_search(&cfg, &query, category, difficulty, limit).await?;
        }
        Commands::Get {
            id,
            sections,
            max_tokens,
        } => {
            get::run_get(&cfg, &id, sections, max_tokens)?;
        }
        Commands::Index { action } => match action {
            IndexAction::Rebuild { reset } => {
                index_cmd::run_index_rebuild(&cfg, reset).await?;
            }
            IndexAction::Delete { id } => {
                index_cmd::run_index_delete(&cfg, &id).await?;
            }
        },
        Commands::Serve { reindex } => {
            server::run_server(&cfg, reindex).await?;
        }
    }

    Ok(())
}
