//! # Document Search CLI (`docsearch`)
//!
//! Commands for indexing a directory of internal documents into Meilisearch
//! and searching them, plus the MCP server for AI-assistant integration.
//!
//! ```bash
//! docsearch index ./docs
//! docsearch search コスト削減
//! docsearch serve mcp
//! ```
//!
//! All commands accept a `--config` flag pointing to a TOML file; without
//! one, the tool talks to a local unsecured Meilisearch at
//! `http://127.0.0.1:7700` with index `documents`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use document_search::{config, index_cmd, search_cmd, server};

/// Document Search — full-text search over Word, Excel, scanned PNG, and
/// draw.io files, backed by Meilisearch.
#[derive(Parser)]
#[command(
    name = "docsearch",
    about = "Full-text search over office documents, spreadsheets, scanned images, and draw.io diagrams",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Missing file means built-in
    /// defaults (local Meilisearch, index `documents`, Japanese OCR).
    #[arg(long, global = true, default_value = "./config/docsearch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recursively index supported files under a directory.
    ///
    /// Walks the directory for `.docx`, `.xlsx`, `.xls`, `.png`, and
    /// `.drawio` files, extracts position-annotated text from each, and
    /// submits one document batch to the engine. Files that fail to parse
    /// or contain no text are skipped with a notice, never aborting the run.
    Index {
        /// Directory to index.
        directory: PathBuf,
    },

    /// Search indexed documents.
    ///
    /// All words are joined into one query string. Prints ranked results
    /// with the matching lines highlighted; exits with an error if the
    /// index has not been created yet.
    Search {
        /// Query words (joined with spaces).
        #[arg(required = true)]
        query: Vec<String>,

        /// Maximum number of results.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Start the MCP tool server.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },
}

#[derive(Subcommand)]
enum ServeService {
    /// Serve the `search_documents` tool over MCP streamable HTTP.
    Mcp,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Index { directory } => {
            index_cmd::run_index(&cfg, &directory).await?;
        }
        Commands::Search { query, limit } => {
            search_cmd::run_search(&cfg, &query.join(" "), limit).await?;
        }
        Commands::Serve { service } => match service {
            ServeService::Mcp => {
                server::run_server(&cfg).await?;
            }
        },
    }

    Ok(())
}
