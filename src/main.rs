mod cli;
mod server;
mod tools;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sqlembed::config::SqlembedConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sqlembed", version, about = "Semantic search for SQLite tables")]
struct Cli {
    /// Config file to load instead of ~/.sqlembed/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Embed every row of a table into its shadow table
    Enrich {
        /// Path to the SQLite database
        db: PathBuf,
        /// Source table to enrich
        table: String,
        /// Embedding model identifier
        #[arg(long)]
        model: Option<String>,
        /// Row template, e.g. "{{ name }} {{ description }}"
        #[arg(long)]
        template: Option<String>,
        /// Rows per batch
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Rank the rows of an enriched table against a query
    Search {
        db: PathBuf,
        table: String,
        query: String,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
        /// Print the generated SQL before the results
        #[arg(long)]
        show_sql: bool,
    },
    /// Show embedding coverage for every table
    Status { db: PathBuf },
    /// Start the MCP server (stdio transport)
    Serve { db: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SqlembedConfig::load_from(path)?,
        None => SqlembedConfig::load()?,
    };

    // Log to stderr so stdout stays clean for MCP JSON-RPC and CLI output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Enrich {
            db,
            table,
            model,
            template,
            batch_size,
        } => {
            cli::enrich::enrich(
                &config,
                &db,
                &table,
                model.as_deref(),
                template.as_deref(),
                batch_size,
            )
            .await?;
        }
        Command::Search {
            db,
            table,
            query,
            limit,
            show_sql,
        } => {
            cli::search::search(&config, &db, &table, &query, limit, show_sql).await?;
        }
        Command::Status { db } => {
            cli::status::status(&db)?;
        }
        Command::Serve { db } => {
            server::serve_stdio(config, &db).await?;
        }
    }

    Ok(())
}
