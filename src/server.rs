//! MCP server initialization for the stdio transport.

use crate::tools::SqlembedTools;
use anyhow::Result;
use rmcp::ServiceExt;
use sqlembed::config::SqlembedConfig;
use sqlembed::credentials::{CredentialResolver, CredentialStash};
use sqlembed::db;
use sqlembed::embedding::{self, Embedder};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Start the MCP server over stdio, serving the database at `db_path`.
pub async fn serve_stdio(config: SqlembedConfig, db_path: &Path) -> Result<()> {
    tracing::info!("starting sqlembed MCP server on stdio");

    let conn = db::open_database(db_path)?;
    let db = Arc::new(Mutex::new(conn));

    let embedder: Arc<dyn Embedder> = Arc::new(embedding::create_embedder(&config.embedding));
    let credentials = CredentialResolver::new(
        config.embedding.api_key.clone(),
        Arc::new(CredentialStash::new()),
    );
    if !credentials.has_trusted_key() {
        tracing::info!("no API key configured; clients must call stash_api_key first");
    }

    let tools = SqlembedTools::new(db, embedder, credentials, Arc::new(config));
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}
