pub mod embedding_columns;
pub mod enrich_table;
pub mod semantic_search;
pub mod stash_api_key;

use embedding_columns::EmbeddingColumnsParams;
use enrich_table::EnrichTableParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use rusqlite::Connection;
use semantic_search::SemanticSearchParams;
use stash_api_key::StashApiKeyParams;
use std::sync::{Arc, Mutex};

use sqlembed::config::SqlembedConfig;
use sqlembed::credentials::CredentialResolver;
use sqlembed::db::with_conn;
use sqlembed::embedding::Embedder;
use sqlembed::semantic::{enrich, search, status};
use sqlembed::semantic::types::EnrichmentOptions;

/// The sqlembed MCP tool handler. Holds the shared connection, embedder,
/// credential resolver and config, and exposes the tools via `#[tool_router]`.
#[derive(Clone)]
pub struct SqlembedTools {
    tool_router: ToolRouter<Self>,
    db: Arc<Mutex<Connection>>,
    embedder: Arc<dyn Embedder>,
    credentials: CredentialResolver,
    config: Arc<SqlembedConfig>,
}

#[tool_router]
impl SqlembedTools {
    pub fn new(
        db: Arc<Mutex<Connection>>,
        embedder: Arc<dyn Embedder>,
        credentials: CredentialResolver,
        config: Arc<SqlembedConfig>,
    ) -> Self {
        Self {
            tool_router: Self::tool_router(),
            db,
            embedder,
            credentials,
            config,
        }
    }

    #[tool(description = "Stash an OpenAI API key for this session and get back an opaque api_key_ref to pass to enrich_table and semantic_search.")]
    async fn stash_api_key(
        &self,
        Parameters(params): Parameters<StashApiKeyParams>,
    ) -> Result<String, String> {
        let reference = self
            .credentials
            .stash()
            .stash(&params.api_key)
            .map_err(|e| e.to_string())?;
        tracing::info!("api key stashed");
        Ok(serde_json::json!({ "api_key_ref": reference }).to_string())
    }

    /// Embed every row of a table into its shadow table.
    #[tool(description = "Compute embeddings for every row of a table using a text template, storing them in the _embeddings_<table> shadow table.")]
    async fn enrich_table(
        &self,
        Parameters(params): Parameters<EnrichTableParams>,
    ) -> Result<String, String> {
        let table = params.table;
        let template = match params
            .template
            .or_else(|| self.config.enrichment.template.clone())
        {
            Some(t) => t,
            None => with_conn(&self.db, |conn| enrich::default_template_for(conn, &table))
                .map_err(|e| e.to_string())?,
        };
        let model = params
            .model
            .unwrap_or_else(|| self.config.embedding.model.clone());
        let options = EnrichmentOptions::new(&model, &template).map_err(|e| e.to_string())?;
        let batch_size = params
            .batch_size
            .unwrap_or(self.config.enrichment.batch_size);

        tracing::info!(table = %table, model = %options.model, "enrich_table called");

        let summary = enrich::enrich_table(
            &self.db,
            self.embedder.as_ref(),
            &self.credentials,
            &table,
            &options,
            params.api_key_ref.as_deref(),
            batch_size,
            |_| {},
        )
        .await
        .map_err(|e| e.to_string())?;

        serde_json::to_string(&summary).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Rank the rows of an enriched table against a natural language query.
    #[tool(description = "Semantic search over a table enriched with enrich_table. Returns rows ranked by cosine similarity, best first, together with the SQL used.")]
    async fn semantic_search(
        &self,
        Parameters(params): Parameters<SemanticSearchParams>,
    ) -> Result<String, String> {
        tracing::info!(table = %params.table, query = %params.query, "semantic_search called");

        if params.sql_only.unwrap_or(false) {
            let built = search::build_search_query(
                &self.db,
                self.embedder.as_ref(),
                &self.credentials,
                &params.table,
                &params.query,
                params.api_key_ref.as_deref(),
            )
            .await
            .map_err(|e| e.to_string())?;
            return Ok(serde_json::json!({
                "sql": built.sql,
                "params": { "vector": built.vector },
                "model": built.model.identifier(),
            })
            .to_string());
        }

        let limit = params.max_results.unwrap_or(self.config.search.max_results);
        let (built, hits) = search::semantic_search(
            &self.db,
            self.embedder.as_ref(),
            &self.credentials,
            &params.table,
            &params.query,
            params.api_key_ref.as_deref(),
            limit,
        )
        .await
        .map_err(|e| e.to_string())?;

        let total = hits.len();
        Ok(serde_json::json!({
            "sql": built.sql,
            "model": built.model.identifier(),
            "results": hits,
            "total": total,
        })
        .to_string())
    }

    #[tool(description = "List which tables have embeddings, which models they use, and how many rows are covered.")]
    async fn embedding_columns(
        &self,
        Parameters(params): Parameters<EmbeddingColumnsParams>,
    ) -> Result<String, String> {
        let report = with_conn(&self.db, |conn| match &params.table {
            Some(table) => Ok(vec![status::status_for(conn, table)?]),
            None => status::table_status(conn),
        })
        .map_err(|e| e.to_string())?;

        serde_json::to_string(&report).map_err(|e| format!("serialization failed: {e}"))
    }
}

#[tool_handler]
impl ServerHandler for SqlembedTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "sqlembed adds semantic search to SQLite tables. Use stash_api_key when no key \
                 is configured, enrich_table to embed rows, then semantic_search to query them."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
