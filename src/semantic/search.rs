//! Cosine-ranked similarity queries over an enriched table.

use std::sync::Mutex;

use rusqlite::types::Value;
use rusqlite::{named_params, Connection};

use super::types::{value_to_json, SearchHit};
use crate::credentials::CredentialResolver;
use crate::db::functions::COSINE_FUNCTION;
use crate::db::schema::{self, quote_ident};
use crate::db::with_conn;
use crate::embedding::{Embedder, EmbeddingModel};
use crate::error::{Error, Result};
use crate::vector;

/// Alias of the similarity score column in generated queries.
pub const SIMILARITY_ALIAS: &str = "_similarity";

/// What a search will join and rank on, derived from the current schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPlan {
    pub table: String,
    pub shadow_table: String,
    /// Primary-key column names in key declaration order.
    pub primary_keys: Vec<String>,
    pub column: String,
    pub model: EmbeddingModel,
}

/// A ready-to-run similarity query and its hex-encoded `:vector` parameter.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub sql: String,
    pub vector: String,
    pub model: EmbeddingModel,
}

/// Pick the embedding column to search and collect the join keys.
///
/// With several models stored, the lexicographically first column wins.
pub fn plan_search(conn: &Connection, table: &str) -> Result<SearchPlan> {
    let columns = schema::list_embedding_columns(conn, table)?;
    let (column, model) = columns
        .into_iter()
        .next()
        .ok_or_else(|| Error::NotEmbedded(table.to_string()))?;
    let primary_keys = schema::primary_keys(conn, table)?
        .into_iter()
        .map(|pk| pk.name)
        .collect();
    Ok(SearchPlan {
        table: table.to_string(),
        shadow_table: schema::shadow_table_name(table),
        primary_keys,
        column,
        model,
    })
}

impl SearchPlan {
    /// The ranking query. A pure function of table, keys and column.
    pub fn to_sql(&self) -> String {
        let table = quote_ident(&self.table);
        let shadow = quote_ident(&self.shadow_table);
        let column = quote_ident(&self.column);
        let on: Vec<String> = self
            .primary_keys
            .iter()
            .map(|pk| {
                format!(
                    "{}.{} = {}.{}",
                    join_ident(&self.table),
                    join_ident(pk),
                    join_ident(&self.shadow_table),
                    join_ident(pk)
                )
            })
            .collect();

        format!(
            "select\n  {table}.*,\n  {COSINE_FUNCTION}({shadow}.{column}, unhex(:vector)) as {SIMILARITY_ALIAS}\n\
             from {table} join {shadow}\n\
             on {}\n\
             where {shadow}.{column} is not null\n\
             order by {SIMILARITY_ALIAS} desc",
            on.join(" and ")
        )
    }
}

/// Identifiers in the join predicate stay bare when that is unambiguous.
fn join_ident(name: &str) -> String {
    let mut chars = name.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain && !is_keyword(name) {
        name.to_string()
    } else {
        quote_ident(name)
    }
}

fn is_keyword(name: &str) -> bool {
    const KEYWORDS: &[&str] = &[
        "all", "alter", "and", "as", "asc", "between", "by", "case", "check", "collate",
        "column", "commit", "constraint", "create", "cross", "default", "delete", "desc",
        "distinct", "drop", "else", "end", "escape", "except", "exists", "foreign", "from",
        "full", "group", "having", "if", "in", "index", "inner", "insert", "intersect", "into",
        "is", "join", "key", "left", "like", "limit", "natural", "not", "null", "offset", "on",
        "or", "order", "outer", "primary", "references", "right", "select", "set", "table",
        "then", "to", "transaction", "union", "unique", "update", "using", "values", "when",
        "where", "with",
    ];
    KEYWORDS.contains(&name.to_ascii_lowercase().as_str())
}

/// Embed `query_text` and build the ranking query for `table`.
///
/// Fails before any network call on an empty query, a missing credential, or a
/// table without embeddings.
pub async fn build_search_query(
    db: &Mutex<Connection>,
    embedder: &dyn Embedder,
    credentials: &CredentialResolver,
    table: &str,
    query_text: &str,
    api_key_ref: Option<&str>,
) -> Result<SearchQuery> {
    if query_text.trim().is_empty() {
        return Err(Error::Configuration("Search query is required".into()));
    }
    let api_key = credentials.resolve(api_key_ref)?;
    let plan = with_conn(db, |conn| plan_search(conn, table))?;

    let embedding = embedder.embed(&api_key, query_text, plan.model).await?;
    let encoded = vector::encode(&embedding);

    tracing::info!(table = %table, model = %plan.model, "search query built");
    Ok(SearchQuery {
        sql: plan.to_sql(),
        vector: vector::to_hex(&encoded),
        model: plan.model,
    })
}

/// Run a built query, returning at most `limit` hits, best first.
pub fn execute_search(conn: &Connection, query: &SearchQuery, limit: usize) -> Result<Vec<SearchHit>> {
    let mut stmt = conn.prepare(&query.sql)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query(named_params! { ":vector": query.vector })?;

    let mut hits = Vec::new();
    while let Some(row) = rows.next()? {
        if hits.len() >= limit {
            break;
        }
        let mut fields = serde_json::Map::new();
        let mut similarity = None;
        for (i, name) in names.iter().enumerate() {
            if name == SIMILARITY_ALIAS {
                similarity = row.get::<_, Option<f64>>(i)?;
            } else {
                fields.insert(name.clone(), value_to_json(&row.get::<_, Value>(i)?));
            }
        }
        hits.push(SearchHit {
            row: fields,
            similarity,
        });
    }
    Ok(hits)
}

/// Embed, build, and run a search in one go.
#[allow(clippy::too_many_arguments)]
pub async fn semantic_search(
    db: &Mutex<Connection>,
    embedder: &dyn Embedder,
    credentials: &CredentialResolver,
    table: &str,
    query_text: &str,
    api_key_ref: Option<&str>,
    limit: usize,
) -> Result<(SearchQuery, Vec<SearchHit>)> {
    let query =
        build_search_query(db, embedder, credentials, table, query_text, api_key_ref).await?;
    let hits = with_conn(db, |conn| execute_search(conn, &query, limit))?;
    Ok((query, hits))
}

/// True when `table` has at least one allow-listed embedding column.
pub fn is_searchable(conn: &Connection, table: &str) -> Result<bool> {
    Ok(!schema::list_embedding_columns(conn, table)?.is_empty())
}
