use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use sqlembed::config::SqlembedConfig;
use sqlembed::db;
use sqlembed::embedding;
use sqlembed::semantic::search::semantic_search;

/// Search an enriched table and print ranked rows.
pub async fn search(
    config: &SqlembedConfig,
    db_path: &Path,
    table: &str,
    query: &str,
    limit: Option<usize>,
    show_sql: bool,
) -> Result<()> {
    let conn = db::open_database(db_path).context("failed to open database")?;
    let db = Mutex::new(conn);
    let embedder = embedding::create_embedder(&config.embedding);
    let credentials = super::credentials(config);
    let limit = limit.unwrap_or(config.search.max_results);

    let (built, hits) =
        semantic_search(&db, &embedder, &credentials, table, query, None, limit).await?;

    if show_sql {
        println!("{}", built.sql);
        println!();
    }

    if hits.is_empty() {
        println!("No embedded rows in '{table}'.");
        return Ok(());
    }

    println!("Results for \"{query}\" ({} rows):", hits.len());
    println!("{}", "=".repeat(60));
    for (i, hit) in hits.iter().enumerate() {
        let score = hit
            .similarity
            .map(|s| format!("{s:.4}"))
            .unwrap_or_else(|| "-".into());
        println!("{:>3}. [{score}] {}", i + 1, serde_json::Value::Object(hit.row.clone()));
    }

    Ok(())
}
