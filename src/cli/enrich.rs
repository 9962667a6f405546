//! CLI `enrich` command: embed every row of a table with a progress bar.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use sqlembed::config::SqlembedConfig;
use sqlembed::db;
use sqlembed::embedding;
use sqlembed::semantic::enrich::{count_rows, default_template_for, enrich_table};
use sqlembed::semantic::types::EnrichmentOptions;

/// Maximum number of row errors echoed after a run.
const SHOWN_ERRORS: usize = 10;

pub async fn enrich(
    config: &SqlembedConfig,
    db_path: &Path,
    table: &str,
    model: Option<&str>,
    template: Option<&str>,
    batch_size: Option<usize>,
) -> Result<()> {
    let conn = db::open_database(db_path).context("failed to open database")?;

    let template = match template.or(config.enrichment.template.as_deref()) {
        Some(t) => t.to_string(),
        None => default_template_for(&conn, table)?,
    };
    let model = model.unwrap_or(&config.embedding.model);
    let options = EnrichmentOptions::new(model, &template)?;
    let batch_size = batch_size.unwrap_or(config.enrichment.batch_size);

    let total = count_rows(&conn, table)?;
    if total == 0 {
        println!("Table '{table}' has no rows to enrich.");
        return Ok(());
    }

    println!(
        "Enriching {total} rows of '{table}' with model '{}'...",
        options.model
    );

    let db = Mutex::new(conn);
    let embedder = embedding::create_embedder(&config.embedding);
    let credentials = super::credentials(config);

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} ({eta})")
            .expect("valid template")
            .progress_chars("##-"),
    );

    let summary = enrich_table(
        &db,
        &embedder,
        &credentials,
        table,
        &options,
        None,
        batch_size,
        |report| pb.inc(report.outcomes.len() as u64),
    )
    .await;
    pb.finish_and_clear();
    let summary = summary?;

    println!(
        "Embedded {} rows into {}.",
        summary.done_count,
        db::schema::shadow_table_name(table)
    );
    if summary.error_count > 0 {
        println!("{} rows failed:", summary.error_count);
        for err in summary.errors.iter().take(SHOWN_ERRORS) {
            let key: Vec<String> = err.primary_key.iter().map(|v| v.to_string()).collect();
            println!("  [{}] {}", key.join(", "), err.error);
        }
        if summary.error_count > SHOWN_ERRORS {
            println!("  ... and {} more", summary.error_count - SHOWN_ERRORS);
        }
    }

    Ok(())
}
