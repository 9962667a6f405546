//! Write path: render, embed, encode, upsert.
//!
//! [`enrich_batch`] is the per-batch entry point. The credential is resolved
//! before any network call and the shadow column is ensured once per batch.
//! Each row then fails or succeeds on its own: a remote error for one row is
//! recorded in the [`BatchReport`] and the remaining rows still run. A vector
//! is only written after it has been fully received and encoded.

use std::sync::Mutex;

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use super::template;
use super::types::{BatchReport, EnrichmentOptions, EnrichmentSummary, RowOutcome, SourceRow};
use crate::credentials::CredentialResolver;
use crate::db::schema::{self, quote_ident, PrimaryKeyColumn};
use crate::db::with_conn;
use crate::embedding::{Embedder, EmbeddingModel};
use crate::error::{Error, Result};
use crate::vector;

/// Embed every row of `rows` into `table`'s shadow table.
///
/// Returns `Err` only for batch-fatal problems (credential, schema); per-row
/// failures are in the report, paired with the row's primary key.
pub async fn enrich_batch(
    db: &Mutex<Connection>,
    embedder: &dyn Embedder,
    credentials: &CredentialResolver,
    table: &str,
    rows: &[SourceRow],
    options: &EnrichmentOptions,
    api_key_ref: Option<&str>,
) -> Result<BatchReport> {
    let api_key = credentials.resolve(api_key_ref)?;

    let pks = with_conn(db, |conn| {
        schema::ensure_column(conn, table, options.model)?;
        schema::primary_keys(conn, table)
    })?;

    let mut report = BatchReport::default();
    for row in rows {
        let primary_key: Vec<Value> = pks
            .iter()
            .map(|pk| row.get(&pk.name).cloned().unwrap_or(Value::Null))
            .collect();

        let result =
            match enrich_row(db, embedder, &api_key, table, &pks, &primary_key, row, options).await {
                Err(e) if !e.is_row_scoped() => return Err(e),
                other => other,
            };

        match &result {
            Ok(()) => tracing::debug!(table = %table, key = ?primary_key, "row embedded"),
            Err(e) => tracing::warn!(table = %table, key = ?primary_key, error = %e, "row failed"),
        }
        report.outcomes.push(RowOutcome {
            primary_key,
            result,
        });
    }

    tracing::info!(
        table = %table,
        model = %options.model,
        done = report.done_count(),
        errors = report.error_count(),
        "batch enriched"
    );
    Ok(report)
}

#[allow(clippy::too_many_arguments)]
async fn enrich_row(
    db: &Mutex<Connection>,
    embedder: &dyn Embedder,
    api_key: &str,
    table: &str,
    pks: &[PrimaryKeyColumn],
    primary_key: &[Value],
    row: &SourceRow,
    options: &EnrichmentOptions,
) -> Result<()> {
    if let Some(missing) = pks.iter().find(|pk| row.get(&pk.name).is_none()) {
        return Err(Error::Configuration(format!(
            "row is missing primary key column {}",
            missing.name
        )));
    }
    if let Some(null) = pks.iter().zip(primary_key).find(|(_, v)| **v == Value::Null) {
        return Err(Error::Configuration(format!(
            "primary key column {} is NULL",
            null.0.name
        )));
    }

    let text = template::render(&options.template, row);
    if text.trim().is_empty() {
        return Err(Error::Configuration(
            "template rendered empty text for this row".into(),
        ));
    }

    let embedding = embedder.embed(api_key, &text, options.model).await?;
    if embedding.is_empty() {
        return Err(Error::InvalidResponse("embedding service returned an empty vector".into()));
    }
    let encoded = vector::encode(&embedding);

    with_conn(db, |conn| {
        schema::upsert(conn, table, pks, primary_key, options.model, &encoded)
    })
}

/// Page through `table` in primary-key order.
pub fn fetch_rows(
    conn: &Connection,
    table: &str,
    pks: &[PrimaryKeyColumn],
    limit: usize,
    offset: usize,
) -> Result<Vec<SourceRow>> {
    let uses_rowid = matches!(pks, [pk] if pk.name == "rowid");
    let projection = if uses_rowid { "rowid, *" } else { "*" };
    let order: Vec<String> = pks.iter().map(|pk| quote_ident(&pk.name)).collect();
    let sql = format!(
        "SELECT {projection} FROM {} ORDER BY {} LIMIT ?1 OFFSET ?2",
        quote_ident(table),
        order.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let rows = stmt
        .query_map(params![limit as i64, offset as i64], |row| {
            names
                .iter()
                .enumerate()
                .map(|(i, name)| -> rusqlite::Result<(String, Value)> {
                    Ok((name.clone(), row.get(i)?))
                })
                .collect::<rusqlite::Result<SourceRow>>()
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn count_rows(conn: &Connection, table: &str) -> Result<usize> {
    let count: i64 = conn.query_row(
        &format!("SELECT count(*) FROM {}", quote_ident(table)),
        [],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

/// Enrich a whole table, `batch_size` rows at a time.
///
/// `on_batch` is called after each batch, e.g. to advance a progress bar.
#[allow(clippy::too_many_arguments)]
pub async fn enrich_table(
    db: &Mutex<Connection>,
    embedder: &dyn Embedder,
    credentials: &CredentialResolver,
    table: &str,
    options: &EnrichmentOptions,
    api_key_ref: Option<&str>,
    batch_size: usize,
    mut on_batch: impl FnMut(&BatchReport) + Send,
) -> Result<EnrichmentSummary> {
    // Fail before touching the schema if there is no key at all.
    credentials.resolve(api_key_ref)?;

    let batch_size = batch_size.max(1);
    let pks = with_conn(db, |conn| schema::primary_keys(conn, table))?;

    let mut summary = EnrichmentSummary {
        table: table.to_string(),
        model: options.model.identifier().to_string(),
        ..Default::default()
    };
    let mut offset = 0;
    loop {
        let rows = with_conn(db, |conn| fetch_rows(conn, table, &pks, batch_size, offset))?;
        if rows.is_empty() {
            break;
        }
        let report =
            enrich_batch(db, embedder, credentials, table, &rows, options, api_key_ref).await?;
        summary.absorb(&report);
        on_batch(&report);
        offset += rows.len();
    }

    tracing::info!(
        table = %table,
        model = %options.model,
        done = summary.done_count,
        errors = summary.error_count,
        "table enriched"
    );
    Ok(summary)
}

/// Default template for `table`: every column, space separated.
pub fn default_template_for(conn: &Connection, table: &str) -> Result<String> {
    let columns = schema::table_columns(conn, table)?;
    if columns.is_empty() {
        return Err(Error::Configuration(format!("table not found: {table}")));
    }
    Ok(template::default_template(&columns))
}

/// Stored vector for one row and model, if any.
pub fn stored_vector(
    conn: &Connection,
    table: &str,
    pks: &[PrimaryKeyColumn],
    primary_key: &[Value],
    model: EmbeddingModel,
) -> Result<Option<Vec<f32>>> {
    let predicate: Vec<String> = pks
        .iter()
        .enumerate()
        .map(|(i, pk)| format!("{} = ?{}", quote_ident(&pk.name), i + 1))
        .collect();
    let sql = format!(
        "SELECT {} FROM {} WHERE {}",
        quote_ident(&model.column_name()),
        quote_ident(&schema::shadow_table_name(table)),
        predicate.join(" AND ")
    );
    let blob: Option<Option<Vec<u8>>> = conn
        .query_row(&sql, params_from_iter(primary_key), |row| row.get(0))
        .optional()?;
    blob.flatten().map(|b| vector::decode(&b)).transpose()
}
