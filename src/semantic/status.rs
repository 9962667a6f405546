//! Embedding coverage per source table.

use rusqlite::Connection;
use serde::Serialize;

use crate::db::schema::{self, quote_ident};
use crate::error::Result;

#[derive(Debug, Clone, Serialize)]
pub struct ColumnStatus {
    pub column: String,
    pub model: String,
    /// Shadow rows with a non-NULL vector in this column.
    pub embedded_rows: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableStatus {
    pub table: String,
    pub rows: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow_table: Option<String>,
    pub columns: Vec<ColumnStatus>,
}

impl TableStatus {
    pub fn searchable(&self) -> bool {
        !self.columns.is_empty()
    }
}

/// Embedding coverage for every source table in the database.
pub fn table_status(conn: &Connection) -> Result<Vec<TableStatus>> {
    crate::db::source_tables(conn)?
        .into_iter()
        .map(|table| status_for(conn, &table))
        .collect()
}

pub fn status_for(conn: &Connection, table: &str) -> Result<TableStatus> {
    let rows = count(conn, &format!("SELECT count(*) FROM {}", quote_ident(table)))?;
    let shadow = schema::shadow_table_name(table);
    let embedding_columns = schema::list_embedding_columns(conn, table)?;

    let shadow_table = schema::table_exists(conn, &shadow)?.then(|| shadow.clone());
    let mut columns = Vec::with_capacity(embedding_columns.len());
    for (column, model) in embedding_columns {
        let embedded_rows = count(
            conn,
            &format!(
                "SELECT count({}) FROM {}",
                quote_ident(&column),
                quote_ident(&shadow)
            ),
        )?;
        columns.push(ColumnStatus {
            column,
            model: model.identifier().to_string(),
            embedded_rows,
        });
    }

    Ok(TableStatus {
        table: table.to_string(),
        rows,
        shadow_table,
        columns,
    })
}

fn count(conn: &Connection, sql: &str) -> Result<u64> {
    let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(n as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::embedding::EmbeddingModel;
    use rusqlite::types::Value;

    #[test]
    fn reports_coverage_per_column() {
        let conn = open_memory_database().unwrap();
        conn.execute_batch(
            "CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT);
             INSERT INTO items VALUES (1, 'a'), (2, 'b');
             CREATE TABLE other (id INTEGER PRIMARY KEY);",
        )
        .unwrap();
        schema::ensure_column(&conn, "items", EmbeddingModel::Small).unwrap();
        let pks = schema::primary_keys(&conn, "items").unwrap();
        schema::upsert(&conn, "items", &pks, &[Value::Integer(1)], EmbeddingModel::Small, b"abcd")
            .unwrap();

        let status = table_status(&conn).unwrap();
        assert_eq!(status.len(), 2);
        let items = &status[0];
        assert_eq!(items.table, "items");
        assert_eq!(items.rows, 2);
        assert_eq!(items.shadow_table.as_deref(), Some("_embeddings_items"));
        assert!(items.searchable());
        assert_eq!(items.columns[0].model, "text-embedding-3-small");
        assert_eq!(items.columns[0].embedded_rows, 1);

        let other = &status[1];
        assert!(other.shadow_table.is_none());
        assert!(!other.searchable());
    }
}
