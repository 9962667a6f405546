//! Shadow tables holding embeddings alongside a source table.
//!
//! For a source table `items` the shadow table is `_embeddings_items`. It has the
//! source table's primary-key columns (same declared types, `INTEGER` when
//! untyped, `rowid` when the source has no declared key) plus one `BLOB` column
//! per embedding model. Rows are upserted by primary key, one column at a time,
//! so writing one model's vector never clobbers another's.

use std::collections::BTreeMap;

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};

use crate::embedding::EmbeddingModel;
use crate::error::{Error, Result};

pub const SHADOW_TABLE_PREFIX: &str = "_embeddings_";

/// A primary-key column of a source table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKeyColumn {
    pub name: String,
    /// Declared type, `INTEGER` if the source column has none.
    pub sql_type: String,
}

pub fn shadow_table_name(source_table: &str) -> String {
    format!("{SHADOW_TABLE_PREFIX}{source_table}")
}

/// Double-quote an identifier for SQLite.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
}

/// Column names of a table in declaration order.
pub fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>("name"))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

/// Primary-key columns of `table` in key declaration order.
///
/// Tables without a declared primary key are keyed by `rowid`.
pub fn primary_keys(conn: &Connection, table: &str) -> Result<Vec<PrimaryKeyColumn>> {
    if !table_exists(conn, table)? {
        return Err(Error::Configuration(format!("table not found: {table}")));
    }
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let mut keyed: Vec<(i64, PrimaryKeyColumn)> = stmt
        .query_map([], |row| {
            let name: String = row.get("name")?;
            let sql_type: String = row.get("type")?;
            let pk: i64 = row.get("pk")?;
            Ok((pk, name, sql_type))
        })?
        .filter_map(|r| match r {
            Ok((pk, name, sql_type)) if pk > 0 => Some(Ok((
                pk,
                PrimaryKeyColumn {
                    name,
                    sql_type: if sql_type.trim().is_empty() {
                        "INTEGER".into()
                    } else {
                        sql_type
                    },
                },
            ))),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
        .collect::<rusqlite::Result<Vec<_>>>()?;

    if keyed.is_empty() {
        return Ok(vec![PrimaryKeyColumn {
            name: "rowid".into(),
            sql_type: "INTEGER".into(),
        }]);
    }
    keyed.sort_by_key(|(pk, _)| *pk);
    Ok(keyed.into_iter().map(|(_, col)| col).collect())
}

/// `CREATE TABLE` statement for a fresh shadow table with one embedding column.
pub fn create_shadow_table_sql(shadow: &str, pks: &[PrimaryKeyColumn], column: &str) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(pks.len() + 2);
    if let [only] = pks {
        lines.push(format!(
            "   {} {} PRIMARY KEY",
            quote_ident(&only.name),
            only.sql_type
        ));
    } else {
        for pk in pks {
            lines.push(format!("   {} {}", quote_ident(&pk.name), pk.sql_type));
        }
    }
    lines.push(format!("   {} BLOB", quote_ident(column)));
    if pks.len() > 1 {
        let names: Vec<String> = pks.iter().map(|pk| quote_ident(&pk.name)).collect();
        lines.push(format!("   PRIMARY KEY ({})", names.join(", ")));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
        quote_ident(shadow),
        lines.join(",\n")
    )
}

/// Make sure `source_table`'s shadow table exists and has `model`'s column.
///
/// Idempotent and safe to race: `CREATE TABLE IF NOT EXISTS` covers concurrent
/// creation and a "duplicate column" failure from a concurrent `ADD COLUMN` is
/// treated as success.
pub fn ensure_column(conn: &Connection, source_table: &str, model: EmbeddingModel) -> Result<()> {
    let shadow = shadow_table_name(source_table);
    let column = model.column_name();
    let schema_err = |source: rusqlite::Error| Error::Schema {
        table: shadow.clone(),
        source,
    };

    if !table_exists(conn, &shadow).map_err(schema_err)? {
        let pks = primary_keys(conn, source_table)?;
        conn.execute_batch(&create_shadow_table_sql(&shadow, &pks, &column))
            .map_err(schema_err)?;
        tracing::info!(table = %shadow, column = %column, "created shadow table");
    }

    let existing = table_columns(conn, &shadow).map_err(schema_err)?;
    if existing.iter().any(|c| c == &column) {
        return Ok(());
    }

    let alter = format!(
        "ALTER TABLE {} ADD COLUMN {} BLOB",
        quote_ident(&shadow),
        quote_ident(&column)
    );
    match conn.execute_batch(&alter) {
        Ok(()) => {
            tracing::info!(table = %shadow, column = %column, "added embedding column");
            Ok(())
        }
        Err(e) if is_duplicate_column(&e) => Ok(()),
        Err(e) => Err(schema_err(e)),
    }
}

fn is_duplicate_column(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("duplicate column name"))
}

/// Embedding columns present in the shadow table, keyed by column name.
///
/// Empty when there is no shadow table. Columns for models outside the
/// allow-list are skipped. `BTreeMap` keeps iteration order lexicographic.
pub fn list_embedding_columns(
    conn: &Connection,
    source_table: &str,
) -> Result<BTreeMap<String, EmbeddingModel>> {
    let shadow = shadow_table_name(source_table);
    if !table_exists(conn, &shadow)? {
        return Ok(BTreeMap::new());
    }
    Ok(table_columns(conn, &shadow)?
        .into_iter()
        .filter_map(|c| EmbeddingModel::from_column(&c).map(|m| (c, m)))
        .collect())
}

/// Insert or update the shadow row for `pk_values`, writing only `model`'s column.
///
/// `pk_values` must follow the order of [`primary_keys`].
pub fn upsert(
    conn: &Connection,
    source_table: &str,
    pks: &[PrimaryKeyColumn],
    pk_values: &[Value],
    model: EmbeddingModel,
    encoded: &[u8],
) -> Result<()> {
    if pks.len() != pk_values.len() {
        return Err(Error::Configuration(format!(
            "expected {} primary key values for {source_table}, got {}",
            pks.len(),
            pk_values.len()
        )));
    }
    let shadow = quote_ident(&shadow_table_name(source_table));
    let column = quote_ident(&model.column_name());
    let pk_names: Vec<String> = pks.iter().map(|pk| quote_ident(&pk.name)).collect();
    let placeholders: Vec<String> = (1..=pks.len() + 1).map(|i| format!("?{i}")).collect();

    let sql = format!(
        "INSERT INTO {shadow} ({pk_list}, {column}) VALUES ({placeholders}) \
         ON CONFLICT ({pk_list}) DO UPDATE SET {column} = excluded.{column}",
        pk_list = pk_names.join(", "),
        placeholders = placeholders.join(", "),
    );

    let mut values: Vec<Value> = pk_values.to_vec();
    values.push(Value::Blob(encoded.to_vec()));
    conn.execute(&sql, params_from_iter(values))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    fn items_db() -> Connection {
        let conn = open_memory_database().unwrap();
        conn.execute_batch(
            "CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT, description TEXT);",
        )
        .unwrap();
        conn
    }

    fn shadow_sql(conn: &Connection, table: &str) -> String {
        conn.query_row(
            "SELECT sql FROM sqlite_master WHERE name = ?1",
            [table],
            |r| r.get(0),
        )
        .unwrap()
    }

    #[test]
    fn creates_shadow_table_with_pk_and_embedding_column() {
        let conn = items_db();
        ensure_column(&conn, "items", EmbeddingModel::Large256).unwrap();
        assert_eq!(
            shadow_sql(&conn, "_embeddings_items"),
            "CREATE TABLE \"_embeddings_items\" (\n   \"id\" INTEGER PRIMARY KEY,\n   \"emb_text_embedding_3_large_256\" BLOB\n)"
        );
    }

    #[test]
    fn ensure_column_is_idempotent() {
        let conn = items_db();
        ensure_column(&conn, "items", EmbeddingModel::Large256).unwrap();
        ensure_column(&conn, "items", EmbeddingModel::Large256).unwrap();
        assert_eq!(
            table_columns(&conn, "_embeddings_items").unwrap(),
            vec!["id", "emb_text_embedding_3_large_256"]
        );
    }

    #[test]
    fn second_model_adds_a_column() {
        let conn = items_db();
        ensure_column(&conn, "items", EmbeddingModel::Large256).unwrap();
        ensure_column(&conn, "items", EmbeddingModel::Small).unwrap();
        assert_eq!(
            table_columns(&conn, "_embeddings_items").unwrap(),
            vec!["id", "emb_text_embedding_3_large_256", "emb_text_embedding_3_small"]
        );
    }

    #[test]
    fn compound_keys_keep_declaration_order() {
        let conn = open_memory_database().unwrap();
        conn.execute_batch(
            "CREATE TABLE items (id INTEGER, category TEXT, name TEXT, PRIMARY KEY (category, id));",
        )
        .unwrap();
        let pks = primary_keys(&conn, "items").unwrap();
        let names: Vec<&str> = pks.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["category", "id"]);

        ensure_column(&conn, "items", EmbeddingModel::Small512).unwrap();
        assert_eq!(
            shadow_sql(&conn, "_embeddings_items"),
            "CREATE TABLE \"_embeddings_items\" (\n   \"category\" TEXT,\n   \"id\" INTEGER,\n   \"emb_text_embedding_3_small_512\" BLOB,\n   PRIMARY KEY (\"category\", \"id\")\n)"
        );
    }

    #[test]
    fn untyped_key_defaults_to_integer_and_keyless_uses_rowid() {
        let conn = open_memory_database().unwrap();
        conn.execute_batch("CREATE TABLE a (k PRIMARY KEY, v); CREATE TABLE b (v TEXT);")
            .unwrap();
        assert_eq!(
            primary_keys(&conn, "a").unwrap(),
            vec![PrimaryKeyColumn { name: "k".into(), sql_type: "INTEGER".into() }]
        );
        assert_eq!(
            primary_keys(&conn, "b").unwrap(),
            vec![PrimaryKeyColumn { name: "rowid".into(), sql_type: "INTEGER".into() }]
        );
    }

    #[test]
    fn primary_keys_of_missing_table_is_an_error() {
        let conn = open_memory_database().unwrap();
        assert!(matches!(
            primary_keys(&conn, "nope"),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn list_embedding_columns_ignores_unknown_models() {
        let conn = items_db();
        assert!(list_embedding_columns(&conn, "items").unwrap().is_empty());

        ensure_column(&conn, "items", EmbeddingModel::Small).unwrap();
        conn.execute_batch(
            "ALTER TABLE _embeddings_items ADD COLUMN emb_text_embedding_ada_002 BLOB;
             ALTER TABLE _embeddings_items ADD COLUMN notes TEXT;",
        )
        .unwrap();
        ensure_column(&conn, "items", EmbeddingModel::Large256).unwrap();

        let columns = list_embedding_columns(&conn, "items").unwrap();
        let listed: Vec<(&str, EmbeddingModel)> =
            columns.iter().map(|(c, m)| (c.as_str(), *m)).collect();
        assert_eq!(
            listed,
            vec![
                ("emb_text_embedding_3_large_256", EmbeddingModel::Large256),
                ("emb_text_embedding_3_small", EmbeddingModel::Small),
            ]
        );
    }

    #[test]
    fn upsert_is_column_scoped() {
        let conn = items_db();
        ensure_column(&conn, "items", EmbeddingModel::Large256).unwrap();
        ensure_column(&conn, "items", EmbeddingModel::Small).unwrap();
        let pks = primary_keys(&conn, "items").unwrap();
        let key = [Value::Integer(1)];

        upsert(&conn, "items", &pks, &key, EmbeddingModel::Large256, b"aaaa").unwrap();
        upsert(&conn, "items", &pks, &key, EmbeddingModel::Small, b"bbbb").unwrap();
        upsert(&conn, "items", &pks, &key, EmbeddingModel::Large256, b"cccc").unwrap();

        let (large, small): (Vec<u8>, Vec<u8>) = conn
            .query_row(
                "SELECT emb_text_embedding_3_large_256, emb_text_embedding_3_small \
                 FROM _embeddings_items WHERE id = 1",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(large, b"cccc");
        assert_eq!(small, b"bbbb");

        let count: i64 = conn
            .query_row("SELECT count(*) FROM _embeddings_items", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn upsert_rejects_wrong_key_arity() {
        let conn = items_db();
        ensure_column(&conn, "items", EmbeddingModel::Large256).unwrap();
        let pks = primary_keys(&conn, "items").unwrap();
        let err = upsert(
            &conn,
            "items",
            &pks,
            &[Value::Integer(1), Value::Integer(2)],
            EmbeddingModel::Large256,
            b"aaaa",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn duplicate_column_error_is_recognised() {
        let conn = items_db();
        ensure_column(&conn, "items", EmbeddingModel::Small).unwrap();
        let err = conn
            .execute_batch("ALTER TABLE \"_embeddings_items\" ADD COLUMN \"id\" BLOB")
            .unwrap_err();
        assert!(is_duplicate_column(&err), "unexpected error: {err}");

        let other = conn.execute_batch("ALTER TABLE missing ADD COLUMN x BLOB").unwrap_err();
        assert!(!is_duplicate_column(&other));
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_ident("items"), "\"items\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
