mod helpers;

use std::sync::{Arc, Barrier};
use std::thread;

use sqlembed::db::{self, schema};
use sqlembed::embedding::EmbeddingModel;
use sqlembed::semantic::status::table_status;
use sqlembed::vector;

#[test]
fn open_database_registers_functions_on_file_db() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("content.db");
    rusqlite::Connection::open(&path)
        .unwrap()
        .execute_batch("CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT);")
        .unwrap();

    let conn = db::open_database(&path).unwrap();
    let mode: String = conn
        .query_row("PRAGMA journal_mode", [], |r| r.get(0))
        .unwrap();
    assert_eq!(mode, "wal");

    let a = vector::encode(&[1.0, 0.0]);
    let b = vector::encode(&[1.0, 0.0]);
    let sim: f64 = conn
        .query_row("SELECT embeddings_cosine(?1, ?2)", [a, b], |r| r.get(0))
        .unwrap();
    assert!((sim - 1.0).abs() < 1e-12);

    let hex = vector::to_hex(&vector::encode(&[0.5]));
    let back: Vec<u8> = conn
        .query_row("SELECT unhex(?1)", [hex], |r| r.get(0))
        .unwrap();
    assert_eq!(back, vector::encode(&[0.5]));
}

#[test]
fn missing_database_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(db::open_database(dir.path().join("nope.db")).is_err());
}

#[test]
fn shadow_tables_persist_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("content.db");
    rusqlite::Connection::open(&path)
        .unwrap()
        .execute_batch(
            "CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT);
             INSERT INTO items VALUES (1, 'One');",
        )
        .unwrap();

    {
        let conn = db::open_database(&path).unwrap();
        schema::ensure_column(&conn, "items", EmbeddingModel::Large1024).unwrap();
    }

    let conn = db::open_database(&path).unwrap();
    let status = table_status(&conn).unwrap();
    assert_eq!(status.len(), 1);
    assert_eq!(status[0].columns[0].column, "emb_text_embedding_3_large_1024");
    assert_eq!(status[0].columns[0].embedded_rows, 0);
}

#[test]
fn cosine_sql_handles_nulls_and_mismatches() {
    let conn = helpers::items_db();
    let null: Option<f64> = conn
        .query_row("SELECT embeddings_cosine(NULL, x'0000803f')", [], |r| r.get(0))
        .unwrap();
    assert!(null.is_none());

    let mismatch: Option<f64> = conn
        .query_row(
            "SELECT embeddings_cosine(?1, ?2)",
            [vector::encode(&[1.0, 0.0]), vector::encode(&[1.0])],
            |r| r.get(0),
        )
        .unwrap();
    assert!(mismatch.is_none());

    let ragged = conn.query_row("SELECT embeddings_cosine(x'000000', x'000000')", [], |r| {
        r.get::<_, Option<f64>>(0)
    });
    assert!(ragged.is_err());
}

#[test]
fn concurrent_first_time_ensure_column_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("content.db");
    rusqlite::Connection::open(&path)
        .unwrap()
        .execute_batch("CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT);")
        .unwrap();

    // Two workers per model, so both the create and the add-column paths race.
    let workers = EmbeddingModel::ALL.len() * 2;
    let connections: Vec<_> = (0..workers)
        .map(|_| db::open_database(&path).unwrap())
        .collect();
    let barrier = Arc::new(Barrier::new(workers));

    let handles: Vec<_> = connections
        .into_iter()
        .enumerate()
        .map(|(i, conn)| {
            let barrier = Arc::clone(&barrier);
            let model = EmbeddingModel::ALL[i % EmbeddingModel::ALL.len()];
            thread::spawn(move || {
                barrier.wait();
                schema::ensure_column(&conn, "items", model)
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let conn = db::open_database(&path).unwrap();
    let mut columns = schema::table_columns(&conn, "_embeddings_items").unwrap();
    columns.sort();
    let mut expected: Vec<String> = EmbeddingModel::ALL.iter().map(|m| m.column_name()).collect();
    expected.push("id".into());
    expected.sort();
    assert_eq!(columns, expected);
}
