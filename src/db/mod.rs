pub mod functions;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

pub use functions::register_functions;

/// Open an existing SQLite database with the similarity functions registered.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    anyhow::ensure!(
        path.exists(),
        "database not found at {}",
        path.display()
    );

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    // Enable WAL mode so readers are not blocked while a batch writes vectors
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.busy_timeout(Duration::from_millis(5000))?;

    register_functions(&conn).context("failed to register SQL functions")?;

    tracing::info!(path = %path.display(), "database opened");
    Ok(conn)
}

/// Open an in-memory database with the similarity functions registered.
pub fn open_memory_database() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    register_functions(&conn).context("failed to register SQL functions")?;
    Ok(conn)
}

/// Run `f` with the connection locked. The guard never outlives the call, so
/// async callers can hold a `&Mutex<Connection>` across `.await` points.
pub fn with_conn<T>(
    db: &Mutex<Connection>,
    f: impl FnOnce(&Connection) -> crate::Result<T>,
) -> crate::Result<T> {
    let conn = db.lock().map_err(|_| crate::Error::LockPoisoned)?;
    f(&conn)
}

/// Names of ordinary tables, excluding SQLite internals and shadow tables.
pub fn source_tables(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' \
         AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '\\_embeddings\\_%' ESCAPE '\\' \
         ORDER BY name",
    )?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_tables_skips_shadow_tables() {
        let conn = open_memory_database().unwrap();
        conn.execute_batch(
            "CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT);
             CREATE TABLE _embeddings_items (id INTEGER PRIMARY KEY, emb_x BLOB);
             CREATE TABLE notes (id INTEGER PRIMARY KEY);",
        )
        .unwrap();
        assert_eq!(source_tables(&conn).unwrap(), vec!["items", "notes"]);
    }
}
