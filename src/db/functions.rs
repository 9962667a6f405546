//! Application-defined SQL functions for similarity ranking.
//!
//! - `embeddings_cosine(a BLOB, b BLOB) -> REAL`: cosine similarity of two encoded
//!   vectors. NULL when either argument is NULL, either vector has zero norm, or
//!   the dimensions differ. A blob whose length is not a multiple of 4 is an error.
//! - `unhex(text) -> BLOB`: registered only when SQLite lacks a native `unhex`.
//!   NULL on malformed hex.

use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::{Type, ValueRef};
use rusqlite::Connection;

use crate::vector;

pub const COSINE_FUNCTION: &str = "embeddings_cosine";
pub const UNHEX_FUNCTION: &str = "unhex";

/// Register all functions the search query needs on this connection.
pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    register_cosine(conn)?;
    if !has_native_unhex(conn) {
        tracing::debug!("SQLite has no native unhex(), registering fallback");
        register_unhex(conn)?;
    }
    Ok(())
}

pub fn register_cosine(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        COSINE_FUNCTION,
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let (Some(a), Some(b)) = (blob_arg(ctx, 0)?, blob_arg(ctx, 1)?) else {
                return Ok(None);
            };
            vector::cosine_similarity(a, b)
                .map_err(|e| rusqlite::Error::UserFunctionError(Box::new(e)))
        },
    )
}

/// Hex decoder used when the engine has none. Never raises on bad input.
pub fn register_unhex(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        UNHEX_FUNCTION,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let decoded = match ctx.get_raw(0) {
                ValueRef::Text(text) => std::str::from_utf8(text).ok().and_then(vector::from_hex),
                _ => None,
            };
            Ok(decoded)
        },
    )
}

fn has_native_unhex(conn: &Connection) -> bool {
    conn.query_row("SELECT unhex('00')", [], |row| row.get::<_, Option<Vec<u8>>>(0))
        .is_ok()
}

fn blob_arg<'a>(ctx: &'a Context<'_>, idx: usize) -> rusqlite::Result<Option<&'a [u8]>> {
    match ctx.get_raw(idx) {
        ValueRef::Blob(bytes) => Ok(Some(bytes)),
        ValueRef::Null => Ok(None),
        ValueRef::Integer(_) => Err(rusqlite::Error::InvalidFunctionParameterType(idx, Type::Integer)),
        ValueRef::Real(_) => Err(rusqlite::Error::InvalidFunctionParameterType(idx, Type::Real)),
        ValueRef::Text(_) => Err(rusqlite::Error::InvalidFunctionParameterType(idx, Type::Text)),
    }
}
