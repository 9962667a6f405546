#![allow(dead_code)]

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;
use sqlembed::credentials::{CredentialResolver, CredentialStash};
use sqlembed::db;
use sqlembed::embedding::{Embedder, EmbeddingModel};
use sqlembed::{Error, Result};

pub const TEST_KEY: &str = "sk-test";

/// Words that get a dedicated dimension in [`FakeEmbedder`] vectors.
const VOCAB: &[&str] = &["one", "first", "item", "two", "second"];

/// Open an in-memory database holding a two-row `items` table.
pub fn items_db() -> Connection {
    let conn = db::open_memory_database().unwrap();
    conn.execute_batch(
        "CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT, description TEXT);
         INSERT INTO items VALUES (1, 'One', 'First item');
         INSERT INTO items VALUES (2, 'Two', 'Second item');",
    )
    .unwrap();
    conn
}

pub fn shared(conn: Connection) -> Mutex<Connection> {
    Mutex::new(conn)
}

/// Resolver with a trusted key, as the CLI would build from config.
pub fn trusted_credentials() -> CredentialResolver {
    CredentialResolver::new(Some(TEST_KEY.into()), Arc::new(CredentialStash::new()))
}

/// Resolver with no trusted key and an empty stash.
pub fn no_credentials() -> CredentialResolver {
    CredentialResolver::new(None, Arc::new(CredentialStash::new()))
}

/// Deterministic bag-of-words embedder. Known words land in their own bucket,
/// anything else is hashed into the tail of the vector.
#[derive(Default)]
pub struct FakeEmbedder {
    calls: AtomicUsize,
    /// Texts containing this substring fail with a remote error.
    fail_on: Option<String>,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(needle: &str) -> Self {
        Self {
            fail_on: Some(needle.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn bag_of_words(text: &str, dims: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; dims];
    for word in text.split_whitespace() {
        let word = word.to_lowercase();
        let slot = match VOCAB.iter().position(|w| *w == word) {
            Some(i) => i,
            None => {
                let mut hasher = DefaultHasher::new();
                word.hash(&mut hasher);
                VOCAB.len() + (hasher.finish() as usize) % (dims - VOCAB.len())
            }
        };
        v[slot] += 1.0;
    }
    v
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, api_key: &str, text: &str, model: EmbeddingModel) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(api_key, TEST_KEY, "embedder received an unexpected key");
        if let Some(needle) = &self.fail_on {
            if text.contains(needle.as_str()) {
                return Err(Error::RemoteService {
                    status: 500,
                    body: "upstream exploded".into(),
                });
            }
        }
        Ok(bag_of_words(text, model.output_dimensions()))
    }
}
