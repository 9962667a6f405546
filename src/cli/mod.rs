pub mod enrich;
pub mod search;
pub mod status;

use std::sync::Arc;

use sqlembed::config::SqlembedConfig;
use sqlembed::credentials::{CredentialResolver, CredentialStash};

/// CLI runs only ever see the trusted key from config or `OPENAI_API_KEY`.
pub(crate) fn credentials(config: &SqlembedConfig) -> CredentialResolver {
    CredentialResolver::new(
        config.embedding.api_key.clone(),
        Arc::new(CredentialStash::new()),
    )
}
