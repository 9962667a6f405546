//! API key resolution.
//!
//! A key comes either from trusted process configuration or from a
//! [`CredentialStash`]: a secret submitted once is swapped for a random
//! reference token, and only the token travels through client-editable
//! payloads. The stash is an explicit object passed by reference, never global.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};

const API_KEY_PREFIX: &str = "sk-";

/// Process-lifetime map from reference token to raw secret.
#[derive(Default)]
pub struct CredentialStash {
    keys: Mutex<HashMap<String, String>>,
}

impl std::fmt::Debug for CredentialStash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.keys.lock().map(|k| k.len()).unwrap_or(0);
        f.debug_struct("CredentialStash")
            .field("entries", &len)
            .finish()
    }
}

impl CredentialStash {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a secret and return the reference token that stands in for it.
    pub fn stash(&self, secret: &str) -> Result<String> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(Error::Configuration("API key is required.".into()));
        }
        if !secret.starts_with(API_KEY_PREFIX) {
            return Err(Error::Configuration(format!(
                "API key must start with {API_KEY_PREFIX}"
            )));
        }
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.keys
            .lock()
            .map_err(|_| Error::LockPoisoned)?
            .insert(token.clone(), secret.to_string());
        tracing::debug!("API key stashed");
        Ok(token)
    }

    /// Look up a secret by reference token.
    pub fn resolve(&self, reference: &str) -> Result<String> {
        self.keys
            .lock()
            .map_err(|_| Error::LockPoisoned)?
            .get(reference)
            .cloned()
            .ok_or_else(|| Error::Credential(format!("No API key found in stash for {reference}")))
    }
}

/// Resolves the API key for one enrichment or search.
#[derive(Clone)]
pub struct CredentialResolver {
    trusted: Option<String>,
    stash: Arc<CredentialStash>,
}

impl std::fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("trusted", &self.trusted.as_ref().map(|_| "<redacted>"))
            .field("stash", &self.stash)
            .finish()
    }
}

impl CredentialResolver {
    /// `trusted` is the key from server-side configuration; blank counts as absent.
    pub fn new(trusted: Option<String>, stash: Arc<CredentialStash>) -> Self {
        let trusted = trusted.filter(|k| !k.trim().is_empty());
        Self { trusted, stash }
    }

    pub fn has_trusted_key(&self) -> bool {
        self.trusted.is_some()
    }

    pub fn stash(&self) -> &CredentialStash {
        &self.stash
    }

    /// Trusted key first, then the stash entry named by `reference`.
    pub fn resolve(&self, reference: Option<&str>) -> Result<String> {
        if let Some(key) = &self.trusted {
            return Ok(key.clone());
        }
        match reference.filter(|r| !r.is_empty()) {
            Some(reference) => self.stash.resolve(reference),
            None => Err(Error::Credential(
                "No API key reference found in config".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(trusted: Option<&str>) -> CredentialResolver {
        CredentialResolver::new(trusted.map(String::from), Arc::new(CredentialStash::new()))
    }

    #[test]
    fn trusted_key_wins() {
        let r = resolver(Some("sk-trusted"));
        assert_eq!(r.resolve(None).unwrap(), "sk-trusted");
        assert_eq!(r.resolve(Some("whatever")).unwrap(), "sk-trusted");
    }

    #[test]
    fn stashed_key_resolves_by_token() {
        let r = resolver(None);
        let token = r.stash().stash("sk-secret").unwrap();
        assert_ne!(token, "sk-secret");
        assert_eq!(r.resolve(Some(&token)).unwrap(), "sk-secret");
    }

    #[test]
    fn missing_reference_is_a_credential_error() {
        let err = resolver(None).resolve(None).unwrap_err();
        assert!(matches!(err, Error::Credential(_)));
    }

    #[test]
    fn unknown_reference_is_a_credential_error() {
        let err = resolver(None).resolve(Some("nope")).unwrap_err();
        assert_eq!(err.to_string(), "No API key found in stash for nope");
    }

    #[test]
    fn blank_trusted_key_is_ignored() {
        let r = resolver(Some("  "));
        assert!(!r.has_trusted_key());
        assert!(r.resolve(None).is_err());
    }

    #[test]
    fn stash_validates_key_shape() {
        let stash = CredentialStash::new();
        assert_eq!(
            stash.stash("pk-live").unwrap_err().to_string(),
            "API key must start with sk-"
        );
        assert_eq!(stash.stash("").unwrap_err().to_string(), "API key is required.");
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let r = resolver(Some("sk-very-secret"));
        r.stash().stash("sk-also-secret").unwrap();
        let debug = format!("{r:?}");
        assert!(!debug.contains("very-secret"));
        assert!(!debug.contains("also-secret"));
    }
}
