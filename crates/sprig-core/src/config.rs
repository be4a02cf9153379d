//! Backend configuration for Sprig clients.
//!
//! Provides a `BackendConfig` struct used by the CLI and app shells to reach
//! the Supabase-style REST backend (auth + per-collection tables).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable holding the backend base URL.
pub const ENV_BACKEND_URL: &str = "SPRIG_BACKEND_URL";
/// Environment variable holding the backend anon (publishable) key.
pub const ENV_ANON_KEY: &str = "SPRIG_ANON_KEY";

/// Build- or environment-provisioned client configuration.
///
/// These values are safe-to-ship public endpoints/keys required to bootstrap
/// auth and sync flows. Secret credentials must never be stored here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendConfig {
    /// Base URL of the backend, e.g. `https://project.supabase.co`
    pub base_url: String,
    /// Public anon key sent as the `apikey` header
    pub anon_key: String,
}

/// Trim an optional value, treating blank text as absent.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn has_http_scheme(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

impl BackendConfig {
    /// Create a validated configuration.
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Result<Self> {
        let base_url = non_blank(Some(base_url.into()))
            .ok_or_else(|| Error::InvalidInput("backend base URL must not be empty".into()))?;
        if !has_http_scheme(&base_url) {
            return Err(Error::InvalidInput(
                "backend base URL must include http:// or https://".into(),
            ));
        }
        let anon_key = non_blank(Some(anon_key.into()))
            .ok_or_else(|| Error::InvalidInput("backend anon key must not be empty".into()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
        })
    }

    /// Load configuration from `SPRIG_BACKEND_URL` / `SPRIG_ANON_KEY`.
    ///
    /// Returns `Ok(None)` when neither variable is set (local-only mode).
    pub fn from_env() -> Result<Option<Self>> {
        let base_url = non_blank(std::env::var(ENV_BACKEND_URL).ok());
        let anon_key = non_blank(std::env::var(ENV_ANON_KEY).ok());

        match (base_url, anon_key) {
            (Some(base_url), Some(anon_key)) => Self::new(base_url, anon_key).map(Some),
            (None, None) => Ok(None),
            (Some(_), None) => Err(Error::InvalidInput(format!(
                "{ENV_ANON_KEY} must be set when {ENV_BACKEND_URL} is"
            ))),
            (None, Some(_)) => Err(Error::InvalidInput(format!(
                "{ENV_BACKEND_URL} must be set when {ENV_ANON_KEY} is"
            ))),
        }
    }

    /// REST endpoint for a collection table.
    pub fn rest_url(&self, collection: &str) -> String {
        format!("{}/rest/v1/{collection}", self.base_url)
    }

    /// Auth endpoint base (GoTrue-style).
    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.base_url)
    }
}
