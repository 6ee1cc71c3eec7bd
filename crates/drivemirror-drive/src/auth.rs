//! Access token lookup
//!
//! DriveMirror does not run an interactive OAuth grant. It expects an access
//! token obtained elsewhere, supplied either through an environment variable
//! or through a small JSON credentials file:
//!
//! ```json
//! { "access_token": "ya29....", "expiry": "2026-01-01T12:00:00Z" }
//! ```
//!
//! `token` is accepted as an alias for `access_token`, matching the files
//! written by the Google client libraries.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use drivemirror_core::config::AuthConfig;

/// Stored credentials, as read from the credentials file
#[derive(Debug, Clone, Deserialize)]
pub struct StoredCredentials {
    #[serde(alias = "token")]
    pub access_token: String,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl StoredCredentials {
    /// Reads and parses a credentials file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials file {}", path.display()))?;
        let creds: StoredCredentials = serde_json::from_str(&content)
            .with_context(|| format!("Invalid credentials file {}", path.display()))?;
        if creds.access_token.trim().is_empty() {
            bail!("Credentials file {} has an empty token", path.display());
        }
        Ok(creds)
    }

    pub fn is_expired(&self) -> bool {
        self.expiry.map(|e| e <= Utc::now()).unwrap_or(false)
    }
}

/// Resolves the access token from the process environment or the credentials file
pub fn load_access_token(config: &AuthConfig) -> Result<String> {
    load_access_token_with(config, |name| std::env::var(name).ok())
}

/// Resolves the access token using `lookup` for environment access
///
/// The environment variable named by `access_token_env` wins when set and
/// non-empty; otherwise the credentials file is read.
pub fn load_access_token_with<F>(config: &AuthConfig, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = lookup(&config.access_token_env).filter(|t| !t.trim().is_empty()) {
        debug!(var = %config.access_token_env, "Using access token from environment");
        return Ok(token.trim().to_string());
    }

    if !config.credentials_file.exists() {
        bail!(
            "No access token: set {} or create {}",
            config.access_token_env,
            config.credentials_file.display()
        );
    }

    let creds = StoredCredentials::from_file(&config.credentials_file)?;
    if creds.is_expired() {
        warn!(
            file = %config.credentials_file.display(),
            "Stored access token has expired; requests will likely be rejected"
        );
    }
    debug!(file = %config.credentials_file.display(), "Using access token from credentials file");
    Ok(creds.access_token)
}
