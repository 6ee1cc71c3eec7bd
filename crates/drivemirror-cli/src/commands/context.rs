//! Shared command plumbing
//!
//! Every command receives a [`CommandContext`] holding the global flags. It
//! loads the configuration, resolves the access token and wires the Drive
//! adapter into a [`SyncSession`].

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use drivemirror_core::config::Config;
use drivemirror_drive::auth::load_access_token;
use drivemirror_drive::client::DriveClient;
use drivemirror_drive::rate_limit::{AdaptiveRateLimiter, RateLimitConfig, RetryPolicy};
use drivemirror_drive::DriveDirectory;
use drivemirror_sync::SyncSession;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Global options shared by all commands
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub format: OutputFormat,
    pub quiet: bool,
    pub config_path: PathBuf,
    pub cancel: CancellationToken,
}

impl CommandContext {
    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format, self.quiet)
    }

    /// Loads and validates the configuration; a missing file means defaults
    pub fn load_config(&self) -> Result<Config> {
        let config = if self.config_path.exists() {
            Config::load(&self.config_path).with_context(|| {
                format!("Failed to load configuration from {}", self.config_path.display())
            })?
        } else {
            debug!(path = %self.config_path.display(), "No configuration file, using defaults");
            Config::default()
        };

        let errors = config.validate();
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            bail!(
                "Invalid configuration in {}: {}",
                self.config_path.display(),
                messages.join("; ")
            );
        }
        Ok(config)
    }

    /// Builds an authenticated session against the configured Drive endpoint
    pub fn connect(&self, config: &Config) -> Result<Arc<SyncSession>> {
        let token = load_access_token(&config.auth).context("Failed to obtain an access token")?;

        let limiter = Arc::new(AdaptiveRateLimiter::new(RateLimitConfig::from(
            &config.rate_limiting,
        )));
        let client = DriveClient::with_base_url(token, config.drive.base_url.clone())
            .with_rate_limiter(limiter)
            .with_retry_policy(RetryPolicy::from(&config.rate_limiting))
            .with_cancellation(self.cancel.clone());
        let directory = DriveDirectory::from_config(client, &config.drive);

        info!(base_url = %config.drive.base_url, "Connected to Drive");
        Ok(Arc::new(
            SyncSession::new(Arc::new(directory)).with_cancellation(self.cancel.clone()),
        ))
    }
}
