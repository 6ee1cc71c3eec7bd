//! Config command - View and check DriveMirror configuration
//!
//! Provides the `drivemirror config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Validates the configuration file and reports errors

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use drivemirror_core::config::{Config, ValidationError};

use super::context::CommandContext;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(ctx),
            ConfigCommand::Validate => self.execute_validate(ctx),
        }
    }

    fn execute_show(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = Config::load_or_default(&ctx.config_path);

        info!(config_path = %ctx.config_path.display(), "Showing configuration");

        if ctx.format.is_json() {
            let json = serde_json::to_value(&config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
            formatter.info("");
            let yaml = serde_yaml::to_string(&config)
                .context("Failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }
        Ok(())
    }

    fn execute_validate(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let path = &ctx.config_path;

        if !path.exists() {
            if ctx.format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "valid": true,
                    "config_path": path.display().to_string(),
                    "errors": [],
                    "defaults": true,
                }));
            } else {
                formatter.warn(&format!("Configuration file not found at {}", path.display()));
                formatter.info("Using default configuration.");
            }
            return Ok(());
        }

        let config = Config::load(path)
            .with_context(|| format!("Failed to parse configuration {}", path.display()))?;
        let errors = config.validate();

        info!(config_path = %path.display(), errors = errors.len(), "Validated configuration");

        if ctx.format.is_json() {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": path.display().to_string(),
                "errors": messages,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            formatter.info(&format!("File: {}", path.display()));
        } else {
            formatter.error(&summary(&errors));
            formatter.info(&format!("File: {}", path.display()));
            formatter.info("");
            for error in &errors {
                formatter.info(&format!("  {} - {}", error.field, error.message));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(summary(&errors))
        }
    }
}

fn summary(errors: &[ValidationError]) -> String {
    format!(
        "Configuration has {} error{}",
        errors.len(),
        if errors.len() == 1 { "" } else { "s" }
    )
}
