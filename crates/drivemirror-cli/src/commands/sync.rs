//! Sync command - Mirror one Drive folder onto another
//!
//! Provides the `drivemirror sync` CLI command which:
//! 1. Loads configuration and the access token
//! 2. Builds the Drive adapter and a sync session
//! 3. Runs the SyncEngine and displays the report

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use drivemirror_core::domain::RemoteId;
use drivemirror_sync::{SyncEngine, SyncOptions};

use super::context::CommandContext;
use crate::output::{format_duration_ms, plural};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Source folder id (`root` for My Drive)
    pub source: RemoteId,

    /// Target folder id (`root` for My Drive)
    pub target: RemoteId,

    /// Only reconcile files directly inside the source folder
    #[arg(long = "non-recursive", alias = "no-recursive")]
    pub non_recursive: bool,

    /// Show what would be created or copied without changing anything
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncCommand {
    /// Resolves the effective options: flags can only narrow the configured behavior
    pub fn options(&self, configured: SyncOptions) -> SyncOptions {
        SyncOptions {
            recursive: configured.recursive && !self.non_recursive,
            dry_run: configured.dry_run || self.dry_run,
            detect_cycles: configured.detect_cycles,
        }
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;
        let session = ctx.connect(&config)?;

        let options = self.options(SyncOptions::from(&config.sync));
        let engine = SyncEngine::from_config(session, &config.sync).with_options(options);

        if options.dry_run {
            formatter.info("Dry run mode - no changes will be made");
        }
        info!(source = %self.source, target = %self.target, "Running sync");

        let report = engine
            .run(&self.source, &self.target)
            .await
            .with_context(|| format!("Sync {} -> {} failed", self.source, self.target))?;

        if ctx.format.is_json() {
            let json = serde_json::to_value(&report).context("Failed to serialize sync report")?;
            formatter.print_json(&json);
            return Ok(());
        }

        let verb = if report.dry_run { "Would copy" } else { "Copied" };
        if report.copied_files.is_empty() && report.folders_created == 0 {
            formatter.success("Already up to date");
        } else {
            formatter.success(&format!(
                "Sync completed in {}",
                format_duration_ms(report.duration_ms)
            ));
        }
        formatter.info(&format!("{}: {}", verb, plural(report.copied_files.len(), "file")));
        formatter.info(&format!(
            "{}: {}",
            if report.dry_run { "Would create" } else { "Created" },
            plural(report.folders_created as usize, "folder")
        ));
        formatter.info(&format!(
            "Skipped: {} (already present)",
            plural(report.files_skipped as usize, "file")
        ));
        for name in &report.copied_files {
            formatter.info(&format!("  + {}", name));
        }

        Ok(())
    }
}
