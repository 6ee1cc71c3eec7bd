//! Copy command - Copy a single file into a folder

use anyhow::{Context, Result};
use clap::Args;

use drivemirror_core::domain::RemoteId;
use drivemirror_sync::SyncEngine;

use super::context::CommandContext;

#[derive(Debug, Args)]
pub struct CopyCommand {
    /// Id of the file to copy
    pub file: RemoteId,

    /// Destination folder id (`root` for My Drive)
    pub target: RemoteId,
}

impl CopyCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;
        let engine = SyncEngine::new(ctx.connect(&config)?);

        let id = engine
            .copy_file(&self.file, &self.target)
            .await
            .with_context(|| format!("Failed to copy {} into {}", self.file, self.target))?;

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "file": self.file,
                "target": self.target,
                "id": id,
            }));
        } else {
            formatter.success(&format!("Copied {} into {}", self.file, self.target));
            formatter.info(&format!("New file id: {}", id));
        }
        Ok(())
    }
}
