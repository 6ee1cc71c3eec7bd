//! Tree command - Render a folder's subtree

use anyhow::{Context, Result};
use clap::Args;

use drivemirror_core::domain::RemoteId;
use drivemirror_sync::TreePrinter;

use super::context::CommandContext;

#[derive(Debug, Args)]
pub struct TreeCommand {
    /// Folder id (`root` for My Drive)
    pub folder: RemoteId,
}

impl TreeCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;
        let session = ctx.connect(&config)?;

        let rendered = TreePrinter::new(&session)
            .render(&self.folder)
            .await
            .with_context(|| format!("Failed to walk {}", self.folder))?;

        if ctx.format.is_json() {
            let lines: Vec<&str> = rendered.lines().collect();
            formatter.print_json(&serde_json::json!({
                "folder": self.folder,
                "lines": lines,
            }));
        } else {
            for line in rendered.lines() {
                formatter.line(line);
            }
        }
        Ok(())
    }
}
