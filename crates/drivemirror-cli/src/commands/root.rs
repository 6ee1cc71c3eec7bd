//! Root command - Print the id of My Drive's root folder

use anyhow::{Context, Result};
use clap::Args;

use super::context::CommandContext;

#[derive(Debug, Args)]
pub struct RootCommand {}

impl RootCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;
        let session = ctx.connect(&config)?;

        let id = session.root_id().await.context("Failed to resolve root folder")?;

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({ "root_id": id }));
        } else {
            formatter.line(id.as_str());
        }
        Ok(())
    }
}
