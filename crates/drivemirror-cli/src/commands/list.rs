//! List command - Print the contents of a folder
//!
//! Output is one `id<TAB>name` line per file, preceded by a header whose
//! `id` column is padded to the widest id. Folders are included only with
//! `--folders`, and are listed before files.

use anyhow::{Context, Result};
use clap::Args;

use drivemirror_core::domain::{Item, RemoteId};
use drivemirror_sync::ListingClassifier;

use super::context::CommandContext;

#[derive(Debug, Args)]
pub struct ListCommand {
    /// Folder id (`root` for My Drive)
    pub folder: RemoteId,

    /// Only items whose name contains this text
    #[arg(short = 'f', long)]
    pub name_filter: Option<String>,

    /// Omit the column header
    #[arg(long)]
    pub no_header: bool,

    /// Include subfolders in the output
    #[arg(long)]
    pub folders: bool,
}

impl ListCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;
        let session = ctx.connect(&config)?;

        let folder = session.resolve(&self.folder).await?;
        let listing = ListingClassifier::new(&session)
            .list_all(&folder, self.name_filter.as_deref())
            .await
            .with_context(|| format!("Failed to list {}", self.folder))?;

        let mut items: Vec<&Item> = Vec::new();
        if self.folders {
            items.extend(listing.folders.iter());
        }
        items.extend(listing.files.iter());

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!(items));
        } else {
            for line in render_rows(&items, !self.no_header) {
                formatter.line(&line);
            }
        }
        Ok(())
    }
}

/// Formats listing rows, optionally with a header line
pub fn render_rows(items: &[&Item], header: bool) -> Vec<String> {
    let mut lines = Vec::with_capacity(items.len() + 1);
    if header {
        let width = items
            .iter()
            .map(|i| i.id.as_str().len())
            .max()
            .unwrap_or(0)
            .max("id".len());
        lines.push(format!("{:<width$}\tname", "id", width = width));
    }
    lines.extend(items.iter().map(|i| format!("{}\t{}", i.id, i.name)));
    lines
}
