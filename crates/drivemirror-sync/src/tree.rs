//! Subtree rendering for inspection
//!
//! ```text
//! .
//! ├── Photos
//! │   ├── 2024
//! │   ├── beach.jpg
//! ├── notes.txt
//! ```
//!
//! Folders come before files at every level, each in name order, and each
//! folder's contents are printed right below it.

use std::fmt::Write as _;
use std::future::Future;
use std::pin::Pin;

use drivemirror_core::domain::{RemoteError, RemoteId};

use crate::classifier::ListingClassifier;
use crate::session::SyncSession;

const INDENT: &str = "│   ";
const BRANCH: &str = "├── ";

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Depth-first textual renderer of a remote subtree
#[derive(Debug, Clone, Copy)]
pub struct TreePrinter<'a> {
    session: &'a SyncSession,
}

impl<'a> TreePrinter<'a> {
    pub fn new(session: &'a SyncSession) -> Self {
        Self { session }
    }

    /// Renders the subtree under `folder`, one line per item
    pub async fn render(&self, folder: &RemoteId) -> Result<String, RemoteError> {
        let folder = self.session.resolve(folder).await?;
        let mut out = String::from(".\n");
        self.render_level(&folder, 0, &mut out).await?;
        Ok(out)
    }

    fn render_level<'b>(
        &'b self,
        folder: &'b RemoteId,
        level: usize,
        out: &'b mut String,
    ) -> BoxFuture<'b, Result<(), RemoteError>> {
        Box::pin(async move {
            let listing = ListingClassifier::new(self.session)
                .list_all(folder, None)
                .await?;

            for child in &listing.folders {
                push_line(out, level, &child.name);
                self.render_level(&child.id, level + 1, out).await?;
            }
            for file in &listing.files {
                push_line(out, level, &file.name);
            }
            Ok(())
        })
    }
}

fn push_line(out: &mut String, level: usize, name: &str) {
    let _ = writeln!(out, "{}{}{}", INDENT.repeat(level), BRANCH, name);
}
