//! Remote tree synchronization engine
//!
//! The [`SyncEngine`] mirrors a source folder onto a target folder inside the
//! same remote service. It creates missing folders and copies missing files,
//! skipping anything whose name already exists at the corresponding level.
//!
//! ## Sync Flow
//!
//! For each (source, target) pair, depth-first:
//!
//! 1. List all children of the source
//! 2. When recursive: for each source folder in name order, resolve (or
//!    create) the target folder of the same name, then sync that pair
//! 3. Take a fresh listing of the target
//! 4. Copy each source file whose name is not among the target files
//!
//! A level's own files are therefore reconciled only after all of its
//! subfolders are complete. The engine never retries: the first error aborts
//! the whole run, leaving whatever was already created or copied in place.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use drivemirror_core::config::{DuplicateFolderPolicy, SyncConfig};
use drivemirror_core::domain::{Listing, RemoteError, RemoteId};

use crate::classifier::ListingClassifier;
use crate::resolver::FolderResolver;
use crate::session::SyncSession;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ============================================================================
// Options, events and report
// ============================================================================

/// Per-run behavior switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Descend into subfolders
    pub recursive: bool,
    /// List only; report what would be created or copied
    pub dry_run: bool,
    /// Abort a branch that revisits one of its own folders
    pub detect_cycles: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            dry_run: false,
            detect_cycles: true,
        }
    }
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            recursive: config.recursive,
            dry_run: config.dry_run,
            detect_cycles: config.detect_cycles,
        }
    }
}

/// Progress notifications emitted while a sync runs
///
/// `id` fields are `None` in dry-run mode, where nothing is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    /// A (source, target) pair is about to be reconciled
    Syncing {
        source: RemoteId,
        target: Option<RemoteId>,
    },
    /// The target counterpart of a source folder is being resolved
    EnsureFolder { name: String, source: RemoteId },
    /// A missing target folder was created
    FolderCreated { name: String, id: Option<RemoteId> },
    /// A missing file was copied into the target
    FileCopied {
        name: String,
        source: RemoteId,
        id: Option<RemoteId>,
    },
    /// A source file was skipped because the target already has that name
    FileExists { name: String },
}

/// Summary of a completed sync
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Names of copied files, in processing order
    pub copied_files: Vec<String>,
    /// Number of target folders created
    pub folders_created: u32,
    /// Number of source files skipped because the name already existed
    pub files_skipped: u32,
    /// Whether this was a dry run
    pub dry_run: bool,
    /// Wall-clock duration of the sync in milliseconds
    pub duration_ms: u64,
}

/// Source and target of one level on the current branch
struct Frame {
    source: RemoteId,
    target: Option<RemoteId>,
}

// ============================================================================
// SyncEngine
// ============================================================================

/// One-way folder tree synchronizer
pub struct SyncEngine {
    session: Arc<SyncSession>,
    options: SyncOptions,
    duplicate_policy: DuplicateFolderPolicy,
    events: Option<mpsc::UnboundedSender<SyncEvent>>,
}

impl SyncEngine {
    pub fn new(session: Arc<SyncSession>) -> Self {
        Self {
            session,
            options: SyncOptions::default(),
            duplicate_policy: DuplicateFolderPolicy::default(),
            events: None,
        }
    }

    /// Creates an engine with options and duplicate policy taken from `config`
    pub fn from_config(session: Arc<SyncSession>, config: &SyncConfig) -> Self {
        Self::new(session)
            .with_options(SyncOptions::from(config))
            .with_duplicate_policy(config.duplicate_folders)
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicateFolderPolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Streams progress events to `sender` in addition to logging them
    pub fn with_events(mut self, sender: mpsc::UnboundedSender<SyncEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn options(&self) -> SyncOptions {
        self.options
    }

    pub fn session(&self) -> &Arc<SyncSession> {
        &self.session
    }

    /// Mirrors `source` onto `target` and returns the names of copied files
    ///
    /// `recursive` overrides the engine's configured option for this call.
    pub async fn sync(
        &self,
        source: &RemoteId,
        target: &RemoteId,
        recursive: bool,
    ) -> Result<Vec<String>, RemoteError> {
        let options = SyncOptions {
            recursive,
            ..self.options
        };
        let report = self.run_with(source, target, options).await?;
        Ok(report.copied_files)
    }

    /// Mirrors `source` onto `target` with the configured options
    pub async fn run(&self, source: &RemoteId, target: &RemoteId) -> Result<SyncReport, RemoteError> {
        self.run_with(source, target, self.options).await
    }

    async fn run_with(
        &self,
        source: &RemoteId,
        target: &RemoteId,
        options: SyncOptions,
    ) -> Result<SyncReport, RemoteError> {
        let start = Instant::now();
        let source = self.session.resolve(source).await?;
        let target = self.session.resolve(target).await?;

        info!(
            source = %source,
            target = %target,
            recursive = options.recursive,
            dry_run = options.dry_run,
            "Starting sync"
        );

        let mut report = SyncReport {
            dry_run: options.dry_run,
            ..SyncReport::default()
        };
        let mut branch = Vec::new();
        self.sync_level(&source, Some(&target), options, &mut branch, &mut report)
            .await?;

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            copied = report.copied_files.len(),
            folders_created = report.folders_created,
            skipped = report.files_skipped,
            duration_ms = report.duration_ms,
            "Sync complete"
        );
        Ok(report)
    }

    /// Copies a single file into `target`, regardless of what it already holds
    pub async fn copy_file(&self, file: &RemoteId, target: &RemoteId) -> Result<RemoteId, RemoteError> {
        let target = self.session.resolve(target).await?;
        let id = self.session.copy_file(file, &target).await?;
        info!(file = %file, target = %target, id = %id, "Copied file");
        Ok(id)
    }

    /// Reconciles one level. `target` is `None` only in dry-run mode, below
    /// a folder that does not exist yet.
    fn sync_level<'b>(
        &'b self,
        source: &'b RemoteId,
        target: Option<&'b RemoteId>,
        options: SyncOptions,
        branch: &'b mut Vec<Frame>,
        report: &'b mut SyncReport,
    ) -> BoxFuture<'b, Result<(), RemoteError>> {
        Box::pin(async move {
            if options.detect_cycles
                && branch
                    .iter()
                    .any(|f| &f.source == source || f.target.as_ref() == Some(source))
            {
                return Err(RemoteError::Permanent(format!(
                    "folder {} is reachable from itself; refusing to descend",
                    source
                )));
            }

            self.emit(SyncEvent::Syncing {
                source: source.clone(),
                target: target.cloned(),
            });

            let classifier = ListingClassifier::new(&self.session);
            let resolver =
                FolderResolver::new(&self.session).with_policy(self.duplicate_policy);

            let source_listing = classifier.list_all(source, None).await?;

            if options.recursive {
                branch.push(Frame {
                    source: source.clone(),
                    target: target.cloned(),
                });

                for folder in &source_listing.folders {
                    self.emit(SyncEvent::EnsureFolder {
                        name: folder.name.clone(),
                        source: folder.id.clone(),
                    });

                    let child_target = match target {
                        Some(parent) if !options.dry_run => {
                            let resolution = resolver.resolve_folder(&folder.name, parent).await?;
                            if resolution.was_created() {
                                report.folders_created += 1;
                                self.emit(SyncEvent::FolderCreated {
                                    name: folder.name.clone(),
                                    id: Some(resolution.id().clone()),
                                });
                            }
                            Some(resolution.into_id())
                        }
                        Some(parent) => resolver.find_folder(&folder.name, parent).await?,
                        None => None,
                    };

                    if options.dry_run && child_target.is_none() {
                        report.folders_created += 1;
                        self.emit(SyncEvent::FolderCreated {
                            name: folder.name.clone(),
                            id: None,
                        });
                    }

                    self.sync_level(&folder.id, child_target.as_ref(), options, branch, report)
                        .await?;
                }

                branch.pop();
            }

            let target_listing = match target {
                Some(parent) => classifier.list_all(parent, None).await?,
                None => Listing::default(),
            };

            for file in &source_listing.files {
                if target_listing.contains_file(&file.name) {
                    report.files_skipped += 1;
                    self.emit(SyncEvent::FileExists {
                        name: file.name.clone(),
                    });
                    continue;
                }

                let copied = match target {
                    Some(parent) if !options.dry_run => {
                        Some(self.session.copy_file(&file.id, parent).await?)
                    }
                    _ => None,
                };
                report.copied_files.push(file.name.clone());
                self.emit(SyncEvent::FileCopied {
                    name: file.name.clone(),
                    source: file.id.clone(),
                    id: copied,
                });
            }

            Ok(())
        })
    }

    fn emit(&self, event: SyncEvent) {
        match &event {
            SyncEvent::Syncing { source, target } => match target {
                Some(target) => info!(source = %source, target = %target, "syncing"),
                None => info!(source = %source, "syncing (target not created yet)"),
            },
            SyncEvent::EnsureFolder { name, source } => {
                info!(name = %name, source = %source, "ensure folder")
            }
            SyncEvent::FolderCreated { name, id } => match id {
                Some(id) => debug!(name = %name, id = %id, "folder created"),
                None => info!(name = %name, "would create folder"),
            },
            SyncEvent::FileCopied { name, source, id } => match id {
                Some(id) => info!(name = %name, source = %source, id = %id, "copy file"),
                None => info!(name = %name, source = %source, "would copy file"),
            },
            SyncEvent::FileExists { name } => info!(name = %name, "file exists"),
        }

        if let Some(tx) = &self.events {
            // A dropped receiver only means nobody is watching.
            let _ = tx.send(event);
        }
    }
}
