//! Integration tests for the sync engine
//!
//! Verifies:
//! - Idempotence of a repeated recursive sync
//! - Name-based completeness at matching relative paths
//! - No file crosses levels
//! - Target folders exist before their source folder is descended into
//! - Skip-on-name-match, non-recursive mode and processing order
//! - An error aborts the run with earlier work left in place
//! - Dry run, cycle detection, cancellation and progress events

use std::collections::BTreeSet;

use drivemirror_core::config::SyncConfig;
use drivemirror_core::domain::{RemoteError, RemoteId};
use drivemirror_sync::{SyncEngine, SyncEvent, SyncOptions, SyncSession};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::common::{self, Call, MemoryDrive};

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Core properties
// ============================================================================

#[tokio::test]
async fn test_recursive_sync_copies_whole_tree() {
    let drive = MemoryDrive::new();
    let (src, dst) = common::fixture(&drive);
    let engine = SyncEngine::new(common::session(&drive));

    let copied = engine.sync(&src, &dst, true).await.unwrap();

    // Subfolder subtrees complete before the level's own files.
    assert_eq!(copied, vec!["x1.txt", "z1.txt", "y1.txt", "a.txt"]);
    assert_eq!(drive.paths(&dst), drive.paths(&src));
}

#[tokio::test]
async fn test_second_run_is_a_no_op() {
    let drive = MemoryDrive::new();
    let (src, dst) = common::fixture(&drive);
    let engine = SyncEngine::new(common::session(&drive));

    engine.sync(&src, &dst, true).await.unwrap();
    drive.clear_calls();

    let report = engine.run(&src, &dst).await.unwrap();

    assert!(report.copied_files.is_empty());
    assert_eq!(report.folders_created, 0);
    assert_eq!(report.files_skipped, 4);
    assert!(drive.create_calls().is_empty());
    assert_eq!(drive.copy_calls(), 0);
}

#[tokio::test]
async fn test_files_never_cross_levels() {
    let drive = MemoryDrive::new();
    let root = drive.root();
    let src = drive.add_folder(&root, "src");
    let dst = drive.add_folder(&root, "dst");

    // Same file name at two levels of the source, one of them present at the
    // top of the target only.
    drive.add_file(&src, "shared.txt");
    let sub = drive.add_folder(&src, "sub");
    drive.add_file(&sub, "shared.txt");
    drive.add_file(&dst, "shared.txt");

    let engine = SyncEngine::new(common::session(&drive));
    let copied = engine.sync(&src, &dst, true).await.unwrap();

    assert_eq!(copied, vec!["shared.txt"]);
    assert_eq!(drive.paths(&dst), set(&["shared.txt", "sub/", "sub/shared.txt"]));

    let dst_sub = drive.child(&dst, "sub").unwrap();
    let copies: Vec<_> = drive
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::Copy { target, .. } => Some(target),
            _ => None,
        })
        .collect();
    assert_eq!(copies, vec![dst_sub.as_str().to_string()]);
}

#[tokio::test]
async fn test_target_folder_resolved_before_descent() {
    let drive = MemoryDrive::new();
    let (src, dst) = common::fixture(&drive);
    let src_y = drive.child(&src, "Y").unwrap();
    let src_z = drive.child(&src_y, "Z").unwrap();
    drive.clear_calls();

    let engine = SyncEngine::new(common::session(&drive));
    engine.sync(&src, &dst, true).await.unwrap();

    let calls = drive.calls();
    let position = |pred: &dyn Fn(&Call) -> bool| calls.iter().position(|c| pred(c)).unwrap();

    let create_y = position(&|c| matches!(c, Call::CreateFolder { name, .. } if name == "Y"));
    let list_src_y = position(&|c| matches!(c, Call::List { parent, .. } if parent == src_y.as_str()));
    let create_z = position(&|c| matches!(c, Call::CreateFolder { name, .. } if name == "Z"));
    let list_src_z = position(&|c| matches!(c, Call::List { parent, .. } if parent == src_z.as_str()));

    assert!(create_y < list_src_y);
    assert!(list_src_y < create_z);
    assert!(create_z < list_src_z);
}

#[tokio::test]
async fn test_existing_file_name_is_skipped() {
    let drive = MemoryDrive::new();
    let root = drive.root();
    let src = drive.add_folder(&root, "src");
    let dst = drive.add_folder(&root, "dst");
    drive.add_file(&src, "report.pdf");
    let existing = drive.add_file(&dst, "report.pdf");

    let engine = SyncEngine::new(common::session(&drive));
    let report = engine.run(&src, &dst).await.unwrap();

    assert!(report.copied_files.is_empty());
    assert_eq!(report.files_skipped, 1);
    assert_eq!(drive.copy_calls(), 0);
    assert_eq!(drive.child(&dst, "report.pdf"), Some(existing));
    assert_eq!(drive.count_named(&dst, "report.pdf"), 1);
}

#[tokio::test]
async fn test_non_recursive_only_reconciles_top_level() {
    let drive = MemoryDrive::new();
    let root = drive.root();
    let src = drive.add_folder(&root, "src");
    let dst = drive.add_folder(&root, "dst");
    drive.add_file(&src, "top.txt");
    let sub = drive.add_folder(&src, "sub");
    drive.add_file(&sub, "inner.txt");

    let engine = SyncEngine::new(common::session(&drive));
    let copied = engine.sync(&src, &dst, false).await.unwrap();

    assert_eq!(copied, vec!["top.txt"]);
    assert_eq!(drive.paths(&dst), set(&["top.txt"]));
    assert!(drive.create_calls().is_empty());
    assert!(!drive
        .calls()
        .iter()
        .any(|c| matches!(c, Call::List { parent, .. } if parent == sub.as_str())));
}

#[tokio::test]
async fn test_failed_sibling_aborts_remaining_siblings() {
    let drive = MemoryDrive::new();
    let root = drive.root();
    let src = drive.add_folder(&root, "src");
    let dst = drive.add_folder(&root, "dst");
    for name in ["A", "B", "C"] {
        let folder = drive.add_folder(&src, name);
        drive.add_file(&folder, &format!("{}.txt", name.to_lowercase()));
    }
    drive.add_file(&src, "top.txt");
    drive.fail_create("B", RemoteError::Permanent("permission denied".into()));

    let engine = SyncEngine::new(common::session(&drive));
    let err = engine.sync(&src, &dst, true).await.unwrap_err();

    assert_eq!(err, RemoteError::Permanent("permission denied".into()));
    assert_eq!(drive.create_calls(), vec!["A".to_string(), "B".to_string()]);
    // Work done before the failure stays; nothing after it happens.
    assert_eq!(drive.paths(&dst), set(&["A/", "A/a.txt"]));
    assert_eq!(drive.copy_calls(), 1);
}

#[tokio::test]
async fn test_rerun_after_failure_completes_tree() {
    let drive = MemoryDrive::new();
    let (src, dst) = common::fixture(&drive);
    drive.fail_create("Y", RemoteError::Transient("retries exhausted".into()));

    let engine = SyncEngine::new(common::session(&drive));
    assert!(engine.sync(&src, &dst, true).await.is_err());
    assert_eq!(drive.paths(&dst), set(&["X/", "X/x1.txt"]));

    drive.clear_faults();
    let copied = engine.sync(&src, &dst, true).await.unwrap();

    assert_eq!(copied, vec!["z1.txt", "y1.txt", "a.txt"]);
    assert_eq!(drive.paths(&dst), drive.paths(&src));
    assert_eq!(drive.count_named(&dst, "X"), 1);
}

#[tokio::test]
async fn test_pagination_in_sync() {
    let drive = MemoryDrive::with_page_size(3);
    let root = drive.root();
    let src = drive.add_folder(&root, "src");
    let dst = drive.add_folder(&root, "dst");
    for i in 0..10 {
        drive.add_file(&src, &format!("f{:02}", i));
    }
    // Present on the last target page only.
    for i in 0..4 {
        drive.add_file(&dst, &format!("other{}", i));
    }
    drive.add_file(&dst, "f09");

    let engine = SyncEngine::new(common::session(&drive));
    let copied = engine.sync(&src, &dst, true).await.unwrap();

    let expected: Vec<String> = (0..9).map(|i| format!("f{:02}", i)).collect();
    assert_eq!(copied, expected);
}

#[tokio::test]
async fn test_root_alias_is_resolved() {
    let drive = MemoryDrive::new();
    let root = drive.root();
    drive.add_file(&root, "at-root.txt");
    let dst = drive.add_folder(&root, "dst");

    let engine = SyncEngine::new(common::session(&drive)).with_options(SyncOptions {
        recursive: false,
        ..SyncOptions::default()
    });
    let report = engine.run(&RemoteId::root_alias(), &dst).await.unwrap();

    assert_eq!(report.copied_files, vec!["at-root.txt"]);
    assert_eq!(drive.calls().first(), Some(&Call::Root));
}

// ============================================================================
// Dry run
// ============================================================================

#[tokio::test]
async fn test_dry_run_changes_nothing() {
    let drive = MemoryDrive::new();
    let (src, dst) = common::fixture(&drive);
    let dst_x = drive.add_folder(&dst, "X");
    drive.add_file(&dst_x, "x1.txt");

    let engine = SyncEngine::new(common::session(&drive)).with_options(SyncOptions {
        dry_run: true,
        ..SyncOptions::default()
    });
    let report = engine.run(&src, &dst).await.unwrap();

    assert!(report.dry_run);
    assert_eq!(report.copied_files, vec!["z1.txt", "y1.txt", "a.txt"]);
    assert_eq!(report.folders_created, 2);
    assert_eq!(report.files_skipped, 1);
    assert!(drive.create_calls().is_empty());
    assert_eq!(drive.copy_calls(), 0);
    assert_eq!(drive.paths(&dst), set(&["X/", "X/x1.txt"]));
}

// ============================================================================
// Cycles and cancellation
// ============================================================================

#[tokio::test]
async fn test_target_inside_source_is_detected() {
    let drive = MemoryDrive::new();
    let root = drive.root();
    let src = drive.add_folder(&root, "src");
    let inner = drive.add_folder(&src, "inner");

    let engine = SyncEngine::new(common::session(&drive));
    let err = engine.sync(&src, &inner, true).await.unwrap_err();

    assert!(matches!(err, RemoteError::Permanent(ref m) if m.contains("reachable from itself")));
    // inner/inner was created before the revisit was noticed; nothing deeper.
    assert_eq!(drive.paths(&inner), set(&["inner/"]));
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let drive = MemoryDrive::new();
    let (src, dst) = common::fixture(&drive);
    let token = CancellationToken::new();
    let session = SyncSession::new(drive.clone()).with_cancellation(token.clone());
    token.cancel();

    let engine = SyncEngine::new(std::sync::Arc::new(session));
    let err = engine.sync(&src, &dst, true).await.unwrap_err();

    assert_eq!(err, RemoteError::Cancelled);
    assert!(drive.calls().is_empty());
}

#[tokio::test]
async fn test_cancel_mid_run_keeps_completed_work() {
    let drive = MemoryDrive::new();
    let (src, dst) = common::fixture(&drive);
    let token = CancellationToken::new();
    drive.cancel_on_copy(token.clone());
    let session = SyncSession::new(drive.clone()).with_cancellation(token);

    let engine = SyncEngine::new(std::sync::Arc::new(session));
    let err = engine.sync(&src, &dst, true).await.unwrap_err();

    assert_eq!(err, RemoteError::Cancelled);
    assert_eq!(drive.copy_calls(), 1);
    assert_eq!(drive.paths(&dst), set(&["X/", "X/x1.txt"]));
}

// ============================================================================
// Events and configuration
// ============================================================================

#[tokio::test]
async fn test_progress_events_are_streamed() {
    let drive = MemoryDrive::new();
    let root = drive.root();
    let src = drive.add_folder(&root, "src");
    let dst = drive.add_folder(&root, "dst");
    let sub = drive.add_folder(&src, "sub");
    let new_file = drive.add_file(&sub, "new.txt");
    drive.add_file(&src, "old.txt");
    drive.add_file(&dst, "old.txt");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let engine = SyncEngine::new(common::session(&drive)).with_events(tx);
    engine.sync(&src, &dst, true).await.unwrap();
    drop(engine);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    let dst_sub = drive.child(&dst, "sub").unwrap();
    let copied_id = drive.child(&dst_sub, "new.txt").unwrap();
    assert_eq!(
        events,
        vec![
            SyncEvent::Syncing {
                source: src.clone(),
                target: Some(dst.clone()),
            },
            SyncEvent::EnsureFolder {
                name: "sub".into(),
                source: sub.clone(),
            },
            SyncEvent::FolderCreated {
                name: "sub".into(),
                id: Some(dst_sub.clone()),
            },
            SyncEvent::Syncing {
                source: sub,
                target: Some(dst_sub),
            },
            SyncEvent::FileCopied {
                name: "new.txt".into(),
                source: new_file,
                id: Some(copied_id),
            },
            SyncEvent::FileExists {
                name: "old.txt".into(),
            },
        ]
    );
}

#[tokio::test]
async fn test_engine_from_config() {
    let drive = MemoryDrive::new();
    let (src, dst) = common::fixture(&drive);
    let config = SyncConfig {
        recursive: false,
        ..SyncConfig::default()
    };

    let engine = SyncEngine::from_config(common::session(&drive), &config);
    assert!(!engine.options().recursive);

    let report = engine.run(&src, &dst).await.unwrap();
    assert_eq!(report.copied_files, vec!["a.txt"]);
}

#[tokio::test]
async fn test_single_file_copy() {
    let drive = MemoryDrive::new();
    let root = drive.root();
    let file = drive.add_file(&root, "note.md");
    let dst = drive.add_folder(&root, "dst");
    drive.add_file(&dst, "note.md");

    let engine = SyncEngine::new(common::session(&drive));
    let copy = engine.copy_file(&file, &dst).await.unwrap();

    assert_ne!(copy, file);
    assert_eq!(drive.count_named(&dst, "note.md"), 2);
}
