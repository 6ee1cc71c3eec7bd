//! Integration tests for the listing classifier
//!
//! Verifies:
//! - All pages are drained before classification (250 items over 100/100/50)
//! - Partitions are sorted by name with no duplicates or omissions
//! - Empty parents yield empty partitions
//! - A failing page aborts the listing without retrying earlier pages
//! - A server whose page tokens loop back is stopped

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use drivemirror_core::domain::{Item, PageToken, RemoteError, RemoteId};
use drivemirror_core::ports::{IRemoteDirectory, ListingPage};
use drivemirror_sync::{ListingClassifier, SyncSession};

use crate::common::{self, Call, MemoryDrive};

#[tokio::test]
async fn test_list_all_drains_three_pages() {
    let drive = MemoryDrive::with_page_size(100);
    let parent = drive.add_folder(&drive.root(), "big");

    // 37 is coprime with 250, so this visits every index once in scrambled order.
    for i in 0..250u32 {
        let n = (i * 37) % 250;
        let name = format!("item-{:03}", n);
        if n % 5 == 0 {
            drive.add_folder(&parent, &name);
        } else {
            drive.add_file(&parent, &name);
        }
    }
    drive.clear_calls();

    let session = common::session(&drive);
    let listing = ListingClassifier::new(&session)
        .list_all(&parent, None)
        .await
        .expect("listing failed");

    assert_eq!(listing.len(), 250);
    assert_eq!(listing.folders.len(), 50);
    assert_eq!(listing.files.len(), 200);

    let ids: HashSet<_> = listing
        .folders
        .iter()
        .chain(listing.files.iter())
        .map(|i| i.id.clone())
        .collect();
    assert_eq!(ids.len(), 250, "duplicate ids in listing");

    assert!(listing.folders.windows(2).all(|w| w[0].name < w[1].name));
    assert!(listing.files.windows(2).all(|w| w[0].name < w[1].name));
    assert!(listing.folders.iter().all(|i| i.is_folder()));
    assert!(listing.files.iter().all(|i| !i.is_folder()));

    let tokens: Vec<Option<String>> = drive
        .calls()
        .into_iter()
        .map(|c| match c {
            Call::List { token, .. } => token,
            other => panic!("unexpected call {other:?}"),
        })
        .collect();
    assert_eq!(
        tokens,
        vec![None, Some("100".to_string()), Some("200".to_string())]
    );
}

#[tokio::test]
async fn test_empty_parent_yields_empty_listing() {
    let drive = MemoryDrive::new();
    let parent = drive.add_folder(&drive.root(), "empty");
    let session = common::session(&drive);

    let listing = ListingClassifier::new(&session)
        .list_all(&parent, None)
        .await
        .unwrap();

    assert!(listing.is_empty());
    assert!(listing.folders.is_empty());
    assert!(listing.files.is_empty());
}

#[tokio::test]
async fn test_failed_page_aborts_listing() {
    let drive = MemoryDrive::with_page_size(2);
    let parent = drive.add_folder(&drive.root(), "p");
    for name in ["a", "b", "c", "d", "e"] {
        drive.add_file(&parent, name);
    }
    drive.fail_list_page(&parent, 1, RemoteError::Transient("503 after retries".into()));
    drive.clear_calls();

    let session = common::session(&drive);
    let err = ListingClassifier::new(&session)
        .list_all(&parent, None)
        .await
        .unwrap_err();

    assert_eq!(err, RemoteError::Transient("503 after retries".into()));
    assert_eq!(drive.list_calls(), 2);
}

#[tokio::test]
async fn test_name_filter_is_forwarded() {
    let drive = MemoryDrive::new();
    let parent = drive.add_folder(&drive.root(), "p");
    drive.add_file(&parent, "report-2023.pdf");
    drive.add_file(&parent, "report-2024.pdf");
    drive.add_file(&parent, "notes.txt");
    drive.clear_calls();

    let session = common::session(&drive);
    let listing = ListingClassifier::new(&session)
        .list_all(&parent, Some("report"))
        .await
        .unwrap();

    let names: Vec<_> = listing.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["report-2023.pdf", "report-2024.pdf"]);
    assert!(matches!(
        &drive.calls()[0],
        Call::List { filter: Some(f), .. } if f == "report"
    ));
}

#[tokio::test]
async fn test_sorting_is_case_sensitive() {
    let drive = MemoryDrive::new();
    let parent = drive.add_folder(&drive.root(), "p");
    for name in ["beta", "Alpha", "alpha", "Beta"] {
        drive.add_file(&parent, name);
    }

    let session = common::session(&drive);
    let listing = ListingClassifier::new(&session)
        .list_all(&parent, None)
        .await
        .unwrap();

    let names: Vec<_> = listing.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Beta", "alpha", "beta"]);
}

/// Remote whose tokens go `a -> b -> a -> ...`, one file per page
#[derive(Default)]
struct CyclingTokens {
    list_calls: AtomicUsize,
}

#[async_trait]
impl IRemoteDirectory for CyclingTokens {
    async fn list_children(
        &self,
        _parent: &RemoteId,
        _name_filter: Option<&str>,
        page_token: Option<&PageToken>,
    ) -> Result<ListingPage, RemoteError> {
        let n = self.list_calls.fetch_add(1, Ordering::SeqCst);
        let next = match page_token.map(PageToken::as_str) {
            Some("a") => "b",
            _ => "a",
        };
        Ok(ListingPage {
            items: vec![Item::file(common::rid(&format!("f{n}")), format!("file-{n}"))],
            next_page_token: Some(PageToken::new(next.to_string())?),
        })
    }

    async fn create_folder(&self, _: &str, _: &RemoteId) -> Result<RemoteId, RemoteError> {
        Err(RemoteError::Permanent("read-only".into()))
    }

    async fn copy_file(&self, _: &RemoteId, _: &RemoteId) -> Result<RemoteId, RemoteError> {
        Err(RemoteError::Permanent("read-only".into()))
    }

    async fn get_root_id(&self) -> Result<RemoteId, RemoteError> {
        Ok(common::rid("root-0"))
    }
}

#[tokio::test]
async fn test_looping_page_tokens_are_rejected() {
    let remote = Arc::new(CyclingTokens::default());
    let session = SyncSession::new(remote.clone());

    let err = ListingClassifier::new(&session)
        .list_all(&common::rid("p"), None)
        .await
        .unwrap_err();

    assert!(matches!(err, RemoteError::Permanent(ref m) if m.contains("did not advance")));
    // None -> a, a -> b, b -> a (already seen)
    assert_eq!(remote.list_calls.load(Ordering::SeqCst), 3);
}
