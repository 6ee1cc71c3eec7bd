//! Integration tests for subtree rendering

use drivemirror_core::domain::RemoteId;
use drivemirror_sync::TreePrinter;

use crate::common::{self, MemoryDrive};

#[tokio::test]
async fn test_render_folders_before_files() {
    let drive = MemoryDrive::new();
    let (src, _dst) = common::fixture(&drive);
    let session = common::session(&drive);

    let rendered = TreePrinter::new(&session).render(&src).await.unwrap();

    let expected = "\
.
├── X
│   ├── x1.txt
├── Y
│   ├── Z
│   │   ├── z1.txt
│   ├── y1.txt
├── a.txt
";
    assert_eq!(rendered, expected);
}

#[tokio::test]
async fn test_render_empty_folder() {
    let drive = MemoryDrive::new();
    let empty = drive.add_folder(&drive.root(), "empty");
    let session = common::session(&drive);

    let rendered = TreePrinter::new(&session).render(&empty).await.unwrap();
    assert_eq!(rendered, ".\n");
}

#[tokio::test]
async fn test_render_root_alias() {
    let drive = MemoryDrive::new();
    drive.add_file(&drive.root(), "top.txt");
    let session = common::session(&drive);

    let rendered = TreePrinter::new(&session)
        .render(&RemoteId::root_alias())
        .await
        .unwrap();
    assert_eq!(rendered, ".\n├── top.txt\n");
}
