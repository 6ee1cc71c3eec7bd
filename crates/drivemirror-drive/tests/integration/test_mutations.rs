//! Integration tests for folder creation and file copy
//!
//! Verifies request bodies and the mapping of rejections onto
//! [`RemoteError`] variants.

use drivemirror_core::domain::RemoteError;
use drivemirror_core::ports::IRemoteDirectory;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_create_folder_posts_folder_resource() {
    let (server, client) = common::setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/files"))
        .and(query_param("fields", "id,name,mimeType"))
        .and(body_json(serde_json::json!({
            "name": "Reports",
            "mimeType": "application/vnd.google-apps.folder",
            "parents": ["parent-1"]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::folder_json("new-folder", "Reports")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = common::directory(client, 100);
    let id = dir
        .create_folder("Reports", &common::rid("parent-1"))
        .await
        .expect("create failed");
    assert_eq!(id.as_str(), "new-folder");
}

#[tokio::test]
async fn test_create_folder_conflict_is_reported() {
    let (server, client) = common::setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
            "error": { "code": 409, "message": "Item already exists", "errors": [] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = common::directory(client, 100);
    let err = dir
        .create_folder("Reports", &common::rid("parent-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Conflict(ref m) if m.contains("already exists")));
}

#[tokio::test]
async fn test_copy_file_posts_target_parent() {
    let (server, client) = common::setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/files/file-1/copy"))
        .and(body_json(serde_json::json!({ "parents": ["target-9"] })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::file_json("copy-1", "notes.txt")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = common::directory(client, 100);
    let id = dir
        .copy_file(&common::rid("file-1"), &common::rid("target-9"))
        .await
        .unwrap();
    assert_eq!(id.as_str(), "copy-1");
}

#[tokio::test]
async fn test_copy_missing_file_is_permanent() {
    let (server, client) = common::setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/files/gone/copy"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": {
                "code": 404,
                "message": "File not found: gone.",
                "errors": [{ "reason": "notFound" }]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = common::directory(client, 100);
    let err = dir
        .copy_file(&common::rid("gone"), &common::rid("target-9"))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Permanent(ref m) if m.contains("File not found")));
}

#[tokio::test]
async fn test_unauthorized_is_permanent() {
    let (server, client) = common::setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let dir = common::directory(client, 100);
    let err = dir
        .create_folder("x", &common::rid("parent-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Permanent(_)));
}
