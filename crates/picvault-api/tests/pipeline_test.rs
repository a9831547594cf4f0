//! Archive pipeline integration tests: upload through the HTTP surface and
//! observe the copy landing in the archive directory.
//!
//! Run with: `cargo test -p picvault-api --test pipeline_test`

mod helpers;

use helpers::{
    basic_auth, image_form, register_user, setup_test_app, setup_test_app_with, wait_for_file,
    PASSWORD,
};
use std::time::Duration;

#[tokio::test]
async fn test_upload_is_archived_under_its_name() {
    let mut app = setup_test_app().await;
    register_user(app.client(), "alice").await;
    let _token = app.mock_token().await;
    let _upload = app.mock_upload("abc", "dh1").await;

    let response = app
        .client()
        .post("/api/v0/images")
        .add_header("Authorization", basic_auth("alice", PASSWORD))
        .multipart(image_form(Some("cat.png"), b"\x89PNG archived bytes"))
        .await;
    assert_eq!(response.status_code(), 201);

    let path = app.archive_path("cat.png");
    assert!(wait_for_file(&path, b"\x89PNG archived bytes", Duration::from_secs(5)).await);

    let stats = app
        .archive
        .take()
        .unwrap()
        .shutdown(Duration::from_secs(1))
        .await;
    assert_eq!(stats.processed, 1);
    assert_eq!(stats.dropped, 0);
}

#[tokio::test]
async fn test_default_archive_name_uses_owner_and_record_id() {
    let mut app = setup_test_app().await;
    register_user(app.client(), "alice").await;
    let _token = app.mock_token().await;
    let _upload = app.mock_upload("abc", "dh1").await;

    let body: serde_json::Value = app
        .client()
        .post("/api/v0/images")
        .add_header("Authorization", basic_auth("alice", PASSWORD))
        .multipart(
            axum_test::multipart::MultipartForm::new().add_part(
                "file",
                axum_test::multipart::Part::bytes(bytes::Bytes::from_static(b"anon")),
            ),
        )
        .await
        .json();

    let expected = format!("alice-{}", body["id"].as_str().unwrap());
    assert_eq!(body["imageName"], expected.as_str());
    assert!(wait_for_file(&app.archive_path(&expected), b"anon", Duration::from_secs(5)).await);
}

#[tokio::test]
async fn test_failed_upload_is_not_archived() {
    let mut app = setup_test_app().await;
    register_user(app.client(), "alice").await;
    let _token = app.mock_token().await;
    let _upload = app
        .hosting
        .mock("POST", "/3/image")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let response = app
        .client()
        .post("/api/v0/images")
        .add_header("Authorization", basic_auth("alice", PASSWORD))
        .multipart(image_form(Some("lost.png"), b"bytes"))
        .await;
    assert_eq!(response.status_code(), 502);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!app.archive_path("lost.png").exists());
}

#[tokio::test]
async fn test_upload_succeeds_with_archive_disabled() {
    let mut app = setup_test_app_with(|config| config.archive_enabled = false).await;
    assert!(app.archive.is_none());
    register_user(app.client(), "alice").await;
    let _token = app.mock_token().await;
    let _upload = app.mock_upload("abc", "dh1").await;

    let response = app
        .client()
        .post("/api/v0/images")
        .add_header("Authorization", basic_auth("alice", PASSWORD))
        .multipart(image_form(Some("cat.png"), b"bytes"))
        .await;

    assert_eq!(response.status_code(), 201);
    let health: serde_json::Value = app.client().get("/health").await.json();
    assert!(health.get("archive").is_none());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!app.archive_path("cat.png").exists());
}
