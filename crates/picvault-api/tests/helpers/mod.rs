//! Shared setup for API integration tests.
//!
//! The hosting provider and its token endpoint are served by a mockito server;
//! users and images live in the in-memory stores and the archive is a tempdir.

#![allow(dead_code)]

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use mockito::{Mock, ServerGuard};
use picvault_api::setup::{self, ArchivePipeline};
use picvault_core::Config;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

pub const PASSWORD: &str = "correct-horse";
pub const ACCESS_TOKEN: &str = "tok-1";

pub struct TestApp {
    pub server: TestServer,
    pub hosting: ServerGuard,
    pub archive_dir: TempDir,
    pub archive: Option<ArchivePipeline>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn archive_path(&self, name: &str) -> std::path::PathBuf {
        self.archive_dir.path().join(name)
    }

    /// Token endpoint answering with [`ACCESS_TOKEN`].
    pub async fn mock_token(&mut self) -> Mock {
        self.hosting
            .mock("POST", "/oauth2/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"access_token":"{}","expires_in":315360000,"token_type":"bearer"}}"#,
                ACCESS_TOKEN
            ))
            .create_async()
            .await
    }

    /// Upload endpoint accepting one bearer-authenticated image.
    pub async fn mock_upload(&mut self, remote_id: &str, delete_hash: &str) -> Mock {
        self.hosting
            .mock("POST", "/3/image")
            .match_header("authorization", format!("Bearer {}", ACCESS_TOKEN).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"data":{{"id":"{id}","link":"https://i.imgur.com/{id}.png","deletehash":"{hash}"}},"success":true,"status":200}}"#,
                id = remote_id,
                hash = delete_hash
            ))
            .create_async()
            .await
    }

    pub async fn mock_delete(&mut self, delete_hash: &str, status: usize) -> Mock {
        self.hosting
            .mock("DELETE", format!("/3/image/{}", delete_hash).as_str())
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":true,"success":true}"#)
            .create_async()
            .await
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

/// Build the app against a fresh mock provider, letting the test adjust config.
pub async fn setup_test_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let hosting = mockito::Server::new_async().await;
    let archive_dir = TempDir::new().expect("Failed to create archive dir");

    let mut config = Config::for_endpoints(&hosting.url(), archive_dir.path().to_path_buf());
    configure(&mut config);

    let app = setup::initialize_app(config)
        .await
        .expect("Failed to initialize app");
    let server = TestServer::new(app.router).expect("Failed to create test server");

    TestApp {
        server,
        hosting,
        archive_dir,
        archive: app.archive,
    }
}

pub fn basic_auth(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", username, password)))
}

pub async fn register_user(client: &TestServer, username: &str) -> serde_json::Value {
    let response = client
        .post("/api/v0/users")
        .json(&serde_json::json!({ "username": username, "password": PASSWORD }))
        .await;
    assert_eq!(response.status_code(), 201);
    response.json()
}

pub fn image_form(name: Option<&str>, bytes: &[u8]) -> MultipartForm {
    let part = Part::bytes(bytes::Bytes::from(bytes.to_vec()))
        .file_name("upload.png")
        .mime_type("image/png");
    let form = MultipartForm::new().add_part("file", part);
    match name {
        Some(name) => form.add_text("name", name.to_string()),
        None => form,
    }
}

/// Poll until `path` holds `expected`, or give up after `timeout`.
pub async fn wait_for_file(path: &Path, expected: &[u8], timeout: Duration) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if let Ok(contents) = tokio::fs::read(path).await {
            if contents == expected {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
