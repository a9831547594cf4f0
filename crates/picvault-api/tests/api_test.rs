//! HTTP surface integration tests.
//!
//! Run with: `cargo test -p picvault-api --test api_test`

mod helpers;

use helpers::{basic_auth, image_form, register_user, setup_test_app, PASSWORD};

#[tokio::test]
async fn test_health_reports_archive_queue() {
    let app = setup_test_app().await;

    let response = app.client().get("/health").await;

    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "alive");
    assert_eq!(body["archive"]["pending"], 0);
}

#[tokio::test]
async fn test_register_user() {
    let app = setup_test_app().await;

    let user = register_user(app.client(), "alice").await;

    assert_eq!(user["username"], "alice");
    assert!(user.get("password").is_none());
    assert!(user.get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_short_passwords() {
    let app = setup_test_app().await;
    register_user(app.client(), "alice").await;

    let duplicate = app
        .client()
        .post("/api/v0/users")
        .json(&serde_json::json!({ "username": "alice", "password": PASSWORD }))
        .await;
    assert_eq!(duplicate.status_code(), 400);

    let short = app
        .client()
        .post("/api/v0/users")
        .json(&serde_json::json!({ "username": "bob", "password": "short" }))
        .await;
    assert_eq!(short.status_code(), 400);
}

#[tokio::test]
async fn test_register_rejects_malformed_json() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/api/v0/users")
        .text("{not json")
        .content_type("application/json")
        .await;

    assert_eq!(response.status_code(), 400);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_requests_without_credentials_are_rejected() {
    let app = setup_test_app().await;

    let response = app.client().get("/api/v0/images").await;

    assert_eq!(response.status_code(), 401);
    assert!(response.headers().contains_key("www-authenticate"));
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "AUTH_REJECTED");
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let app = setup_test_app().await;
    register_user(app.client(), "alice").await;

    let response = app
        .client()
        .get("/api/v0/images")
        .add_header("Authorization", basic_auth("alice", "not-the-password"))
        .await;

    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_upload_list_and_delete() {
    let mut app = setup_test_app().await;
    register_user(app.client(), "alice").await;
    let token = app.mock_token().await;
    let upload = app.mock_upload("abc", "dh1").await;

    let response = app
        .client()
        .post("/api/v0/images")
        .add_header("Authorization", basic_auth("alice", PASSWORD))
        .multipart(image_form(Some("cat.png"), b"fake-png"))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: serde_json::Value = response.json();
    assert_eq!(body["remoteId"], "abc");
    assert_eq!(body["link"], "https://i.imgur.com/abc.png");
    assert_eq!(body["deleteHash"], "dh1");
    assert_eq!(body["owner"], "alice");
    assert_eq!(body["imageName"], "cat.png");
    assert_eq!(body["message"], "Uploaded Success");
    upload.assert_async().await;
    token.assert_async().await;

    let image_id = body["id"].as_str().unwrap().to_string();

    let list = app
        .client()
        .get("/api/v0/images")
        .add_header("Authorization", basic_auth("alice", PASSWORD))
        .await;
    assert_eq!(list.status_code(), 200);
    let items: Vec<serde_json::Value> = list.json();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], image_id.as_str());
    assert_eq!(items[0]["deleteHash"], "dh1");

    let remote_delete = app.mock_delete("dh1", 200).await;
    let deleted = app
        .client()
        .delete(&format!("/api/v0/images/{}", image_id))
        .add_header("Authorization", basic_auth("alice", PASSWORD))
        .await;
    assert_eq!(deleted.status_code(), 204);
    remote_delete.assert_async().await;

    let list = app
        .client()
        .get("/api/v0/images")
        .add_header("Authorization", basic_auth("alice", PASSWORD))
        .await;
    let items: Vec<serde_json::Value> = list.json();
    assert!(items.is_empty());

    let again = app
        .client()
        .delete(&format!("/api/v0/images/{}", image_id))
        .add_header("Authorization", basic_auth("alice", PASSWORD))
        .await;
    assert_eq!(again.status_code(), 404);
}

#[tokio::test]
async fn test_delete_by_non_owner_is_forbidden_and_never_reaches_provider() {
    let mut app = setup_test_app().await;
    register_user(app.client(), "alice").await;
    register_user(app.client(), "bob").await;
    let _token = app.mock_token().await;
    let _upload = app.mock_upload("abc", "dh1").await;

    let uploaded: serde_json::Value = app
        .client()
        .post("/api/v0/images")
        .add_header("Authorization", basic_auth("alice", PASSWORD))
        .multipart(image_form(None, b"bytes"))
        .await
        .json();
    let image_id = uploaded["id"].as_str().unwrap().to_string();

    let remote_delete = app
        .hosting
        .mock("DELETE", "/3/image/dh1")
        .expect(0)
        .create_async()
        .await;

    let response = app
        .client()
        .delete(&format!("/api/v0/images/{}", image_id))
        .add_header("Authorization", basic_auth("bob", PASSWORD))
        .await;

    assert_eq!(response.status_code(), 403);
    remote_delete.assert_async().await;

    let list: Vec<serde_json::Value> = app
        .client()
        .get("/api/v0/images")
        .add_header("Authorization", basic_auth("alice", PASSWORD))
        .await
        .json();
    assert_eq!(list.len(), 1);
}

#[tokio::test]
async fn test_provider_rejection_surfaces_status_and_body() {
    let mut app = setup_test_app().await;
    register_user(app.client(), "alice").await;
    let _token = app.mock_token().await;
    let _upload = app
        .hosting
        .mock("POST", "/3/image")
        .with_status(400)
        .with_body(r#"{"data":{"error":"File type invalid"},"success":false,"status":400}"#)
        .create_async()
        .await;

    let response = app
        .client()
        .post("/api/v0/images")
        .add_header("Authorization", basic_auth("alice", PASSWORD))
        .multipart(image_form(Some("bad.png"), b"bytes"))
        .await;

    assert_eq!(response.status_code(), 502);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "HOSTING_UPLOAD_FAILED");
    assert!(body["error"].as_str().unwrap().contains("File type invalid"));

    let list: Vec<serde_json::Value> = app
        .client()
        .get("/api/v0/images")
        .add_header("Authorization", basic_auth("alice", PASSWORD))
        .await
        .json();
    assert!(list.is_empty());
}

#[tokio::test]
async fn test_token_server_failure_is_retryable() {
    let mut app = setup_test_app().await;
    register_user(app.client(), "alice").await;
    let _token = app
        .hosting
        .mock("POST", "/oauth2/token")
        .with_status(503)
        .with_body("maintenance")
        .create_async()
        .await;
    let upload = app.hosting.mock("POST", "/3/image").expect(0).create_async().await;

    let response = app
        .client()
        .post("/api/v0/images")
        .add_header("Authorization", basic_auth("alice", PASSWORD))
        .multipart(image_form(Some("a.png"), b"bytes"))
        .await;

    assert_eq!(response.status_code(), 503);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "TOKEN_SERVER_ERROR");
    assert_eq!(body["recoverable"], true);
    upload.assert_async().await;
}

#[tokio::test]
async fn test_rejected_hosting_credentials_do_not_challenge_the_caller() {
    let mut app = setup_test_app().await;
    register_user(app.client(), "alice").await;
    let _token = app
        .hosting
        .mock("POST", "/oauth2/token")
        .with_status(400)
        .with_body(r#"{"data":{"error":"Invalid refresh token"},"success":false,"status":400}"#)
        .create_async()
        .await;
    let upload = app.hosting.mock("POST", "/3/image").expect(0).create_async().await;

    let response = app
        .client()
        .post("/api/v0/images")
        .add_header("Authorization", basic_auth("alice", PASSWORD))
        .multipart(image_form(Some("a.png"), b"bytes"))
        .await;

    assert_eq!(response.status_code(), 502);
    assert!(!response.headers().contains_key("www-authenticate"));
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "UPSTREAM_AUTH_REJECTED");
    upload.assert_async().await;
}

#[tokio::test]
async fn test_upload_without_file_field_is_rejected() {
    let app = setup_test_app().await;
    register_user(app.client(), "alice").await;

    let form = axum_test::multipart::MultipartForm::new().add_text("name", "a.png");
    let response = app
        .client()
        .post("/api/v0/images")
        .add_header("Authorization", basic_auth("alice", PASSWORD))
        .multipart(form)
        .await;

    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_upload_rejects_path_like_names() {
    let app = setup_test_app().await;
    register_user(app.client(), "alice").await;

    let response = app
        .client()
        .post("/api/v0/images")
        .add_header("Authorization", basic_auth("alice", PASSWORD))
        .multipart(image_form(Some("../etc/passwd"), b"bytes"))
        .await;

    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_delete_with_malformed_id_is_rejected() {
    let app = setup_test_app().await;
    register_user(app.client(), "alice").await;

    let response = app
        .client()
        .delete("/api/v0/images/not-a-uuid")
        .add_header("Authorization", basic_auth("alice", PASSWORD))
        .await;

    assert_eq!(response.status_code(), 400);
}
