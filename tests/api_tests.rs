//! API integration tests
//!
//! Require a running server. Run with: cargo test -- --ignored

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Register a throwaway member and return their bearer token
async fn register_member(client: &Client) -> (String, i64) {
    let email = format!(
        "member-{}@test.invalid",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("clock before epoch")
            .as_nanos()
    );

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "name": "Test Member",
            "email": email,
            "password": "correct horse battery staple"
        }))
        .send()
        .await
        .expect("Failed to send register request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    (
        body["token"].as_str().expect("No token").to_string(),
        body["user"]["id"].as_i64().expect("No user id"),
    )
}

#[tokio::test]
#[ignore]
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_register_and_me() {
    let client = Client::new();
    let (token, user_id) = register_member(&client).await;

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["id"].as_i64(), Some(user_id));
    assert_eq!(body["role"], "member");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": "nobody@test.invalid",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_list_books_is_public() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body.is_array());
}

#[tokio::test]
#[ignore]
async fn test_borrow_requires_authentication() {
    let client = Client::new();

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({ "book_id": 1 }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_borrow_unknown_book() {
    let client = Client::new();
    let (token, _) = register_member(&client).await;

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "book_id": 999999 }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_my_loans_starts_empty() {
    let client = Client::new();
    let (token, _) = register_member(&client).await;

    let response = client
        .get(format!("{}/loans/my-loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
#[ignore]
async fn test_members_cannot_list_all_loans() {
    let client = Client::new();
    let (token, _) = register_member(&client).await;

    let response = client
        .get(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_members_cannot_read_reports() {
    let client = Client::new();
    let (token, _) = register_member(&client).await;

    let response = client
        .get(format!("{}/reports/statistics", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}
