//! Integration tests for the authentication gate
//!
//! Exercise every way a bearer token can fail. Protected routes answer every
//! failure with the same fixed 401 envelope; lenient routes (register, login,
//! health) carry on anonymously.

use jsonwebtoken::Algorithm;
use reqwest::StatusCode;
use serde_json::{json, Value};
use task_test_utils::{
    test_secret, unsigned_token, with_corrupted_signature, with_swapped_payload,
    EnvelopeAssertions, TestTaskServer, TestTokenBuilder,
};

async fn assert_rejected(
    server: &TestTaskServer,
    path: &str,
    token: &str,
) -> Result<(), anyhow::Error> {
    let response = server
        .send(reqwest::Method::GET, path, Some(token))
        .await?;

    assert_eq!(
        response.status(),
        StatusCode::UNAUTHORIZED,
        "token should be rejected on {path}"
    );
    response.json::<Value>().await?.assert_unauthorized();

    Ok(())
}

// ============================================================================
// Missing credentials
// ============================================================================

#[tokio::test]
async fn test_protected_route_without_header_returns_401() -> Result<(), anyhow::Error> {
    let server = TestTaskServer::spawn().await?;

    let response = server
        .send(reqwest::Method::GET, "/api/v1/tasks", None)
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    response.json::<Value>().await?.assert_unauthorized();

    Ok(())
}

#[tokio::test]
async fn test_non_bearer_scheme_is_treated_as_absent() -> Result<(), anyhow::Error> {
    let server = TestTaskServer::spawn().await?;
    let alice = server.register_user("Alice", "alice@example.com").await?;

    let basic = server
        .client()
        .get(format!("{}/api/v1/tasks", server.url()))
        .header("Authorization", format!("Basic {}", alice.token))
        .send()
        .await?;
    let lowercase = server
        .client()
        .get(format!("{}/health", server.url()))
        .header("Authorization", format!("bearer {}", alice.token))
        .send()
        .await?;

    assert_eq!(basic.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        lowercase.status(),
        StatusCode::OK,
        "unrecognized scheme on a lenient route proceeds anonymously"
    );

    Ok(())
}

// ============================================================================
// Valid tokens
// ============================================================================

#[tokio::test]
async fn test_externally_minted_token_with_shared_secret_is_accepted(
) -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestTaskServer::spawn().await?;
    let alice = server.register_user("Alice", "alice@example.com").await?;
    let token = TestTokenBuilder::new().for_user_id(alice.id).build();

    // Act
    let response = server
        .send(reqwest::Method::GET, "/api/v1/tasks", Some(&token))
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_token_for_deleted_or_unknown_user_is_anonymous() -> Result<(), anyhow::Error> {
    let server = TestTaskServer::spawn().await?;
    let ghost = TestTokenBuilder::new().for_user_id(9_999).build();

    let protected = server
        .send(reqwest::Method::GET, "/api/v1/tasks", Some(&ghost))
        .await?;
    let lenient = server
        .send(reqwest::Method::GET, "/health", Some(&ghost))
        .await?;

    assert_eq!(protected.status(), StatusCode::UNAUTHORIZED);
    protected.json::<Value>().await?.assert_unauthorized();
    assert_eq!(lenient.status(), StatusCode::OK);

    Ok(())
}

// ============================================================================
// Invalid tokens
// ============================================================================

#[tokio::test]
async fn test_expired_token_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestTaskServer::spawn().await?;
    let alice = server.register_user("Alice", "alice@example.com").await?;
    let expired = TestTokenBuilder::new()
        .for_user_id(alice.id)
        .expired_seconds_ago(1)
        .build();

    assert_rejected(&server, "/api/v1/tasks", &expired).await
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestTaskServer::spawn().await?;
    let alice = server.register_user("Alice", "alice@example.com").await?;
    let forged = TestTokenBuilder::new()
        .for_user_id(alice.id)
        .signed_with(&test_secret(99, 32))
        .build();

    assert_rejected(&server, "/api/v1/tasks", &forged).await
}

#[tokio::test]
async fn test_corrupted_signature_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestTaskServer::spawn().await?;
    let alice = server.register_user("Alice", "alice@example.com").await?;

    assert_rejected(
        &server,
        "/api/v1/tasks",
        &with_corrupted_signature(&alice.token),
    )
    .await
}

#[tokio::test]
async fn test_payload_swapped_to_other_user_is_rejected() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestTaskServer::spawn().await?;
    let alice = server.register_user("Alice", "alice@example.com").await?;
    let bob = server.register_user("Bob", "bob@example.com").await?;
    let claims = TestTokenBuilder::new().for_user_id(bob.id).claims();

    // Act / Assert: Alice's signature does not cover Bob's subject
    assert_rejected(
        &server,
        "/api/v1/tasks",
        &with_swapped_payload(&alice.token, &claims),
    )
    .await
}

#[tokio::test]
async fn test_algorithm_downgrade_and_none_are_rejected() -> Result<(), anyhow::Error> {
    let server = TestTaskServer::spawn().await?;
    let alice = server.register_user("Alice", "alice@example.com").await?;

    let hs384 = TestTokenBuilder::new()
        .for_user_id(alice.id)
        .with_algorithm(Algorithm::HS384)
        .build();
    let unsigned = unsigned_token(&TestTokenBuilder::new().for_user_id(alice.id).claims());

    assert_rejected(&server, "/api/v1/tasks", &hs384).await?;
    assert_rejected(&server, "/api/v1/tasks", &unsigned).await
}

#[tokio::test]
async fn test_token_without_expiry_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestTaskServer::spawn().await?;
    let alice = server.register_user("Alice", "alice@example.com").await?;
    let token = TestTokenBuilder::new()
        .for_user_id(alice.id)
        .without_expiry()
        .build();

    assert_rejected(&server, "/api/v1/tasks", &token).await
}

#[tokio::test]
async fn test_non_numeric_subject_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestTaskServer::spawn().await?;
    let token = TestTokenBuilder::new().for_subject("alice").build();

    assert_rejected(&server, "/api/v1/tasks", &token).await
}

#[tokio::test]
async fn test_invalid_token_on_lenient_route_proceeds_anonymously() -> Result<(), anyhow::Error> {
    let server = TestTaskServer::spawn().await?;

    let response = server
        .client()
        .post(format!("{}/api/v1/auth/register", server.url()))
        .bearer_auth("not.a.token")
        .json(&json!({
            "name": "Alice",
            "email": "alice@example.com",
            "password": task_test_utils::TEST_PASSWORD
        }))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::CREATED);
    response.json::<Value>().await?.assert_success();

    Ok(())
}

#[tokio::test]
async fn test_oversized_token_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestTaskServer::spawn().await?;
    let padding = "x".repeat(common::jwt::MAX_JWT_SIZE_BYTES);
    let token = TestTokenBuilder::new()
        .for_user_id(1)
        .with_claim("padding", json!(padding))
        .build();

    assert_rejected(&server, "/api/v1/tasks", &token).await
}
