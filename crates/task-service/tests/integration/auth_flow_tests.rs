//! Integration tests for registration, login and logout

use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Instant;
use task_service::errors::INVALID_CREDENTIALS_MESSAGE;
use task_test_utils::{EnvelopeAssertions, TestTaskServer, TEST_PASSWORD};

#[tokio::test]
async fn test_register_returns_token_for_new_user() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestTaskServer::spawn().await?;

    // Act
    let response = server
        .client()
        .post(format!("{}/api/v1/auth/register", server.url()))
        .json(&json!({
            "name": "Alice",
            "email": "alice@example.com",
            "password": TEST_PASSWORD
        }))
        .send()
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await?;
    body.assert_success()
        .assert_message("User registered successfully");
    assert_eq!(body["body"]["tokenType"], "Bearer");
    assert_eq!(body["body"]["expiresIn"], 3600);
    assert_eq!(body["body"]["user"]["email"], "alice@example.com");
    assert!(
        body["body"]["user"].get("passwordHash").is_none(),
        "password hash must never leave the service"
    );

    let token = body["body"]["accessToken"].as_str().unwrap_or_default();
    let user_id = body["body"]["user"]["id"].as_i64().unwrap_or_default();
    assert_eq!(server.codec().verify(token)?, user_id.to_string());

    Ok(())
}

#[tokio::test]
async fn test_register_duplicate_email_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestTaskServer::spawn().await?;
    server.register_user("Alice", "alice@example.com").await?;

    let response = server
        .client()
        .post(format!("{}/api/v1/auth/register", server.url()))
        .json(&json!({
            "name": "Alice Again",
            "email": "alice@example.com",
            "password": TEST_PASSWORD
        }))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    body.assert_failure().assert_message("Email already exists");

    Ok(())
}

#[tokio::test]
async fn test_register_invalid_fields_report_each_field() -> Result<(), anyhow::Error> {
    let server = TestTaskServer::spawn().await?;

    let response = server
        .client()
        .post(format!("{}/api/v1/auth/register", server.url()))
        .json(&json!({"name": " ", "email": "not-an-email", "password": ""}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    body.assert_failure()
        .assert_field_error("name")
        .assert_field_error("email")
        .assert_field_error("password");

    Ok(())
}

#[tokio::test]
async fn test_register_name_is_measured_after_trimming() -> Result<(), anyhow::Error> {
    let server = TestTaskServer::spawn().await?;

    let response = server
        .client()
        .post(format!("{}/api/v1/auth/register", server.url()))
        .json(&json!({"name": " A ", "email": "a@example.com", "password": TEST_PASSWORD}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    response
        .json::<Value>()
        .await?
        .assert_failure()
        .assert_field_error("name");

    Ok(())
}

#[tokio::test]
async fn test_login_with_valid_credentials_returns_token() -> Result<(), anyhow::Error> {
    let server = TestTaskServer::spawn().await?;
    let alice = server.register_user("Alice", "alice@example.com").await?;

    let response = server.login(&alice.email, &alice.password).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    body.assert_success()
        .assert_message("User logged in successfully");
    let token = body["body"]["accessToken"].as_str().unwrap_or_default();
    assert_eq!(server.codec().verify(token)?, alice.id.to_string());

    Ok(())
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestTaskServer::spawn().await?;
    let alice = server.register_user("Alice", "alice@example.com").await?;

    // Act
    let wrong_password = server.login(&alice.email, "not-the-password").await?;
    let unknown_email = server.login("nobody@example.com", TEST_PASSWORD).await?;

    // Assert
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);

    let wrong_password: Value = wrong_password.json().await?;
    let unknown_email: Value = unknown_email.json().await?;
    wrong_password
        .assert_failure()
        .assert_message(INVALID_CREDENTIALS_MESSAGE);
    assert_eq!(wrong_password, unknown_email);

    Ok(())
}

#[tokio::test]
async fn test_login_unknown_email_takes_as_long_as_wrong_password() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestTaskServer::spawn().await?;
    let alice = server.register_user("Alice", "alice@example.com").await?;
    // Warm up connection pool and blocking threads
    server.login(&alice.email, "not-the-password").await?;

    // Act
    let start = Instant::now();
    server.login(&alice.email, "not-the-password").await?;
    let wrong_password_duration = start.elapsed();

    let start = Instant::now();
    server.login("nobody@example.com", "not-the-password").await?;
    let unknown_email_duration = start.elapsed();

    // Assert: proportional check to tolerate CI variance
    let time_diff = wrong_password_duration.abs_diff(unknown_email_duration);
    let max_time = wrong_password_duration.max(unknown_email_duration);
    let diff_percentage = (time_diff.as_millis() as f64 / max_time.as_millis() as f64) * 100.0;

    assert!(
        diff_percentage < 50.0,
        "Timing difference too large: {}ms ({:.1}% of {}ms)",
        time_diff.as_millis(),
        diff_percentage,
        max_time.as_millis()
    );

    Ok(())
}

#[tokio::test]
async fn test_logout_requires_identity() -> Result<(), anyhow::Error> {
    let server = TestTaskServer::spawn().await?;
    let alice = server.register_user("Alice", "alice@example.com").await?;

    let anonymous = server
        .send(reqwest::Method::POST, "/api/v1/auth/logout", None)
        .await?;
    let authenticated = server
        .send(reqwest::Method::POST, "/api/v1/auth/logout", Some(&alice.token))
        .await?;

    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    anonymous.json::<Value>().await?.assert_unauthorized();

    assert_eq!(authenticated.status(), StatusCode::OK);
    authenticated
        .json::<Value>()
        .await?
        .assert_success()
        .assert_message("User logged out successfully");

    Ok(())
}

#[tokio::test]
async fn test_token_survives_logout() -> Result<(), anyhow::Error> {
    let server = TestTaskServer::spawn().await?;
    let alice = server.register_user("Alice", "alice@example.com").await?;

    server
        .send(reqwest::Method::POST, "/api/v1/auth/logout", Some(&alice.token))
        .await?;
    let response = server
        .send(reqwest::Method::GET, "/api/v1/tasks", Some(&alice.token))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}
