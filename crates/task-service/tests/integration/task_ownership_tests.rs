//! Integration tests for per-task ownership
//!
//! A task is only visible to and mutable by the user who created it. Another
//! user's task is 403, a missing task is 404.

use reqwest::{Method, StatusCode};
use serde_json::Value;
use task_test_utils::{EnvelopeAssertions, TestTaskServer};

#[tokio::test]
async fn test_other_user_cannot_read_update_or_delete_task() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestTaskServer::spawn().await?;
    let alice = server.register_user("Alice", "alice@example.com").await?;
    let bob = server.register_user("Bob", "bob@example.com").await?;
    let task = server.create_task(&alice.token, "Alice's private task").await?;
    let path = format!("/api/v1/tasks/{}", task["id"]);

    // Act / Assert
    for (method, action) in [
        (Method::GET, "access"),
        (Method::PUT, "update"),
        (Method::DELETE, "delete"),
    ] {
        let response = server.send(method.clone(), &path, Some(&bob.token)).await?;

        assert_eq!(
            response.status(),
            StatusCode::FORBIDDEN,
            "{method} by a non-owner should be forbidden"
        );
        response
            .json::<Value>()
            .await?
            .assert_failure()
            .assert_message(&format!("User is not authorized to {action} this task"));
    }

    // The task is untouched
    let response = server.send(Method::GET, &path, Some(&alice.token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["body"]["status"], "open");

    Ok(())
}

#[tokio::test]
async fn test_missing_task_is_not_found_for_everyone() -> Result<(), anyhow::Error> {
    let server = TestTaskServer::spawn().await?;
    let alice = server.register_user("Alice", "alice@example.com").await?;

    let response = server
        .send(Method::GET, "/api/v1/tasks/424242", Some(&alice.token))
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    response
        .json::<Value>()
        .await?
        .assert_failure()
        .assert_message("Task not found with ID: 424242");

    Ok(())
}

#[tokio::test]
async fn test_listing_only_returns_own_tasks() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestTaskServer::spawn().await?;
    let alice = server.register_user("Alice", "alice@example.com").await?;
    let bob = server.register_user("Bob", "bob@example.com").await?;
    server.create_task(&alice.token, "Alice one").await?;
    server.create_task(&alice.token, "Alice two").await?;
    server.create_task(&bob.token, "Bob one").await?;

    // Act
    let response = server
        .send(Method::GET, "/api/v1/tasks", Some(&bob.token))
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["body"]["totalElements"], 1);
    let tasks = body["body"]["tasks"].as_array().cloned().unwrap_or_default();
    assert_eq!(tasks.len(), 1);
    assert!(tasks.iter().all(|t| t["userId"] == bob.id));

    Ok(())
}

#[tokio::test]
async fn test_owner_is_taken_from_token_not_body() -> Result<(), anyhow::Error> {
    let server = TestTaskServer::spawn().await?;
    let alice = server.register_user("Alice", "alice@example.com").await?;
    let bob = server.register_user("Bob", "bob@example.com").await?;

    let response = server
        .client()
        .post(format!("{}/api/v1/tasks", server.url()))
        .bearer_auth(&alice.token)
        .json(&serde_json::json!({"title": "Planted task", "userId": bob.id}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await?;
    assert_eq!(body["body"]["userId"], alice.id);

    Ok(())
}
