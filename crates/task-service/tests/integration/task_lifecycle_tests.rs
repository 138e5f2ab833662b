//! Integration tests for the task lifecycle and listing

use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use task_test_utils::{EnvelopeAssertions, TestTaskServer};

#[tokio::test]
async fn test_task_create_complete_delete() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestTaskServer::spawn().await?;
    let alice = server.register_user("Alice", "alice@example.com").await?;

    // Act: create
    let response = server
        .client()
        .post(format!("{}/api/v1/tasks", server.url()))
        .bearer_auth(&alice.token)
        .json(&json!({"title": "Write report", "description": "Quarterly numbers"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await?;
    created
        .assert_success()
        .assert_message("Task created successfully");
    assert_eq!(created["body"]["status"], "open");
    assert_eq!(created["body"]["description"], "Quarterly numbers");
    let path = format!("/api/v1/tasks/{}", created["body"]["id"]);

    // Act: complete
    let response = server.send(Method::PUT, &path, Some(&alice.token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let completed: Value = response.json().await?;
    completed.assert_message("Task updated successfully");
    assert_eq!(completed["body"]["status"], "done");

    // Completing twice is a conflict
    let response = server.send(Method::PUT, &path, Some(&alice.token)).await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    response
        .json::<Value>()
        .await?
        .assert_failure()
        .assert_message("Task status is already done");

    // Act: delete
    let response = server.send(Method::DELETE, &path, Some(&alice.token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    response
        .json::<Value>()
        .await?
        .assert_success()
        .assert_message("Task deleted successfully");

    // Assert: gone
    let response = server.send(Method::GET, &path, Some(&alice.token)).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_create_task_with_short_title_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestTaskServer::spawn().await?;
    let alice = server.register_user("Alice", "alice@example.com").await?;

    let response = server
        .client()
        .post(format!("{}/api/v1/tasks", server.url()))
        .bearer_auth(&alice.token)
        .json(&json!({"title": "ab"}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    response
        .json::<Value>()
        .await?
        .assert_failure()
        .assert_field_error("title");

    Ok(())
}

#[tokio::test]
async fn test_invalid_task_id_is_bad_request() -> Result<(), anyhow::Error> {
    let server = TestTaskServer::spawn().await?;
    let alice = server.register_user("Alice", "alice@example.com").await?;

    let response = server
        .send(Method::GET, "/api/v1/tasks/abc", Some(&alice.token))
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    response
        .json::<Value>()
        .await?
        .assert_message("Invalid task ID: abc");

    Ok(())
}

#[tokio::test]
async fn test_list_filters_by_status_and_search() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestTaskServer::spawn().await?;
    let alice = server.register_user("Alice", "alice@example.com").await?;
    let groceries = server.create_task(&alice.token, "Buy groceries").await?;
    server.create_task(&alice.token, "Book dentist").await?;
    server.create_task(&alice.token, "Buy birthday gift").await?;
    server
        .send(
            Method::PUT,
            &format!("/api/v1/tasks/{}", groceries["id"]),
            Some(&alice.token),
        )
        .await?;

    // Act
    let open_buys: Value = server
        .send(
            Method::GET,
            "/api/v1/tasks?status=OPEN&search=buy",
            Some(&alice.token),
        )
        .await?
        .json()
        .await?;
    let done: Value = server
        .send(Method::GET, "/api/v1/tasks?status=done", Some(&alice.token))
        .await?
        .json()
        .await?;

    // Assert
    assert_eq!(open_buys["body"]["totalElements"], 1);
    assert_eq!(open_buys["body"]["tasks"][0]["title"], "Buy birthday gift");
    assert_eq!(done["body"]["totalElements"], 1);
    assert_eq!(done["body"]["tasks"][0]["id"], groceries["id"]);

    Ok(())
}

#[tokio::test]
async fn test_list_paginates_and_sorts() -> Result<(), anyhow::Error> {
    let server = TestTaskServer::spawn().await?;
    let alice = server.register_user("Alice", "alice@example.com").await?;
    for title in ["Charlie", "Alpha", "Bravo"] {
        server.create_task(&alice.token, title).await?;
    }

    let body: Value = server
        .send(
            Method::GET,
            "/api/v1/tasks?sortBy=title&sortDirection=asc&page=1&size=2",
            Some(&alice.token),
        )
        .await?
        .json()
        .await?;

    let page = &body["body"];
    assert_eq!(page["currentPage"], 1);
    assert_eq!(page["size"], 2);
    assert_eq!(page["totalElements"], 3);
    assert_eq!(page["totalPages"], 2);
    assert_eq!(page["first"], false);
    assert_eq!(page["last"], true);
    assert_eq!(page["tasks"][0]["title"], "Charlie");

    Ok(())
}

#[tokio::test]
async fn test_list_rejects_invalid_status() -> Result<(), anyhow::Error> {
    let server = TestTaskServer::spawn().await?;
    let alice = server.register_user("Alice", "alice@example.com").await?;

    let response = server
        .send(
            Method::GET,
            "/api/v1/tasks?status=archived",
            Some(&alice.token),
        )
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    response
        .json::<Value>()
        .await?
        .assert_message("Invalid task status: archived. Must be 'open' or 'done'");

    Ok(())
}
