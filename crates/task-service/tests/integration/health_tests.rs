//! Integration tests for operational endpoints and routing fallbacks

use reqwest::StatusCode;
use task_test_utils::{EnvelopeAssertions, TestTaskServer};

#[tokio::test]
async fn test_health_endpoint_returns_ok() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestTaskServer::spawn().await?;

    // Act
    let response = reqwest::get(format!("{}/health", server.url())).await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_is_public() -> Result<(), anyhow::Error> {
    let server = TestTaskServer::spawn().await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_unknown_endpoint_returns_not_found_envelope() -> Result<(), anyhow::Error> {
    let server = TestTaskServer::spawn().await?;

    let response = server
        .send(reqwest::Method::DELETE, "/api/v1/unknown", None)
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json().await?;
    body.assert_failure()
        .assert_message("The requested endpoint 'DELETE /api/v1/unknown' was not found");

    Ok(())
}
