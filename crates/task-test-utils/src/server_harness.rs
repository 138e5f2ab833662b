//! Test server harness for E2E testing
//!
//! Provides TestTaskServer for spawning real task service instances in tests.

use crate::crypto_fixtures::{encode_secret, test_jwt_secret};
use anyhow::Context;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use task_service::config::{Config, MIN_BCRYPT_COST};
use task_service::crypto::TokenCodec;
use task_service::middleware::AuthenticationGate;
use task_service::repositories::MemoryStore;
use task_service::routes::{self, AppState};
use tokio::task::JoinHandle;

/// Password used by [`TestTaskServer::register_user`].
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// A user registered through the HTTP API
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub token: String,
}

/// Test harness for spawning the task service in E2E tests
///
/// Backed by the in-memory store, so no database is required.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_list_tasks_e2e() -> Result<(), anyhow::Error> {
///     let server = TestTaskServer::spawn().await?;
///     let alice = server.register_user("Alice", "alice@example.com").await?;
///
///     let response = server
///         .client()
///         .get(format!("{}/api/v1/tasks", server.url()))
///         .bearer_auth(&alice.token)
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestTaskServer {
    addr: SocketAddr,
    config: Config,
    codec: Arc<TokenCodec>,
    store: Arc<MemoryStore>,
    client: reqwest::Client,
    _handle: JoinHandle<()>,
}

impl TestTaskServer {
    /// Spawn a server with the default test secret and a one hour token lifetime.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_secret(&test_jwt_secret(), 3600).await
    }

    /// Spawn a server with a specific signing secret and token lifetime.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Use the minimum bcrypt cost to keep tests fast
    /// - Start the HTTP server in the background
    pub async fn spawn_with_secret(
        secret: &[u8],
        ttl_seconds: u64,
    ) -> Result<Self, anyhow::Error> {
        let config = Config::from_vars(&HashMap::from([
            ("JWT_SECRET_KEY".to_string(), encode_secret(secret)),
            ("JWT_EXPIRATION_SECONDS".to_string(), ttl_seconds.to_string()),
            ("BCRYPT_COST".to_string(), MIN_BCRYPT_COST.to_string()),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ]))
        .map_err(|e| anyhow::anyhow!("Failed to build test config: {}", e))?;

        let codec = Arc::new(
            TokenCodec::new(&config.jwt_secret, config.token_ttl)
                .map_err(|e| anyhow::anyhow!("Failed to build token codec: {}", e))?,
        );
        let store = Arc::new(MemoryStore::new());
        let gate = Arc::new(AuthenticationGate::new(codec.clone(), store.clone()));

        let state = Arc::new(
            AppState::new(config.clone(), codec.clone(), store.clone(), store.clone())
                .map_err(|e| anyhow::anyhow!("Failed to build app state: {}", e))?,
        );

        // Note: This may fail if already installed in the test process.
        // In that case, we create a new recorder without installing it globally.
        let metrics_handle = match routes::init_metrics_recorder() {
            Ok(handle) => handle,
            Err(_) => {
                use metrics_exporter_prometheus::PrometheusBuilder;
                let recorder = PrometheusBuilder::new().build_recorder();
                recorder.handle()
            }
        };

        let app = routes::build_routes(state, gate, metrics_handle);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        // Spawn server in background
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            codec,
            store,
            client: reqwest::Client::new(),
            _handle: handle,
        })
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The codec the server signs and verifies with
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Direct access to the backing store, bypassing HTTP
    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// Shared HTTP client
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Register a user with [`TEST_PASSWORD`] and return its id and token.
    pub async fn register_user(&self, name: &str, email: &str) -> Result<TestUser, anyhow::Error> {
        let response = self
            .client
            .post(format!("{}/api/v1/auth/register", self.url()))
            .json(&json!({"name": name, "email": email, "password": TEST_PASSWORD}))
            .send()
            .await?;

        anyhow::ensure!(
            response.status() == 201,
            "register returned {}",
            response.status()
        );

        let body: Value = response.json().await?;
        Ok(TestUser {
            id: body["body"]["user"]["id"]
                .as_i64()
                .context("register response missing user id")?,
            email: email.to_string(),
            password: TEST_PASSWORD.to_string(),
            token: body["body"]["accessToken"]
                .as_str()
                .context("register response missing access token")?
                .to_string(),
        })
    }

    /// Log in and return the raw response.
    pub async fn login(&self, email: &str, password: &str) -> Result<reqwest::Response, anyhow::Error> {
        Ok(self
            .client
            .post(format!("{}/api/v1/auth/login", self.url()))
            .json(&json!({"email": email, "password": password}))
            .send()
            .await?)
    }

    /// Create a task for `token` and return the task body.
    pub async fn create_task(&self, token: &str, title: &str) -> Result<Value, anyhow::Error> {
        let response = self
            .client
            .post(format!("{}/api/v1/tasks", self.url()))
            .bearer_auth(token)
            .json(&json!({"title": title}))
            .send()
            .await?;

        anyhow::ensure!(
            response.status() == 201,
            "create task returned {}",
            response.status()
        );

        let body: Value = response.json().await?;
        Ok(body["body"].clone())
    }

    /// Send an authenticated request to `path` with `method`.
    pub async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        token: Option<&str>,
    ) -> Result<reqwest::Response, anyhow::Error> {
        let mut request = self.client.request(method, format!("{}{}", self.url(), path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        Ok(request.send().await?)
    }
}

impl Drop for TestTaskServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
