//! HTTP routes for the task service.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::crypto::{dummy_password_hash, TokenCodec};
use crate::errors::TaskError;
use crate::handlers;
use crate::middleware::{
    authenticate, http_metrics_middleware, require_identity, AuthenticationGate,
};
use crate::repositories::{TaskRepository, UserRepository};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub use crate::observability::metrics::init_metrics_recorder;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,

    /// Process-wide token codec; immutable after startup.
    pub codec: Arc<TokenCodec>,

    pub users: Arc<dyn UserRepository>,

    pub tasks: Arc<dyn TaskRepository>,

    /// Verified in place of a stored hash when a login names an unknown
    /// email; hashed at the configured bcrypt cost.
    pub dummy_password_hash: String,
}

impl AppState {
    /// Assemble the state, hashing the login dummy password at
    /// `config.bcrypt_cost`.
    pub fn new(
        config: Config,
        codec: Arc<TokenCodec>,
        users: Arc<dyn UserRepository>,
        tasks: Arc<dyn TaskRepository>,
    ) -> Result<Self, TaskError> {
        let dummy_password_hash = dummy_password_hash(config.bcrypt_cost)?;

        Ok(Self {
            config,
            codec,
            users,
            tasks,
            dummy_password_hash,
        })
    }
}

/// Build the application routes.
///
/// - `/health` - liveness probe (lenient auth)
/// - `/metrics` - Prometheus metrics (no auth)
/// - `/api/v1/auth/register`, `/api/v1/auth/login` - lenient auth
/// - `/api/v1/auth/logout` - identity required
/// - `/api/v1/tasks`, `/api/v1/tasks/:id` - identity required
/// - everything else - 404 envelope
pub fn build_routes(
    state: Arc<AppState>,
    gate: Arc<AuthenticationGate>,
    metrics_handle: PrometheusHandle,
) -> Router {
    // Identity attached when proven; anonymous otherwise.
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/v1/auth/register", post(handlers::register))
        .route("/api/v1/auth/login", post(handlers::login))
        .route_layer(middleware::from_fn_with_state(gate.clone(), authenticate))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Handlers only run with a proven identity.
    let protected_routes = Router::new()
        .route("/api/v1/auth/logout", post(handlers::logout))
        .route(
            "/api/v1/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route(
            "/api/v1/tasks/:id",
            get(handlers::get_task)
                .put(handlers::complete_task)
                .delete(handlers::delete_task),
        )
        .route_layer(middleware::from_fn_with_state(gate, require_identity))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::repositories::MemoryStore;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use tower::ServiceExt;

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    fn test_app() -> (Router, Arc<TokenCodec>, Arc<MemoryStore>) {
        let secret = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, [5u8; 32]);
        let config = Config::from_vars(&HashMap::from([
            ("JWT_SECRET_KEY".to_string(), secret),
            ("JWT_EXPIRATION_SECONDS".to_string(), "3600".to_string()),
            ("BCRYPT_COST".to_string(), "10".to_string()),
        ]))
        .unwrap();

        let codec = Arc::new(TokenCodec::new(&config.jwt_secret, config.token_ttl).unwrap());
        let store = Arc::new(MemoryStore::new());
        let gate = Arc::new(AuthenticationGate::new(codec.clone(), store.clone()));
        let state = Arc::new(
            AppState::new(config, codec.clone(), store.clone(), store.clone()).unwrap(),
        );
        let handle = PrometheusBuilder::new().build_recorder().handle();

        (build_routes(state, gate, handle), codec, store)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let (app, _, _) = test_app();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_tasks_require_identity() {
        let (app, _, _) = test_app();
        let response = app
            .oneshot(Request::get("/api/v1/tasks").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_route_is_envelope_404() {
        let (app, _, _) = test_app();
        let response = app
            .oneshot(Request::get("/api/v1/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({
                "success": false,
                "message": "The requested endpoint 'GET /api/v1/nope' was not found",
                "errors": null
            })
        );
    }

    #[tokio::test]
    async fn test_malformed_json_is_400_envelope() {
        let (app, _, _) = test_app();
        let response = app
            .oneshot(
                Request::post("/api/v1/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "Invalid request body");
    }

    #[tokio::test]
    async fn test_create_task_with_token() {
        let (app, codec, store) = test_app();
        let user = crate::repositories::UserRepository::create_user(
            store.as_ref(),
            crate::models::NewUser {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                password_hash: "$2b$10$hash".to_string(),
            },
        )
        .await
        .unwrap();
        let token = codec.issue(&user.id.to_string()).unwrap();

        let response = app
            .oneshot(
                Request::post("/api/v1/tasks")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"title":"Write docs"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Task created successfully");
        assert_eq!(body["body"]["status"], "open");
        assert_eq!(body["body"]["userId"], user.id);
    }

    #[tokio::test]
    async fn test_invalid_sort_field_is_400() {
        let (app, codec, store) = test_app();
        let user = crate::repositories::UserRepository::create_user(
            store.as_ref(),
            crate::models::NewUser {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                password_hash: "$2b$10$hash".to_string(),
            },
        )
        .await
        .unwrap();
        let token = codec.issue(&user.id.to_string()).unwrap();

        let response = app
            .oneshot(
                Request::get("/api/v1/tasks?sortBy=password")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_app_state_dummy_hash_matches_configured_cost() {
        let (_, codec, store) = test_app();
        let secret = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, [5u8; 32]);
        let config = Config::from_vars(&HashMap::from([
            ("JWT_SECRET_KEY".to_string(), secret),
            ("JWT_EXPIRATION_SECONDS".to_string(), "3600".to_string()),
            ("BCRYPT_COST".to_string(), "11".to_string()),
        ]))
        .unwrap();

        let state = AppState::new(config, codec, store.clone(), store).unwrap();

        assert!(state.dummy_password_hash.starts_with("$2b$11$"));
    }
}
