use std::net::SocketAddr;
use std::sync::Arc;
use task_service::auth::CredentialStore;
use task_service::config::Config;
use task_service::crypto::TokenCodec;
use task_service::middleware::AuthenticationGate;
use task_service::repositories::{MemoryStore, PgStore, TaskRepository, UserRepository};
use task_service::routes::{self, AppState};
use task_service::services::seeder;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "task_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Task Tracker");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!("Configuration loaded successfully");

    let codec = Arc::new(TokenCodec::new(&config.jwt_secret, config.token_ttl).map_err(|e| {
        error!("Failed to build token codec: {}", e);
        e
    })?);

    info!(algorithm = ?codec.algorithm(), "Token codec ready");

    // Select storage backend
    let (users, tasks, credentials): (
        Arc<dyn UserRepository>,
        Arc<dyn TaskRepository>,
        Arc<dyn CredentialStore>,
    ) = match config.database_url.as_deref() {
        Some(database_url) => {
            info!("Connecting to database...");
            let db_pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await
                .map_err(|e| {
                    error!("Failed to connect to database: {}", e);
                    e
                })?;

            sqlx::migrate!("../../migrations")
                .run(&db_pool)
                .await
                .map_err(|e| {
                    error!("Failed to run migrations: {}", e);
                    e
                })?;

            info!("Database connection established");
            let store = Arc::new(PgStore::new(db_pool));
            (store.clone(), store.clone(), store)
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory storage");
            let store = Arc::new(MemoryStore::new());
            (store.clone(), store.clone(), store)
        }
    };

    if config.seed_demo_data {
        let summary = seeder::seed_demo_data(users.as_ref(), tasks.as_ref(), config.bcrypt_cost)
            .await
            .map_err(|e| {
                error!("Failed to seed demo data: {}", e);
                e
            })?;
        info!(
            users = summary.users_created,
            tasks = summary.tasks_created,
            "Demo data seeded"
        );
    }

    let metrics_handle = routes::init_metrics_recorder().map_err(|e| {
        error!("Failed to install metrics recorder: {}", e);
        e
    })?;

    // Parse bind address before moving config
    let bind_address = config.bind_address.clone();

    let gate = Arc::new(AuthenticationGate::new(codec.clone(), credentials));

    // Create application state
    let state = Arc::new(AppState::new(config, codec, users, tasks).map_err(|e| {
        error!("Failed to prepare application state: {}", e);
        e
    })?);

    // Build application routes
    let app = routes::build_routes(state, gate, metrics_handle);

    // Parse bind address
    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Task Tracker listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Task Tracker stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
