//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, SupabaseAuthAdapter},
    config::Config,
    error::ApiError,
    web::{self, state::AppState},
};
use chefito_core::{QuotaTracker, SystemClock};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?;
    let identity = Arc::new(SupabaseAuthAdapter::new(
        http_client,
        config.supabase_url.clone(),
        config.supabase_service_key.clone(),
    ));

    let quota = QuotaTracker::new(
        db_adapter.clone(),
        Arc::new(SystemClock),
        config.quota_limits,
    );

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        &config,
        quota,
        db_adapter.clone(),
        db_adapter,
        identity,
    ));

    // --- 5. Create the Web Router ---
    let app = web::router(app_state);

    // --- 6. Start the Server ---
    info!(
        free = config.quota_limits.free,
        premium = config.quota_limits.premium,
        "Weekly recipe limits"
    );
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/api/docs",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
