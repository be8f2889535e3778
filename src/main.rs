//! AuthGate binary entry point

use authgate::auth::SessionStore as _;
use authgate::{AppState, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Initialize tracing/logging
/// 2. Initialize metrics
/// 3. Load configuration from file and environment
/// 4. Initialize AppState
/// 5. Build Axum router
/// 6. Start background session sweeper
/// 7. Start HTTP server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize tracing/logging
    let log_format =
        std::env::var("AUTHGATE__LOGGING__FORMAT").unwrap_or_else(|_| "pretty".to_string());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "authgate=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "authgate=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!("Starting AuthGate...");

    // 2. Initialize metrics
    authgate::metrics::init_metrics();

    // 3. Load configuration
    let config = config::AppConfig::load()?;
    tracing::info!(
        base_url = %config.server.base_url(),
        callback = %config.oauth_redirect_url(),
        "Configuration loaded"
    );

    // 4. Initialize application state
    let state = AppState::new(config.clone())?;

    // 5. Build Axum router
    let app = authgate::build_router(state.clone());

    // 6. Start background session sweeper
    spawn_session_sweep_task(state.clone());

    // 7. Start HTTP server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Public URL: {}", config.server.base_url());

    axum::serve(listener, app).await?;

    Ok(())
}

/// Spawn the background task that reaps expired sessions
fn spawn_session_sweep_task(state: AppState) {
    tokio::spawn(async move {
        let interval_secs = state.config.auth.sweep_interval_seconds.max(1);
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));

        // Consume the immediate first tick so the first sweep waits a
        // full interval.
        interval.tick().await;

        loop {
            interval.tick().await;

            match state.sessions.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "Expired sessions purged"),
                Err(error) => tracing::error!(%error, "Session purge failed"),
            }
        }
    });

    tracing::info!("Session sweep task spawned");
}
