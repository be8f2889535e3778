//! AuthGate - a minimal Google OAuth2 login server
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - HTML pages (home, profile)                                │
//! │  - Auth endpoints (login redirect, callback, logout)         │
//! │  - Metrics endpoint                                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Session Authentication Gate                     │
//! │  - Anonymous/Authenticated state machine                     │
//! │  - Admits or redirects protected requests                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Collaborators                             │
//! │  - Session store (in-memory)                                 │
//! │  - Identity provider client (Google, via oauth2)             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers for pages and metrics
//! - `auth`: gate, sessions, provider client, middleware, auth routes
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;

use std::sync::Arc;

use crate::auth::{GoogleProvider, IdentityProvider, MemorySessionStore, SessionGate, SessionStore};

/// Application state shared across all handlers
///
/// This struct is cloned for each request; all fields are `Arc`s.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Session store
    pub sessions: Arc<dyn SessionStore>,

    /// Session authentication gate
    pub gate: Arc<SessionGate>,
}

impl AppState {
    /// Initialize application state with the production collaborators:
    /// an in-memory session store and the Google provider client.
    ///
    /// # Errors
    /// Returns error if the provider client cannot be built from the
    /// configuration.
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        let provider = GoogleProvider::new(&config.auth.google, &config.oauth_redirect_url())?;
        Ok(Self::with_parts(
            config,
            Arc::new(MemorySessionStore::new()),
            Arc::new(provider),
        ))
    }

    /// Assemble state from explicit collaborators.
    ///
    /// Tests inject a stub provider and their own store here.
    pub fn with_parts(
        config: config::AppConfig,
        sessions: Arc<dyn SessionStore>,
        provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        let config = Arc::new(config);
        let gate = Arc::new(SessionGate::new(
            sessions.clone(),
            provider,
            config.session_ttl(),
        ));
        Self {
            config,
            sessions,
            gate,
        }
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments. `/health` and `/metrics`
/// sit outside the session middleware so probes do not mint sessions.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, routing::get};
    use tower_http::trace::TraceLayer;

    Router::new()
        .merge(api::pages_router())
        .merge(auth::auth_router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::session_context,
        ))
        .layer(TraceLayer::new_for_http())
        .route("/health", get(health_check))
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}
