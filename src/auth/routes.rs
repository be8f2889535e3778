//! Google OAuth flow routes
//!
//! Thin handlers over the session gate: every outcome is one of the two
//! fixed redirects.

use axum::{
    Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect},
    routing::get,
};

use super::gate::CallbackParams;
use super::middleware::SessionContext;
use crate::AppState;
use crate::error::AppError;

/// Create authentication router
///
/// Routes:
/// - GET /auth/google - Redirect to Google
/// - GET /auth/google/callback - OAuth callback
/// - GET /logout - Logout
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/google", get(google_redirect))
        .route("/auth/google/callback", get(google_callback))
        .route("/logout", get(logout))
}

/// GET /auth/google
///
/// Redirects the user to Google's authorization page.
async fn google_redirect(State(state): State<AppState>) -> impl IntoResponse {
    let url = state.gate.begin_login();
    Redirect::to(url.as_str())
}

/// GET /auth/google/callback
///
/// Handles the OAuth callback from Google. Success lands on `/profile`;
/// any failure redirects back to `/` via the error response mapping.
async fn google_callback(
    State(state): State<AppState>,
    ctx: SessionContext,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect, AppError> {
    state.gate.complete_login(&ctx.id, params).await?;
    Ok(Redirect::to("/profile"))
}

/// GET /logout
///
/// Clears the session's authentication state and redirects home.
async fn logout(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> Result<Redirect, AppError> {
    state.gate.logout(&ctx.id).await?;
    Ok(Redirect::to("/"))
}
