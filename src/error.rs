//! Error types for AuthGate
//!
//! All errors in the application are converted to `AppError`. Login-flow
//! failures recover as redirects back to the home page; everything else
//! becomes a proper HTTP error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// The identity provider reported an error on the callback,
    /// e.g. the user denied consent.
    #[error("identity provider denied the login: {0}")]
    ProviderDenied(String),

    /// The authorization code could not be exchanged for an identity
    /// (token endpoint failure, userinfo failure, network error).
    #[error("authorization code exchange failed: {0}")]
    Exchange(String),

    /// A protected route was requested without a logged-in session.
    #[error("authentication required")]
    NotAuthenticated,

    /// Session cookie was malformed or carried a bad signature.
    #[error("invalid session token")]
    InvalidSessionToken,

    /// Configuration error (500)
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Login-flow failures (`ProviderDenied`, `Exchange`,
    /// `NotAuthenticated`, `InvalidSessionToken`) redirect to `/` and are
    /// never fatal. `Config` and `Internal` map to 500 with a JSON body.
    fn into_response(self) -> Response {
        use axum::Json;

        let error_type = match &self {
            AppError::ProviderDenied(_) => "provider_denied",
            AppError::Exchange(_) => "exchange_failed",
            AppError::NotAuthenticated => "not_authenticated",
            AppError::InvalidSessionToken => "invalid_session_token",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        };

        // Record error metric
        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[error_type]).inc();

        match self {
            AppError::ProviderDenied(reason) => {
                tracing::warn!(%reason, "Provider denied login; redirecting to home");
                Redirect::to("/").into_response()
            }
            AppError::Exchange(reason) => {
                tracing::warn!(%reason, "Code exchange failed; redirecting to home");
                Redirect::to("/").into_response()
            }
            AppError::NotAuthenticated | AppError::InvalidSessionToken => {
                Redirect::to("/").into_response()
            }
            AppError::Config(message) => {
                tracing::error!(%message, "Configuration error");
                let body = Json(serde_json::json!({ "error": message }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
            AppError::Internal(error) => {
                tracing::error!(error = %error, "Internal server error");
                let body = Json(serde_json::json!({ "error": "Internal server error" }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .expect("location header")
    }

    #[test]
    fn flow_errors_redirect_home() {
        for error in [
            AppError::ProviderDenied("access_denied".to_string()),
            AppError::Exchange("token endpoint unreachable".to_string()),
            AppError::NotAuthenticated,
            AppError::InvalidSessionToken,
        ] {
            let response = error.into_response();
            assert!(response.status().is_redirection());
            assert_eq!(location(&response), "/");
        }
    }

    #[test]
    fn internal_errors_are_500() {
        let response = AppError::Internal(anyhow::anyhow!("boom")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = AppError::Config("bad secret".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
