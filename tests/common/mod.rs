//! Common test utilities for E2E tests

use std::sync::Arc;

use authgate::auth::{Identity, IdentityProvider, MemorySessionStore};
use authgate::error::AppError;
use authgate::{AppState, config};
use axum::async_trait;
use tokio::net::TcpListener;
use url::Url;

/// Identity provider stub: no network, fixed identities per code
pub struct StubProvider;

/// Code the stub accepts for the default test user
pub const GOOD_CODE: &str = "good-code";
/// Code the stub accepts for a second, different user
pub const SECOND_CODE: &str = "second-code";
/// Code yielding a display name full of HTML markup
pub const MARKUP_CODE: &str = "markup-code";

#[async_trait]
impl IdentityProvider for StubProvider {
    fn begin_auth(&self) -> Url {
        Url::parse(
            "https://accounts.google.com/o/oauth2/v2/auth\
             ?response_type=code&client_id=test-client-id\
             &scope=profile+email&state=test-state",
        )
        .expect("stub auth URL parses")
    }

    async fn exchange_code(&self, code: &str) -> Result<Identity, AppError> {
        match code {
            GOOD_CODE => Ok(Identity {
                provider_id: "google-1".to_string(),
                display_name: "Ada Lovelace".to_string(),
                emails: vec!["ada@example.com".to_string()],
                picture: None,
            }),
            SECOND_CODE => Ok(Identity {
                provider_id: "google-2".to_string(),
                display_name: "Grace Hopper".to_string(),
                emails: vec!["grace@example.com".to_string()],
                picture: Some("https://example.com/grace.png".to_string()),
            }),
            MARKUP_CODE => Ok(Identity {
                provider_id: "google-3".to_string(),
                display_name: "<script>alert('x')</script>".to_string(),
                emails: vec![],
                picture: None,
            }),
            _ => Err(AppError::Exchange(format!("unknown code: {code}"))),
        }
    }
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        let state = AppState::with_parts(
            test_config(),
            Arc::new(MemorySessionStore::new()),
            Arc::new(StubProvider),
        );

        // Cookie-aware client that does not follow redirects, so every
        // Location header can be asserted on.
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build test client");

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());

        // Build router and spawn server in background
        let app = authgate::build_router(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, client }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Drive the callback with the given code and assert it landed on
    /// the profile page.
    pub async fn login(&self, code: &str) {
        let response = self
            .client
            .get(self.url(&format!(
                "/auth/google/callback?code={code}&state=test-state"
            )))
            .send()
            .await
            .expect("callback request succeeds");

        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/profile");
    }
}

/// Location header of a redirect response
pub fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
}

fn test_config() -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            domain: "localhost:3000".to_string(),
            protocol: "http".to_string(),
        },
        auth: config::AuthConfig {
            session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
            session_max_age: 3600,
            sweep_interval_seconds: 300,
            google: config::GoogleOAuthConfig {
                client_id: "test-client-id".to_string(),
                client_secret: "test-client-secret".to_string(),
                redirect_url: None,
            },
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}
