//! Identity provider client
//!
//! The OAuth2 handshake is delegated to the `oauth2` crate; this module
//! only wires Google's endpoints together and maps the userinfo payload
//! into an [`Identity`]. The trait exists so the gate and the tests never
//! need network access.

use axum::async_trait;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use url::Url;

use super::identity::Identity;
use crate::config::GoogleOAuthConfig;
use crate::error::AppError;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

const USER_AGENT: &str = concat!("AuthGate/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// External identity provider
///
/// `begin_auth` builds the authorization URL the user is redirected to;
/// `exchange_code` turns a callback code into the authenticated identity.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn begin_auth(&self) -> Url;
    async fn exchange_code(&self, code: &str) -> Result<Identity, AppError>;
}

/// OAuth client type with auth URL, token URL and redirect URL set.
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// Google user info from the userinfo API
#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

impl GoogleUserInfo {
    fn into_identity(self) -> Identity {
        let GoogleUserInfo {
            id,
            email,
            name,
            picture,
        } = self;
        let display_name = name
            .or_else(|| email.clone())
            .unwrap_or_else(|| id.clone());
        Identity {
            provider_id: id,
            display_name,
            emails: email.into_iter().collect(),
            picture,
        }
    }
}

/// Google OAuth2 authorization-code client
pub struct GoogleProvider {
    client: ConfiguredClient,
    http: reqwest::Client,
}

impl GoogleProvider {
    /// Build a provider from credentials and the registered callback URL
    ///
    /// # Errors
    /// Returns a `Config` error if any endpoint URL fails to parse.
    pub fn new(google: &GoogleOAuthConfig, redirect_url: &str) -> Result<Self, AppError> {
        let client = BasicClient::new(ClientId::new(google.client_id.clone()))
            .set_client_secret(ClientSecret::new(google.client_secret.clone()))
            .set_auth_uri(
                AuthUrl::new(GOOGLE_AUTH_URL.to_string())
                    .map_err(|e| AppError::Config(format!("invalid auth URL: {e}")))?,
            )
            .set_token_uri(
                TokenUrl::new(GOOGLE_TOKEN_URL.to_string())
                    .map_err(|e| AppError::Config(format!("invalid token URL: {e}")))?,
            )
            .set_redirect_uri(
                RedirectUrl::new(redirect_url.to_string())
                    .map_err(|e| AppError::Config(format!("invalid redirect URL: {e}")))?,
            );

        // No redirect following on the token endpoint; a bounded timeout so
        // a provider outage surfaces as a failed login, not a hung request.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self { client, http })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    /// Authorization URL requesting the `profile` and `email` scopes.
    ///
    /// The URL carries a random `state` parameter because the grant
    /// requires one; the callback does not validate it.
    fn begin_auth(&self) -> Url {
        let (auth_url, _csrf_state) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("profile".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .url();
        auth_url
    }

    async fn exchange_code(&self, code: &str) -> Result<Identity, AppError> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_owned()))
            .request_async(&self.http)
            .await
            .map_err(|e| AppError::Exchange(format!("token exchange failed: {e}")))?;

        let response = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(token.access_token().secret())
            .send()
            .await
            .map_err(|e| AppError::Exchange(format!("userinfo request failed: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::Exchange(format!("userinfo request rejected: {e}")))?;

        let profile: GoogleUserInfo = response
            .json()
            .await
            .map_err(|e| AppError::Exchange(format!("userinfo payload invalid: {e}")))?;

        tracing::debug!(provider_id = %profile.id, "Fetched user info from Google");
        Ok(profile.into_identity())
    }
}
