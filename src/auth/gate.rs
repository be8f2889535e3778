//! Session authentication gate
//!
//! The state machine between the OAuth redirect flow and the session
//! store. Two states per session: Anonymous and Authenticated. A
//! successful callback moves a session to Authenticated (replacing any
//! previous identity); logout moves it back; every failure leaves it
//! Anonymous.

use std::sync::Arc;

use serde::Deserialize;
use url::Url;

use super::identity::Identity;
use super::provider::IdentityProvider;
use super::session::{Session, SessionId, SessionStore};
use crate::error::AppError;
use crate::metrics;

/// Query parameters the provider sends to the callback route
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    /// Authorization code, present on success
    pub code: Option<String>,
    /// Opaque state echoed by the provider. Carried, not validated.
    pub state: Option<String>,
    /// Provider error code, e.g. "access_denied"
    pub error: Option<String>,
}

/// Gate between inbound requests, the OAuth flow and the session store
///
/// Both collaborators are injected trait objects, so the gate is testable
/// without network access or a shared process-wide store.
pub struct SessionGate {
    store: Arc<dyn SessionStore>,
    provider: Arc<dyn IdentityProvider>,
    session_ttl: chrono::Duration,
}

impl SessionGate {
    pub fn new(
        store: Arc<dyn SessionStore>,
        provider: Arc<dyn IdentityProvider>,
        session_ttl: chrono::Duration,
    ) -> Self {
        Self {
            store,
            provider,
            session_ttl,
        }
    }

    /// Start a login: the URL the user should be redirected to.
    ///
    /// Always succeeds; no precondition on session state.
    pub fn begin_login(&self) -> Url {
        self.provider.begin_auth()
    }

    /// Complete a login from the provider callback.
    ///
    /// On success the session is marked authenticated and the returned
    /// identity replaces any previously stored one. On any failure the
    /// session is left unauthenticated. No retry.
    pub async fn complete_login(
        &self,
        id: &SessionId,
        params: CallbackParams,
    ) -> Result<Identity, AppError> {
        if let Some(reason) = params.error {
            metrics::LOGINS_TOTAL.with_label_values(&["denied"]).inc();
            return Err(AppError::ProviderDenied(reason));
        }

        let Some(code) = params.code else {
            metrics::LOGINS_TOTAL.with_label_values(&["denied"]).inc();
            return Err(AppError::ProviderDenied(
                "callback carried no authorization code".to_string(),
            ));
        };

        let identity = match self.provider.exchange_code(&code).await {
            Ok(identity) => identity,
            Err(error) => {
                metrics::LOGINS_TOTAL
                    .with_label_values(&["exchange_failed"])
                    .inc();
                return Err(error);
            }
        };

        // The record may have expired between the redirect and the
        // callback; start a fresh one in that case.
        let mut session = self
            .store
            .get(id)
            .await?
            .unwrap_or_else(|| Session::anonymous(self.session_ttl));
        session.attach_identity(identity.clone());
        self.store.set(id, session).await?;

        metrics::LOGINS_TOTAL.with_label_values(&["success"]).inc();
        tracing::info!(provider_id = %identity.provider_id, "Login completed");
        Ok(identity)
    }

    /// Admit the request iff the session is authenticated with an
    /// identity attached.
    pub async fn require_auth(&self, id: &SessionId) -> Result<Identity, AppError> {
        match self.store.get(id).await? {
            Some(Session {
                authenticated: true,
                identity: Some(identity),
                ..
            }) => Ok(identity),
            _ => Err(AppError::NotAuthenticated),
        }
    }

    /// Clear authentication state, regardless of prior state. Idempotent.
    pub async fn logout(&self, id: &SessionId) -> Result<(), AppError> {
        if let Some(mut session) = self.store.get(id).await? {
            session.clear();
            self.store.set(id, session).await?;
        }
        metrics::LOGOUTS_TOTAL.inc();
        tracing::debug!(session_id = %id, "Session logged out");
        Ok(())
    }
}
