//! Session records and the session store
//!
//! Sessions live server-side, keyed by an opaque random id. The client only
//! ever holds the id, HMAC-signed so a forged cookie cannot address another
//! session.

use std::collections::HashMap;
use std::fmt;

use axum::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::identity::Identity;
use crate::error::AppError;
use crate::metrics;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Opaque session identifier (256 random bits, base64url)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        use base64::{Engine as _, engine::general_purpose};
        use rand::RngCore;

        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-side session record
///
/// A request counts as logged in iff `authenticated` is set and an
/// identity is attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub authenticated: bool,
    pub identity: Option<Identity>,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// When the session expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Fresh anonymous session with the given lifetime
    pub fn anonymous(ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            authenticated: false,
            identity: None,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    /// The logged-in invariant: authenticated with an identity attached
    pub fn is_logged_in(&self) -> bool {
        self.authenticated && self.identity.is_some()
    }

    /// Mark the session authenticated, replacing any previous identity
    pub fn attach_identity(&mut self, identity: Identity) {
        self.authenticated = true;
        self.identity = Some(identity);
    }

    /// Return the session to the anonymous state
    pub fn clear(&mut self) {
        self.authenticated = false;
        self.identity = None;
    }
}

/// Create a signed cookie token for a session id
///
/// Token format: `{id}.{base64(hmac_sha256(id))}`
pub fn sign_session_id(id: &SessionId, secret: &str) -> Result<String, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid session secret: {e}")))?;
    mac.update(id.as_str().as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", id.as_str(), signature_b64))
}

/// Verify a signed cookie token and recover the session id
///
/// # Errors
/// Returns `InvalidSessionToken` if the token is malformed or the
/// signature does not match.
pub fn verify_session_token(token: &str, secret: &str) -> Result<SessionId, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let Some((id, signature_b64)) = token.split_once('.') else {
        return Err(AppError::InvalidSessionToken);
    };

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid session secret: {e}")))?;
    mac.update(id.as_bytes());

    let expected_signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::InvalidSessionToken)?;

    mac.verify_slice(&expected_signature)
        .map_err(|_| AppError::InvalidSessionToken)?;

    Ok(SessionId(id.to_owned()))
}

/// Session store capability: atomic get/set/delete by key
///
/// Expiry is store policy: `get` never returns an expired record, and
/// `purge_expired` reaps them.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: &SessionId) -> Result<Option<Session>, AppError>;
    async fn set(&self, id: &SessionId, session: Session) -> Result<(), AppError>;
    async fn delete(&self, id: &SessionId) -> Result<(), AppError>;
    async fn purge_expired(&self) -> Result<usize, AppError>;
}

/// In-memory session store
///
/// Per-key atomicity comes from the single `RwLock` over the map.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, id: &SessionId) -> Result<Option<Session>, AppError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(id).filter(|s| !s.is_expired()).cloned())
    }

    async fn set(&self, id: &SessionId, session: Session) -> Result<(), AppError> {
        let mut sessions = self.sessions.write().await;
        if sessions.insert(id.clone(), session).is_none() {
            metrics::SESSIONS_CREATED_TOTAL.inc();
        }
        metrics::SESSIONS_ACTIVE.set(sessions.len() as i64);
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<(), AppError> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(id);
        metrics::SESSIONS_ACTIVE.set(sessions.len() as i64);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, AppError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        let removed = before - sessions.len();
        if removed > 0 {
            metrics::SESSIONS_EXPIRED_TOTAL.inc_by(removed as u64);
        }
        metrics::SESSIONS_ACTIVE.set(sessions.len() as i64);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_identity() -> Identity {
        Identity {
            provider_id: "google-123".to_string(),
            display_name: "Test User".to_string(),
            emails: vec!["test@example.com".to_string()],
            picture: None,
        }
    }

    #[test]
    fn token_roundtrip() {
        let secret = "test-secret-key-32-bytes-long!!!";
        let id = SessionId::generate();

        let token = sign_session_id(&id, secret).unwrap();
        let verified = verify_session_token(&token, secret).unwrap();
        assert_eq!(verified, id);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let secret = "test-secret-key-32-bytes-long!!!";
        let id = SessionId::generate();
        let token = sign_session_id(&id, secret).unwrap();

        let mut tampered = token.clone();
        tampered.replace_range(0..1, if token.starts_with('A') { "B" } else { "A" });
        assert!(matches!(
            verify_session_token(&tampered, secret),
            Err(AppError::InvalidSessionToken)
        ));

        assert!(matches!(
            verify_session_token("no-separator", secret),
            Err(AppError::InvalidSessionToken)
        ));

        assert!(matches!(
            verify_session_token(&token, "another-secret-key-32-bytes-long"),
            Err(AppError::InvalidSessionToken)
        ));
    }

    #[test]
    fn attach_and_clear_follow_the_invariant() {
        let mut session = Session::anonymous(Duration::hours(1));
        assert!(!session.is_logged_in());

        session.attach_identity(test_identity());
        assert!(session.is_logged_in());

        session.clear();
        assert!(!session.is_logged_in());
        assert!(session.identity.is_none());
    }

    #[tokio::test]
    async fn memory_store_set_get_delete() {
        let store = MemorySessionStore::new();
        let id = SessionId::generate();

        assert!(store.get(&id).await.unwrap().is_none());

        store
            .set(&id, Session::anonymous(Duration::hours(1)))
            .await
            .unwrap();
        assert!(store.get(&id).await.unwrap().is_some());

        store.delete(&id).await.unwrap();
        assert!(store.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_sessions_are_invisible_and_purged() {
        let store = MemorySessionStore::new();
        let live = SessionId::generate();
        let expired = SessionId::generate();

        store
            .set(&live, Session::anonymous(Duration::hours(1)))
            .await
            .unwrap();
        store
            .set(&expired, Session::anonymous(Duration::seconds(-1)))
            .await
            .unwrap();

        assert!(store.get(&live).await.unwrap().is_some());
        assert!(store.get(&expired).await.unwrap().is_none());

        let removed = store.purge_expired().await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.get(&live).await.unwrap().is_some());
    }
}
