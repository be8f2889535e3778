//! Google OAuth authentication
//!
//! Handles:
//! - The session authentication gate
//! - Session records, signed cookie tokens and the session store
//! - The Google OAuth flow (delegated to the `oauth2` crate)
//! - Session middleware and extractors

mod gate;
pub mod identity;
mod middleware;
mod provider;
mod routes;
pub mod session;

pub use gate::{CallbackParams, SessionGate};
pub use identity::Identity;
pub use middleware::{CurrentUser, SessionContext, session_context};
pub use provider::{GoogleProvider, IdentityProvider};
pub use routes::auth_router;
pub use session::{MemorySessionStore, Session, SessionId, SessionStore};
