//! The authenticated principal

use serde::{Deserialize, Serialize};

/// Identity returned by the provider after a completed login.
///
/// Attached to a session wholesale and replaced wholesale on re-login;
/// never partially updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-assigned stable user id
    pub provider_id: String,
    /// Human-readable name for display
    pub display_name: String,
    /// Email addresses attested by the provider
    pub emails: Vec<String>,
    /// Avatar URL, if the provider supplied one
    pub picture: Option<String>,
}
