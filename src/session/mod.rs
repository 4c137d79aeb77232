//! Authenticated session tokens and their local cache
//!
//! A [`Session`] is the token bundle issued by the auth backend. The client
//! keeps a serialized copy in a [`SessionStore`] so that a cold start can
//! bootstrap without a network round-trip.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub mod store;

pub use store::{
    open_store, FileSessionStore, KeyringSessionStore, MemorySessionStore, SessionStore,
    SESSION_KEY,
};

/// Identifier of a backend user (a UUID string for Supabase projects)
pub type UserId = String;

/// The user a session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend user identifier.
    pub id: UserId,

    /// E-mail address, when the backend returns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// An authenticated user's token bundle.
///
/// `expires_at` is stored as UNIX seconds, matching both the backend's token
/// response and the cached JSON layout.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use foodvision::session::{Session, User};
///
/// let session = Session {
///     access_token: "access".to_string(),
///     refresh_token: "refresh".to_string(),
///     token_type: "bearer".to_string(),
///     expires_at: Utc::now() + Duration::hours(1),
///     user: User { id: "user-1".to_string(), email: None },
/// };
/// assert!(!session.is_expired(Duration::seconds(60)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token for backend calls.
    pub access_token: String,

    /// Token exchanged for a new access token once this one expires.
    pub refresh_token: String,

    /// Token type, normally `"bearer"`.
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// UTC instant after which `access_token` is rejected.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,

    /// Owner of the session.
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    /// Returns `true` when the access token is expired or expires within
    /// `margin`.
    ///
    /// Callers use a positive margin so that a token is refreshed before the
    /// backend starts rejecting it.
    pub fn is_expired(&self, margin: Duration) -> bool {
        Utc::now() >= self.expires_at - margin
    }

    /// Shorthand for the owning user's id.
    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}
