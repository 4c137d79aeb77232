//! Authentication: backend abstraction, session manager and change events
//!
//! The auth backend is an external collaborator reached over HTTP. This
//! module defines the [`AuthBackend`] seam, a Supabase-compatible
//! implementation, and the [`SessionManager`] that owns the current session,
//! its local cache and the observers interested in changes.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

use crate::error::{FoodVisionError, Result};
use crate::session::{Session, User};

pub mod events;
pub mod manager;
pub mod supabase;

pub use events::{AuthEvent, ListenerRegistry, Subscription};
pub use manager::{AuthRedirects, SessionManager, SignUpOutcome};
pub use supabase::SupabaseAuth;

/// Operations consumed from the auth backend.
///
/// Implementations return [`FoodVisionError::Auth`] carrying the backend's
/// message verbatim when the backend rejects a request, and
/// [`FoodVisionError::Unauthorized`] when a bearer token is refused.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchanges e-mail and password for a session.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session>;

    /// Creates an account.
    ///
    /// Returns `Some(session)` when the backend confirms the account
    /// immediately, `None` when the user must follow the e-mailed link to
    /// `redirect_to` first.
    async fn sign_up(&self, email: &str, password: &str, redirect_to: &str)
        -> Result<Option<Session>>;

    /// Revokes the session behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<()>;

    /// Sends a password-reset e-mail pointing at `redirect_to`.
    async fn reset_password_for_email(&self, email: &str, redirect_to: &str) -> Result<()>;

    /// Exchanges a refresh token for a new session.
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session>;

    /// Returns the user owning `access_token`.
    async fn get_user(&self, access_token: &str) -> Result<User>;
}

/// Trims and lowercases an e-mail address the way the backend stores it.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is a valid regex")
    })
}

/// Checks the sign-in form before any network call.
///
/// # Errors
///
/// Returns [`FoodVisionError::Validation`] for a malformed e-mail or an empty
/// password.
pub fn validate_credentials(email: &str, password: &str) -> Result<()> {
    if !email_pattern().is_match(&normalize_email(email)) {
        return Err(
            FoodVisionError::Validation("Please enter a valid email address".to_string()).into(),
        );
    }
    if password.is_empty() {
        return Err(FoodVisionError::Validation("Please enter your password".to_string()).into());
    }
    Ok(())
}

/// Checks the sign-up form: valid credentials and a matching confirmation.
pub fn validate_sign_up(email: &str, password: &str, confirm_password: &str) -> Result<()> {
    validate_credentials(email, password)?;
    if password != confirm_password {
        return Err(FoodVisionError::Validation("Passwords do not match.".to_string()).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Jane.Doe@Example.COM "), "jane.doe@example.com");
    }

    #[test]
    fn test_validate_credentials_accepts_normal_input() {
        assert!(validate_credentials(" Jane@Example.com", "pw").is_ok());
    }

    #[test]
    fn test_validate_credentials_rejects_bad_email() {
        let err = validate_credentials("jane.example.com", "pw").unwrap_err();
        assert!(err.to_string().contains("valid email"));
    }

    #[test]
    fn test_validate_credentials_rejects_empty_password() {
        assert!(validate_credentials("jane@example.com", "").is_err());
    }

    #[test]
    fn test_validate_sign_up_password_mismatch() {
        let err = validate_sign_up("jane@example.com", "one", "two").unwrap_err();
        assert!(err.to_string().contains("Passwords do not match."));
    }
}
