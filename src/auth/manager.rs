//! Session manager: the single owner of the signed-in session
//!
//! [`SessionManager`] coordinates the auth backend, the local session cache
//! and the observers interested in auth changes. It is created once and
//! handed to the gate and commands by `Arc`, replacing any process-wide
//! auth singleton.
//!
//! Every mutation follows the same order: update the cache, update the
//! in-memory session, then notify listeners.

use std::sync::{Arc, Mutex};

use chrono::Duration;
use tokio::sync::mpsc;

use crate::auth::events::{AuthEvent, ListenerRegistry, Subscription};
use crate::auth::supabase::SupabaseAuth;
use crate::auth::{normalize_email, validate_credentials, AuthBackend};
use crate::backend::BackendClient;
use crate::config::{BackendConfig, Config};
use crate::error::{FoodVisionError, Result};
use crate::session::{open_store, Session, SessionStore, User};

/// Deep-link targets embedded in e-mails sent by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRedirects {
    /// Where the sign-up confirmation link lands.
    pub email_redirect: String,
    /// Where the password-reset link lands.
    pub password_reset_redirect: String,
}

impl From<&BackendConfig> for AuthRedirects {
    fn from(config: &BackendConfig) -> Self {
        Self {
            email_redirect: config.email_redirect.clone(),
            password_reset_redirect: config.password_reset_redirect.clone(),
        }
    }
}

/// Result of a successful sign-up request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The backend confirmed the account at once and issued a session.
    SignedIn(Session),
    /// A confirmation link was e-mailed; the user must verify before signing in.
    ConfirmationRequired,
}

/// Owner of the current session, its cache and its observers.
pub struct SessionManager {
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn SessionStore>,
    redirects: AuthRedirects,
    expiry_margin: Duration,
    current: Mutex<Option<Session>>,
    listeners: ListenerRegistry,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("redirects", &self.redirects)
            .field("expiry_margin", &self.expiry_margin)
            .field("signed_in", &self.current_session().is_some())
            .field("listeners", &self.listeners)
            .finish()
    }
}

impl SessionManager {
    /// Creates a manager with no session loaded and a 60 second expiry margin.
    ///
    /// Call [`initialize`](Self::initialize) before anything else to restore a
    /// cached session.
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        store: Arc<dyn SessionStore>,
        redirects: AuthRedirects,
    ) -> Self {
        Self {
            backend,
            store,
            redirects,
            expiry_margin: Duration::seconds(60),
            current: Mutex::new(None),
            listeners: ListenerRegistry::default(),
        }
    }

    /// Builds a manager wired to the configured backend and session store.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = SupabaseAuth::new(BackendClient::new(&config.backend)?);
        let store = open_store(&config.session)?;
        Ok(Self::new(Arc::new(backend), store, AuthRedirects::from(&config.backend))
            .with_expiry_margin(Duration::seconds(config.session.expiry_margin_seconds)))
    }

    /// Overrides how early before expiry a token is refreshed.
    pub fn with_expiry_margin(mut self, margin: Duration) -> Self {
        self.expiry_margin = margin;
        self
    }

    /// Registers an auth-change observer. Dropping the handle unsubscribes.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AuthEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    /// Registers an observer that forwards events into a channel.
    pub fn subscribe_channel(&self) -> (Subscription, mpsc::UnboundedReceiver<AuthEvent>) {
        self.listeners.subscribe_channel()
    }

    /// The session currently held in memory, without any expiry check.
    pub fn current_session(&self) -> Option<Session> {
        self.current.lock().ok().and_then(|guard| guard.clone())
    }

    /// The signed-in user, if any.
    pub fn current_user(&self) -> Option<User> {
        self.current_session().map(|s| s.user)
    }

    /// Restores the cached session at process start.
    ///
    /// An unexpired cached session is adopted as-is. An expired one is only
    /// adopted after a successful refresh; otherwise the cache is cleared.
    /// Failures never escape: they are logged and the user ends up signed
    /// out. Always notifies [`AuthEvent::InitialSession`].
    pub async fn initialize(&self) -> Option<Session> {
        let cached = match self.store.load() {
            Ok(cached) => cached,
            Err(e) => {
                tracing::error!("Error restoring session from storage: {}", e);
                self.clear_cache();
                None
            }
        };

        let session = match cached {
            None => {
                tracing::debug!("No cached session");
                None
            }
            Some(session) if !session.is_expired(self.expiry_margin) => {
                tracing::info!(user = %session.user.id, "Session restored from storage");
                Some(session)
            }
            Some(stale) => {
                tracing::info!(user = %stale.user.id, "Cached session expired, refreshing");
                match self.backend.refresh_session(&stale.refresh_token).await {
                    Ok(fresh) => {
                        self.persist(&fresh);
                        Some(fresh)
                    }
                    Err(e) => {
                        tracing::warn!("Could not refresh cached session: {}", e);
                        self.clear_cache();
                        None
                    }
                }
            }
        };

        self.set_current(session.clone());
        self.listeners
            .notify(&AuthEvent::InitialSession(session.clone()));
        session
    }

    /// Signs in with e-mail and password.
    ///
    /// The e-mail is trimmed and lowercased. On success the session is
    /// cached and [`AuthEvent::SignedIn`] is sent.
    ///
    /// # Errors
    ///
    /// Returns [`FoodVisionError::Validation`] for malformed input, or the
    /// backend's message verbatim as [`FoodVisionError::Auth`].
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        validate_credentials(email, password)?;
        let email = normalize_email(email);

        let session = self
            .backend
            .sign_in_with_password(&email, password)
            .await
            .map_err(|e| {
                tracing::error!("Sign in error: {}", e);
                e
            })?;

        tracing::info!(user = %session.user.id, "Sign in successful");
        self.adopt(session.clone(), AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    /// Creates an account, sending the configured confirmation redirect.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        validate_credentials(email, password)?;
        let email = normalize_email(email);

        let issued = self
            .backend
            .sign_up(&email, password, &self.redirects.email_redirect)
            .await
            .map_err(|e| {
                tracing::error!("Sign up error: {}", e);
                e
            })?;

        tracing::info!("Sign up successful");
        match issued {
            Some(session) => {
                self.adopt(session.clone(), AuthEvent::SignedIn(session.clone()));
                Ok(SignUpOutcome::SignedIn(session))
            }
            None => Ok(SignUpOutcome::ConfirmationRequired),
        }
    }

    /// Signs out.
    ///
    /// The backend is told to revoke the session, but its answer does not
    /// matter: the cache and in-memory session are cleared regardless and
    /// [`AuthEvent::SignedOut`] is always sent.
    ///
    /// # Errors
    ///
    /// Returns an error only if the local cache could not be cleared.
    pub async fn sign_out(&self) -> Result<()> {
        if let Some(session) = self.current_session() {
            if let Err(e) = self.backend.sign_out(&session.access_token).await {
                tracing::warn!("Sign out error: {}", e);
            }
        }

        let cleared = self.store.clear();
        self.set_current(None);
        self.listeners.notify(&AuthEvent::SignedOut);

        match cleared {
            Ok(()) => {
                tracing::info!("Sign out successful");
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to clear cached session: {}", e);
                Err(e)
            }
        }
    }

    /// Sends a password-reset e-mail with the configured redirect.
    pub async fn reset_password(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        if !email.contains('@') {
            return Err(
                FoodVisionError::Validation("Please enter a valid email address".to_string())
                    .into(),
            );
        }

        self.backend
            .reset_password_for_email(&email, &self.redirects.password_reset_redirect)
            .await
            .map_err(|e| {
                tracing::error!("Reset password error: {}", e);
                e
            })
    }

    /// Returns a session whose access token is valid for at least the expiry
    /// margin, refreshing it first if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`FoodVisionError::Unauthorized`] when nobody is signed in. A
    /// failed refresh signs the user out and returns
    /// [`FoodVisionError::Auth`].
    pub async fn authorized_session(&self) -> Result<Session> {
        let session = self
            .current_session()
            .ok_or(FoodVisionError::Unauthorized)?;

        if !session.is_expired(self.expiry_margin) {
            return Ok(session);
        }

        tracing::debug!(user = %session.user.id, "Access token expiring, refreshing");
        match self.backend.refresh_session(&session.refresh_token).await {
            Ok(fresh) => {
                self.adopt(fresh.clone(), AuthEvent::TokenRefreshed(fresh.clone()));
                Ok(fresh)
            }
            Err(e) => {
                tracing::warn!("Token refresh failed: {}", e);
                self.handle_unauthorized();
                Err(FoodVisionError::Auth(
                    "Your session has expired. Please sign in again.".to_string(),
                )
                .into())
            }
        }
    }

    /// Convenience wrapper returning only the bearer token.
    pub async fn access_token(&self) -> Result<String> {
        Ok(self.authorized_session().await?.access_token)
    }

    /// Asks the backend who the current token belongs to.
    ///
    /// A `401` invalidates the session as in [`Self::handle_unauthorized`].
    pub async fn fetch_user(&self) -> Result<User> {
        let session = self.authorized_session().await?;
        match self.backend.get_user(&session.access_token).await {
            Ok(user) => Ok(user),
            Err(e) => {
                if matches!(
                    e.downcast_ref::<FoodVisionError>(),
                    Some(FoodVisionError::Unauthorized)
                ) {
                    self.handle_unauthorized();
                }
                Err(e)
            }
        }
    }

    /// Reacts to the backend refusing the current token.
    ///
    /// Clears the cache and the in-memory session, then sends
    /// [`AuthEvent::SignedOut`].
    pub fn handle_unauthorized(&self) {
        tracing::warn!("Session invalidated by backend, signing out");
        self.clear_cache();
        self.set_current(None);
        self.listeners.notify(&AuthEvent::SignedOut);
    }

    fn adopt(&self, session: Session, event: AuthEvent) {
        self.persist(&session);
        self.set_current(Some(session));
        self.listeners.notify(&event);
    }

    fn persist(&self, session: &Session) {
        if let Err(e) = self.store.save(session) {
            // The session still works for this process; only offline
            // bootstrap is lost.
            tracing::warn!("Failed to cache session: {}", e);
        }
    }

    fn clear_cache(&self) {
        if let Err(e) = self.store.clear() {
            tracing::error!("Failed to clear cached session: {}", e);
        }
    }

    fn set_current(&self, session: Option<Session>) {
        match self.current.lock() {
            Ok(mut guard) => *guard = session,
            Err(poisoned) => *poisoned.into_inner() = session,
        }
    }
}
