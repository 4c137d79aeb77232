//! Session/profile gate
//!
//! Decides which top-level screen set is reachable from the authentication
//! state and profile completeness:
//!
//! ```text
//!             Start
//!               |
//!           Loading{None} --SessionMissing--> Unauthenticated
//!               |                                  |
//!         SessionFound(u)                     SignedIn(u)
//!               v                                  |
//!           Loading{u} <---------------------------+
//!            |       |
//!   ProfileChecked  ProfileChecked
//!     Complete      Incomplete/Failed
//!        v              v
//!   WithProfile <-- NoProfile
//!             ProfileSaved
//! ```
//!
//! `SignedOut` leads to `Unauthenticated` from every state. Transitions are
//! pure ([`GateState::apply`]); [`Gate`] performs the backend calls the
//! states ask for.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::auth::{AuthEvent, SessionManager, Subscription};
use crate::error::{FoodVisionError, Result};
use crate::profile::{parse_age, Profile, ProfileStore};
use crate::session::UserId;

/// A screen the client can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    /// Spinner shown while the gate is deciding.
    Splash,
    /// Landing page with sign-in and sign-up entry points.
    Welcome,
    /// E-mail/password sign in (with password reset).
    SignIn,
    /// Account creation.
    SignUp,
    /// One-field age form completing the profile.
    AgeSetup,
    /// Capture-and-query screen.
    Home,
    /// Profile details and sign out.
    Profile,
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Splash => "Splash",
            Self::Welcome => "Welcome",
            Self::SignIn => "SignIn",
            Self::SignUp => "SignUp",
            Self::AgeSetup => "AgeSetup",
            Self::Home => "Home",
            Self::Profile => "Profile",
        };
        f.write_str(name)
    }
}

/// Outcome of a profile lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileStatus {
    /// Age is recorded.
    Complete,
    /// No row, or a row without an age.
    Incomplete,
    /// The lookup failed; treated like `Incomplete` so the user is asked again
    /// rather than locked out.
    Failed,
}

impl From<&Profile> for ProfileStatus {
    fn from(profile: &Profile) -> Self {
        if profile.is_complete() {
            Self::Complete
        } else {
            Self::Incomplete
        }
    }
}

/// Inputs driving the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateEvent {
    /// Process start.
    Start,
    /// Bootstrap found no usable session.
    SessionMissing,
    /// Bootstrap restored a session for this user.
    SessionFound(UserId),
    /// The profile lookup for the pending user finished.
    ProfileChecked(ProfileStatus),
    /// A user signed in.
    SignedIn(UserId),
    /// The session ended.
    SignedOut,
    /// The age form was saved successfully.
    ProfileSaved,
}

/// Gate states; each maps to one exclusive screen set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    /// Deciding. `user` is set once a session is confirmed and the profile
    /// check is pending.
    Loading {
        /// User whose profile still has to be checked.
        user: Option<UserId>,
    },
    /// Nobody is signed in.
    Unauthenticated,
    /// Signed in, age not recorded yet.
    AuthenticatedNoProfile {
        /// Signed-in user.
        user: UserId,
    },
    /// Signed in with a complete profile.
    AuthenticatedWithProfile {
        /// Signed-in user.
        user: UserId,
    },
}

impl Default for GateState {
    fn default() -> Self {
        Self::Loading { user: None }
    }
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading { .. } => write!(f, "Loading"),
            Self::Unauthenticated => write!(f, "Unauthenticated"),
            Self::AuthenticatedNoProfile { .. } => write!(f, "AuthenticatedNoProfile"),
            Self::AuthenticatedWithProfile { .. } => write!(f, "AuthenticatedWithProfile"),
        }
    }
}

const SPLASH_SCREENS: &[Screen] = &[Screen::Splash];
const AUTH_SCREENS: &[Screen] = &[Screen::Welcome, Screen::SignIn, Screen::SignUp];
const SETUP_SCREENS: &[Screen] = &[Screen::AgeSetup];
const MAIN_SCREENS: &[Screen] = &[Screen::Home, Screen::Profile];

impl GateState {
    /// Applies `event`, returning the next state.
    ///
    /// Events that make no sense in the current state leave it unchanged.
    pub fn apply(self, event: &GateEvent) -> GateState {
        match (self, event) {
            (_, GateEvent::Start) => GateState::Loading { user: None },
            (_, GateEvent::SignedOut) => GateState::Unauthenticated,
            (_, GateEvent::SignedIn(user)) => GateState::Loading {
                user: Some(user.clone()),
            },
            (GateState::Loading { user: None }, GateEvent::SessionMissing) => {
                GateState::Unauthenticated
            }
            (GateState::Loading { user: None }, GateEvent::SessionFound(user)) => {
                GateState::Loading {
                    user: Some(user.clone()),
                }
            }
            (GateState::Loading { user: Some(user) }, GateEvent::ProfileChecked(status)) => {
                match status {
                    ProfileStatus::Complete => GateState::AuthenticatedWithProfile { user },
                    ProfileStatus::Incomplete | ProfileStatus::Failed => {
                        GateState::AuthenticatedNoProfile { user }
                    }
                }
            }
            (GateState::AuthenticatedNoProfile { user }, GateEvent::ProfileSaved) => {
                GateState::AuthenticatedWithProfile { user }
            }
            (state, event) => {
                tracing::debug!(state = %state, ?event, "Gate event ignored");
                state
            }
        }
    }

    /// The screens reachable in this state. Sets never overlap.
    pub fn screens(&self) -> &'static [Screen] {
        match self {
            Self::Loading { .. } => SPLASH_SCREENS,
            Self::Unauthenticated => AUTH_SCREENS,
            Self::AuthenticatedNoProfile { .. } => SETUP_SCREENS,
            Self::AuthenticatedWithProfile { .. } => MAIN_SCREENS,
        }
    }

    /// `true` when `screen` may be shown in this state.
    pub fn allows(&self, screen: Screen) -> bool {
        self.screens().contains(&screen)
    }

    /// The user whose profile check is pending, if any.
    pub fn pending_profile_check(&self) -> Option<&UserId> {
        match self {
            Self::Loading { user } => user.as_ref(),
            _ => None,
        }
    }

    /// The signed-in user in the two authenticated states.
    pub fn user(&self) -> Option<&UserId> {
        match self {
            Self::AuthenticatedNoProfile { user } | Self::AuthenticatedWithProfile { user } => {
                Some(user)
            }
            _ => None,
        }
    }
}

/// Drives [`GateState`] from the session manager and the profile store.
pub struct Gate {
    state: GateState,
    sessions: Arc<SessionManager>,
    profiles: Arc<dyn ProfileStore>,
    events: mpsc::UnboundedReceiver<AuthEvent>,
    _subscription: Subscription,
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gate").field("state", &self.state).finish()
    }
}

impl Gate {
    /// Creates a gate in `Loading` and subscribes it to auth changes.
    ///
    /// The subscription lives as long as the gate.
    pub fn new(sessions: Arc<SessionManager>, profiles: Arc<dyn ProfileStore>) -> Self {
        let (subscription, events) = sessions.subscribe_channel();
        Self {
            state: GateState::default(),
            sessions,
            profiles,
            events,
            _subscription: subscription,
        }
    }

    /// Current state.
    pub fn state(&self) -> &GateState {
        &self.state
    }

    /// Screens reachable right now.
    pub fn screens(&self) -> &'static [Screen] {
        self.state.screens()
    }

    /// The session manager this gate observes.
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Bootstraps: restores the session, then checks the profile.
    pub async fn start(&mut self) -> &GateState {
        self.transition(GateEvent::Start);
        let event = match self.sessions.initialize().await {
            Some(session) => GateEvent::SessionFound(session.user.id),
            None => GateEvent::SessionMissing,
        };
        self.transition(event);
        self.run_pending_profile_check().await;
        // The bootstrap notification was handled above through the return value.
        self.sync().await
    }

    /// Applies every auth change observed since the last call.
    pub async fn sync(&mut self) -> &GateState {
        while let Ok(event) = self.events.try_recv() {
            self.on_auth_event(&event).await;
        }
        &self.state
    }

    /// Reacts to a single auth change.
    pub async fn on_auth_event(&mut self, event: &AuthEvent) {
        match event {
            AuthEvent::SignedIn(session) => {
                self.transition(GateEvent::SignedIn(session.user.id.clone()));
                self.run_pending_profile_check().await;
            }
            AuthEvent::SignedOut => self.transition(GateEvent::SignedOut),
            AuthEvent::InitialSession(_) | AuthEvent::TokenRefreshed(_) => {}
        }
    }

    /// Validates and saves the age form, completing setup.
    ///
    /// # Errors
    ///
    /// Returns [`FoodVisionError::Validation`] for an out-of-range age and
    /// [`FoodVisionError::Unauthorized`] when nobody is signed in; backend
    /// failures are passed through.
    pub async fn save_age(&mut self, input: &str) -> Result<u32> {
        let age = parse_age(input)?;
        if self.state.user().is_none() {
            return Err(FoodVisionError::Unauthorized.into());
        }

        let session = self.sessions.authorized_session().await?;
        match self.profiles.save_age(&session, age).await {
            Ok(()) => {
                self.transition(GateEvent::ProfileSaved);
                Ok(age)
            }
            Err(e) => {
                tracing::error!("Error saving age: {}", e);
                self.on_backend_error(&e);
                self.sync().await;
                Err(e)
            }
        }
    }

    /// Loads the signed-in user's profile for display.
    pub async fn profile(&mut self) -> Result<Profile> {
        let session = self.sessions.authorized_session().await?;
        match self.profiles.fetch_profile(&session).await {
            Ok(profile) => Ok(profile),
            Err(e) => {
                self.on_backend_error(&e);
                self.sync().await;
                Err(e)
            }
        }
    }

    async fn run_pending_profile_check(&mut self) {
        let Some(pending) = self.state.pending_profile_check().cloned() else {
            return;
        };
        // A newer sign-in or sign-out is still queued; it will be applied by `sync`.
        if !self.is_current_user(&pending) {
            tracing::debug!(user = %pending, "Skipping profile check for superseded session");
            return;
        }

        let status = match self.sessions.authorized_session().await {
            Ok(session) if session.user.id == pending => {
                match self.profiles.fetch_profile(&session).await {
                    Ok(profile) => ProfileStatus::from(&profile),
                    Err(e) => {
                        tracing::warn!("Error checking profile: {}", e);
                        self.on_backend_error(&e);
                        ProfileStatus::Failed
                    }
                }
            }
            Ok(_) => return,
            Err(e) => {
                tracing::warn!("No usable session for profile check: {}", e);
                ProfileStatus::Failed
            }
        };

        if !self.is_current_user(&pending) {
            return;
        }
        self.transition(GateEvent::ProfileChecked(status));
    }

    fn is_current_user(&self, user: &UserId) -> bool {
        self.sessions
            .current_user()
            .map_or(false, |current| &current.id == user)
    }

    fn on_backend_error(&self, error: &anyhow::Error) {
        if matches!(
            error.downcast_ref::<FoodVisionError>(),
            Some(FoodVisionError::Unauthorized)
        ) {
            self.sessions.handle_unauthorized();
        }
    }

    fn transition(&mut self, event: GateEvent) {
        let previous = std::mem::take(&mut self.state);
        let previous_name = previous.to_string();
        self.state = previous.apply(&event);
        tracing::debug!(from = %previous_name, to = %self.state, ?event, "Gate transition");
    }
}
