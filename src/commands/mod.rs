/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `auth`: status, sign-in, sign-up, sign-out and password reset
- `profile`: show the profile or complete setup with an age
- `detect`: one-shot detection with optional follow-up lookups
- `categories`: the follow-up category table
- `app`: the interactive shell that walks the gate's screens

Every handler builds its collaborators through [`Services`] and routes
through the session/profile [`Gate`], so the CLI reaches exactly the
screens a signed-in (or signed-out) user may see.
*/

use std::sync::Arc;

use crate::auth::SessionManager;
use crate::backend::BackendClient;
use crate::config::Config;
use crate::error::{FoodVisionError, Result};
use crate::gate::{Gate, GateState, Screen};
use crate::media::LocalMediaSource;
use crate::pipeline::Pipeline;
use crate::profile::{ProfileStore, SupabaseProfiles};
use crate::vision::{FoodVisionClient, VisionApi};

pub mod app;
pub mod auth;
pub mod categories;
pub mod detect;
pub mod profile;
pub mod render;
pub mod shell_commands;

/// Long-lived collaborators shared by the command handlers.
pub struct Services {
    pub config: Config,
    pub sessions: Arc<SessionManager>,
    pub profiles: Arc<dyn ProfileStore>,
    pub vision: Arc<dyn VisionApi>,
}

impl Services {
    /// Wires the configured backend, session cache and vision API.
    pub fn from_config(config: Config) -> Result<Self> {
        let sessions = Arc::new(SessionManager::from_config(&config)?);
        let profiles: Arc<dyn ProfileStore> =
            Arc::new(SupabaseProfiles::new(BackendClient::new(&config.backend)?));
        let vision: Arc<dyn VisionApi> = Arc::new(FoodVisionClient::new(&config.vision)?);
        Ok(Self {
            config,
            sessions,
            profiles,
            vision,
        })
    }

    /// Assembles services from explicit parts.
    pub fn new(
        config: Config,
        sessions: Arc<SessionManager>,
        profiles: Arc<dyn ProfileStore>,
        vision: Arc<dyn VisionApi>,
    ) -> Self {
        Self {
            config,
            sessions,
            profiles,
            vision,
        }
    }

    /// A fresh gate observing this process's session manager.
    pub fn gate(&self) -> Gate {
        Gate::new(self.sessions.clone(), self.profiles.clone())
    }

    /// A fresh capture pipeline.
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(self.vision.clone())
    }

    /// The local camera/library source.
    pub fn media(&self) -> LocalMediaSource {
        LocalMediaSource::new(&self.config.media)
    }
}

/// Fails unless `screen` is reachable in the gate's current state.
///
/// The error tells the user which step is missing.
pub fn require_screen(state: &GateState, screen: Screen) -> Result<()> {
    if state.allows(screen) {
        return Ok(());
    }
    let message = match state {
        GateState::Unauthenticated | GateState::Loading { .. } => {
            "Please sign in first: foodvision sign-in --email <EMAIL>".to_string()
        }
        GateState::AuthenticatedNoProfile { .. } => {
            "Please complete your profile first: foodvision profile set-age <AGE>".to_string()
        }
        GateState::AuthenticatedWithProfile { .. } => {
            format!("{} is not available once setup is complete", screen)
        }
    };
    tracing::debug!(state = %state, screen = %screen, "Screen not reachable");
    Err(FoodVisionError::Auth(message).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_screen_explains_missing_sign_in() {
        let err = require_screen(&GateState::Unauthenticated, Screen::Home).unwrap_err();
        assert!(err.to_string().contains("sign in first"));
    }

    #[test]
    fn test_require_screen_explains_missing_profile() {
        let state = GateState::AuthenticatedNoProfile {
            user: "u1".to_string(),
        };
        let err = require_screen(&state, Screen::Home).unwrap_err();
        assert!(err.to_string().contains("profile set-age"));
        assert!(require_screen(&state, Screen::AgeSetup).is_ok());
    }

    #[test]
    fn test_require_screen_allows_home_with_profile() {
        let state = GateState::AuthenticatedWithProfile {
            user: "u1".to_string(),
        };
        assert!(require_screen(&state, Screen::Home).is_ok());
        assert!(require_screen(&state, Screen::AgeSetup).is_err());
    }
}
