//! Food Vision - headless client core
//!
//! This library holds the client side of the Food Vision app: sign-in and
//! session caching against a hosted auth/database backend, a one-step
//! profile setup, and the capture-and-query pipeline that uploads a food
//! photo and fetches follow-up information about what was detected.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: Session tokens and the local session cache
//! - `auth`: The session manager, auth-change notifications and the backend client
//! - `profile`: Profile rows and age validation
//! - `gate`: Which screens are reachable for the current session/profile
//! - `media`: Camera and library image acquisition
//! - `vision`: The food-vision API client and failure classification
//! - `pipeline`: The pick/detect/follow-up state machine and its driver
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`, `commands`: Command-line interface and handlers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use foodvision::{Config, Gate, SessionManager};
//! use foodvision::backend::BackendClient;
//! use foodvision::profile::SupabaseProfiles;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let sessions = Arc::new(SessionManager::from_config(&config)?);
//!     let profiles = Arc::new(SupabaseProfiles::new(BackendClient::new(&config.backend)?));
//!     let mut gate = Gate::new(sessions, profiles);
//!     println!("{}", gate.start().await);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod backend;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod gate;
pub mod media;
pub mod pipeline;
pub mod profile;
pub mod session;
pub mod vision;

// Re-export commonly used types
pub use auth::{AuthEvent, SessionManager, Subscription};
pub use config::Config;
pub use error::{FoodVisionError, Result};
pub use gate::{Gate, GateState, Screen};
pub use pipeline::{CaptureMachine, CaptureState, Pipeline};
pub use session::Session;
pub use vision::{FollowUpCategory, FoodVisionClient, VisionApi};

#[cfg(test)]
pub mod test_utils;
