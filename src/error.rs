//! Error types for Food Vision
//!
//! This module defines all error types used throughout the client,
//! using `thiserror` for ergonomic error handling.
//!
//! None of these errors is fatal to the process. Every failure resolves to
//! an idle or error state from which the user can retry manually.

use thiserror::Error;

/// Main error type for Food Vision operations
///
/// This enum covers configuration loading, the auth and profile backend,
/// the session cache, image acquisition and the food-vision API.
#[derive(Error, Debug)]
pub enum FoodVisionError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication errors reported by the backend
    ///
    /// The payload is the backend's own message, surfaced verbatim.
    #[error("{0}")]
    Auth(String),

    /// The backend rejected the access token (HTTP 401)
    #[error("Session is no longer valid, please sign in again")]
    Unauthorized,

    /// Camera or library access was refused or is unavailable
    #[error("Permission required: {0}")]
    PermissionDenied(String),

    /// Input rejected before or by the server (bad image payload, bad age, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Timeouts and connectivity failures
    #[error("Network error: {0}")]
    Network(String),

    /// The detection call succeeded but did not name a food
    #[error("{0}")]
    NoFoodDetected(String),

    /// Any other non-success response from the food-vision API
    #[error("API error: {0}")]
    Api(String),

    /// Profile row read/write failures
    #[error("Profile error: {0}")]
    Profile(String),

    /// Local session cache failures
    #[error("Session store error: {0}")]
    SessionStore(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Result type alias for Food Vision operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
