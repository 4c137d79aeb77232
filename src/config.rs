//! Configuration management for Food Vision
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{FoodVisionError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for Food Vision
///
/// Holds the endpoints of the two external collaborators (the auth/profile
/// backend and the food-vision API) plus local session and media settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Auth and profile backend settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Food-vision API settings
    #[serde(default)]
    pub vision: VisionConfig,

    /// Local session cache settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Image acquisition settings
    #[serde(default)]
    pub media: MediaConfig,
}

/// Auth/profile backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Project base URL (auth lives under `/auth/v1`, rows under `/rest/v1`)
    #[serde(default = "default_backend_url")]
    pub url: String,

    /// Public anonymous API key sent as the `apikey` header
    #[serde(default)]
    pub anon_key: String,

    /// Deep link the confirmation e-mail sends the user to after sign-up
    #[serde(default = "default_email_redirect")]
    pub email_redirect: String,

    /// Deep link used by password-reset e-mails
    #[serde(default = "default_password_reset_redirect")]
    pub password_reset_redirect: String,

    /// Request timeout (seconds)
    #[serde(default = "default_backend_timeout")]
    pub timeout_seconds: u64,
}

fn default_backend_url() -> String {
    "http://localhost:54321".to_string()
}

fn default_email_redirect() -> String {
    "myapp://login".to_string()
}

fn default_password_reset_redirect() -> String {
    "myapp://reset-password".to_string()
}

fn default_backend_timeout() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            anon_key: String::new(),
            email_redirect: default_email_redirect(),
            password_reset_redirect: default_password_reset_redirect(),
            timeout_seconds: default_backend_timeout(),
        }
    }
}

impl BackendConfig {
    /// Request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Food-vision API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    /// Base URL hosting `/detect_food` and `/food_info`
    #[serde(default = "default_vision_url")]
    pub base_url: String,

    /// Language declared in the `lang` field of detection uploads
    #[serde(default = "default_language")]
    pub language: String,

    /// Request timeout (seconds); detection on a cold server can be slow
    #[serde(default = "default_vision_timeout")]
    pub timeout_seconds: u64,
}

fn default_vision_url() -> String {
    "https://foodvision-fcsf.onrender.com".to_string()
}

fn default_language() -> String {
    "english".to_string()
}

fn default_vision_timeout() -> u64 {
    60
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            base_url: default_vision_url(),
            language: default_language(),
            timeout_seconds: default_vision_timeout(),
        }
    }
}

impl VisionConfig {
    /// Request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Where the cached session is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStoreKind {
    /// JSON key-value file in the platform data directory
    #[default]
    File,
    /// OS native credential store
    Keyring,
    /// Process memory only; nothing survives a restart
    Memory,
}

impl SessionStoreKind {
    /// Parse a store kind from a string ("file", "keyring" or "memory")
    pub fn parse_str(s: &str) -> std::result::Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(Self::File),
            "keyring" => Ok(Self::Keyring),
            "memory" => Ok(Self::Memory),
            other => Err(format!("Unknown session store: {}", other)),
        }
    }
}

/// Local session cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Backing store for the cached session
    #[serde(default)]
    pub store: SessionStoreKind,

    /// Explicit path for the file store (defaults to the platform data dir)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Tokens expiring within this many seconds are refreshed before use
    #[serde(default = "default_expiry_margin")]
    pub expiry_margin_seconds: i64,
}

fn default_expiry_margin() -> i64 {
    60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store: SessionStoreKind::default(),
            path: None,
            expiry_margin_seconds: default_expiry_margin(),
        }
    }
}

/// Image acquisition configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Shell command that captures a photo into `{output}`
    ///
    /// When unset the camera is reported as unavailable and only library
    /// (file) selection works.
    #[serde(default)]
    pub capture_command: Option<String>,
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| FoodVisionError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| FoodVisionError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(url) = std::env::var("FOODVISION_BACKEND_URL") {
            self.backend.url = url;
        }

        if let Ok(key) = std::env::var("FOODVISION_ANON_KEY") {
            self.backend.anon_key = key;
        }

        if let Ok(url) = std::env::var("FOODVISION_VISION_URL") {
            self.vision.base_url = url;
        }

        if let Ok(lang) = std::env::var("FOODVISION_LANG") {
            self.vision.language = lang;
        }

        if let Ok(store) = std::env::var("FOODVISION_SESSION_STORE") {
            match SessionStoreKind::parse_str(&store) {
                Ok(kind) => {
                    self.session.store = kind;
                    tracing::debug!(?kind, "Env override: FOODVISION_SESSION_STORE");
                }
                Err(_) => {
                    tracing::warn!("Invalid value for FOODVISION_SESSION_STORE: {}", store);
                }
            }
        }

        if let Ok(path) = std::env::var("FOODVISION_SESSION_PATH") {
            self.session.path = Some(PathBuf::from(path));
        }

        if let Ok(cmd) = std::env::var("FOODVISION_CAPTURE_COMMAND") {
            self.media.capture_command = Some(cmd);
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(store) = cli.session_store {
            self.session.store = store;
        }
    }

    /// Validate the configuration
    ///
    /// Ensures URLs parse, timeouts are positive and the detection language
    /// is set.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if let Err(e) = url::Url::parse(&self.backend.url) {
            return Err(FoodVisionError::Config(format!(
                "backend.url is not a valid URL ({}): {}",
                self.backend.url, e
            ))
            .into());
        }

        if let Err(e) = url::Url::parse(&self.vision.base_url) {
            return Err(FoodVisionError::Config(format!(
                "vision.base_url is not a valid URL ({}): {}",
                self.vision.base_url, e
            ))
            .into());
        }

        if self.backend.timeout_seconds == 0 {
            return Err(FoodVisionError::Config(
                "backend.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.vision.timeout_seconds == 0 {
            return Err(FoodVisionError::Config(
                "vision.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.vision.language.trim().is_empty() {
            return Err(
                FoodVisionError::Config("vision.language cannot be empty".to_string()).into(),
            );
        }

        if self.session.expiry_margin_seconds < 0 {
            return Err(FoodVisionError::Config(
                "session.expiry_margin_seconds cannot be negative".to_string(),
            )
            .into());
        }

        if self.backend.anon_key.is_empty() {
            tracing::warn!("backend.anon_key is empty; backend calls will likely be rejected");
        }

        Ok(())
    }
}
