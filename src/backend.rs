//! Shared HTTP plumbing for the managed auth/database backend
//!
//! Both the auth client (`/auth/v1`) and the profile table client
//! (`/rest/v1`) talk to the same project URL with the same public API key.
//! [`BackendClient`] owns that shared state.

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::config::BackendConfig;
use crate::error::{FoodVisionError, Result};

/// HTTP client bound to one backend project.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
    anon_key: String,
}

impl BackendClient {
    /// Builds a client from backend configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FoodVisionError::Config`] if the URL is invalid, or
    /// [`FoodVisionError::Http`] if the HTTP client cannot be constructed.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.url).map_err(|e| {
            FoodVisionError::Config(format!("Invalid backend url {}: {}", config.url, e))
        })?;
        // Url::join drops the last segment unless the base ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(FoodVisionError::Http)?;

        Ok(Self {
            http,
            base_url,
            anon_key: config.anon_key.clone(),
        })
    }

    /// Resolves `path` (e.g. `auth/v1/token`) against the project URL.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| FoodVisionError::Config(format!("Invalid endpoint {}: {}", path, e)).into())
    }

    /// Starts a request carrying the project's `apikey` header.
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
    }

    /// Starts a request carrying both the `apikey` and a bearer token.
    pub fn authorized(&self, method: Method, url: Url, access_token: &str) -> RequestBuilder {
        self.request(method, url).bearer_auth(access_token)
    }
}

/// Error payloads the backend may return; all fields optional because the
/// auth and REST services use different shapes.
#[derive(Debug, Default, Deserialize)]
struct BackendErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Extracts the user-facing message from a failed backend response.
///
/// Preference order: `error_description`, `msg`, `message`, `error`, then
/// the raw body, then a generic message naming the status.
pub fn backend_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<BackendErrorBody>(body) {
        let candidate = parsed
            .error_description
            .or(parsed.msg)
            .or(parsed.message)
            .or(parsed.error);
        if let Some(message) = candidate.filter(|m| !m.trim().is_empty()) {
            return message;
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("Request failed ({})", status.as_u16())
    } else {
        trimmed.to_string()
    }
}
