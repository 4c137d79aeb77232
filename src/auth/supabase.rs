//! Supabase-compatible auth backend (GoTrue REST API)
//!
//! Endpoints used, all relative to `{backend.url}/auth/v1`:
//!
//! | Operation | Request |
//! |---|---|
//! | sign in | `POST /token?grant_type=password` `{email, password}` |
//! | refresh | `POST /token?grant_type=refresh_token` `{refresh_token}` |
//! | sign up | `POST /signup?redirect_to=…` `{email, password}` |
//! | sign out | `POST /logout` (bearer) |
//! | reset password | `POST /recover?redirect_to=…` `{email}` |
//! | current user | `GET /user` (bearer) |

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::auth::AuthBackend;
use crate::backend::{backend_error_message, BackendClient};
use crate::error::{FoodVisionError, Result};
use crate::session::{Session, User};

/// Default access-token lifetime when the backend omits both expiry fields.
const DEFAULT_EXPIRES_IN: i64 = 3600;

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserResponse> for User {
    fn from(user: UserResponse) -> Self {
        Self {
            id: user.id,
            email: user.email,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: UserResponse,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .unwrap_or_else(|| {
                Utc::now() + Duration::seconds(self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN))
            });
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type.unwrap_or_else(|| "bearer".to_string()),
            expires_at,
            user: self.user.into(),
        }
    }
}

/// [`AuthBackend`] over a Supabase project's GoTrue endpoints.
#[derive(Debug, Clone)]
pub struct SupabaseAuth {
    client: BackendClient,
}

impl SupabaseAuth {
    /// Wraps a configured backend client.
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    /// Sends `request`, mapping transport failures and non-2xx responses.
    ///
    /// `bearer` marks requests authorized with an access token; a `401` on
    /// those means the token is no longer valid.
    async fn send(
        &self,
        request: RequestBuilder,
        action: &str,
        bearer: bool,
    ) -> Result<reqwest::Response> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!("Auth backend unreachable during {}: {}", action, e);
            FoodVisionError::Network(format!("Could not reach the server: {}", e))
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!("Auth backend {} failed with {}: {}", action, status, body);
        if bearer && status == StatusCode::UNAUTHORIZED {
            return Err(FoodVisionError::Unauthorized.into());
        }
        Err(FoodVisionError::Auth(backend_error_message(status, &body)).into())
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
        action: &str,
    ) -> Result<Session> {
        let url = self.client.endpoint("auth/v1/token")?;
        let request = self
            .client
            .request(Method::POST, url)
            .query(&[("grant_type", grant_type)])
            .json(&body);
        let response = self.send(request, action, false).await?;
        let token: TokenResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse token response: {}", e);
            FoodVisionError::Auth(format!("Unexpected response from server: {}", e))
        })?;
        Ok(token.into_session())
    }
}

#[async_trait]
impl AuthBackend for SupabaseAuth {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        self.token_grant(
            "password",
            json!({ "email": email, "password": password }),
            "sign in",
        )
        .await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: &str,
    ) -> Result<Option<Session>> {
        let url = self.client.endpoint("auth/v1/signup")?;
        let request = self
            .client
            .request(Method::POST, url)
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({ "email": email, "password": password }));
        let response = self.send(request, "sign up", false).await?;

        let value: serde_json::Value = response.json().await.map_err(|e| {
            FoodVisionError::Auth(format!("Unexpected response from server: {}", e))
        })?;
        if value.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(value)?;
            Ok(Some(token.into_session()))
        } else {
            tracing::debug!("Sign up pending e-mail confirmation");
            Ok(None)
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let url = self.client.endpoint("auth/v1/logout")?;
        let request = self.client.authorized(Method::POST, url, access_token);
        self.send(request, "sign out", true).await?;
        Ok(())
    }

    async fn reset_password_for_email(&self, email: &str, redirect_to: &str) -> Result<()> {
        let url = self.client.endpoint("auth/v1/recover")?;
        let request = self
            .client
            .request(Method::POST, url)
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({ "email": email }));
        self.send(request, "password reset", false).await?;
        Ok(())
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        self.token_grant(
            "refresh_token",
            json!({ "refresh_token": refresh_token }),
            "token refresh",
        )
        .await
    }

    async fn get_user(&self, access_token: &str) -> Result<User> {
        let url = self.client.endpoint("auth/v1/user")?;
        let request = self.client.authorized(Method::GET, url, access_token);
        let response = self.send(request, "get user", true).await?;
        let user: UserResponse = response.json().await.map_err(|e| {
            FoodVisionError::Auth(format!("Unexpected response from server: {}", e))
        })?;
        Ok(user.into())
    }
}
