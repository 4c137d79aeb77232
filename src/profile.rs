//! User profile rows (one per user, keyed by user id)
//!
//! The profile holds a single user-supplied field, `age`. Its presence is
//! what the gate uses to decide whether setup is complete.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::backend::{backend_error_message, BackendClient};
use crate::error::{FoodVisionError, Result};
use crate::session::{Session, UserId};

/// Youngest accepted age.
pub const MIN_AGE: u32 = 13;
/// Oldest accepted age.
pub const MAX_AGE: u32 = 120;

/// A user's profile as shown on the profile screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Owning user.
    pub id: UserId,
    /// Account e-mail, taken from the session.
    #[serde(default)]
    pub email: Option<String>,
    /// Age in years; `None` until setup is completed.
    ///
    /// Stored values are not range-checked: any integer marks setup as done.
    #[serde(default)]
    pub age: Option<i64>,
}

impl Profile {
    /// `true` once the age step has been completed.
    pub fn is_complete(&self) -> bool {
        self.age.is_some()
    }
}

/// Parses the age typed into the setup form.
///
/// # Errors
///
/// Returns [`FoodVisionError::Validation`] unless the input is an integer in
/// `13..=120`.
///
/// # Examples
///
/// ```
/// use foodvision::profile::parse_age;
///
/// assert_eq!(parse_age(" 34 ").unwrap(), 34);
/// assert!(parse_age("12").is_err());
/// assert!(parse_age("abc").is_err());
/// ```
pub fn parse_age(input: &str) -> Result<u32> {
    let invalid = || FoodVisionError::Validation("Please enter a valid age (13-120)".to_string());
    let age: u32 = input.trim().parse().map_err(|_| invalid())?;
    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        return Err(invalid().into());
    }
    Ok(age)
}

/// Read/write access to the profile table.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Loads the profile of the session's user. A missing row is a profile
    /// without an age, not an error.
    async fn fetch_profile(&self, session: &Session) -> Result<Profile>;

    /// Creates or updates the user's row with `age` and a fresh `updated_at`.
    async fn save_age(&self, session: &Session, age: u32) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    #[serde(default)]
    age: Option<i64>,
}

/// [`ProfileStore`] over the backend's REST interface (`/rest/v1/profiles`).
#[derive(Debug, Clone)]
pub struct SupabaseProfiles {
    client: BackendClient,
}

impl SupabaseProfiles {
    /// Wraps a configured backend client.
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    async fn check(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::error!("Profile {} failed with {}: {}", action, status, body);
        if status == StatusCode::UNAUTHORIZED {
            return Err(FoodVisionError::Unauthorized.into());
        }
        Err(FoodVisionError::Profile(backend_error_message(status, &body)).into())
    }
}

#[async_trait]
impl ProfileStore for SupabaseProfiles {
    async fn fetch_profile(&self, session: &Session) -> Result<Profile> {
        let url = self.client.endpoint("rest/v1/profiles")?;
        let id_filter = format!("eq.{}", session.user.id);
        let response = self
            .client
            .authorized(Method::GET, url, &session.access_token)
            .query(&[("id", id_filter.as_str()), ("select", "age")])
            .send()
            .await
            .map_err(|e| FoodVisionError::Network(format!("Could not load profile: {}", e)))?;

        let rows: Vec<ProfileRow> = Self::check(response, "fetch")
            .await?
            .json()
            .await
            .map_err(|e| FoodVisionError::Profile(format!("Unexpected profile response: {}", e)))?;

        Ok(Profile {
            id: session.user.id.clone(),
            email: session.user.email.clone(),
            age: rows.into_iter().next().and_then(|row| row.age),
        })
    }

    async fn save_age(&self, session: &Session, age: u32) -> Result<()> {
        let url = self.client.endpoint("rest/v1/profiles")?;
        let body = json!({
            "id": session.user.id,
            "age": age,
            "updated_at": Utc::now().to_rfc3339(),
        });
        let response = self
            .client
            .authorized(Method::POST, url, &session.access_token)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&body)
            .send()
            .await
            .map_err(|e| FoodVisionError::Network(format!("Could not save profile: {}", e)))?;

        Self::check(response, "upsert").await?;
        tracing::info!(user = %session.user.id, age, "Profile saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_age_bounds() {
        assert_eq!(parse_age("13").unwrap(), 13);
        assert_eq!(parse_age("120").unwrap(), 120);
        assert!(parse_age("12").is_err());
        assert!(parse_age("121").is_err());
    }

    #[test]
    fn test_parse_age_rejects_non_numbers() {
        for input in ["", "  ", "abc", "-5", "30.5"] {
            let err = parse_age(input).unwrap_err();
            assert!(err.to_string().contains("Please enter a valid age (13-120)"));
        }
    }

    #[test]
    fn test_profile_completeness() {
        let mut profile = Profile {
            id: "u1".to_string(),
            email: None,
            age: None,
        };
        assert!(!profile.is_complete());
        profile.age = Some(40);
        assert!(profile.is_complete());
    }

    #[test]
    fn test_profile_row_missing_age() {
        let rows: Vec<ProfileRow> = serde_json::from_str(r#"[{"age": null}]"#).unwrap();
        assert!(rows[0].age.is_none());
    }

    #[test]
    fn test_profile_row_accepts_out_of_range_ages() {
        let rows: Vec<ProfileRow> =
            serde_json::from_str(r#"[{"age": -1}, {"age": 5000000000}]"#).unwrap();
        assert_eq!(rows[0].age, Some(-1));
        assert_eq!(rows[1].age, Some(5_000_000_000));
    }
}
