//! Test utilities for Food Vision
//!
//! Temporary files, sample configuration, and in-memory fakes for the auth
//! backend, the profile table, the vision API and the device picker. Fakes
//! are `Clone` and share their state, so a test keeps one handle for
//! assertions and gives another to the code under test.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;

use crate::auth::AuthBackend;
use crate::error::{FoodVisionError, Result};
use crate::media::{MediaSource, PermissionStatus, SourceKind};
use crate::profile::{Profile, ProfileStore};
use crate::session::{Session, User, UserId};
use crate::vision::{
    DetectionFailure, DetectionResult, FailureKind, FollowUpQuery, FollowUpResult, PickedImage,
    VisionApi, NO_FOOD_MESSAGE,
};

/// Create a temporary directory for testing
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a test file with the given content
///
/// # Panics
///
/// Panics if file creation or writing fails
pub fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: Result<T>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

/// A configuration YAML string touching every section
pub fn test_config_yaml() -> String {
    r#"
backend:
  url: http://localhost:54321
  anon_key: test-anon-key
  timeout_seconds: 5
vision:
  base_url: http://localhost:9000
  language: english
  timeout_seconds: 5
session:
  store: memory
  expiry_margin_seconds: 30
media:
  capture_command: "fswebcam --no-banner {output}"
"#
    .to_string()
}

/// A session for `user_id` expiring at `expires_at`
pub fn session_for(user_id: &str, expires_at: DateTime<Utc>) -> Session {
    Session {
        access_token: format!("access-{}", user_id),
        refresh_token: format!("refresh-{}", user_id),
        token_type: "bearer".to_string(),
        expires_at,
        user: User {
            id: user_id.to_string(),
            email: Some(format!("{}@example.com", user_id)),
        },
    }
}

/// A small picked image named `file_name`
pub fn picked_image(file_name: &str) -> PickedImage {
    PickedImage {
        uri: PathBuf::from(format!("/tmp/{}", file_name)),
        mime_type: "image/jpeg".to_string(),
        file_name: file_name.to_string(),
        bytes: Bytes::from_static(b"\xFF\xD8\xFFfake-jpeg"),
    }
}

// ----------------------------------------------------------------------------
// Auth backend
// ----------------------------------------------------------------------------

#[derive(Default)]
struct AuthState {
    user_id: Option<String>,
    sign_in_error: Option<String>,
    sign_in_expiry: Option<DateTime<Utc>>,
    sign_up_session: Option<Session>,
    sign_out_fails: bool,
    refresh_session: Option<Session>,
    refresh_calls: usize,
    sign_out_calls: usize,
    last_email: Option<String>,
    last_redirect: Option<String>,
}

/// In-memory [`AuthBackend`].
///
/// Sign-in succeeds for any credentials and issues a one-hour session for
/// user `u1` unless configured otherwise. Refresh fails until a session is
/// supplied with [`FakeAuthBackend::set_refresh_session`].
#[derive(Clone, Default)]
pub struct FakeAuthBackend {
    state: Arc<Mutex<AuthState>>,
}

impl FakeAuthBackend {
    fn lock(&self) -> std::sync::MutexGuard<'_, AuthState> {
        self.state.lock().unwrap()
    }

    pub fn set_user_id(&self, user_id: &str) {
        self.lock().user_id = Some(user_id.to_string());
    }

    pub fn set_sign_in_error(&self, message: &str) {
        self.lock().sign_in_error = Some(message.to_string());
    }

    pub fn set_sign_in_expiry(&self, expires_at: DateTime<Utc>) {
        self.lock().sign_in_expiry = Some(expires_at);
    }

    pub fn set_sign_up_session(&self, session: Session) {
        self.lock().sign_up_session = Some(session);
    }

    pub fn set_sign_out_fails(&self, fails: bool) {
        self.lock().sign_out_fails = fails;
    }

    pub fn set_refresh_session(&self, session: Session) {
        self.lock().refresh_session = Some(session);
    }

    pub fn refresh_calls(&self) -> usize {
        self.lock().refresh_calls
    }

    pub fn sign_out_calls(&self) -> usize {
        self.lock().sign_out_calls
    }

    pub fn last_email(&self) -> Option<String> {
        self.lock().last_email.clone()
    }

    pub fn last_redirect(&self) -> Option<String> {
        self.lock().last_redirect.clone()
    }
}

#[async_trait]
impl AuthBackend for FakeAuthBackend {
    async fn sign_in_with_password(&self, email: &str, _password: &str) -> Result<Session> {
        let mut state = self.lock();
        state.last_email = Some(email.to_string());
        if let Some(message) = &state.sign_in_error {
            return Err(FoodVisionError::Auth(message.clone()).into());
        }
        let user_id = state.user_id.clone().unwrap_or_else(|| "u1".to_string());
        let expires_at = state
            .sign_in_expiry
            .unwrap_or_else(|| Utc::now() + Duration::hours(1));
        let mut session = session_for(&user_id, expires_at);
        session.user.email = Some(email.to_string());
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        redirect_to: &str,
    ) -> Result<Option<Session>> {
        let mut state = self.lock();
        state.last_email = Some(email.to_string());
        state.last_redirect = Some(redirect_to.to_string());
        Ok(state.sign_up_session.clone())
    }

    async fn sign_out(&self, _access_token: &str) -> Result<()> {
        let mut state = self.lock();
        state.sign_out_calls += 1;
        if state.sign_out_fails {
            return Err(FoodVisionError::Network("connection reset".to_string()).into());
        }
        Ok(())
    }

    async fn reset_password_for_email(&self, email: &str, redirect_to: &str) -> Result<()> {
        let mut state = self.lock();
        state.last_email = Some(email.to_string());
        state.last_redirect = Some(redirect_to.to_string());
        Ok(())
    }

    async fn refresh_session(&self, _refresh_token: &str) -> Result<Session> {
        let mut state = self.lock();
        state.refresh_calls += 1;
        state
            .refresh_session
            .clone()
            .ok_or_else(|| FoodVisionError::Auth("Invalid Refresh Token".to_string()).into())
    }

    async fn get_user(&self, _access_token: &str) -> Result<User> {
        let state = self.lock();
        Ok(User {
            id: state.user_id.clone().unwrap_or_else(|| "u1".to_string()),
            email: state.last_email.clone(),
        })
    }
}

// ----------------------------------------------------------------------------
// Profile store
// ----------------------------------------------------------------------------

#[derive(Default)]
struct ProfileState {
    ages: HashMap<UserId, i64>,
    fetch_error: Option<FailureMode>,
    fetch_calls: usize,
}

#[derive(Clone, Copy)]
enum FailureMode {
    Unauthorized,
    Backend,
}

/// In-memory [`ProfileStore`].
#[derive(Clone, Default)]
pub struct FakeProfileStore {
    state: Arc<Mutex<ProfileState>>,
}

impl FakeProfileStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, ProfileState> {
        self.state.lock().unwrap()
    }

    pub fn set_age(&self, user_id: &str, age: i64) {
        self.lock().ages.insert(user_id.to_string(), age);
    }

    pub fn age_of(&self, user_id: &str) -> Option<i64> {
        self.lock().ages.get(user_id).copied()
    }

    /// Makes every fetch fail with a backend error.
    pub fn fail_fetches(&self) {
        self.lock().fetch_error = Some(FailureMode::Backend);
    }

    /// Makes every fetch fail with `401`.
    pub fn reject_token(&self) {
        self.lock().fetch_error = Some(FailureMode::Unauthorized);
    }

    pub fn fetch_calls(&self) -> usize {
        self.lock().fetch_calls
    }
}

#[async_trait]
impl ProfileStore for FakeProfileStore {
    async fn fetch_profile(&self, session: &Session) -> Result<Profile> {
        let mut state = self.lock();
        state.fetch_calls += 1;
        match state.fetch_error {
            Some(FailureMode::Unauthorized) => return Err(FoodVisionError::Unauthorized.into()),
            Some(FailureMode::Backend) => {
                return Err(FoodVisionError::Profile("relation does not exist".into()).into())
            }
            None => {}
        }
        Ok(Profile {
            id: session.user.id.clone(),
            email: session.user.email.clone(),
            age: state.ages.get(&session.user.id).copied(),
        })
    }

    async fn save_age(&self, session: &Session, age: u32) -> Result<()> {
        self.lock().ages.insert(session.user.id.clone(), i64::from(age));
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Vision API
// ----------------------------------------------------------------------------

#[derive(Default)]
struct VisionState {
    detection: Option<std::result::Result<DetectionResult, DetectionFailure>>,
    info_response: Option<String>,
    detect_calls: usize,
    last_query: Option<FollowUpQuery>,
}

/// In-memory [`VisionApi`].
///
/// Without configuration detection reports no food and follow-ups fail with
/// a server error.
#[derive(Clone, Default)]
pub struct FakeVisionApi {
    state: Arc<Mutex<VisionState>>,
}

impl FakeVisionApi {
    fn lock(&self) -> std::sync::MutexGuard<'_, VisionState> {
        self.state.lock().unwrap()
    }

    pub fn set_detection(&self, outcome: std::result::Result<DetectionResult, DetectionFailure>) {
        self.lock().detection = Some(outcome);
    }

    pub fn set_info_response(&self, response: &str) {
        self.lock().info_response = Some(response.to_string());
    }

    pub fn detect_calls(&self) -> usize {
        self.lock().detect_calls
    }

    pub fn last_query(&self) -> Option<FollowUpQuery> {
        self.lock().last_query.clone()
    }
}

#[async_trait]
impl VisionApi for FakeVisionApi {
    async fn detect_food(
        &self,
        _image: &PickedImage,
    ) -> std::result::Result<DetectionResult, DetectionFailure> {
        let mut state = self.lock();
        state.detect_calls += 1;
        state.detection.clone().unwrap_or_else(|| {
            Err(DetectionFailure::new(
                FailureKind::NoFoodDetected,
                NO_FOOD_MESSAGE,
            ))
        })
    }

    async fn food_info(&self, query: &FollowUpQuery) -> Result<FollowUpResult> {
        let mut state = self.lock();
        state.last_query = Some(query.clone());
        match &state.info_response {
            Some(response) => Ok(FollowUpResult {
                food_name: query.food_name.clone(),
                info_type: query.info_type.clone(),
                response: response.clone(),
            }),
            None => Err(FoodVisionError::Api("500: Internal Server Error".to_string()).into()),
        }
    }
}

// ----------------------------------------------------------------------------
// Media source
// ----------------------------------------------------------------------------

/// [`MediaSource`] returning a fixed outcome for both kinds.
pub struct FakeMediaSource {
    permission: PermissionStatus,
    image: Option<PickedImage>,
}

impl FakeMediaSource {
    pub fn with_image(image: PickedImage) -> Self {
        Self {
            permission: PermissionStatus::Granted,
            image: Some(image),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            permission: PermissionStatus::Granted,
            image: None,
        }
    }

    pub fn denied() -> Self {
        Self {
            permission: PermissionStatus::Denied,
            image: None,
        }
    }
}

#[async_trait]
impl MediaSource for FakeMediaSource {
    async fn request_permission(&self, _kind: SourceKind) -> Result<PermissionStatus> {
        Ok(self.permission)
    }

    async fn launch(&self, _kind: SourceKind) -> Result<Option<PickedImage>> {
        Ok(self.image.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_create_test_file() {
        let dir = temp_dir();
        let path = create_test_file(&dir, "test.txt", "content");
        assert!(path.exists());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "content");
    }

    #[test]
    fn test_assert_error_contains_success() {
        let result: Result<()> = Err(FoodVisionError::Config("test error message".into()).into());
        assert_error_contains(result, "test error");
    }

    #[test]
    #[should_panic(expected = "Expected error containing")]
    fn test_assert_error_contains_ok() {
        assert_error_contains(Ok(()), "error");
    }

    #[test]
    fn test_test_config_yaml_parses() {
        let config: Config = serde_yaml::from_str(&test_config_yaml()).unwrap();
        assert_eq!(config.backend.anon_key, "test-anon-key");
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_fake_profile_store_round_trip() {
        let store = FakeProfileStore::default();
        let session = session_for("u1", Utc::now() + Duration::hours(1));
        assert!(store.fetch_profile(&session).await.unwrap().age.is_none());
        store.save_age(&session, 30).await.unwrap();
        assert_eq!(store.age_of("u1"), Some(30));
    }
}
