use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;

use foodvision::auth::{AuthRedirects, SupabaseAuth};
use foodvision::backend::BackendClient;
use foodvision::config::{BackendConfig, VisionConfig};
use foodvision::session::{FileSessionStore, Session, User};
use foodvision::SessionManager;

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

#[allow(dead_code)]
pub fn backend_config(uri: &str) -> BackendConfig {
    BackendConfig {
        url: uri.to_string(),
        anon_key: "test-anon-key".to_string(),
        timeout_seconds: 5,
        ..BackendConfig::default()
    }
}

#[allow(dead_code)]
pub fn vision_config(uri: &str) -> VisionConfig {
    VisionConfig {
        base_url: uri.to_string(),
        timeout_seconds: 5,
        ..VisionConfig::default()
    }
}

/// A session manager talking to `uri` and caching into `store_path`.
#[allow(dead_code)]
pub fn session_manager(uri: &str, store_path: PathBuf) -> Arc<SessionManager> {
    let config = backend_config(uri);
    let client = BackendClient::new(&config).expect("backend client");
    Arc::new(SessionManager::new(
        Arc::new(SupabaseAuth::new(client)),
        Arc::new(FileSessionStore::new_with_path(store_path)),
        AuthRedirects::from(&config),
    ))
}

/// GoTrue token response body.
#[allow(dead_code)]
pub fn token_body(user_id: &str, email: &str, expires_in: i64) -> Value {
    json!({
        "access_token": format!("access-{}", user_id),
        "refresh_token": format!("refresh-{}", user_id),
        "token_type": "bearer",
        "expires_in": expires_in,
        "user": { "id": user_id, "email": email }
    })
}

#[allow(dead_code)]
pub fn session(user_id: &str, expires_at: DateTime<Utc>) -> Session {
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
