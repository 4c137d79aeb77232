//! Local cache for the serialized session
//!
//! The cached session lives under the fixed key [`SESSION_KEY`]. Three
//! backends are provided:
//!
//! - [`FileSessionStore`]: a small JSON key-value file in the platform data
//!   directory, values stored as serialized strings.
//! - [`KeyringSessionStore`]: the OS native credential store (Keychain on
//!   macOS, Secret Service on Linux, Credential Manager on Windows).
//! - [`MemorySessionStore`]: process memory, for tests and throwaway runs.
//!
//! Only the session manager writes to a store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use directories::ProjectDirs;

use crate::config::{SessionConfig, SessionStoreKind};
use crate::error::{FoodVisionError, Result};
use crate::session::Session;

/// Key under which the serialized session is cached.
pub const SESSION_KEY: &str = "supabase_session";

/// Key-value cache holding at most one serialized [`Session`].
pub trait SessionStore: Send + Sync {
    /// Returns the cached session, or `Ok(None)` when nothing is cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails or the cached value is not
    /// a valid session.
    fn load(&self) -> Result<Option<Session>>;

    /// Replaces the cached session.
    fn save(&self, session: &Session) -> Result<()>;

    /// Removes the cached session. Clearing an empty store is a no-op.
    fn clear(&self) -> Result<()>;
}

/// Builds the store selected by `config`.
///
/// # Errors
///
/// Returns [`FoodVisionError::SessionStore`] if the platform data directory
/// cannot be determined for the file store.
pub fn open_store(config: &SessionConfig) -> Result<Arc<dyn SessionStore>> {
    match config.store {
        SessionStoreKind::File => {
            let store = match &config.path {
                Some(path) => FileSessionStore::new_with_path(path.clone()),
                None => FileSessionStore::new()?,
            };
            tracing::debug!(path = %store.path().display(), "Using file session store");
            Ok(Arc::new(store))
        }
        SessionStoreKind::Keyring => {
            tracing::debug!("Using keyring session store");
            Ok(Arc::new(KeyringSessionStore))
        }
        SessionStoreKind::Memory => {
            tracing::debug!("Using in-memory session store");
            Ok(Arc::new(MemorySessionStore::default()))
        }
    }
}

// ---------------------------------------------------------------------------
// FileSessionStore
// ---------------------------------------------------------------------------

/// JSON key-value file store.
///
/// The file holds an object mapping keys to serialized JSON strings, so other
/// entries written by future versions survive a session update.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Creates a store backed by `storage.json` in the user's data directory.
    pub fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("com", "foodvision", "foodvision").ok_or_else(|| {
            FoodVisionError::SessionStore("Could not determine data directory".into())
        })?;
        Ok(Self::new_with_path(proj_dirs.data_dir().join("storage.json")))
    }

    /// Creates a store backed by the given file path.
    ///
    /// The file and its parent directories are created on first write.
    pub fn new_with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read session store")
            .map_err(|e| FoodVisionError::SessionStore(e.to_string()))?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        let entries = serde_json::from_str(&contents)
            .context("Session store file is corrupt")
            .map_err(|e| FoodVisionError::SessionStore(e.to_string()))?;
        Ok(entries)
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create session store directory")
                .map_err(|e| FoodVisionError::SessionStore(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json)
            .context("Failed to write session store")
            .map_err(|e| FoodVisionError::SessionStore(e.to_string()))?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>> {
        let entries = self.read_entries()?;
        match entries.get(SESSION_KEY) {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, session: &Session) -> Result<()> {
        let mut entries = self.read_entries().unwrap_or_else(|e| {
            tracing::warn!("Discarding unreadable session store: {}", e);
            BTreeMap::new()
        });
        entries.insert(SESSION_KEY.to_string(), serde_json::to_string(session)?);
        self.write_entries(&entries)
    }

    fn clear(&self) -> Result<()> {
        let mut entries = match self.read_entries() {
            Ok(entries) => entries,
            Err(e) => {
                // A corrupt file cannot hold a usable session; drop it.
                tracing::warn!("Removing unreadable session store: {}", e);
                std::fs::remove_file(&self.path)?;
                return Ok(());
            }
        };
        if entries.remove(SESSION_KEY).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// KeyringSessionStore
// ---------------------------------------------------------------------------

/// Stateless accessor for the OS native keyring.
pub struct KeyringSessionStore;

impl KeyringSessionStore {
    const SERVICE: &'static str = "foodvision";

    fn entry() -> Result<keyring::Entry> {
        keyring::Entry::new(Self::SERVICE, SESSION_KEY).map_err(|e| FoodVisionError::Keyring(e).into())
    }
}

impl SessionStore for KeyringSessionStore {
    fn load(&self) -> Result<Option<Session>> {
        match Self::entry()?.get_password() {
            Ok(json_str) => Ok(Some(serde_json::from_str(&json_str)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(FoodVisionError::Keyring(e).into()),
        }
    }

    fn save(&self, session: &Session) -> Result<()> {
        let json_str = serde_json::to_string(session)?;
        Self::entry()?
            .set_password(&json_str)
            .map_err(FoodVisionError::Keyring)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match Self::entry()?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(FoodVisionError::Keyring(e).into()),
        }
    }
}

// ---------------------------------------------------------------------------
// MemorySessionStore
// ---------------------------------------------------------------------------

/// In-process store. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemorySessionStore {
    /// Creates a store pre-populated with `session`.
    pub fn with_session(session: &Session) -> Result<Self> {
        let store = Self::default();
        store.save(session)?;
        Ok(store)
    }

    /// Stores a raw value under the session key, bypassing serialization.
    pub fn put_raw(&self, raw: impl Into<String>) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(raw.into());
        }
    }

    /// Returns `true` when something is cached.
    pub fn is_populated(&self) -> bool {
        self.slot.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>> {
        self.slot
            .lock()
            .map_err(|_| FoodVisionError::SessionStore("memory store lock poisoned".into()).into())
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>> {
        match self.lock()?.as_deref() {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, session: &Session) -> Result<()> {
        let raw = serde_json::to_string(session)?;
        *self.lock()? = Some(raw);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.lock()? = None;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
