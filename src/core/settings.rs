//! Panel settings and the key/value store behind them
//!
//! The backend exposes settings as remote `get`/`set`/`commit` calls. The
//! panel keeps a local [`SettingsCache`] that is updated optimistically on
//! toggle and confirmed (or rolled back) once the round trip completes.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from a settings store
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings io error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("settings file {path:?} is not a JSON object: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("settings rpc failed: {0}")]
    Rpc(String),
}

/// Remote key/value settings interface.
///
/// Every `set` must be followed by a `commit` to be persisted.
pub trait SettingsRpc: Send + Sync {
    fn get(&self, key: &str, default: Value) -> impl Future<Output = Result<Value, SettingsError>> + Send;
    fn set(&self, key: &str, value: Value) -> impl Future<Output = Result<(), SettingsError>> + Send;
    fn commit(&self) -> impl Future<Output = Result<(), SettingsError>> + Send;
}

/// Settings the panel knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKey {
    Debug,
    Notifications,
}

impl SettingKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::Debug => "debug",
            SettingKey::Notifications => "notifications",
        }
    }

    pub fn default_value(&self) -> bool {
        match self {
            SettingKey::Debug => false,
            SettingKey::Notifications => true,
        }
    }

    pub fn all() -> &'static [SettingKey] {
        &[SettingKey::Debug, SettingKey::Notifications]
    }
}

impl std::str::FromStr for SettingKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(SettingKey::Debug),
            "notifications" => Ok(SettingKey::Notifications),
            other => Err(format!("unknown setting '{}'", other)),
        }
    }
}

impl std::fmt::Display for SettingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local copy of the panel settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsState {
    pub debug: bool,
    pub notifications: bool,
}

impl Default for SettingsState {
    fn default() -> Self {
        Self {
            debug: SettingKey::Debug.default_value(),
            notifications: SettingKey::Notifications.default_value(),
        }
    }
}

impl SettingsState {
    /// Read every known key from the store, falling back to its default
    pub async fn load<R: SettingsRpc>(rpc: &R) -> Result<Self, SettingsError> {
        let mut state = Self::default();
        for key in SettingKey::all() {
            let value = read_bool(rpc, *key).await?;
            state.set(*key, value);
        }
        Ok(state)
    }

    pub fn get(&self, key: SettingKey) -> bool {
        match key {
            SettingKey::Debug => self.debug,
            SettingKey::Notifications => self.notifications,
        }
    }

    pub fn set(&mut self, key: SettingKey, value: bool) {
        match key {
            SettingKey::Debug => self.debug = value,
            SettingKey::Notifications => self.notifications = value,
        }
    }
}

/// Read one boolean setting
pub async fn read_bool<R: SettingsRpc>(rpc: &R, key: SettingKey) -> Result<bool, SettingsError> {
    let default = key.default_value();
    let value = rpc.get(key.as_str(), Value::Bool(default)).await?;
    match value.as_bool() {
        Some(b) => Ok(b),
        None => {
            warn!("Setting {} has non-boolean value {}, using default", key, value);
            Ok(default)
        }
    }
}

/// Write one boolean setting and commit it
pub async fn write_bool<R: SettingsRpc>(
    rpc: &R,
    key: SettingKey,
    value: bool,
) -> Result<(), SettingsError> {
    rpc.set(key.as_str(), Value::Bool(value)).await?;
    rpc.commit().await
}

/// A toggle applied locally and waiting for backend confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingWrite {
    pub key: SettingKey,
    pub value: bool,
    pub previous: bool,
}

/// Optimistic settings cache.
///
/// Writes are not queued: each toggle starts its own round trip and
/// whichever finishes last decides the cached value.
#[derive(Debug, Default)]
pub struct SettingsCache {
    state: SettingsState,
    error: Option<String>,
}

impl SettingsCache {
    pub fn state(&self) -> SettingsState {
        self.state
    }

    /// Error from the last failed write, until the next successful one
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn replace(&mut self, state: SettingsState) {
        self.state = state;
    }

    /// Apply a toggle locally before it reaches the backend
    pub fn begin(&mut self, key: SettingKey, value: bool) -> PendingWrite {
        let previous = self.state.get(key);
        self.state.set(key, value);
        debug!("Setting {} -> {} (optimistic, was {})", key, value, previous);
        PendingWrite { key, value, previous }
    }

    /// Settle a toggle once its round trip completed.
    ///
    /// On failure the previous value is restored and the error is kept for
    /// display.
    pub fn finish(
        &mut self,
        pending: PendingWrite,
        result: Result<(), SettingsError>,
    ) -> Result<(), SettingsError> {
        match result {
            Ok(()) => {
                self.state.set(pending.key, pending.value);
                self.error = None;
                info!("Setting {} = {} committed", pending.key, pending.value);
                Ok(())
            }
            Err(e) => {
                warn!("Setting {} = {} failed, rolling back: {}", pending.key, pending.value, e);
                self.state.set(pending.key, pending.previous);
                self.error = Some(format!("Could not save {}: {}", pending.key, e));
                Err(e)
            }
        }
    }
}

// ── Stores ─────────────────────────────────────────────────────────

/// JSON file backed settings store.
///
/// The file is read once on open; `set` only changes memory and `commit`
/// writes the whole object back.
pub struct JsonSettingsStore {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl JsonSettingsStore {
    /// Open (or start empty when the file doesn't exist)
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let values = if path.exists() {
            let content = std::fs::read(&path).map_err(|source| SettingsError::Io {
                path: path.clone(),
                source,
            })?;
            serde_json::from_slice::<Map<String, Value>>(&content).map_err(|source| {
                SettingsError::Parse {
                    path: path.clone(),
                    source,
                }
            })?
        } else {
            Map::new()
        };
        info!("Settings loaded from {:?} ({} keys)", path, values.len());
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Open, or start empty at the same path when the file can't be read.
    /// The next commit replaces the unreadable file.
    pub fn open_or_empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::open(path.clone()) {
            Ok(store) => store,
            Err(e) => {
                warn!("{}, starting with default settings", e);
                Self {
                    path,
                    values: Mutex::new(Map::new()),
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsRpc for JsonSettingsStore {
    async fn get(&self, key: &str, default: Value) -> Result<Value, SettingsError> {
        debug!("Get {}", key);
        Ok(self.values.lock().get(key).cloned().unwrap_or(default))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        debug!("Set {}: {}", key, value);
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn commit(&self) -> Result<(), SettingsError> {
        let content = {
            let values = self.values.lock();
            serde_json::to_vec_pretty(&*values).map_err(|e| SettingsError::Rpc(e.to_string()))?
        };

        let io_err = |source| SettingsError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        // Write next to the target, then rename over it
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        info!("Settings saved to {:?}", self.path);
        Ok(())
    }
}

/// In-process settings store; `commit` is a no-op
#[derive(Default)]
pub struct MemorySettingsStore {
    values: Mutex<Map<String, Value>>,
    commits: Mutex<usize>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of commits seen so far
    pub fn commit_count(&self) -> usize {
        *self.commits.lock()
    }
}

impl SettingsRpc for MemorySettingsStore {
    async fn get(&self, key: &str, default: Value) -> Result<Value, SettingsError> {
        Ok(self.values.lock().get(key).cloned().unwrap_or(default))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn commit(&self) -> Result<(), SettingsError> {
        *self.commits.lock() += 1;
        Ok(())
    }
}
