//! User preference storage for the outbound view.
//!
//! Preferences are kept apart from the entity stores: a small string
//! key-value layer with an in-memory and a JSON file implementation, and a
//! cached [`PreferenceStore`] on top.

use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::PreferenceError;

/// Key of the active outbound sub-tab.
pub const OUTBOUND_TAB_KEY: &str = "tab_outbound";

/// String key-value persistence.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, PreferenceError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError>;

    async fn remove(&self, key: &str) -> Result<(), PreferenceError>;
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryKv {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PreferenceError> {
        self.values.write().await.remove(key);
        Ok(())
    }
}

/// All keys in one JSON object file. A missing file reads as empty.
#[derive(Debug)]
pub struct FileKv {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileKv {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<HashMap<String, String>, PreferenceError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_all(&self, values: &HashMap<String, String>) -> Result<(), PreferenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(values)?;
        tokio::fs::write(&self.path, bytes).await?;
        debug!("Wrote {} preferences to {}", values.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileKv {
    async fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let _lock = self.write_lock.lock().await;
        let mut values = self.read_all().await?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values).await
    }

    async fn remove(&self, key: &str) -> Result<(), PreferenceError> {
        let _lock = self.write_lock.lock().await;
        let mut values = self.read_all().await?;
        if values.remove(key).is_some() {
            self.write_all(&values).await?;
        }
        Ok(())
    }
}

/// Sub-tabs of the outbound view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboundTab {
    #[default]
    Trunk,
    Scheduler,
    Call,
}

impl OutboundTab {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trunk => "trunk",
            Self::Scheduler => "scheduler",
            Self::Call => "call",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trunk" => Some(Self::Trunk),
            "scheduler" => Some(Self::Scheduler),
            "call" => Some(Self::Call),
            _ => None,
        }
    }
}

impl fmt::Display for OutboundTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cached preferences over a [`KeyValueStore`].
///
/// Reads and writes always succeed from the caller's point of view:
/// persistence failures are logged and the cached value is used.
pub struct PreferenceStore {
    cache: RwLock<HashMap<String, String>>,
    backend: Arc<dyn KeyValueStore>,
}

impl Default for PreferenceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PreferenceStore {
    /// Create an in-memory preference store.
    pub fn new() -> Self {
        Self::with_backend(Arc::new(MemoryKv::new()))
    }

    /// Create a preference store persisted to a JSON file.
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self::with_backend(Arc::new(FileKv::new(path)))
    }

    pub fn with_backend(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            backend,
        }
    }

    /// Get a raw preference value.
    pub async fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.cache.read().await.get(key) {
            return Some(value.clone());
        }

        match self.backend.get(key).await {
            Ok(Some(value)) => {
                self.cache
                    .write()
                    .await
                    .insert(key.to_string(), value.clone());
                Some(value)
            }
            Ok(None) => None,
            Err(err) => {
                warn!("Failed to load preference {}: {}", key, err);
                None
            }
        }
    }

    /// Set a raw preference value.
    pub async fn set(&self, key: &str, value: &str) {
        self.cache
            .write()
            .await
            .insert(key.to_string(), value.to_string());

        if let Err(err) = self.backend.set(key, value).await {
            warn!("Failed to persist preference {}: {}", key, err);
        }
    }

    /// Clear a preference (reset to default).
    pub async fn clear(&self, key: &str) {
        self.cache.write().await.remove(key);

        if let Err(err) = self.backend.remove(key).await {
            warn!("Failed to clear preference {}: {}", key, err);
        }
    }

    /// The last active outbound tab. Unknown stored values read as the
    /// default tab.
    pub async fn outbound_tab(&self) -> OutboundTab {
        self.get(OUTBOUND_TAB_KEY)
            .await
            .and_then(|value| OutboundTab::parse(&value))
            .unwrap_or_default()
    }

    pub async fn set_outbound_tab(&self, tab: OutboundTab) {
        self.set(OUTBOUND_TAB_KEY, tab.as_str()).await;
    }
}
