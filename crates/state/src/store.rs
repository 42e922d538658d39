//! Scoped key-value persistence.
//!
//! Two scopes exist with different lifetimes:
//! - [`StoreScope::Sync`] holds small settings such as credentials.
//! - [`StoreScope::Local`] holds bulk data such as cached analyses.
//!
//! Callers receive the store as an injected `Arc<dyn KeyValueStore>`; nothing
//! in the workspace reaches for a global instance.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Storage scope for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreScope {
    /// Small synced settings (credentials).
    Sync,
    /// Bulk local data (cache entries, analysis blobs).
    Local,
}

impl StoreScope {
    /// Stable label used for file names and log fields.
    pub fn label(&self) -> &'static str {
        match self {
            StoreScope::Sync => "sync",
            StoreScope::Local => "local",
        }
    }
}

/// Get/set-by-key storage over two scopes.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, scope: StoreScope, key: &str) -> Result<Option<Value>>;
    fn set(&self, scope: StoreScope, key: &str, value: Value) -> Result<()>;
    /// Removes a key, returning whether it existed.
    fn remove(&self, scope: StoreScope, key: &str) -> Result<bool>;

    /// Reads a string value, ignoring non-string and blank entries.
    fn get_string(&self, scope: StoreScope, key: &str) -> Result<Option<String>> {
        Ok(self
            .get(scope, key)?
            .and_then(|v| v.as_str().map(|s| s.trim().to_string()))
            .filter(|s| !s.is_empty()))
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<(StoreScope, String), Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, scope: StoreScope, key: &str) -> Result<Option<Value>> {
        Ok(self.inner.lock().get(&(scope, key.to_string())).cloned())
    }

    fn set(&self, scope: StoreScope, key: &str, value: Value) -> Result<()> {
        self.inner.lock().insert((scope, key.to_string()), value);
        Ok(())
    }

    fn remove(&self, scope: StoreScope, key: &str) -> Result<bool> {
        Ok(self.inner.lock().remove(&(scope, key.to_string())).is_some())
    }
}

/// File-backed store: one JSON object per scope under a root directory.
///
/// Each write rewrites the whole scope file. Writers are serialized within a
/// process by a mutex; concurrent processes follow last-writer-wins.
#[derive(Debug)]
pub struct JsonFileStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Create a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: Mutex::new(()),
        }
    }

    /// Open the store under the repolens data directory.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(crate::env::data_dir()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn scope_path(&self, scope: StoreScope) -> PathBuf {
        self.root.join(format!("{}.json", scope.label()))
    }

    fn load_scope(&self, scope: StoreScope) -> Result<Map<String, Value>> {
        let path = self.scope_path(scope);
        if !path.exists() {
            return Ok(Map::new());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        let value: Value = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        match value {
            Value::Object(map) => Ok(map),
            _ => anyhow::bail!("{} does not contain a JSON object", path.display()),
        }
    }

    fn save_scope(&self, scope: StoreScope, map: &Map<String, Value>) -> Result<()> {
        let path = self.scope_path(scope);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::write(&path, serde_json::to_string_pretty(map)?)
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::trace!(
            target: "repolens::store",
            scope = scope.label(),
            keys = map.len(),
            "saved scope file"
        );
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, scope: StoreScope, key: &str) -> Result<Option<Value>> {
        let _guard = self.lock.lock();
        Ok(self.load_scope(scope)?.remove(key))
    }

    fn set(&self, scope: StoreScope, key: &str, value: Value) -> Result<()> {
        let _guard = self.lock.lock();
        let mut map = self.load_scope(scope)?;
        map.insert(key.to_string(), value);
        self.save_scope(scope, &map)
    }

    fn remove(&self, scope: StoreScope, key: &str) -> Result<bool> {
        let _guard = self.lock.lock();
        let mut map = self.load_scope(scope)?;
        let existed = map.remove(key).is_some();
        if existed {
            self.save_scope(scope, &map)?;
        }
        Ok(existed)
    }
}
