//! Persistence seam for presentation state.
//!
//! Backends are plain string key-value stores. Reads never fail: a missing or
//! unreadable key is reported as `None` and the caller falls back to the
//! column model's declared defaults.

use std::collections::HashMap;

use crate::error::Result;

/// String-keyed store for presentation state.
pub trait PresentationStore {
    /// Read a value. `None` if absent or unreadable.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, overwriting any previous one.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove a value. `Ok(())` even if nothing was stored.
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-memory store for tests, the CLI and environments without storage.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate from `(key, value)` pairs.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PresentationStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// Browser `localStorage` backend.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone)]
pub struct LocalStorageStore {
    storage: Option<web_sys::Storage>,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorageStore {
    /// Bind to `window.localStorage`. Without access (private mode, workers)
    /// reads return `None` and writes fail softly.
    pub fn new() -> Self {
        let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten());
        if storage.is_none() {
            log::warn!("localStorage unavailable; column settings will not persist");
        }
        Self { storage }
    }
}

#[cfg(target_arch = "wasm32")]
impl Default for LocalStorageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_arch = "wasm32")]
impl PresentationStore for LocalStorageStore {
    fn get(&self, key: &str) -> Option<String> {
        self.storage.as_ref()?.get_item(key).ok().flatten()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let storage = self
            .storage
            .as_ref()
            .ok_or_else(|| crate::error::GridError::Storage("localStorage unavailable".into()))?;
        storage
            .set_item(key, value)
            .map_err(|e| crate::error::GridError::Storage(format!("{e:?}")))
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if let Some(storage) = &self.storage {
            storage
                .remove_item(key)
                .map_err(|e| crate::error::GridError::Storage(format!("{e:?}")))?;
        }
        Ok(())
    }
}
