//! In-process credential storage

use async_trait::async_trait;
use bridge_traits::{error::Result, storage::SecureStore};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// `SecureStore` backed by a `HashMap`.
///
/// Values live only as long as the process. Used as the default store for
/// headless sessions and throughout the test suites.
#[derive(Default)]
pub struct MemorySecureStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemorySecureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl std::fmt::Debug for MemorySecureStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySecureStore")
            .field("entries", &self.len())
            .finish()
    }
}

#[async_trait]
impl SecureStore for MemorySecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_vec());
        debug!(key = key, "Stored secret in memory");
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        if self.entries.write().remove(key).is_some() {
            debug!(key = key, "Deleted secret from memory");
        }
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn clear_all(&self) -> Result<()> {
        self.entries.write().clear();
        Ok(())
    }
}
