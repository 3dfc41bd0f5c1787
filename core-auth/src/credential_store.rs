//! Credential Storage
//!
//! Persists the bearer credential and the signed-in account's email under the
//! two well-known keys from [`StorageKeys`], using the host's [`SecureStore`].
//!
//! - Values are never logged
//! - Deleting a key that is not present is not an error
//! - A value that is not valid UTF-8 is treated as corrupt: it is removed and
//!   reported as absent
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{Credential, CredentialStore};
//! use core_runtime::StorageKeys;
//! use std::sync::Arc;
//! # use bridge_traits::storage::SecureStore;
//! # async fn example(secure_store: Arc<dyn SecureStore>) -> core_auth::Result<()> {
//! let store = CredentialStore::new(secure_store, StorageKeys::default());
//!
//! store.store(&Credential::new("abc.def.ghi"), "reader@example.com").await?;
//! assert!(store.token().await?.is_some());
//!
//! store.clear().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::Credential;
use bridge_traits::storage::SecureStore;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use core_runtime::StorageKeys;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Client-side persistence for the credential and account email.
#[derive(Clone)]
pub struct CredentialStore {
    secure_store: Arc<dyn SecureStore>,
    keys: StorageKeys,
}

impl CredentialStore {
    pub fn new(secure_store: Arc<dyn SecureStore>, keys: StorageKeys) -> Self {
        debug!(
            token_key = %keys.token_key,
            email_key = %keys.email_key,
            "Initializing CredentialStore"
        );
        Self { secure_store, keys }
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// Persist a freshly issued credential together with the account email.
    ///
    /// Both keys are overwritten. If the email cannot be written the token is
    /// removed again so the store never holds a token without its owner.
    pub async fn store(&self, credential: &Credential, email: &str) -> Result<()> {
        self.write(&self.keys.token_key, credential.expose()).await?;

        if let Err(e) = self.write(&self.keys.email_key, email).await {
            let _ = self.remove(&self.keys.token_key).await;
            return Err(e);
        }

        info!(token_len = credential.expose().len(), "Credential stored");
        Ok(())
    }

    /// The stored credential, if any.
    pub async fn token(&self) -> Result<Option<Credential>> {
        Ok(self.read(&self.keys.token_key).await?.map(Credential::new))
    }

    /// The stored account email, if any.
    pub async fn email(&self) -> Result<Option<String>> {
        self.read(&self.keys.email_key).await
    }

    /// Remove only the credential, keeping the email.
    pub async fn clear_token(&self) -> Result<()> {
        self.remove(&self.keys.token_key).await?;
        debug!("Credential removed");
        Ok(())
    }

    /// The server refused the credential.
    ///
    /// Removes the token, keeps the email and publishes `SessionExpired`. The
    /// event goes out even when the token could not be removed.
    pub async fn expire(&self, event_bus: &EventBus) -> Result<()> {
        let removed = self.clear_token().await;
        warn!("Credential refused by the API, session expired");
        let _ = event_bus.emit(CoreEvent::Auth(AuthEvent::SessionExpired));
        removed
    }

    /// Remove both the credential and the email.
    pub async fn clear(&self) -> Result<()> {
        let token = self.remove(&self.keys.token_key).await;
        let email = self.remove(&self.keys.email_key).await;
        token.and(email)?;
        info!("Stored credentials cleared");
        Ok(())
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        self.secure_store
            .set_secret(key, value.as_bytes())
            .await
            .map_err(|e| {
                warn!(key = key, error = %e, "Failed to write to secure storage");
                AuthError::SecureStorageUnavailable(e.to_string())
            })
    }

    async fn read(&self, key: &str) -> Result<Option<String>> {
        let bytes = self.secure_store.get_secret(key).await.map_err(|e| {
            warn!(key = key, error = %e, "Failed to read from secure storage");
            AuthError::SecureStorageUnavailable(e.to_string())
        })?;

        let Some(bytes) = bytes else {
            return Ok(None);
        };

        match String::from_utf8(bytes) {
            Ok(value) => Ok(Some(value)),
            Err(_) => {
                warn!(key = key, "Stored value is not valid UTF-8, removing it");
                let _ = self.remove(key).await;
                Ok(None)
            }
        }
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.secure_store.delete_secret(key).await.map_err(|e| {
            warn!(key = key, error = %e, "Failed to delete from secure storage");
            AuthError::SecureStorageUnavailable(e.to_string())
        })
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("keys", &self.keys)
            .finish()
    }
}
