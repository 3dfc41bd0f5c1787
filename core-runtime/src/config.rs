//! # Core Configuration Module
//!
//! Provides configuration management for the audiobook core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct an `AppConfig`
//! instance that holds the host capabilities and settings shared by every core
//! crate. It enforces fail-fast validation so that a misconfigured shell is
//! rejected at startup instead of on the first request.
//!
//! ## Required Dependencies
//!
//! - `SecureStore` - Client-side credential persistence
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `HttpClient` - REST API access (desktop default: reqwest)
//!
//! When the `desktop-shims` feature is enabled, an in-memory `SecureStore` and
//! a reqwest `HttpClient` are injected automatically if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::AppConfig;
//! use std::sync::Arc;
//!
//! let config = AppConfig::builder()
//!     .api_base_url("https://api.example.com/v1")
//!     .secure_store(Arc::new(MySecureStore))
//!     .http_client(Arc::new(MyHttpClient))
//!     .build()?;
//!
//! assert_eq!(config.endpoint("audiobooks/"), "https://api.example.com/v1/audiobooks/");
//! ```
//!
//! ## Error Handling
//!
//! Invalid values surface as [`Error::Config`]; a missing required capability
//! surfaces as [`Error::CapabilityMissing`] with a message naming the fix.

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{HttpClient, SecureStore};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Base URL of the development API server.
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/";

/// Per-request timeout used when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Header scheme the API expects in front of the credential.
pub const DEFAULT_AUTH_SCHEME: &str = "Token";

/// Keys under which the credential and the account email are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub token_key: String,
    pub email_key: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            token_key: "Token".to_string(),
            email_key: "userEmail".to_string(),
        }
    }
}

impl StorageKeys {
    fn validate(&self) -> Result<()> {
        if self.token_key.trim().is_empty() || self.email_key.trim().is_empty() {
            return Err(Error::Config(
                "Storage keys cannot be empty. Use .storage_keys() with non-empty names."
                    .to_string(),
            ));
        }

        if self.token_key == self.email_key {
            return Err(Error::Config(format!(
                "Token and email storage keys must differ (both are '{}')",
                self.token_key
            )));
        }

        Ok(())
    }
}

/// Core configuration for the audiobook platform.
///
/// Use [`AppConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct AppConfig {
    /// Root of the REST API; always ends with `/`
    pub api_base_url: Url,

    /// Timeout applied to every API request
    pub request_timeout: Duration,

    /// `Authorization` header scheme (`Token` or `Bearer`)
    pub auth_scheme: String,

    pub storage_keys: StorageKeys,

    /// Where the gate sends visitors without a usable credential
    pub login_redirect: String,

    /// Where the API client sends the user after a 401
    pub unauthorized_redirect: String,

    /// Per-subscriber buffer of the event bus
    pub event_buffer_size: usize,

    /// Secure credential storage (required)
    pub secure_store: Arc<dyn SecureStore>,

    /// HTTP client for API requests (optional with desktop default)
    pub http_client: Option<Arc<dyn HttpClient>>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_base_url", &self.api_base_url.as_str())
            .field("request_timeout", &self.request_timeout)
            .field("auth_scheme", &self.auth_scheme)
            .field("storage_keys", &self.storage_keys)
            .field("login_redirect", &self.login_redirect)
            .field("unauthorized_redirect", &self.unauthorized_redirect)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("secure_store", &"SecureStore { ... }")
            .field(
                "http_client",
                &self.http_client.as_ref().map(|_| "HttpClient { ... }"),
            )
            .finish()
    }
}

impl AppConfig {
    /// Creates a new builder for constructing an `AppConfig`.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Absolute URL of an API path such as `audiobooks/12/`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path.trim_start_matches('/'))
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The base URL is http(s) and ends with `/`
    /// - The request timeout is within 1 ms..=120 s
    /// - The auth scheme is a single non-empty word
    /// - Storage keys are non-empty and distinct
    /// - Redirect targets are non-empty
    /// - The event buffer is non-zero
    pub fn validate(&self) -> Result<()> {
        match self.api_base_url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(Error::Config(format!(
                    "API base URL must use http or https, got '{}'",
                    other
                )))
            }
        }

        if !self.api_base_url.path().ends_with('/') {
            return Err(Error::Config(
                "API base URL must end with '/' so endpoint paths join correctly".to_string(),
            ));
        }

        if self.request_timeout < Duration::from_millis(1) {
            return Err(Error::Config(
                "Request timeout must be at least 1 ms".to_string(),
            ));
        }

        if self.request_timeout > MAX_REQUEST_TIMEOUT {
            return Err(Error::Config(
                "Request timeout exceeds maximum of 120 seconds".to_string(),
            ));
        }

        if self.auth_scheme.is_empty() || self.auth_scheme.chars().any(char::is_whitespace) {
            return Err(Error::Config(format!(
                "Auth scheme must be a single word such as 'Token' or 'Bearer', got '{}'",
                self.auth_scheme
            )));
        }

        self.storage_keys.validate()?;

        if self.login_redirect.is_empty() || self.unauthorized_redirect.is_empty() {
            return Err(Error::Config(
                "Redirect targets cannot be empty".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let mut normalized = raw.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }

    Url::parse(&normalized)
        .map_err(|e| Error::Config(format!("Invalid API base URL '{}': {}", raw, e)))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    Err(Error::capability_missing(
        "SecureStore",
        "SecureStore implementation is required for credential persistence. \
         Desktop: enable the 'desktop-shims' feature to use the in-memory store, \
         or inject bridge_desktop::KeyringSecureStore. \
         Web: inject a localStorage-backed store.",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    use bridge_desktop::MemorySecureStore;

    let store: Arc<dyn SecureStore> = Arc::new(MemorySecureStore::new());
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Duration) -> Result<Option<Arc<dyn HttpClient>>> {
    Ok(None)
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration) -> Result<Option<Arc<dyn HttpClient>>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::with_timeout(timeout).map_err(|e| {
        Error::Internal(format!("Failed to create default HttpClient: {}", e))
    })?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(Some(client))
}

/// Builder for constructing [`AppConfig`] instances.
#[derive(Default)]
pub struct AppConfigBuilder {
    api_base_url: Option<String>,
    request_timeout: Option<Duration>,
    auth_scheme: Option<String>,
    storage_keys: Option<StorageKeys>,
    login_redirect: Option<String>,
    unauthorized_redirect: Option<String>,
    event_buffer_size: Option<usize>,
    secure_store: Option<Arc<dyn SecureStore>>,
    http_client: Option<Arc<dyn HttpClient>>,
}

impl AppConfigBuilder {
    /// Sets the REST API root. A trailing `/` is appended if missing.
    ///
    /// Default: `http://127.0.0.1:8000/`
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Default: 5 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the `Authorization` header scheme.
    ///
    /// Default: `Token`
    pub fn auth_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.auth_scheme = Some(scheme.into());
        self
    }

    pub fn storage_keys(mut self, keys: StorageKeys) -> Self {
        self.storage_keys = Some(keys);
        self
    }

    /// Default: `/login`
    pub fn login_redirect(mut self, target: impl Into<String>) -> Self {
        self.login_redirect = Some(target.into());
        self
    }

    /// Default: `/`
    pub fn unauthorized_redirect(mut self, target: impl Into<String>) -> Self {
        self.unauthorized_redirect = Some(target.into());
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the secure store implementation (required).
    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, a reqwest-based client honouring `request_timeout`
    /// is used when the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Builds the final `AppConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(AppConfig)` on success, or an error if:
    /// - The SecureStore is missing and no default is available
    /// - Configuration values are invalid
    pub fn build(self) -> Result<AppConfig> {
        let api_base_url =
            parse_base_url(self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL))?;
        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let secure_store = match self.secure_store {
            Some(store) => store,
            None => provide_default_secure_store()?,
        };

        let http_client = match self.http_client {
            Some(client) => Some(client),
            None => provide_default_http_client(request_timeout)?,
        };

        let config = AppConfig {
            api_base_url,
            request_timeout,
            auth_scheme: self
                .auth_scheme
                .unwrap_or_else(|| DEFAULT_AUTH_SCHEME.to_string()),
            storage_keys: self.storage_keys.unwrap_or_default(),
            login_redirect: self.login_redirect.unwrap_or_else(|| "/login".to_string()),
            unauthorized_redirect: self
                .unauthorized_redirect
                .unwrap_or_else(|| "/".to_string()),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            secure_store,
            http_client,
        };

        config.validate()?;

        Ok(config)
    }
}
