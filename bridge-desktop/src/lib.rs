//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for native hosts
//! (macOS, Windows, Linux) and for tests.
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `SecureStore` held in process memory (`MemorySecureStore`)
//! - `SecureStore` using the OS keychain through the `keyring` crate
//!
//! ## Feature Flags
//!
//! - `secure-store`: Enable OS keychain integration
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{MemorySecureStore, ReqwestHttpClient};
//! use std::time::Duration;
//!
//! let http_client = ReqwestHttpClient::with_timeout(Duration::from_secs(5))?;
//! let store = MemorySecureStore::new();
//! // Hand both to the core configuration
//! ```

mod http;
mod memory_store;

#[cfg(feature = "secure-store")]
mod secure_store;

pub use http::ReqwestHttpClient;
pub use memory_store::MemorySecureStore;

#[cfg(feature = "secure-store")]
pub use secure_store::KeyringSecureStore;
