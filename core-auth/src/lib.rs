//! # Authentication Module
//!
//! Email/password sessions for the audiobook catalog.
//!
//! ## Overview
//!
//! This crate decides whether the client holds a usable credential and manages
//! the lifecycle of that credential: obtaining it from the login endpoint,
//! persisting it in client-side storage, and discarding it on logout or when
//! the API refuses it.
//!
//! ## Features
//!
//! - [`gate`]: fail-closed expiry check of the stored token
//! - [`CredentialStore`]: the credential and account email in a `SecureStore`
//! - [`SessionManager`]: login, registration, logout, unauthorized handling
//! - Auth state event emission

pub mod credential_store;
pub mod error;
pub mod gate;
pub mod manager;
pub mod types;

pub use credential_store::CredentialStore;
pub use error::{AuthError, Result};
pub use gate::{is_session_valid, is_session_valid_at, GateDecision, SessionGate};
pub use manager::SessionManager;
pub use types::{AuthState, Credential, TokenClaims};
