//! Workspace entry crate.
//!
//! This crate exposes shared feature flags that map to the individual
//! workspace crates (`core-service`, and through it `core-auth`,
//! `core-playback`, `core-api`). Host applications can depend on
//! `audiobook-workspace` and enable the documented features without wiring
//! each crate individually.

#[cfg(any(feature = "desktop-shims", feature = "keyring-store"))]
pub use core_service::{AppService, Result, ServiceError};
