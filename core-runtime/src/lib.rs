//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the audiobook core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! Every other core crate depends on this one. It fixes the configuration
//! surface handed over by the host shell, the logging conventions, and the
//! typed events through which the session manager, the playback store and
//! the API client report what happened.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{AppConfig, AppConfigBuilder, StorageKeys};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream};
