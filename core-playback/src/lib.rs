//! # Playback Module
//!
//! The playback session: what is playing, what comes next, and whether the
//! transport is running.
//!
//! ## Overview
//!
//! This module handles:
//! - The [`PlaybackSession`] value and its total reducer over [`PlaybackCommand`]
//! - A single owning [`PlaybackStore`] with `watch` observers and bus events
//! - A cloneable [`PlaybackHandle`] feeding the store's command queue
//! - A [`PlaybackDriver`] that mirrors the session onto a host media element
//! - Transport bar helpers in [`progress`]

pub mod driver;
pub mod error;
pub mod handle;
pub mod progress;
pub mod session;
pub mod store;
pub mod types;

pub use driver::{PlaybackDriver, DEFAULT_POLL_INTERVAL};
pub use error::{PlaybackError, Result};
pub use handle::PlaybackHandle;
pub use progress::{format_time, PlaybackProgress};
pub use session::{PlaybackCommand, PlaybackSession, Transition};
pub use store::PlaybackStore;
pub use types::{ItemId, PlaybackContext, PlaybackItem, PlaylistEntry};
