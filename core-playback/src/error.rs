//! # Playback Error Types
//!
//! Errors raised around the playback session. The session reducer itself is
//! total and never fails; these come from the store task, the media driver
//! and input validation.

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Store Errors
    // ========================================================================
    /// The owning store task has stopped; commands can no longer be applied.
    #[error("Playback store is no longer running")]
    StoreClosed,

    /// No tokio runtime was available to host the store task.
    #[error("No async runtime available: {0}")]
    RuntimeUnavailable(String),

    // ========================================================================
    // Media Errors
    // ========================================================================
    /// The current item carries no media locator.
    #[error("Item {0} has no media reference")]
    MissingMediaRef(String),

    /// The host media element reported a failure.
    #[error("Media element error: {0}")]
    Media(String),

    /// Attempted operation when no item is loaded.
    #[error("No item loaded")]
    NoItemLoaded,

    // ========================================================================
    // Control Errors
    // ========================================================================
    /// Invalid volume value (must be in range [0.0, 1.0]).
    #[error("Invalid volume: {0} (must be between 0.0 and 1.0)")]
    InvalidVolume(f32),
}

impl PlaybackError {
    /// Returns `true` if retrying the same media operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, PlaybackError::Media(_))
    }
}

impl From<BridgeError> for PlaybackError {
    fn from(error: BridgeError) -> Self {
        PlaybackError::Media(error.to_string())
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
