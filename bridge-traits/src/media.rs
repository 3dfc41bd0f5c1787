//! Media playback bridge.
//!
//! The host owns the real decoder (an HTML audio element in the browser, a
//! native engine elsewhere). The core only tells it what to load and whether
//! it should be playing, and reads back position and completion.

use crate::error::Result;
use std::time::Duration;

/// Lifecycle state reported by a media element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MediaState {
    /// Nothing loaded yet.
    #[default]
    Idle,
    /// A source is being fetched or probed.
    Loading,
    Playing,
    Paused,
    /// The loaded source played to its end.
    Ended,
    /// The element failed to load or decode the source.
    Error { message: String },
}

impl MediaState {
    /// Returns `true` once the loaded source has finished.
    pub fn is_ended(&self) -> bool {
        matches!(self, MediaState::Ended)
    }
}

/// Host media playback capability.
///
/// Given a media locator it can load, play, pause, seek, and report elapsed
/// and total time and completion.
#[async_trait::async_trait]
pub trait MediaElement: Send + Sync {
    /// Replace the current source with `media_ref` and start buffering it.
    async fn load(&self, media_ref: &str) -> Result<()>;

    /// Begin or resume playback of the loaded source.
    async fn play(&self) -> Result<()>;

    /// Pause playback without unloading the source.
    async fn pause(&self) -> Result<()>;

    /// Seek to an absolute position within the source.
    async fn seek(&self, position: Duration) -> Result<()>;

    /// Adjust playback volume. Volume is normalized to `0.0..=1.0`.
    async fn set_volume(&self, volume: f32) -> Result<()>;

    /// Current playback position.
    async fn position(&self) -> Result<Duration>;

    /// Total duration of the loaded source, once its metadata is known.
    async fn duration(&self) -> Result<Option<Duration>>;

    /// The element's current understanding of its state.
    async fn state(&self) -> Result<MediaState>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_state_defaults_to_idle() {
        assert_eq!(MediaState::default(), MediaState::Idle);
    }

    #[test]
    fn only_ended_is_ended() {
        assert!(MediaState::Ended.is_ended());
        assert!(!MediaState::Playing.is_ended());
        assert!(!MediaState::Error {
            message: "404".to_string()
        }
        .is_ended());
    }
}
