//! Position bookkeeping for the transport bar.

use std::time::Duration;

/// Jump applied by the replay button.
pub const REPLAY_STEP: Duration = Duration::from_secs(10);

/// Jump applied by the forward button.
pub const FORWARD_STEP: Duration = Duration::from_secs(30);

/// Elapsed and total time of the current item.
///
/// Positions are always clamped to `0..=duration` once the duration is known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackProgress {
    position: Duration,
    duration: Option<Duration>,
}

impl PlaybackProgress {
    pub fn new(position: Duration, duration: Option<Duration>) -> Self {
        let mut progress = Self { position, duration };
        progress.position = progress.clamp(position);
        progress
    }

    pub fn position(&self) -> Duration {
        self.position
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Record what the media element reported.
    pub fn update(&mut self, position: Duration, duration: Option<Duration>) {
        self.duration = duration.or(self.duration);
        self.position = self.clamp(position);
    }

    /// Move back by [`REPLAY_STEP`], stopping at zero. Returns the new position.
    pub fn replay(&mut self) -> Duration {
        self.position = self.position.saturating_sub(REPLAY_STEP);
        self.position
    }

    /// Move ahead by [`FORWARD_STEP`], stopping at the duration. Returns the
    /// new position.
    pub fn forward(&mut self) -> Duration {
        self.position = self.clamp(self.position.saturating_add(FORWARD_STEP));
        self.position
    }

    pub fn seek_to(&mut self, position: Duration) -> Duration {
        self.position = self.clamp(position);
        self.position
    }

    /// Played share in `0.0..=1.0`; zero while the duration is unknown.
    pub fn fraction(&self) -> f64 {
        match self.duration {
            Some(duration) if !duration.is_zero() => {
                (self.position.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.duration
            .map(|duration| duration.saturating_sub(self.position))
    }

    fn clamp(&self, position: Duration) -> Duration {
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }
}

/// Render seconds as `m:ss`.
///
/// ```
/// use core_playback::progress::format_time;
///
/// assert_eq!(format_time(0.0), "0:00");
/// assert_eq!(format_time(65.9), "1:05");
/// assert_eq!(format_time(f64::NAN), "0:00");
/// ```
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }

    let whole = seconds.floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}
