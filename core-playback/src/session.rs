//! # Playback Session
//!
//! The value describing what is playing, its sibling playlist and the two
//! transport flags, plus the reducer that moves it between states.
//!
//! Every [`PlaybackCommand`] is accepted: inputs that cannot be honoured
//! (moving past either end of the playlist, an empty playlist) leave the
//! session unchanged instead of failing.
//!
//! ## Index handling
//!
//! `PlayItem` clamps the requested index into the playlist (`0` for an empty
//! one). When the entry found at the stored index is not the entry being
//! played, the session keeps the supplied entry as current, logs a warning
//! and reports `is_consistent() == false` until the next move.

use crate::types::PlaylistEntry;
use core_runtime::events::Direction;
use serde::Serialize;
use tracing::warn;

/// One transition request.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackCommand {
    /// Make `entry` current inside `playlist` (defaults to `[entry]`) at
    /// `index` (defaults to 0).
    PlayItem {
        entry: PlaylistEntry,
        playlist: Option<Vec<PlaylistEntry>>,
        index: Option<usize>,
    },
    Toggle,
    Advance,
    Retreat,
    Close,
}

impl PlaybackCommand {
    /// `PlayItem` for a single entry with no playlist.
    pub fn play(entry: impl Into<PlaylistEntry>) -> Self {
        PlaybackCommand::PlayItem {
            entry: entry.into(),
            playlist: None,
            index: None,
        }
    }

    /// `PlayItem` for the entry at `index` of `playlist`.
    ///
    /// An out-of-range `index` falls back to the first entry; an empty
    /// playlist yields `None`.
    pub fn play_from(playlist: Vec<PlaylistEntry>, index: usize) -> Option<Self> {
        let index = if index < playlist.len() { index } else { 0 };
        let entry = playlist.get(index)?.clone();
        Some(PlaybackCommand::PlayItem {
            entry,
            playlist: Some(playlist),
            index: Some(index),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            PlaybackCommand::PlayItem { .. } => "play_item",
            PlaybackCommand::Toggle => "toggle",
            PlaybackCommand::Advance => "advance",
            PlaybackCommand::Retreat => "retreat",
            PlaybackCommand::Close => "close",
        }
    }
}

/// What a command did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A new item became current.
    Started {
        index: usize,
        /// Index as supplied by the caller, before clamping
        requested_index: usize,
    },
    /// The play/pause flag flipped.
    Toggled { is_playing: bool },
    /// The current index moved by one.
    Moved { direction: Direction, index: usize },
    /// Advance/retreat hit the end of the playlist.
    Boundary { direction: Direction },
    /// Transport flags were cleared.
    Closed,
    /// The command had no effect.
    Unchanged,
}

impl Transition {
    /// Whether observers need a new snapshot.
    pub fn changed_state(&self) -> bool {
        !matches!(self, Transition::Boundary { .. } | Transition::Unchanged)
    }
}

/// What is playing and what comes next.
///
/// ```
/// use core_playback::{PlaybackCommand, PlaybackItem, PlaybackSession};
///
/// let mut session = PlaybackSession::default();
/// session.apply(PlaybackCommand::play(PlaybackItem::new(9u64, "Solo")));
///
/// assert!(session.is_playing());
/// assert!(session.is_visible());
/// assert_eq!(session.playlist().len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaybackSession {
    current_item: Option<PlaylistEntry>,
    playlist: Vec<PlaylistEntry>,
    current_index: usize,
    is_playing: bool,
    is_visible: bool,
    /// Bumped by every `PlayItem`, including one that replays the current item
    play_generation: u64,
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_item(&self) -> Option<&PlaylistEntry> {
        self.current_item.as_ref()
    }

    pub fn playlist(&self) -> &[PlaylistEntry] {
        &self.playlist
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_visible(&self) -> bool {
        self.is_visible
    }

    /// Counts accepted `PlayItem` commands.
    ///
    /// Replaying the item that is already current leaves everything else
    /// equal, so media followers compare this to know they must restart.
    pub fn play_generation(&self) -> u64 {
        self.play_generation
    }

    pub fn has_current_item(&self) -> bool {
        self.current_item.is_some()
    }

    pub fn has_next(&self) -> bool {
        self.current_index + 1 < self.playlist.len()
    }

    pub fn has_previous(&self) -> bool {
        self.current_index > 0 && self.current_index <= self.playlist.len()
    }

    /// `playlist[current_index]` is the current item, or either side is empty.
    pub fn is_consistent(&self) -> bool {
        match (&self.current_item, self.playlist.get(self.current_index)) {
            (Some(current), Some(slot)) => current == slot,
            (Some(_), None) => self.playlist.is_empty(),
            (None, _) => true,
        }
    }

    /// Apply one command. Never fails.
    pub fn apply(&mut self, command: PlaybackCommand) -> Transition {
        match command {
            PlaybackCommand::PlayItem {
                entry,
                playlist,
                index,
            } => self.play_item(entry, playlist, index),
            PlaybackCommand::Toggle => {
                self.is_playing = !self.is_playing;
                Transition::Toggled {
                    is_playing: self.is_playing,
                }
            }
            PlaybackCommand::Advance => self.step(Direction::Forward),
            PlaybackCommand::Retreat => self.step(Direction::Backward),
            PlaybackCommand::Close => {
                if !self.is_visible && !self.is_playing {
                    return Transition::Unchanged;
                }
                self.is_visible = false;
                self.is_playing = false;
                Transition::Closed
            }
        }
    }

    fn play_item(
        &mut self,
        entry: PlaylistEntry,
        playlist: Option<Vec<PlaylistEntry>>,
        index: Option<usize>,
    ) -> Transition {
        let playlist = playlist.unwrap_or_else(|| vec![entry.clone()]);
        let requested_index = index.unwrap_or(0);
        let index = match playlist.len() {
            0 => 0,
            len => requested_index.min(len - 1),
        };

        if let Some(slot) = playlist.get(index) {
            if slot != &entry {
                warn!(
                    item_id = %entry.id(),
                    slot_id = %slot.id(),
                    requested_index,
                    index,
                    playlist_len = playlist.len(),
                    "Played item does not match its playlist slot"
                );
            }
        }

        self.current_item = Some(entry);
        self.playlist = playlist;
        self.current_index = index;
        self.is_playing = true;
        self.is_visible = true;
        self.play_generation = self.play_generation.wrapping_add(1);

        Transition::Started {
            index,
            requested_index,
        }
    }

    fn step(&mut self, direction: Direction) -> Transition {
        let target = match direction {
            Direction::Forward => self.current_index.checked_add(1),
            Direction::Backward => self.current_index.checked_sub(1),
        };

        match target.and_then(|index| self.playlist.get(index).map(|entry| (index, entry))) {
            Some((index, entry)) => {
                self.current_item = Some(entry.clone());
                self.current_index = index;
                Transition::Moved { direction, index }
            }
            None => Transition::Boundary { direction },
        }
    }
}
