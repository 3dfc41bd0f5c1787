//! # Playlist Types
//!
//! The playable unit ([`PlaybackItem`]), the context its caller attaches when
//! placing it into a playlist ([`PlaybackContext`]), and the pair of the two
//! ([`PlaylistEntry`]).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a playable item, stable across the playlist.
///
/// ```
/// use core_playback::ItemId;
///
/// assert_eq!(ItemId::from(3u64), ItemId::from("3"));
/// assert_eq!(ItemId::from(3u64).to_string(), "3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One playable unit, typically a chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackItem {
    pub id: ItemId,
    pub title: String,
    /// Locator handed to the media element
    #[serde(default)]
    pub media_ref: Option<String>,
}

impl PlaybackItem {
    pub fn new(id: impl Into<ItemId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            media_ref: None,
        }
    }

    pub fn with_media_ref(mut self, media_ref: impl Into<String>) -> Self {
        self.media_ref = Some(media_ref.into());
        self
    }
}

/// What the item belongs to. Attached by the caller, never by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackContext {
    pub parent_title: Option<String>,
    pub cover_art_ref: Option<String>,
    pub parent_id: Option<String>,
}

impl PlaybackContext {
    pub fn is_empty(&self) -> bool {
        self.parent_title.is_none() && self.cover_art_ref.is_none() && self.parent_id.is_none()
    }
}

/// A playlist slot: the item plus the context it was queued with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub item: PlaybackItem,
    #[serde(default)]
    pub context: PlaybackContext,
}

impl PlaylistEntry {
    pub fn new(item: PlaybackItem, context: PlaybackContext) -> Self {
        Self { item, context }
    }

    pub fn id(&self) -> &ItemId {
        &self.item.id
    }

    pub fn title(&self) -> &str {
        &self.item.title
    }
}

impl From<PlaybackItem> for PlaylistEntry {
    fn from(item: PlaybackItem) -> Self {
        Self {
            item,
            context: PlaybackContext::default(),
        }
    }
}
