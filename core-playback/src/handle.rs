//! # Playback Handle
//!
//! Cloneable front door to a spawned [`PlaybackStore`](crate::PlaybackStore).
//!
//! Transport methods are synchronous sends onto the store's command queue;
//! they return as soon as the command is queued. Commands from all clones of
//! a handle are applied in the order they were sent.
//!
//! ```no_run
//! use core_playback::{PlaybackItem, PlaybackStore};
//! use core_runtime::EventBus;
//!
//! # async fn example() -> core_playback::Result<()> {
//! let playback = PlaybackStore::new(EventBus::default()).spawn()?;
//!
//! playback.play_item(PlaybackItem::new(9u64, "Solo").into(), None, None)?;
//! playback.toggle_playback()?;
//! playback.flush().await?;
//!
//! assert!(!playback.session().is_playing());
//! # Ok(())
//! # }
//! ```

use crate::error::{PlaybackError, Result};
use crate::session::{PlaybackCommand, PlaybackSession};
use crate::types::PlaylistEntry;
use tokio::sync::{mpsc, oneshot, watch};

pub(crate) enum StoreMessage {
    Command(PlaybackCommand),
    Flush(oneshot::Sender<()>),
    Shutdown,
}

#[derive(Clone)]
pub struct PlaybackHandle {
    sender: mpsc::UnboundedSender<StoreMessage>,
    observer: watch::Receiver<PlaybackSession>,
}

impl PlaybackHandle {
    pub(crate) fn new(
        sender: mpsc::UnboundedSender<StoreMessage>,
        observer: watch::Receiver<PlaybackSession>,
    ) -> Self {
        Self { sender, observer }
    }

    pub fn dispatch(&self, command: PlaybackCommand) -> Result<()> {
        self.send(StoreMessage::Command(command))
    }

    pub fn play_item(
        &self,
        entry: PlaylistEntry,
        playlist: Option<Vec<PlaylistEntry>>,
        index: Option<usize>,
    ) -> Result<()> {
        self.dispatch(PlaybackCommand::PlayItem {
            entry,
            playlist,
            index,
        })
    }

    pub fn toggle_playback(&self) -> Result<()> {
        self.dispatch(PlaybackCommand::Toggle)
    }

    pub fn advance(&self) -> Result<()> {
        self.dispatch(PlaybackCommand::Advance)
    }

    pub fn retreat(&self) -> Result<()> {
        self.dispatch(PlaybackCommand::Retreat)
    }

    pub fn close_session(&self) -> Result<()> {
        self.dispatch(PlaybackCommand::Close)
    }

    /// Latest snapshot published by the store.
    ///
    /// Commands still in the queue are not reflected; call
    /// [`flush`](Self::flush) first to wait for them.
    pub fn session(&self) -> PlaybackSession {
        self.observer.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackSession> {
        self.observer.clone()
    }

    /// Wait until every command sent before this call has been applied.
    pub async fn flush(&self) -> Result<()> {
        let (done, wait) = oneshot::channel();
        self.send(StoreMessage::Flush(done))?;
        wait.await.map_err(|_| PlaybackError::StoreClosed)
    }

    /// Stop the store task once the commands already queued are applied.
    pub fn shutdown(&self) -> Result<()> {
        self.send(StoreMessage::Shutdown)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn send(&self, message: StoreMessage) -> Result<()> {
        self.sender
            .send(message)
            .map_err(|_| PlaybackError::StoreClosed)
    }
}

impl std::fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("closed", &self.is_closed())
            .finish()
    }
}
