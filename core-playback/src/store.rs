//! # Playback Store
//!
//! Sole owner of the [`PlaybackSession`]. Every mutation goes through
//! [`PlaybackStore::dispatch`], which applies the command, hands observers a
//! fresh snapshot and publishes the matching [`PlaybackEvent`].
//!
//! Observers are notified before `dispatch` returns, so a transition is fully
//! visible before the next one is applied.
//!
//! To share the store between tasks, move it into its own task with
//! [`PlaybackStore::spawn`] and talk to it through the returned
//! [`PlaybackHandle`].

use crate::error::{PlaybackError, Result};
use crate::handle::{PlaybackHandle, StoreMessage};
use crate::session::{PlaybackCommand, PlaybackSession, Transition};
use crate::types::PlaylistEntry;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

pub struct PlaybackStore {
    session: PlaybackSession,
    observers: watch::Sender<PlaybackSession>,
    event_bus: EventBus,
}

impl PlaybackStore {
    pub fn new(event_bus: EventBus) -> Self {
        let (observers, _) = watch::channel(PlaybackSession::default());
        Self {
            session: PlaybackSession::default(),
            observers,
            event_bus,
        }
    }

    /// Current session snapshot.
    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    /// A receiver that always holds the latest session.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSession> {
        self.observers.subscribe()
    }

    pub fn play_item(
        &mut self,
        entry: PlaylistEntry,
        playlist: Option<Vec<PlaylistEntry>>,
        index: Option<usize>,
    ) -> Transition {
        self.dispatch(PlaybackCommand::PlayItem {
            entry,
            playlist,
            index,
        })
    }

    pub fn toggle_playback(&mut self) -> Transition {
        self.dispatch(PlaybackCommand::Toggle)
    }

    pub fn advance(&mut self) -> Transition {
        self.dispatch(PlaybackCommand::Advance)
    }

    pub fn retreat(&mut self) -> Transition {
        self.dispatch(PlaybackCommand::Retreat)
    }

    pub fn close_session(&mut self) -> Transition {
        self.dispatch(PlaybackCommand::Close)
    }

    pub fn dispatch(&mut self, command: PlaybackCommand) -> Transition {
        let name = command.name();
        let transition = self.session.apply(command);
        debug!(command = name, ?transition, "Applied playback command");

        if transition.changed_state() {
            self.observers.send_replace(self.session.clone());
        }

        if let Some(event) = self.event_for(transition) {
            let _ = self.event_bus.emit(CoreEvent::Playback(event));
        }

        transition
    }

    fn event_for(&self, transition: Transition) -> Option<PlaybackEvent> {
        let current_id = || self.session.current_item().map(|e| e.id().to_string());

        match transition {
            Transition::Started { index, .. } | Transition::Moved { index, .. } => {
                let entry = self.session.current_item()?;
                Some(PlaybackEvent::TrackChanged {
                    item_id: entry.id().to_string(),
                    title: entry.title().to_string(),
                    index,
                    playlist_len: self.session.playlist().len(),
                })
            }
            Transition::Toggled { is_playing: true } => Some(PlaybackEvent::Resumed {
                item_id: current_id(),
            }),
            Transition::Toggled { is_playing: false } => Some(PlaybackEvent::Paused {
                item_id: current_id(),
            }),
            Transition::Boundary { direction } => {
                Some(PlaybackEvent::BoundaryReached { direction })
            }
            Transition::Closed => Some(PlaybackEvent::Closed),
            Transition::Unchanged => None,
        }
    }

    /// Move the store into a task on the current tokio runtime.
    ///
    /// Commands sent through the handle are applied one at a time in the
    /// order they were sent. The task ends on [`PlaybackHandle::shutdown`] or
    /// when every handle has been dropped.
    pub fn spawn(self) -> Result<PlaybackHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| PlaybackError::RuntimeUnavailable(e.to_string()))?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = PlaybackHandle::new(sender, self.subscribe());

        runtime.spawn(self.run(receiver));
        Ok(handle)
    }

    async fn run(mut self, mut messages: mpsc::UnboundedReceiver<StoreMessage>) {
        info!("Playback store started");

        while let Some(message) = messages.recv().await {
            match message {
                StoreMessage::Command(command) => {
                    self.dispatch(command);
                }
                StoreMessage::Flush(done) => {
                    let _ = done.send(());
                }
                StoreMessage::Shutdown => break,
            }
        }

        info!("Playback store stopped");
    }
}

impl Default for PlaybackStore {
    fn default() -> Self {
        Self::new(EventBus::default())
    }
}
