//! # Playback Driver
//!
//! Mirrors the playback session onto the host's [`MediaElement`].
//!
//! The driver is a reader of the session, never a writer, with one exception:
//! when the element reports that the current item has ended it asks the store
//! to advance, the way the transport's "next" button would.
//!
//! Media failures are published as [`PlaybackEvent::Error`] and leave the
//! session untouched.

use crate::error::{PlaybackError, Result};
use crate::handle::PlaybackHandle;
use crate::progress::PlaybackProgress;
use crate::session::PlaybackSession;
use crate::types::ItemId;
use bridge_traits::media::{MediaElement, MediaState};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How often [`PlaybackDriver::spawn`] polls the element for position.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// What the element currently holds.
#[derive(Debug, Clone, PartialEq)]
struct LoadedItem {
    id: ItemId,
    media_ref: Option<String>,
    /// Session play generation the load belongs to
    generation: u64,
    /// Completion or failure already reported for this load
    reported: bool,
    load_failed: bool,
}

pub struct PlaybackDriver {
    media: Arc<dyn MediaElement>,
    playback: PlaybackHandle,
    event_bus: EventBus,
    loaded: Option<LoadedItem>,
    playing: bool,
    progress: PlaybackProgress,
}

impl PlaybackDriver {
    pub fn new(media: Arc<dyn MediaElement>, playback: PlaybackHandle, event_bus: EventBus) -> Self {
        Self {
            media,
            playback,
            event_bus,
            loaded: None,
            playing: false,
            progress: PlaybackProgress::default(),
        }
    }

    pub fn progress(&self) -> PlaybackProgress {
        self.progress
    }

    pub fn loaded_item(&self) -> Option<&ItemId> {
        self.loaded.as_ref().map(|loaded| &loaded.id)
    }

    /// Bring the element in line with `session`.
    pub async fn sync(&mut self, session: &PlaybackSession) {
        if !session.is_visible() {
            if self.playing {
                self.pause().await;
            }
            return;
        }

        let Some(current) = session.current_item() else {
            return;
        };

        let media_ref = current.item.media_ref.clone();
        let generation = session.play_generation();
        let is_new = self.loaded.as_ref().map_or(true, |loaded| {
            loaded.id != current.item.id
                || loaded.media_ref != media_ref
                || loaded.generation != generation
        });

        if is_new {
            self.load(current.item.id.clone(), media_ref, generation).await;
        }

        let can_play = self
            .loaded
            .as_ref()
            .is_some_and(|loaded| !loaded.load_failed);

        if session.is_playing() && can_play && (is_new || !self.playing) {
            self.play().await;
        } else if !session.is_playing() && self.playing {
            self.pause().await;
        }
    }

    async fn load(&mut self, id: ItemId, media_ref: Option<String>, generation: u64) {
        self.progress = PlaybackProgress::default();
        self.playing = false;

        let Some(locator) = media_ref.as_deref() else {
            let error = PlaybackError::MissingMediaRef(id.to_string());
            warn!(item_id = %id, "Current item has no media reference");
            self.report_error(Some(&id), &error);
            self.loaded = Some(LoadedItem {
                id,
                media_ref,
                generation,
                reported: true,
                load_failed: true,
            });
            return;
        };

        info!(item_id = %id, "Loading media");
        let load_failed = match self.media.load(locator).await {
            Ok(()) => false,
            Err(e) => {
                let error = PlaybackError::from(e);
                warn!(item_id = %id, error = %error, "Failed to load media");
                self.report_error(Some(&id), &error);
                true
            }
        };

        self.loaded = Some(LoadedItem {
            id,
            media_ref,
            generation,
            reported: load_failed,
            load_failed,
        });
    }

    async fn play(&mut self) {
        match self.media.play().await {
            Ok(()) => {
                // a resumed element can end again
                self.playing = true;
                if let Some(loaded) = self.loaded.as_mut() {
                    loaded.reported = false;
                }
            }
            Err(e) => {
                let error = PlaybackError::from(e);
                warn!(error = %error, "Media element refused to play");
                let id = self.loaded.as_ref().map(|loaded| loaded.id.clone());
                self.report_error(id.as_ref(), &error);
            }
        }
    }

    async fn pause(&mut self) {
        if let Err(e) = self.media.pause().await {
            let error = PlaybackError::from(e);
            warn!(error = %error, "Media element refused to pause");
            let id = self.loaded.as_ref().map(|loaded| loaded.id.clone());
            self.report_error(id.as_ref(), &error);
        }
        self.playing = false;
    }

    /// Read position and state back from the element.
    ///
    /// Publishes `PositionChanged`, and on completion publishes `Completed`
    /// and advances the store.
    pub async fn poll(&mut self) -> Result<()> {
        let Some(loaded) = self.loaded.clone() else {
            return Ok(());
        };
        if loaded.load_failed {
            return Ok(());
        }

        match self.media.state().await? {
            MediaState::Ended if !loaded.reported => {
                info!(item_id = %loaded.id, "Item finished, advancing");
                self.mark_reported();
                self.playing = false;
                let _ = self.event_bus.emit(CoreEvent::Playback(PlaybackEvent::Completed {
                    item_id: loaded.id.to_string(),
                }));
                self.playback.advance()?;
            }
            MediaState::Error { message } if !loaded.reported => {
                self.mark_reported();
                self.report_error(Some(&loaded.id), &PlaybackError::Media(message));
            }
            MediaState::Playing | MediaState::Paused => {
                let position = self.media.position().await?;
                let duration = self.media.duration().await?;
                let before = self.progress;
                self.progress.update(position, duration);

                if self.progress != before {
                    let _ = self.event_bus.emit(CoreEvent::Playback(
                        PlaybackEvent::PositionChanged {
                            item_id: loaded.id.to_string(),
                            position_ms: self.progress.position().as_millis() as u64,
                            duration_ms: self.progress.duration().map(|d| d.as_millis() as u64),
                        },
                    ));
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Set the element's volume. Accepts `0.0..=1.0`.
    pub async fn set_volume(&self, volume: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(PlaybackError::InvalidVolume(volume));
        }
        self.media.set_volume(volume).await?;
        Ok(())
    }

    /// Jump back ten seconds.
    pub async fn replay(&mut self) -> Result<Duration> {
        self.ensure_loaded()?;
        let position = self.progress.replay();
        self.media.seek(position).await?;
        Ok(position)
    }

    /// Jump ahead thirty seconds.
    pub async fn forward(&mut self) -> Result<Duration> {
        self.ensure_loaded()?;
        let position = self.progress.forward();
        self.media.seek(position).await?;
        Ok(position)
    }

    pub async fn seek_to(&mut self, position: Duration) -> Result<Duration> {
        self.ensure_loaded()?;
        let position = self.progress.seek_to(position);
        self.media.seek(position).await?;
        Ok(position)
    }

    /// Follow the store on the current tokio runtime until it shuts down.
    pub fn spawn(self, poll_interval: Duration) -> Result<JoinHandle<()>> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| PlaybackError::RuntimeUnavailable(e.to_string()))?;
        Ok(runtime.spawn(self.run(poll_interval)))
    }

    async fn run(mut self, poll_interval: Duration) {
        let mut observer = self.playback.subscribe();
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let initial = observer.borrow_and_update().clone();
        self.sync(&initial).await;

        loop {
            tokio::select! {
                changed = observer.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let session = observer.borrow_and_update().clone();
                    self.sync(&session).await;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.poll().await {
                        debug!(error = %e, "Media poll failed");
                        if matches!(e, PlaybackError::StoreClosed) {
                            break;
                        }
                    }
                }
            }
        }

        debug!("Playback driver stopped");
    }

    fn ensure_loaded(&self) -> Result<()> {
        match &self.loaded {
            Some(loaded) if !loaded.load_failed => Ok(()),
            _ => Err(PlaybackError::NoItemLoaded),
        }
    }

    fn mark_reported(&mut self) {
        if let Some(loaded) = self.loaded.as_mut() {
            loaded.reported = true;
        }
    }

    fn report_error(&self, item_id: Option<&ItemId>, error: &PlaybackError) {
        let _ = self.event_bus.emit(CoreEvent::Playback(PlaybackEvent::Error {
            item_id: item_id.map(ItemId::to_string),
            message: error.to_string(),
            recoverable: error.is_transient(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PlaybackStore;
    use crate::types::{PlaybackItem, PlaylistEntry};
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Load(String),
        Play,
        Pause,
        Seek(Duration),
        Volume(f32),
    }

    #[derive(Default)]
    struct FakeMedia {
        calls: Mutex<Vec<Call>>,
        state: Mutex<MediaState>,
        position: Mutex<Duration>,
        duration: Mutex<Option<Duration>>,
        fail_loads: bool,
    }

    impl FakeMedia {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }

        fn set_state(&self, state: MediaState) {
            *self.state.lock() = state;
        }
    }

    #[async_trait]
    impl MediaElement for FakeMedia {
        async fn load(&self, media_ref: &str) -> BridgeResult<()> {
            if self.fail_loads {
                return Err(BridgeError::OperationFailed("404 Not Found".to_string()));
            }
            self.calls.lock().push(Call::Load(media_ref.to_string()));
            *self.state.lock() = MediaState::Loading;
            Ok(())
        }

        async fn play(&self) -> BridgeResult<()> {
            self.calls.lock().push(Call::Play);
            *self.state.lock() = MediaState::Playing;
            Ok(())
        }

        async fn pause(&self) -> BridgeResult<()> {
            self.calls.lock().push(Call::Pause);
            *self.state.lock() = MediaState::Paused;
            Ok(())
        }

        async fn seek(&self, position: Duration) -> BridgeResult<()> {
            self.calls.lock().push(Call::Seek(position));
            *self.position.lock() = position;
            Ok(())
        }

        async fn set_volume(&self, volume: f32) -> BridgeResult<()> {
            self.calls.lock().push(Call::Volume(volume));
            Ok(())
        }

        async fn position(&self) -> BridgeResult<Duration> {
            Ok(*self.position.lock())
        }

        async fn duration(&self) -> BridgeResult<Option<Duration>> {
            Ok(*self.duration.lock())
        }

        async fn state(&self) -> BridgeResult<MediaState> {
            Ok(self.state.lock().clone())
        }
    }

    fn chapter(id: u64) -> PlaylistEntry {
        PlaybackItem::new(id, format!("Ch{id}"))
            .with_media_ref(format!("/media/ch{id}.mp3"))
            .into()
    }

    struct Rig {
        media: Arc<FakeMedia>,
        playback: PlaybackHandle,
        driver: PlaybackDriver,
        events: EventBus,
    }

    fn rig(media: FakeMedia) -> Rig {
        let events = EventBus::new(32);
        let media = Arc::new(media);
        let playback = PlaybackStore::new(events.clone()).spawn().unwrap();
        let driver = PlaybackDriver::new(media.clone(), playback.clone(), events.clone());
        Rig {
            media,
            playback,
            driver,
            events,
        }
    }

    async fn settle(rig: &mut Rig) {
        rig.playback.flush().await.unwrap();
        let session = rig.playback.session();
        rig.driver.sync(&session).await;
    }

    #[tokio::test]
    async fn test_new_item_is_loaded_and_played() {
        let mut rig = rig(FakeMedia::default());
        let playlist = vec![chapter(1), chapter(2)];
        rig.playback
            .play_item(playlist[0].clone(), Some(playlist), Some(0))
            .unwrap();
        settle(&mut rig).await;

        assert_eq!(
            rig.media.calls(),
            vec![Call::Load("/media/ch1.mp3".to_string()), Call::Play]
        );
        assert_eq!(rig.driver.loaded_item(), Some(&ItemId::from(1u64)));
    }

    #[tokio::test]
    async fn test_toggle_and_close_pause_the_element() {
        let mut rig = rig(FakeMedia::default());
        rig.playback.play_item(chapter(1), None, None).unwrap();
        settle(&mut rig).await;

        rig.playback.toggle_playback().unwrap();
        settle(&mut rig).await;
        rig.playback.toggle_playback().unwrap();
        settle(&mut rig).await;
        rig.playback.close_session().unwrap();
        settle(&mut rig).await;

        assert_eq!(
            rig.media.calls(),
            vec![
                Call::Load("/media/ch1.mp3".to_string()),
                Call::Play,
                Call::Pause,
                Call::Play,
                Call::Pause,
            ]
        );
    }

    #[tokio::test]
    async fn test_ended_advances_the_store() {
        let mut rig = rig(FakeMedia::default());
        let playlist = vec![chapter(1), chapter(2)];
        rig.playback
            .play_item(playlist[0].clone(), Some(playlist), Some(0))
            .unwrap();
        settle(&mut rig).await;

        let mut events = rig.events.stream();
        rig.media.set_state(MediaState::Ended);
        rig.driver.poll().await.unwrap();
        rig.driver.poll().await.unwrap();
        settle(&mut rig).await;

        assert_eq!(rig.playback.session().current_index(), 1);
        assert_eq!(rig.driver.loaded_item(), Some(&ItemId::from(2u64)));

        let completed: Vec<_> = events
            .drain()
            .into_iter()
            .filter(|e| matches!(e, CoreEvent::Playback(PlaybackEvent::Completed { .. })))
            .collect();
        assert_eq!(completed.len(), 1);
    }

    fn completed(events: &mut core_runtime::events::EventStream) -> usize {
        events
            .drain()
            .iter()
            .filter(|e| matches!(e, CoreEvent::Playback(PlaybackEvent::Completed { .. })))
            .count()
    }

    #[tokio::test]
    async fn test_replaying_loaded_item_restarts_it() {
        let mut rig = rig(FakeMedia::default());
        let mut events = rig.events.stream();

        rig.playback.play_item(chapter(1), None, None).unwrap();
        settle(&mut rig).await;
        *rig.media.position.lock() = Duration::from_secs(90);
        *rig.media.duration.lock() = Some(Duration::from_secs(300));
        rig.driver.poll().await.unwrap();
        rig.media.set_state(MediaState::Ended);
        rig.driver.poll().await.unwrap();
        rig.playback.flush().await.unwrap();

        rig.playback.play_item(chapter(1), None, None).unwrap();
        settle(&mut rig).await;
        assert_eq!(rig.driver.progress(), PlaybackProgress::default());

        rig.media.set_state(MediaState::Ended);
        rig.driver.poll().await.unwrap();

        let load = Call::Load("/media/ch1.mp3".to_string());
        assert_eq!(
            rig.media.calls(),
            vec![load.clone(), Call::Play, load, Call::Play]
        );
        assert_eq!(completed(&mut events), 2);
    }

    #[tokio::test]
    async fn test_ended_on_last_chapter_stops_at_boundary() {
        let mut rig = rig(FakeMedia::default());
        let playlist = vec![chapter(1), chapter(2)];
        rig.playback
            .play_item(playlist[1].clone(), Some(playlist), Some(1))
            .unwrap();
        settle(&mut rig).await;

        let mut events = rig.events.stream();
        rig.media.set_state(MediaState::Ended);
        rig.driver.poll().await.unwrap();
        rig.playback.flush().await.unwrap();

        let session = rig.playback.session();
        assert_eq!(session.current_index(), 1);
        assert!(session.is_playing());
        assert!(!rig.driver.playing);
        assert_eq!(rig.driver.loaded_item(), Some(&ItemId::from(2u64)));

        let drained = events.drain();
        assert!(drained.iter().any(|e| matches!(
            e,
            CoreEvent::Playback(PlaybackEvent::BoundaryReached {
                direction: core_runtime::events::Direction::Forward
            })
        )));

        // pause then resume plays the same load again
        rig.playback.toggle_playback().unwrap();
        settle(&mut rig).await;
        rig.playback.toggle_playback().unwrap();
        settle(&mut rig).await;
        assert!(rig.driver.playing);

        rig.media.set_state(MediaState::Ended);
        rig.driver.poll().await.unwrap();
        assert_eq!(completed(&mut events), 1);
        assert_eq!(
            rig.media.calls(),
            vec![
                Call::Load("/media/ch2.mp3".to_string()),
                Call::Play,
                Call::Play
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_media_ref_reports_error_without_touching_session() {
        let mut rig = rig(FakeMedia::default());
        let mut events = rig.events.stream();

        rig.playback
            .play_item(PlaybackItem::new(7u64, "Silent").into(), None, None)
            .unwrap();
        settle(&mut rig).await;

        assert!(rig.media.calls().is_empty());
        assert!(rig.playback.session().is_playing());
        assert!(events.drain().iter().any(|e| matches!(
            e,
            CoreEvent::Playback(PlaybackEvent::Error { item_id: Some(id), recoverable: false, .. })
                if id == "7"
        )));
    }

    #[tokio::test]
    async fn test_load_failure_is_reported() {
        let mut rig = rig(FakeMedia {
            fail_loads: true,
            ..FakeMedia::default()
        });
        let mut events = rig.events.stream();

        rig.playback.play_item(chapter(1), None, None).unwrap();
        settle(&mut rig).await;

        assert!(events.drain().iter().any(|e| matches!(
            e,
            CoreEvent::Playback(PlaybackEvent::Error { recoverable: true, .. })
        )));
        assert!(rig.playback.session().is_visible());
    }

    #[tokio::test]
    async fn test_position_updates_are_published() {
        let mut rig = rig(FakeMedia::default());
        rig.playback.play_item(chapter(1), None, None).unwrap();
        settle(&mut rig).await;

        *rig.media.position.lock() = Duration::from_secs(12);
        *rig.media.duration.lock() = Some(Duration::from_secs(300));
        let mut events = rig.events.stream();
        rig.driver.poll().await.unwrap();

        assert_eq!(
            events.drain(),
            vec![CoreEvent::Playback(PlaybackEvent::PositionChanged {
                item_id: "1".to_string(),
                position_ms: 12_000,
                duration_ms: Some(300_000),
            })]
        );
    }

    #[tokio::test]
    async fn test_skip_buttons_seek_within_bounds() {
        let mut rig = rig(FakeMedia::default());
        assert!(matches!(
            rig.driver.replay().await,
            Err(PlaybackError::NoItemLoaded)
        ));

        rig.playback.play_item(chapter(1), None, None).unwrap();
        settle(&mut rig).await;
        *rig.media.position.lock() = Duration::from_secs(5);
        *rig.media.duration.lock() = Some(Duration::from_secs(40));
        rig.driver.poll().await.unwrap();

        assert_eq!(rig.driver.replay().await.unwrap(), Duration::ZERO);
        assert_eq!(rig.driver.forward().await.unwrap(), Duration::from_secs(30));
        assert_eq!(rig.driver.forward().await.unwrap(), Duration::from_secs(40));
    }

    #[tokio::test]
    async fn test_volume_must_be_normalized() {
        let rig = rig(FakeMedia::default());

        rig.driver.set_volume(0.5).await.unwrap();
        assert!(matches!(
            rig.driver.set_volume(1.5).await,
            Err(PlaybackError::InvalidVolume(_))
        ));
        assert!(matches!(
            rig.driver.set_volume(f32::NAN).await,
            Err(PlaybackError::InvalidVolume(_))
        ));
        assert_eq!(rig.media.calls(), vec![Call::Volume(0.5)]);
    }
}
