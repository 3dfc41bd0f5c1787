//! Core service façade.
//!
//! This crate wires the host-provided bridges from an [`AppConfig`] into the
//! audiobook core and hands the host one [`AppService`] handle. Desktop hosts
//! typically enable the `desktop-shims` feature, which supplies an in-memory
//! credential store and a reqwest HTTP client when none are injected.
//!
//! ```no_run
//! use core_runtime::AppConfig;
//! use core_service::AppService;
//!
//! # async fn example() -> core_service::Result<()> {
//! let config = AppConfig::builder()
//!     .api_base_url("https://api.example.com/")
//!     .build()?;
//! let app = AppService::new(config)?;
//!
//! if app.can_view_protected().await.is_allowed() {
//!     app.play_audiobook(12, 0).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;

pub use error::{Result, ServiceError};

use std::sync::Arc;

use bridge_traits::{
    media::MediaElement,
    payment::PaymentProcessor,
    time::{Clock, SystemClock},
};
use core_api::{playlist_for, ApiClient, CheckoutFlow};
use core_auth::{Credential, GateDecision, SessionGate, SessionManager};
use core_playback::{
    PlaybackCommand, PlaybackContext, PlaybackDriver, PlaybackHandle, PlaybackSession,
    PlaybackStore, DEFAULT_POLL_INTERVAL,
};
use core_runtime::{AppConfig, EventBus, EventStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

#[cfg(feature = "keyring-store")]
use bridge_traits::storage::SecureStore;

/// Primary façade exposed to host applications.
///
/// Owns the event bus, the session manager, the API client and a handle to
/// the single playback store task. Cloning shares all of them.
#[derive(Clone)]
pub struct AppService {
    config: AppConfig,
    events: EventBus,
    sessions: Arc<SessionManager>,
    api: ApiClient,
    playback: PlaybackHandle,
}

impl AppService {
    /// Build the service against the system clock.
    ///
    /// Must be called from within a tokio runtime: the playback store is
    /// spawned onto it.
    pub fn new(config: AppConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build the service with the clock the authentication gate checks
    /// expiry against.
    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let http = config
            .http_client
            .clone()
            .ok_or_else(|| ServiceError::CapabilityMissing {
                capability: "HttpClient".to_string(),
                message: "No HTTP client implementation provided. \
                          Desktop: enable the 'desktop-shims' feature. \
                          Web: inject a fetch-backed client."
                    .to_string(),
            })?;

        let events = EventBus::new(config.event_buffer_size);
        let sessions = SessionManager::new(&config, http.clone(), events.clone(), clock);
        let api = ApiClient::new(&config, http, events.clone());
        let playback = PlaybackStore::new(events.clone()).spawn()?;

        info!(base_url = %config.api_base_url, "Audiobook core started");

        Ok(Self {
            config,
            events,
            sessions: Arc::new(sessions),
            api,
            playback,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Transport controls for the shared playback session.
    pub fn playback(&self) -> &PlaybackHandle {
        &self.playback
    }

    /// Receiver holding the latest playback session snapshot.
    pub fn session_observer(&self) -> watch::Receiver<PlaybackSession> {
        self.playback.subscribe()
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn gate(&self) -> &SessionGate {
        self.sessions.gate()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to every event published from now on.
    pub fn event_stream(&self) -> EventStream {
        self.events.stream()
    }

    /// Decide whether a protected view may render.
    ///
    /// A credential that cannot be read from storage is treated like a
    /// missing one.
    pub async fn can_view_protected(&self) -> GateDecision {
        let credential = match self.sessions.credentials().token().await {
            Ok(credential) => credential,
            Err(e) => {
                warn!(error = %e, "Could not read credential for gate check");
                None
            }
        };

        self.gate()
            .check(credential.as_ref().map(Credential::expose))
    }

    /// Play the chapters of an audiobook, starting at `start_index`.
    ///
    /// Returns `false` without touching the session when the audiobook has
    /// no chapters. An out-of-range `start_index` starts at the first one.
    #[instrument(skip(self))]
    pub async fn play_audiobook(&self, audiobook_id: u64, start_index: usize) -> Result<bool> {
        let audiobook = self.api.audiobook(audiobook_id).await?;
        let chapters = self.api.chapters(audiobook_id).await?;

        self.play_chapters(&audiobook, &chapters, start_index)
    }

    /// Queue already fetched chapters under `audiobook` and start playing.
    pub fn play_chapters(
        &self,
        audiobook: impl Into<PlaybackContext>,
        chapters: &[core_api::Chapter],
        start_index: usize,
    ) -> Result<bool> {
        let playlist = playlist_for(audiobook, chapters);
        let Some(command) = PlaybackCommand::play_from(playlist, start_index) else {
            info!("Audiobook has no chapters, nothing to play");
            return Ok(false);
        };

        self.playback.dispatch(command)?;
        Ok(true)
    }

    /// Purchase flow bound to this service's API client.
    pub fn checkout(&self, processor: Arc<dyn PaymentProcessor>) -> CheckoutFlow {
        CheckoutFlow::new(self.api.clone(), processor)
    }

    /// Drive the host's media element from the playback session.
    pub fn attach_media(&self, media: Arc<dyn MediaElement>) -> Result<JoinHandle<()>> {
        let driver = PlaybackDriver::new(media, self.playback.clone(), self.events.clone());
        Ok(driver.spawn(DEFAULT_POLL_INTERVAL)?)
    }

    /// Sign out and dismiss the player.
    pub async fn sign_out(&self) -> Result<()> {
        self.sessions.logout().await?;
        self.playback.close_session()?;
        Ok(())
    }

    /// Stop the playback store once queued commands are applied.
    pub fn shutdown(&self) -> Result<()> {
        self.playback.shutdown()?;
        Ok(())
    }
}

impl std::fmt::Debug for AppService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppService")
            .field("config", &self.config)
            .field("playback", &self.playback)
            .finish_non_exhaustive()
    }
}

/// OS keychain credential store for desktop hosts.
#[cfg(feature = "keyring-store")]
pub fn keyring_secure_store(service_name: &str) -> Arc<dyn SecureStore> {
    Arc::new(bridge_desktop::KeyringSecureStore::with_service_name(
        service_name,
    ))
}
