use async_trait::async_trait;
use bridge_desktop::MemorySecureStore;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::storage::SecureStore;
use bytes::Bytes;
use core_api::{playlist_for, ApiClient, ApiError};
use core_playback::{PlaybackCommand, PlaybackStore};
use core_runtime::events::{AuthEvent, CoreEvent, EventBus, PlaybackEvent};
use core_runtime::AppConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Serves canned bodies by path and refuses everything once `revoked` is set.
#[derive(Default)]
struct FakeCatalog {
    routes: HashMap<&'static str, &'static str>,
    revoked: Mutex<bool>,
    requests: Mutex<Vec<(String, bool)>>,
}

impl FakeCatalog {
    fn with_route(mut self, path: &'static str, body: &'static str) -> Self {
        self.routes.insert(path, body);
        self
    }
}

#[async_trait]
impl HttpClient for FakeCatalog {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let path = request
            .url
            .strip_prefix("http://127.0.0.1:8000/")
            .ok_or_else(|| BridgeError::OperationFailed(format!("unknown host: {}", request.url)))?
            .to_string();
        self.requests
            .lock()
            .push((path.clone(), request.headers.contains_key("Authorization")));

        let (status, body) = if *self.revoked.lock() {
            (401, r#"{"detail": "Invalid token."}"#)
        } else {
            match self.routes.get(path.as_str()) {
                Some(body) => (200, *body),
                None => (404, r#"{"detail": "Not found."}"#),
            }
        };

        Ok(HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from_static(body.as_bytes()),
        })
    }
}

const DETAIL: &str = r#"{
    "id": 12,
    "title": "Dune",
    "cover_image": "/media/covers/dune.jpg",
    "author": {"id": 3, "name": "Frank Herbert"}
}"#;

const CHAPTERS: &str = r#"[
    {"id": 100, "title": "Prologue", "chapter_number": 1,
     "audio_file": "http://127.0.0.1:8000/media/audio/100.mp3", "duration_seconds": 95},
    {"id": 101, "title": "Arrakis", "chapter_number": 2,
     "audio_file": "http://127.0.0.1:8000/media/audio/101.mp3", "duration_seconds": 1800}
]"#;

fn config(store: Arc<MemorySecureStore>) -> AppConfig {
    AppConfig::builder().secure_store(store).build().unwrap()
}

#[tokio::test]
async fn chapters_become_a_playable_queue() {
    let catalog = FakeCatalog::default()
        .with_route("audiobooks/12/", DETAIL)
        .with_route("audiobooks/12/chapters/", CHAPTERS);
    let events = EventBus::new(16);
    let mut stream = events.stream();

    let api = ApiClient::new(
        &config(Arc::new(MemorySecureStore::new())),
        Arc::new(catalog),
        events.clone(),
    );
    let detail = api.audiobook(12).await.unwrap();
    let chapters = api.chapters(12).await.unwrap();
    let playlist = playlist_for(&detail, &chapters);

    let mut store = PlaybackStore::new(events);
    store.dispatch(PlaybackCommand::play_from(playlist, 1).unwrap());

    let session = store.session();
    let current = session.current_item().unwrap();
    assert_eq!(current.title(), "Arrakis");
    assert_eq!(current.context.parent_title.as_deref(), Some("Dune"));
    assert_eq!(
        current.item.media_ref.as_deref(),
        Some("http://127.0.0.1:8000/media/audio/101.mp3")
    );
    assert!(session.has_previous());
    assert!(!session.has_next());

    assert_eq!(
        stream.drain(),
        vec![CoreEvent::Playback(PlaybackEvent::TrackChanged {
            item_id: "101".to_string(),
            title: "Arrakis".to_string(),
            index: 1,
            playlist_len: 2,
        })]
    );
}

#[tokio::test]
async fn revoked_credential_signs_the_client_out() {
    let store = Arc::new(MemorySecureStore::new());
    store.set_secret("Token", b"abc.def.ghi").await.unwrap();

    let catalog = Arc::new(FakeCatalog::default().with_route("library/", "[]"));
    let events = EventBus::new(16);
    let mut stream = events.stream();
    let api = ApiClient::new(&config(store.clone()), catalog.clone(), events);

    assert!(api.library().await.unwrap().is_empty());

    *catalog.revoked.lock() = true;
    let error = api.library().await.unwrap_err();
    assert!(error.is_unauthorized());
    assert!(store.get_secret("Token").await.unwrap().is_none());

    *catalog.revoked.lock() = false;
    api.library().await.unwrap();

    assert_eq!(
        stream.drain(),
        vec![CoreEvent::Auth(AuthEvent::SessionExpired)]
    );
    assert_eq!(
        catalog.requests.lock().as_slice(),
        &[
            ("library/".to_string(), true),
            ("library/".to_string(), true),
            ("library/".to_string(), false),
        ]
    );
}

#[tokio::test]
async fn unknown_audiobook_is_a_status_error() {
    let api = ApiClient::new(
        &config(Arc::new(MemorySecureStore::new())),
        Arc::new(FakeCatalog::default()),
        EventBus::new(4),
    );

    assert!(matches!(
        api.audiobook(404).await,
        Err(ApiError::Status { status: 404, .. })
    ));
}
