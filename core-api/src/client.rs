//! # Catalog API Client
//!
//! Typed access to the catalog, library, account and payment endpoints.
//!
//! Every request carries the stored credential when one exists. A `401`
//! answer means the server no longer accepts it: the token is removed,
//! `SessionExpired` is published and the caller gets
//! [`ApiError::Unauthorized`] with the route to send the user to.
//!
//! ```no_run
//! use core_api::ApiClient;
//! use core_runtime::{AppConfig, EventBus};
//! use bridge_traits::http::HttpClient;
//! use std::sync::Arc;
//!
//! # async fn example(config: AppConfig, http: Arc<dyn HttpClient>) -> core_api::Result<()> {
//! let api = ApiClient::new(&config, http, EventBus::new(config.event_buffer_size));
//!
//! for book in api.search_audiobooks("dune").await? {
//!     println!("{} by {:?}", book.title, book.author_name);
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{ApiError, Result};
use crate::models::{
    AudiobookDetail, AudiobookRef, AudiobookSummary, Author, Chapter, IntentRef, LibraryChange,
    LibraryItem, PaymentConfig, PaymentConfirmation, PaymentIntent, UserAccount,
};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use core_auth::CredentialStore;
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use core_runtime::AppConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const AUDIOBOOKS_PATH: &str = "audiobooks/";
const AUTHORS_PATH: &str = "authors/";
const LIBRARY_PATH: &str = "library/";
const LIBRARY_ADD_PATH: &str = "library/add_audiobook/";
const LIBRARY_REMOVE_PATH: &str = "library/remove_audiobook/";
const ME_PATH: &str = "me/";
const PAYMENT_CONFIG_PATH: &str = "payments/config/";
const PAYMENT_INTENT_PATH: &str = "payments/create-intent/";
const PAYMENT_CONFIRM_PATH: &str = "payments/confirm/";

/// REST client for the catalog API.
#[derive(Clone)]
pub struct ApiClient {
    http: Arc<dyn HttpClient>,
    credentials: CredentialStore,
    config: AppConfig,
    event_bus: EventBus,
}

impl ApiClient {
    pub fn new(config: &AppConfig, http: Arc<dyn HttpClient>, event_bus: EventBus) -> Self {
        let credentials =
            CredentialStore::new(config.secure_store.clone(), config.storage_keys.clone());
        Self {
            http,
            credentials,
            config: config.clone(),
            event_bus,
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub(crate) fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub async fn audiobooks(&self) -> Result<Vec<AudiobookSummary>> {
        self.get(AUDIOBOOKS_PATH).await
    }

    #[instrument(skip(self))]
    pub async fn search_audiobooks(&self, query: &str) -> Result<Vec<AudiobookSummary>> {
        let request = self
            .request(HttpMethod::Get, AUDIOBOOKS_PATH)
            .await?
            .query("search", query);
        self.fetch(request).await
    }

    pub async fn audiobook(&self, id: u64) -> Result<AudiobookDetail> {
        self.get(&format!("{AUDIOBOOKS_PATH}{id}/")).await
    }

    pub async fn chapters(&self, audiobook_id: u64) -> Result<Vec<Chapter>> {
        self.get(&format!("{AUDIOBOOKS_PATH}{audiobook_id}/chapters/"))
            .await
    }

    pub async fn authors(&self) -> Result<Vec<Author>> {
        self.get(AUTHORS_PATH).await
    }

    #[instrument(skip(self))]
    pub async fn search_authors(&self, query: &str) -> Result<Vec<Author>> {
        let request = self
            .request(HttpMethod::Get, AUTHORS_PATH)
            .await?
            .query("search", query);
        self.fetch(request).await
    }

    pub async fn author(&self, id: u64) -> Result<Author> {
        self.get(&format!("{AUTHORS_PATH}{id}/")).await
    }

    /// Audiobooks written by one author.
    pub async fn author_audiobooks(&self, author_id: u64) -> Result<Vec<AudiobookSummary>> {
        self.get(&format!("{AUTHORS_PATH}{author_id}/audiobooks/"))
            .await
    }

    pub async fn library(&self) -> Result<Vec<LibraryItem>> {
        self.get(LIBRARY_PATH).await
    }

    /// Adds an audiobook to the signed-in user's library and publishes
    /// `AudiobookAdded`.
    #[instrument(skip(self))]
    pub async fn add_to_library(&self, audiobook_id: u64) -> Result<LibraryChange> {
        let change: LibraryChange = self
            .post(LIBRARY_ADD_PATH, &AudiobookRef { audiobook_id })
            .await?;
        info!(audiobook_id, "Added to library");
        let _ = self
            .event_bus
            .emit(CoreEvent::Library(LibraryEvent::AudiobookAdded { audiobook_id }));
        Ok(change)
    }

    #[instrument(skip(self))]
    pub async fn remove_from_library(&self, audiobook_id: u64) -> Result<LibraryChange> {
        let change: LibraryChange = self
            .post(LIBRARY_REMOVE_PATH, &AudiobookRef { audiobook_id })
            .await?;
        info!(audiobook_id, "Removed from library");
        let _ = self
            .event_bus
            .emit(CoreEvent::Library(LibraryEvent::AudiobookRemoved { audiobook_id }));
        Ok(change)
    }

    pub async fn me(&self) -> Result<UserAccount> {
        self.get(ME_PATH).await
    }

    pub async fn payment_config(&self) -> Result<PaymentConfig> {
        self.get(PAYMENT_CONFIG_PATH).await
    }

    pub async fn create_payment_intent(&self, audiobook_id: u64) -> Result<PaymentIntent> {
        self.post(PAYMENT_INTENT_PATH, &AudiobookRef { audiobook_id })
            .await
    }

    /// Tells the server the processor accepted the charge.
    pub async fn confirm_payment(&self, payment_intent_id: &str) -> Result<PaymentConfirmation> {
        self.post(PAYMENT_CONFIRM_PATH, &IntentRef { payment_intent_id })
            .await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.request(HttpMethod::Get, path).await?;
        self.fetch(request).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let request = self
            .request(HttpMethod::Post, path)
            .await?
            .json(body)
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        self.fetch(request).await
    }

    async fn request(&self, method: HttpMethod, path: &str) -> Result<HttpRequest> {
        let mut request = HttpRequest::new(method, self.config.endpoint(path))
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .timeout(self.config.request_timeout);

        if let Some(credential) = self.credentials.token().await? {
            request = request.authorization(&self.config.auth_scheme, credential.expose());
        }
        Ok(request)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T> {
        let url = request.url.clone();
        debug!(method = ?request.method, %url, "API request");

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if response.is_unauthorized() {
            return Err(self.unauthorized().await);
        }

        if !response.is_success() {
            let error = status_error(&response);
            warn!(status = response.status, %url, error = %error, "API request failed");
            return Err(error);
        }

        response
            .json()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn unauthorized(&self) -> ApiError {
        if let Err(e) = self.credentials.expire(&self.event_bus).await {
            warn!(error = %e, "Failed to remove refused credential");
        }

        ApiError::Unauthorized {
            redirect_to: self.config.unauthorized_redirect.clone(),
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.api_base_url.as_str())
            .finish_non_exhaustive()
    }
}

fn status_error(response: &HttpResponse) -> ApiError {
    let message = serde_json::from_slice::<Value>(&response.body)
        .ok()
        .and_then(|body| {
            ["error", "detail"].iter().find_map(|field| {
                body.get(*field)
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
        })
        .unwrap_or_else(|| format!("HTTP {}", response.status));

    ApiError::Status {
        status: response.status,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_desktop::MemorySecureStore;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::storage::SecureStore;
    use bytes::Bytes;
    use core_runtime::events::AuthEvent;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn config(store: Arc<MemorySecureStore>) -> AppConfig {
        AppConfig::builder().secure_store(store).build().unwrap()
    }

    async fn signed_in_store() -> Arc<MemorySecureStore> {
        let store = Arc::new(MemorySecureStore::new());
        store.set_secret("Token", b"abc.def.ghi").await.unwrap();
        store
            .set_secret("userEmail", b"reader@example.com")
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_request_carries_stored_credential() {
        let store = signed_in_store().await;
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| {
                req.url == "http://127.0.0.1:8000/audiobooks/"
                    && req.headers.get("Authorization").map(String::as_str)
                        == Some("Token abc.def.ghi")
                    && req.headers.get("Accept").map(String::as_str) == Some("application/json")
                    && req.timeout == Some(std::time::Duration::from_secs(5))
            })
            .times(1)
            .returning(|_| Ok(response(200, r#"[{"id": 1, "title": "Dune"}]"#)));

        let api = ApiClient::new(&config(store), Arc::new(http), EventBus::new(8));
        let books = api.audiobooks().await.unwrap();

        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "Dune");
    }

    #[tokio::test]
    async fn test_anonymous_request_has_no_authorization() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| !req.headers.contains_key("Authorization"))
            .returning(|_| Ok(response(200, "[]")));

        let api = ApiClient::new(
            &config(Arc::new(MemorySecureStore::new())),
            Arc::new(http),
            EventBus::new(8),
        );
        assert!(api.authors().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_encodes_query() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| req.url == "http://127.0.0.1:8000/audiobooks/?search=dune+messiah")
            .returning(|_| Ok(response(200, "[]")));

        let api = ApiClient::new(
            &config(Arc::new(MemorySecureStore::new())),
            Arc::new(http),
            EventBus::new(8),
        );
        api.search_audiobooks("dune messiah").await.unwrap();
    }

    #[tokio::test]
    async fn test_unauthorized_clears_token_and_expires_session() {
        let store = signed_in_store().await;
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .returning(|_| Ok(response(401, r#"{"detail": "Invalid token."}"#)));

        let events = EventBus::new(8);
        let mut stream = events.stream();
        let api = ApiClient::new(&config(store.clone()), Arc::new(http), events);

        let error = api.library().await.unwrap_err();
        assert!(matches!(
            error,
            ApiError::Unauthorized { ref redirect_to } if redirect_to == "/"
        ));

        assert!(store.get_secret("Token").await.unwrap().is_none());
        assert!(store.get_secret("userEmail").await.unwrap().is_some());
        assert_eq!(
            stream.drain(),
            vec![CoreEvent::Auth(AuthEvent::SessionExpired)]
        );
    }

    #[tokio::test]
    async fn test_status_error_uses_server_message() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .returning(|_| Ok(response(404, r#"{"detail": "Not found."}"#)));

        let api = ApiClient::new(
            &config(Arc::new(MemorySecureStore::new())),
            Arc::new(http),
            EventBus::new(8),
        );

        match api.audiobook(99).await.unwrap_err() {
            ApiError::Status { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Not found.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_and_decode_errors() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Err(BridgeError::OperationFailed("connection refused".into())));
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(response(200, "<html>")));

        let api = ApiClient::new(
            &config(Arc::new(MemorySecureStore::new())),
            Arc::new(http),
            EventBus::new(8),
        );

        let first = api.me().await.unwrap_err();
        assert!(matches!(first, ApiError::Transport(_)));
        assert!(first.is_retryable());

        assert!(matches!(api.me().await.unwrap_err(), ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_library_changes_publish_events() {
        let store = signed_in_store().await;
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| {
                req.method == HttpMethod::Post
                    && req.url.ends_with("/library/add_audiobook/")
                    && req.body.as_deref() == Some(br#"{"audiobook_id":7}"#.as_slice())
            })
            .returning(|_| {
                Ok(response(
                    200,
                    r#"{"message": "Added", "in_library": true}"#,
                ))
            });
        http.expect_execute()
            .withf(|req| req.url.ends_with("/library/remove_audiobook/"))
            .returning(|_| Ok(response(200, r#"{"in_library": false}"#)));

        let events = EventBus::new(8);
        let mut stream = events.stream();
        let api = ApiClient::new(&config(store), Arc::new(http), events);

        assert_eq!(
            api.add_to_library(7).await.unwrap().in_library,
            Some(true)
        );
        assert_eq!(
            api.remove_from_library(7).await.unwrap().in_library,
            Some(false)
        );

        assert_eq!(
            stream.drain(),
            vec![
                CoreEvent::Library(LibraryEvent::AudiobookAdded { audiobook_id: 7 }),
                CoreEvent::Library(LibraryEvent::AudiobookRemoved { audiobook_id: 7 }),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_library_change_publishes_nothing() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .returning(|_| Ok(response(400, r#"{"error": "Already in library"}"#)));

        let events = EventBus::new(8);
        let mut stream = events.stream();
        let api = ApiClient::new(
            &config(Arc::new(MemorySecureStore::new())),
            Arc::new(http),
            events,
        );

        let error = api.add_to_library(7).await.unwrap_err();
        assert_eq!(
            error.to_string(),
            "API error (status 400): Already in library"
        );
        assert!(stream.drain().is_empty());
    }
}
