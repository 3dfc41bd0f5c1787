//! # Session Manager
//!
//! Email/password authentication against the catalog API.
//!
//! ## Overview
//!
//! The `SessionManager` submits the login and registration forms, persists the
//! issued credential through the [`CredentialStore`], answers "is this user
//! signed in?" through the [`SessionGate`], and publishes [`AuthEvent`]s on the
//! application's event bus.
//!
//! ## Usage
//!
//! ```no_run
//! use core_auth::SessionManager;
//! use core_runtime::{AppConfig, EventBus};
//! use bridge_traits::{time::SystemClock, http::HttpClient};
//! use std::sync::Arc;
//!
//! # async fn example(config: AppConfig, http: Arc<dyn HttpClient>) -> core_auth::Result<()> {
//! let events = EventBus::new(config.event_buffer_size);
//! let sessions = SessionManager::new(&config, http, events, Arc::new(SystemClock));
//!
//! sessions.login("reader@example.com", "hunter22").await?;
//! assert!(sessions.is_authenticated().await);
//!
//! sessions.logout().await?;
//! # Ok(())
//! # }
//! ```

use crate::credential_store::CredentialStore;
use crate::error::{AuthError, Result};
use crate::gate::SessionGate;
use crate::types::{AuthState, Credential};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::time::Clock;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use core_runtime::AppConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

const LOGIN_PATH: &str = "login/";
const REGISTER_PATH: &str = "register/";
const LOGOUT_ALL_PATH: &str = "logoutall/";
const CHECK_EMAIL_PATH: &str = "check-email/";

/// Shown when registration fails without a field message.
const GENERIC_REGISTRATION_ERROR: &str = "Registration failed";

#[derive(Serialize)]
struct CredentialsForm<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct EmailForm<'a> {
    email: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
    #[serde(default)]
    user: Option<LoginUser>,
}

#[derive(Deserialize)]
struct LoginUser {
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct EmailExists {
    exists: bool,
}

/// Login, registration and logout for a single client.
pub struct SessionManager {
    http: Arc<dyn HttpClient>,
    credentials: CredentialStore,
    gate: SessionGate,
    event_bus: EventBus,
    config: AppConfig,
}

impl SessionManager {
    /// Creates a session manager from the application configuration.
    ///
    /// The secure store and storage keys come from `config`; the clock drives
    /// the expiry check of [`is_authenticated`](Self::is_authenticated).
    pub fn new(
        config: &AppConfig,
        http: Arc<dyn HttpClient>,
        event_bus: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let credentials =
            CredentialStore::new(config.secure_store.clone(), config.storage_keys.clone());
        let gate = SessionGate::new(clock, config.login_redirect.clone());

        Self {
            http,
            credentials,
            gate,
            event_bus,
            config: config.clone(),
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn gate(&self) -> &SessionGate {
        &self.gate
    }

    /// Submits the login form.
    ///
    /// On success the credential and the account email are persisted and
    /// `SignedIn` is published.
    ///
    /// # Errors
    ///
    /// - `LoginRejected` when the server explains the refusal
    /// - `InvalidCredentials` for a bare HTTP 400
    /// - `Transport` when the request never completed
    /// - `UnexpectedResponse` for any other answer
    #[instrument(skip(self, email, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Credential> {
        info!("Submitting login");

        let result = self.try_login(email, password).await;
        match &result {
            Ok(_) => {
                info!("Login succeeded");
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.emit_error(e);
            }
        }
        result
    }

    async fn try_login(&self, email: &str, password: &str) -> Result<Credential> {
        let request = self.post(LOGIN_PATH, &CredentialsForm { email, password })?;
        let response = self.send(request).await?;

        if !response.is_success() {
            let body = body_json(&response);
            if let Some(message) = body.as_ref().and_then(|b| string_field(b, "error")) {
                return Err(AuthError::LoginRejected(message));
            }
            if response.status == 400 {
                return Err(AuthError::InvalidCredentials);
            }
            return Err(unexpected(&response));
        }

        let login: LoginResponse = response.json().map_err(|e| AuthError::UnexpectedResponse {
            status: response.status,
            message: e.to_string(),
        })?;

        if login.token.is_empty() {
            return Err(AuthError::UnexpectedResponse {
                status: response.status,
                message: "login response carried an empty token".to_string(),
            });
        }

        let account_email = login
            .user
            .and_then(|user| user.email)
            .unwrap_or_else(|| email.to_string());

        let credential = Credential::new(login.token);
        self.credentials.store(&credential, &account_email).await?;

        let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::SignedIn {
            email: account_email,
        }));

        Ok(credential)
    }

    /// Submits the registration form.
    ///
    /// Registration does not sign the user in; no credential is stored.
    ///
    /// # Errors
    ///
    /// - `EmailTaken` when the server reports the email as already in use
    /// - `RegistrationRejected` with the first `email` or `password` message
    /// - `Transport` / `UnexpectedResponse` as for [`login`](Self::login)
    #[instrument(skip(self, email, password))]
    pub async fn register(&self, email: &str, password: &str) -> Result<()> {
        info!("Submitting registration");

        let result = self.try_register(email, password).await;
        match &result {
            Ok(()) => info!("Registration succeeded"),
            Err(e) => {
                warn!(error = %e, "Registration failed");
                self.emit_error(e);
            }
        }
        result
    }

    async fn try_register(&self, email: &str, password: &str) -> Result<()> {
        let request = self.post(REGISTER_PATH, &CredentialsForm { email, password })?;
        let response = self.send(request).await?;

        if response.is_success() {
            let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::Registered {
                email: email.to_string(),
            }));
            return Ok(());
        }

        let body = body_json(&response);
        if let Some(message) = body.as_ref().and_then(|b| first_message(b, "email")) {
            let lowered = message.to_lowercase();
            if lowered.contains("already exists") || lowered.contains("unique") {
                return Err(AuthError::EmailTaken(message));
            }
            return Err(AuthError::RegistrationRejected(message));
        }
        if let Some(message) = body.as_ref().and_then(|b| first_message(b, "password")) {
            return Err(AuthError::RegistrationRejected(message));
        }
        if response.is_server_error() {
            return Err(unexpected(&response));
        }

        Err(AuthError::RegistrationRejected(
            GENERIC_REGISTRATION_ERROR.to_string(),
        ))
    }

    /// Asks the server whether an account already uses `email`.
    #[instrument(skip(self, email))]
    pub async fn check_email(&self, email: &str) -> Result<bool> {
        let request = self.post(CHECK_EMAIL_PATH, &EmailForm { email })?;
        let response = self.send(request).await?;

        if !response.is_success() {
            return Err(unexpected(&response));
        }

        let answer: EmailExists =
            response.json().map_err(|e| AuthError::UnexpectedResponse {
                status: response.status,
                message: e.to_string(),
            })?;
        debug!(exists = answer.exists, "Email availability checked");
        Ok(answer.exists)
    }

    /// Signs out.
    ///
    /// The server is asked to revoke every credential of the account, but
    /// its answer does not matter: local storage is cleared either way and
    /// `SignedOut` is published once it is.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        let credential = match self.credentials.token().await {
            Ok(credential) => credential,
            Err(e) => {
                warn!(error = %e, "Could not read credential before logout");
                None
            }
        };

        if let Some(credential) = credential {
            match self.revoke(&credential).await {
                Ok(()) => debug!("Server revoked credentials"),
                Err(e) => warn!(error = %e, "Server-side logout failed, clearing locally"),
            }
        }

        self.credentials.clear().await.map_err(|e| {
            error!(error = %e, "Failed to clear stored credentials");
            e
        })?;

        info!("Signed out");
        let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::SignedOut));
        Ok(())
    }

    async fn revoke(&self, credential: &Credential) -> Result<()> {
        let request = self
            .request(HttpMethod::Post, LOGOUT_ALL_PATH)
            .authorization(&self.config.auth_scheme, credential.expose());
        let response = self.send(request).await?;

        if response.is_success() {
            Ok(())
        } else {
            Err(unexpected(&response))
        }
    }

    /// Whether the stored credential passes the gate.
    pub async fn is_authenticated(&self) -> bool {
        match self.credentials.token().await {
            Ok(credential) => self.gate.is_valid(credential.as_ref().map(Credential::expose)),
            Err(e) => {
                warn!(error = %e, "Could not read credential");
                false
            }
        }
    }

    pub async fn state(&self) -> AuthState {
        if self.is_authenticated().await {
            AuthState::SignedIn
        } else {
            AuthState::SignedOut
        }
    }

    pub async fn user_email(&self) -> Result<Option<String>> {
        self.credentials.email().await
    }

    /// Reacts to the API refusing the credential.
    ///
    /// Only the token is removed; the email stays so the login form can be
    /// pre-filled.
    #[instrument(skip(self))]
    pub async fn handle_unauthorized(&self) -> Result<()> {
        self.credentials.expire(&self.event_bus).await
    }

    fn request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest::new(method, self.config.endpoint(path))
            .header("Accept", "application/json")
            .timeout(self.config.request_timeout)
    }

    fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<HttpRequest> {
        self.request(HttpMethod::Post, path)
            .json(body)
            .map_err(|e| AuthError::Transport(e.to_string()))
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.http
            .execute(request)
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))
    }

    fn emit_error(&self, error: &AuthError) {
        let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::AuthError {
            message: error.to_string(),
            recoverable: error.is_recoverable(),
        }));
    }
}

fn body_json(response: &HttpResponse) -> Option<Value> {
    serde_json::from_slice(&response.body).ok()
}

fn string_field(body: &Value, field: &str) -> Option<String> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// First entry of a field error list such as `{"email": ["..."]}`.
fn first_message(body: &Value, field: &str) -> Option<String> {
    match body.get(field)? {
        Value::Array(messages) => messages
            .first()
            .and_then(Value::as_str)
            .map(str::to_string),
        Value::String(message) => Some(message.clone()),
        _ => None,
    }
}

fn unexpected(response: &HttpResponse) -> AuthError {
    let message = body_json(response)
        .and_then(|b| string_field(&b, "error").or_else(|| string_field(&b, "detail")))
        .unwrap_or_else(|| format!("HTTP {}", response.status));
    AuthError::UnexpectedResponse {
        status: response.status,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use bridge_desktop::MemorySecureStore;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::storage::SecureStore;
    use bridge_traits::time::FixedClock;
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    const NOW: i64 = 1_700_000_000;

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

    fn token(exp: i64) -> String {
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp},"user_id":3}}"#));
        format!("eyJhbGciOiJIUzI1NiJ9.{payload}.c2lnbmF0dXJl")
    }

    struct Harness {
        manager: SessionManager,
        store: Arc<MemorySecureStore>,
        events: EventBus,
    }

    fn harness(http: MockHttpClient) -> Harness {
        let store = Arc::new(MemorySecureStore::new());
        let config = AppConfig::builder()
            .secure_store(store.clone())
            .http_client(Arc::new(MockHttpClient::new()))
            .build()
            .unwrap();
        let events = EventBus::new(16);
        let manager = SessionManager::new(
            &config,
            Arc::new(http),
            events.clone(),
            Arc::new(FixedClock::at_unix(NOW)),
        );
        Harness {
            manager,
            store,
            events,
        }
    }

    #[tokio::test]
    async fn test_login_stores_credential_and_emits_signed_in() {
        let issued = token(NOW + 3600);
        let body = format!(r#"{{"token":"{issued}","user":{{"id":3,"email":"reader@example.com"}}}}"#);

        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|request| {
                request.method == HttpMethod::Post
                    && request.url == "http://127.0.0.1:8000/login/"
                    && request.body.as_deref()
                        == Some(br#"{"email":"reader@example.com","password":"hunter22"}"#.as_slice())
            })
            .times(1)
            .returning(move |_| Ok(response(200, &body)));

        let h = harness(http);
        let mut events = h.events.stream();

        let credential = h.manager.login("reader@example.com", "hunter22").await.unwrap();
        assert_eq!(credential.expose(), issued);

        assert_eq!(
            h.store.get_secret("Token").await.unwrap(),
            Some(issued.clone().into_bytes())
        );
        assert_eq!(
            h.manager.user_email().await.unwrap().as_deref(),
            Some("reader@example.com")
        );
        assert!(h.manager.is_authenticated().await);
        assert_eq!(h.manager.state().await, AuthState::SignedIn);

        assert_eq!(
            events.drain(),
            vec![CoreEvent::Auth(AuthEvent::SignedIn {
                email: "reader@example.com".to_string()
            })]
        );
    }

    #[tokio::test]
    async fn test_login_without_user_falls_back_to_submitted_email() {
        let body = format!(r#"{{"token":"{}"}}"#, token(NOW + 60));
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .returning(move |_| Ok(response(200, &body)));

        let h = harness(http);
        h.manager.login("reader@example.com", "pw").await.unwrap();

        assert_eq!(
            h.manager.user_email().await.unwrap().as_deref(),
            Some("reader@example.com")
        );
    }

    #[tokio::test]
    async fn test_login_server_message_is_surfaced() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .returning(|_| Ok(response(400, r#"{"error":"Invalid credentials"}"#)));

        let h = harness(http);
        let mut events = h.events.stream();

        let err = h.manager.login("reader@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::LoginRejected(ref m) if m == "Invalid credentials"));
        assert!(h.store.is_empty());

        assert_eq!(
            events.drain(),
            vec![CoreEvent::Auth(AuthEvent::AuthError {
                message: "Login rejected: Invalid credentials".to_string(),
                recoverable: false,
            })]
        );
    }

    #[tokio::test]
    async fn test_login_bare_400_is_invalid_credentials() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .returning(|_| Ok(response(400, r#"{"email":["Enter a valid email address."]}"#)));

        let h = harness(http);
        let err = h.manager.login("nope", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_transport_failure() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .returning(|_| Err(BridgeError::OperationFailed("Request timed out".to_string())));

        let h = harness(http);
        let err = h.manager.login("reader@example.com", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::Transport(_)));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_login_server_error_is_unexpected() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .returning(|_| Ok(response(502, "<html>Bad Gateway</html>")));

        let h = harness(http);
        let err = h.manager.login("reader@example.com", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::UnexpectedResponse { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_login_with_expired_token_is_not_authenticated() {
        let body = format!(r#"{{"token":"{}"}}"#, token(NOW - 1));
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .returning(move |_| Ok(response(200, &body)));

        let h = harness(http);
        h.manager.login("reader@example.com", "pw").await.unwrap();
        assert!(!h.manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_register_success_emits_registered_without_storing() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|request| request.url.ends_with("/register/"))
            .returning(|_| Ok(response(200, r#"{"id":4,"email":"new@example.com"}"#)));

        let h = harness(http);
        let mut events = h.events.stream();

        h.manager.register("new@example.com", "longpassword").await.unwrap();

        assert!(h.store.is_empty());
        assert_eq!(
            events.drain(),
            vec![CoreEvent::Auth(AuthEvent::Registered {
                email: "new@example.com".to_string()
            })]
        );
    }

    #[tokio::test]
    async fn test_register_error_mapping() {
        let cases = [
            (
                r#"{"email":["custom user with this email already exists."]}"#,
                "taken",
            ),
            (r#"{"email":["Enter a valid email address."]}"#, "rejected"),
            (r#"{"password":["This password is too short."]}"#, "rejected"),
            (r#"{}"#, "generic"),
        ];

        for (body, expected) in cases {
            let mut http = MockHttpClient::new();
            let body = body.to_string();
            http.expect_execute()
                .returning(move |_| Ok(response(400, &body)));

            let h = harness(http);
            let err = h.manager.register("x@example.com", "pw").await.unwrap_err();

            match expected {
                "taken" => assert!(matches!(err, AuthError::EmailTaken(_))),
                "rejected" => assert!(
                    matches!(err, AuthError::RegistrationRejected(ref m) if m != GENERIC_REGISTRATION_ERROR)
                ),
                _ => assert!(
                    matches!(err, AuthError::RegistrationRejected(ref m) if m == GENERIC_REGISTRATION_ERROR)
                ),
            }
        }
    }

    #[tokio::test]
    async fn test_check_email() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|request| request.url.ends_with("/check-email/"))
            .returning(|_| Ok(response(200, r#"{"exists":true}"#)));

        let h = harness(http);
        assert!(h.manager.check_email("reader@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_server_fails() {
        let issued = token(NOW + 3600);
        let header = format!("Token {issued}");

        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(move |request| {
                request.url.ends_with("/logoutall/")
                    && request.headers.get("Authorization") == Some(&header)
            })
            .times(1)
            .returning(|_| Ok(response(500, "")));

        let h = harness(http);
        h.manager
            .credentials()
            .store(&Credential::new(issued), "reader@example.com")
            .await
            .unwrap();
        let mut events = h.events.stream();

        h.manager.logout().await.unwrap();

        assert!(h.store.is_empty());
        assert!(!h.manager.is_authenticated().await);
        assert_eq!(events.drain(), vec![CoreEvent::Auth(AuthEvent::SignedOut)]);
    }

    #[tokio::test]
    async fn test_logout_without_credential_skips_server() {
        let mut http = MockHttpClient::new();
        http.expect_execute().times(0);

        let h = harness(http);
        h.manager.logout().await.unwrap();
    }

    #[tokio::test]
    async fn test_handle_unauthorized_keeps_email() {
        let h = harness(MockHttpClient::new());
        h.manager
            .credentials()
            .store(&Credential::new(token(NOW + 3600)), "reader@example.com")
            .await
            .unwrap();
        let mut events = h.events.stream();

        h.manager.handle_unauthorized().await.unwrap();

        assert!(!h.manager.is_authenticated().await);
        assert!(h.manager.user_email().await.unwrap().is_some());
        assert_eq!(
            events.drain(),
            vec![CoreEvent::Auth(AuthEvent::SessionExpired)]
        );
    }

    struct BrokenStore;

    #[async_trait]
    impl SecureStore for BrokenStore {
        async fn set_secret(&self, _key: &str, _value: &[u8]) -> BridgeResult<()> {
            Err(BridgeError::NotAvailable("storage disabled".to_string()))
        }

        async fn get_secret(&self, _key: &str) -> BridgeResult<Option<Vec<u8>>> {
            Err(BridgeError::NotAvailable("storage disabled".to_string()))
        }

        async fn delete_secret(&self, _key: &str) -> BridgeResult<()> {
            Err(BridgeError::NotAvailable("storage disabled".to_string()))
        }

        async fn list_keys(&self) -> BridgeResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn clear_all(&self) -> BridgeResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_unreadable_storage_is_signed_out() {
        let config = AppConfig::builder()
            .secure_store(Arc::new(BrokenStore))
            .http_client(Arc::new(MockHttpClient::new()))
            .build()
            .unwrap();
        let manager = SessionManager::new(
            &config,
            Arc::new(MockHttpClient::new()),
            EventBus::new(4),
            Arc::new(FixedClock::at_unix(NOW)),
        );

        assert!(!manager.is_authenticated().await);
        assert_eq!(manager.state().await, AuthState::SignedOut);
        assert!(matches!(
            manager.logout().await,
            Err(AuthError::SecureStorageUnavailable(_))
        ));
    }
}
