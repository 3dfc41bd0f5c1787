use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque bearer credential issued by the API at login.
///
/// The raw value is only reachable through [`Credential::expose`]; `Debug`
/// and `Display` never print it.
///
/// ```
/// use core_auth::Credential;
///
/// let credential = Credential::new("abc.def.ghi");
/// assert_eq!(credential.expose(), "abc.def.ghi");
/// assert!(!format!("{:?}", credential).contains("abc"));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw token, for the `Authorization` header and the gate.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&"[REDACTED]").finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Claims read from the middle segment of a token.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenClaims {
    /// Expiry, seconds since the Unix epoch
    pub exp: f64,
}

/// Whether a usable credential is currently held.
///
/// ```
/// use core_auth::AuthState;
///
/// assert!(!AuthState::SignedOut.is_authenticated());
/// assert!(AuthState::SignedIn.is_authenticated());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AuthState {
    #[default]
    SignedOut,
    SignedIn,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::SignedIn)
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthState::SignedOut => write!(f, "Signed Out"),
            AuthState::SignedIn => write!(f, "Signed In"),
        }
    }
}
