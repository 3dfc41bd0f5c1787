//! # Authentication Gate
//!
//! Decides whether a held credential still grants access to protected views.
//!
//! A credential is usable only when it is a three-segment, dot-separated token
//! whose middle segment decodes to a JSON object carrying a numeric `exp`
//! (seconds since the Unix epoch) that lies in the future. Anything else is
//! rejected: absent, empty, malformed, undecodable or expired credentials all
//! map to `false`. The gate never reads, refreshes or deletes storage.
//!
//! ```
//! use core_auth::gate::is_session_valid;
//!
//! assert!(!is_session_valid(None));
//! assert!(!is_session_valid(Some("")));
//! assert!(!is_session_valid(Some("not-a-token")));
//! ```

use crate::types::TokenClaims;
use base64::{
    alphabet,
    engine::{general_purpose::GeneralPurpose, DecodePaddingMode, GeneralPurposeConfig},
    Engine as _,
};
use bridge_traits::time::Clock;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);

/// base64url with or without `=` padding
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// Standard alphabet, accepted when the issuer did not use base64url
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);

/// Why a credential could not be decoded into claims.
#[derive(Error, Debug)]
pub enum ClaimsError {
    #[error("credential is empty")]
    Empty,

    #[error("expected 3 non-empty segments, found {0}")]
    Segments(usize),

    #[error("payload is not base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("payload is not JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("payload has no numeric exp claim")]
    MissingExpiry,
}

/// Decode the claims carried by a credential.
///
/// Only the decode step returns errors; callers deciding access should use
/// [`is_session_valid_at`], which maps every error to "invalid".
pub fn decode_claims(credential: &str) -> Result<TokenClaims, ClaimsError> {
    if credential.is_empty() {
        return Err(ClaimsError::Empty);
    }

    let segments: Vec<&str> = credential.split('.').collect();
    if segments.len() != 3 || segments.iter().any(|segment| segment.is_empty()) {
        return Err(ClaimsError::Segments(
            segments.iter().filter(|segment| !segment.is_empty()).count(),
        ));
    }

    let payload = URL_SAFE_LENIENT
        .decode(segments[1])
        .or_else(|_| STANDARD_LENIENT.decode(segments[1]))?;

    let value: serde_json::Value = serde_json::from_slice(&payload)?;
    let object = value.as_object().ok_or(ClaimsError::NotAnObject)?;

    match object.get("exp") {
        Some(exp) if exp.is_number() => Ok(serde_json::from_value(value)?),
        _ => Err(ClaimsError::MissingExpiry),
    }
}

/// Is the credential usable at `now`?
pub fn is_session_valid_at(credential: Option<&str>, now: DateTime<Utc>) -> bool {
    let Some(credential) = credential else {
        return false;
    };

    match decode_claims(credential) {
        Ok(claims) => {
            let now_secs = now.timestamp_millis() as f64 / 1000.0;
            claims.exp.is_finite() && claims.exp > now_secs
        }
        Err(error) => {
            debug!(error = %error, "Credential rejected by gate");
            false
        }
    }
}

/// Is the credential usable right now?
pub fn is_session_valid(credential: Option<&str>) -> bool {
    is_session_valid_at(credential, Utc::now())
}

/// Outcome of a gate check for a protected view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Render the protected subtree
    Allow,
    /// Substitute a redirect
    Redirect { to: String },
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allow)
    }
}

/// Gate bound to a clock and the login route.
#[derive(Clone)]
pub struct SessionGate {
    clock: Arc<dyn Clock>,
    login_redirect: String,
}

impl SessionGate {
    pub fn new(clock: Arc<dyn Clock>, login_redirect: impl Into<String>) -> Self {
        Self {
            clock,
            login_redirect: login_redirect.into(),
        }
    }

    pub fn is_valid(&self, credential: Option<&str>) -> bool {
        is_session_valid_at(credential, self.clock.now())
    }

    pub fn check(&self, credential: Option<&str>) -> GateDecision {
        if self.is_valid(credential) {
            GateDecision::Allow
        } else {
            GateDecision::Redirect {
                to: self.login_redirect.clone(),
            }
        }
    }

    pub fn login_redirect(&self) -> &str {
        &self.login_redirect
    }
}

impl std::fmt::Debug for SessionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGate")
            .field("login_redirect", &self.login_redirect)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
    use bridge_traits::time::FixedClock;

    const NOW: i64 = 1_700_000_000;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(NOW, 0).unwrap()
    }

    fn token_with_payload(payload: &str) -> String {
        format!("header.{}.signature", URL_SAFE_NO_PAD.encode(payload))
    }

    #[test]
    fn test_absent_and_empty_are_invalid() {
        assert!(!is_session_valid_at(None, now()));
        assert!(!is_session_valid_at(Some(""), now()));
        assert!(matches!(decode_claims(""), Err(ClaimsError::Empty)));
    }

    #[test]
    fn test_garbage_is_invalid() {
        for garbage in [
            "not-a-token",
            "undefined",
            "null",
            "a.b",
            "a.b.c.d",
            "..",
            "a..c",
            "a.!!!!.c",
            "9944b09199c62bcf9418ad846dd0e4bbdfc6ee4b",
        ] {
            assert!(
                !is_session_valid_at(Some(garbage), now()),
                "{garbage} should be invalid"
            );
        }
    }

    #[test]
    fn test_segment_errors() {
        assert!(matches!(decode_claims("a.b"), Err(ClaimsError::Segments(2))));
        assert!(matches!(decode_claims("a..c"), Err(ClaimsError::Segments(2))));
    }

    #[test]
    fn test_expired_is_invalid() {
        let token = token_with_payload(&format!(r#"{{"exp": {}}}"#, NOW - 3600));
        assert!(!is_session_valid_at(Some(&token), now()));
    }

    #[test]
    fn test_future_expiry_is_valid() {
        let token = token_with_payload(&format!(r#"{{"exp": {}, "sub": "7"}}"#, NOW + 3600));
        assert!(is_session_valid_at(Some(&token), now()));
    }

    #[test]
    fn test_expiry_equal_to_now_is_invalid() {
        let token = token_with_payload(&format!(r#"{{"exp": {}}}"#, NOW));
        assert!(!is_session_valid_at(Some(&token), now()));
    }

    #[test]
    fn test_fractional_expiry() {
        let token = token_with_payload(&format!(r#"{{"exp": {}.5}}"#, NOW));
        assert!(is_session_valid_at(Some(&token), now()));
    }

    #[test]
    fn test_padded_and_standard_alphabet_payloads() {
        let payload = format!(r#"{{"exp":{},"name":"??>"}}"#, NOW + 60);

        let padded = format!("h.{}.s", URL_SAFE.encode(&payload));
        assert!(is_session_valid_at(Some(&padded), now()));

        let standard = format!("h.{}.s", STANDARD.encode(&payload));
        assert!(is_session_valid_at(Some(&standard), now()));
    }

    #[test]
    fn test_payload_shape_errors() {
        assert!(matches!(
            decode_claims(&token_with_payload("not json")),
            Err(ClaimsError::Json(_))
        ));
        assert!(matches!(
            decode_claims(&token_with_payload(&format!("[{}]", NOW + 60))),
            Err(ClaimsError::NotAnObject)
        ));
        assert!(matches!(
            decode_claims(&token_with_payload(r#"{"sub": "1"}"#)),
            Err(ClaimsError::MissingExpiry)
        ));
        assert!(matches!(
            decode_claims(&token_with_payload(r#"{"exp": "tomorrow"}"#)),
            Err(ClaimsError::MissingExpiry)
        ));
    }

    #[test]
    fn test_session_gate_decisions() {
        let gate = SessionGate::new(Arc::new(FixedClock::at_unix(NOW)), "/login");
        let valid = token_with_payload(&format!(r#"{{"exp": {}}}"#, NOW + 1));
        let expired = token_with_payload(&format!(r#"{{"exp": {}}}"#, NOW - 1));

        assert_eq!(gate.check(Some(&valid)), GateDecision::Allow);
        assert_eq!(
            gate.check(Some(&expired)),
            GateDecision::Redirect {
                to: "/login".to_string()
            }
        );
        assert!(!gate.check(None).is_allowed());
    }
}
