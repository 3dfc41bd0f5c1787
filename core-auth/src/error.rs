use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// The server refused the login and said why.
    #[error("Login rejected: {0}")]
    LoginRejected(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email already registered: {0}")]
    EmailTaken(String),

    #[error("Registration rejected: {0}")]
    RegistrationRejected(String),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Unexpected response (HTTP {status}): {message}")]
    UnexpectedResponse { status: u16, message: String },

    #[error("Secure storage unavailable: {0}")]
    SecureStorageUnavailable(String),

    #[error("Not authenticated")]
    NotAuthenticated,
}

impl AuthError {
    /// Whether resubmitting the same form could succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AuthError::Transport(_) | AuthError::UnexpectedResponse { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
