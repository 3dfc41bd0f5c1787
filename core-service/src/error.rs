use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Authentication error: {0}")]
    Auth(#[from] core_auth::AuthError),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),

    #[error("API error: {0}")]
    Api(#[from] core_api::ApiError),
}

impl ServiceError {
    /// Whether the API refused the stored credential and the host should
    /// navigate to the sign-in flow.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ServiceError::Api(error) if error.is_unauthorized())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
