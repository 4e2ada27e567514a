//! Error types for settings, gateway and controller operations

use thiserror::Error;

/// A required settings field was left empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("apiKey required")]
    MissingApiKey,

    #[error("apiEndpoint required")]
    MissingApiEndpoint,
}

/// Failure while saving settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to write settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A submit was attempted without an API key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("configuration required: set an API key first")]
pub struct ConfigurationRequired;

/// Failure of a single chat-completion exchange
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Non-success HTTP status, carrying the server's message or a synthesized one
    #[error("{0}")]
    Api(String),

    #[error("Invalid response format from API")]
    InvalidResponse,

    /// DNS, connection or timeout failure
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
}

impl GatewayError {
    pub fn status_fallback(status: u16) -> Self {
        GatewayError::Api(format!("API request failed with status {}", status))
    }
}
