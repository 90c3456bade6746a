use thiserror::Error;

#[derive(Error, Debug)]
pub enum HubError {
    #[error("Source error: {0}")]
    SourceError(String),

    #[error("Source unavailable after {0} connection attempts")]
    SourceUnavailable(u32),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for HubError {
    fn from(e: serde_json::Error) -> Self {
        HubError::SerializationError(e.to_string())
    }
}

impl From<reqwest::Error> for HubError {
    fn from(e: reqwest::Error) -> Self {
        HubError::SourceError(e.to_string())
    }
}
