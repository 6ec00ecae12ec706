//! Error type shared by the relay, the scheduler and the activity clients.

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Presence payload is missing field '{0}'")]
    MissingField(&'static str),

    #[error("Presence payload field '{field}' is not {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Failed to load resource: {0}")]
    ResourceLoad(String),

    #[error("Failed to initialize activity client: {0}")]
    Initialization(String),

    #[error("Activity client error: {0}")]
    Activity(String),

    #[error("Discord error: {0}")]
    Discord(#[from] discord_sdk::Error),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = RelayError> = std::result::Result<T, E>;
