//! Error taxonomy for the city list and the weather cards.
//!
//! Fetch errors stay inside the card that produced them, storage errors are
//! logged at the registry boundary, and validation errors are reported back to
//! whoever tried to add the city. None of them is allowed to take the board
//! down.

use reqwest::StatusCode;
use thiserror::Error;

/// Rejected user input for a new city.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("City name must not be empty")]
    EmptyName,

    #[error("No unused city id is left")]
    IdsExhausted,
}

/// Failure of a single weather lookup.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Weather request failed: {0}")]
    Network(String),

    #[error("Weather service responded with status {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },

    #[error("Unexpected weather payload: {0}")]
    MalformedResponse(String),
}

impl FetchError {
    /// Short message for the card face.
    pub fn user_message(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "Network unavailable",
            FetchError::HttpStatus { status, .. } if *status == StatusCode::NOT_FOUND => {
                "City not found"
            }
            FetchError::HttpStatus { .. } => "Weather service error",
            FetchError::MalformedResponse(_) => "Unreadable weather data",
        }
    }
}

/// Failure of the key-value store behind the city list.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read '{key}' from store: {source}")]
    Read {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to write '{key}' to store: {source}")]
    Write {
        key: String,
        #[source]
        source: anyhow::Error,
    },
}

impl StorageError {
    pub fn read(key: &str, source: impl Into<anyhow::Error>) -> Self {
        StorageError::Read { key: key.to_string(), source: source.into() }
    }

    pub fn write(key: &str, source: impl Into<anyhow::Error>) -> Self {
        StorageError::Write { key: key.to_string(), source: source.into() }
    }
}
