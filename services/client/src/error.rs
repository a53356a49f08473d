//! services/client/src/error.rs
//!
//! Defines the primary error type for the client service.

use crate::config::ConfigError;
use coursedocs_core::ports::PortError;

/// The primary error type for the `client` service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("{0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying HTTP library.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Represents a standard Input/Output error (e.g., reading an upload from disk).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The session was cleared or replaced while the operation was in flight.
    #[error("The session changed before the operation completed")]
    Superseded,

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ClientError {
    /// The message a user should see for this error.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Port(PortError::Rejected { detail, .. }) => detail.clone(),
            other => other.to_string(),
        }
    }
}
