//! Error types for the event pipeline.

use fleetlease_core::AllocationExhausted;
use fleetlease_store::StoreError;

/// Result type for event operations.
pub type Result<T> = std::result::Result<T, EventError>;

/// Errors that can occur while publishing or consuming events.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The broker connection, channel or delivery failed.
    #[error("broker error: {0}")]
    Broker(String),

    /// An event could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The notification could not be persisted.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// No free notification id within the probe bound.
    #[error(transparent)]
    Allocation(#[from] AllocationExhausted),
}

impl From<lapin::Error> for EventError {
    fn from(err: lapin::Error) -> Self {
        Self::Broker(err.to_string())
    }
}
