//! Error types for the filtering engine.
//!
//! Nothing in this crate is fatal to the page. These errors travel across the
//! trait seams (`Channel`, `Store`) and out of the pattern compiler so the
//! engine can log them and carry on with in-memory defaults.

use crate::protocol::ProtocolError;

/// Error type for engine operations.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("Invalid name pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("Store unavailable: {0}")]
    Store(String),
    #[error("Channel unavailable: {0}")]
    Channel(String),
}
