//! Error types for editor operations.

use thiserror::Error;

/// Result type for editor operations.
pub type EditorResult<T> = Result<T, EditorError>;

/// Errors that can occur in local editing operations.
#[derive(Debug, Error)]
pub enum EditorError {
    /// State not found in the graph.
    #[error("State not found: {0}")]
    StateNotFound(String),

    /// Transition not found in the graph.
    #[error("Transition not found: {0}")]
    TransitionNotFound(String),

    /// An entity with this id already exists.
    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    /// A transition endpoint does not name an existing state.
    #[error("Transition {transition} references unknown state {state}")]
    DanglingEndpoint {
        /// Offending transition id.
        transition: String,
        /// Missing state id.
        state: String,
    },

    /// Invalid editing operation.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while decoding inbound host messages.
///
/// These never escape the host bridge: they are logged and the message is
/// dropped.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The message was not valid JSON or not a JSON object.
    #[error("Malformed message: {0}")]
    Malformed(String),

    /// The envelope carried no `version` field.
    #[error("Envelope has no version")]
    MissingVersion,

    /// The `version` field was not a non-negative integer.
    #[error("Invalid envelope version: {0}")]
    InvalidVersion(String),

    /// The envelope version is newer than this build understands.
    #[error("Unsupported protocol version {found} (max {supported})")]
    UnsupportedVersion {
        /// Version found on the envelope.
        found: u64,
        /// Highest supported version.
        supported: u32,
    },

    /// The message type is not part of the inbound catalog.
    #[error("Unknown message type: {0}")]
    UnknownType(String),

    /// The payload did not match the schema for its type.
    #[error("Invalid payload for {kind}: {reason}")]
    InvalidPayload {
        /// Message type.
        kind: String,
        /// Decoder error.
        reason: String,
    },

    /// The message was larger than the configured limit.
    #[error("Message too large ({size} bytes, max {max})")]
    TooLarge {
        /// Message size in bytes.
        size: usize,
        /// Maximum accepted size.
        max: usize,
    },
}
