//! Input validation for untrusted data.
//!
//! Frames are checked here before the bridge ever parses them.

use thiserror::Error;

/// Maximum WebSocket text frame size.
pub const MAX_WS_MESSAGE_SIZE: usize = editor_core::protocol::MAX_MESSAGE_BYTES;
/// Smallest accepted tick interval in milliseconds.
pub const MIN_TICK_MS: u64 = 1;
/// Largest accepted tick interval in milliseconds.
pub const MAX_TICK_MS: u64 = 1000;

/// Validation error types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// WebSocket message exceeds maximum size.
    #[error("message too large ({size} bytes, max {MAX_WS_MESSAGE_SIZE})")]
    MessageTooLarge {
        /// Received size in bytes.
        size: usize,
    },
    /// Binary frames carry no envelopes.
    #[error("binary frames are not supported")]
    BinaryFrame,
    /// Tick interval outside the accepted range.
    #[error("tick interval {0}ms outside {MIN_TICK_MS}..={MAX_TICK_MS}ms")]
    InvalidTickInterval(u64),
}

impl ValidationError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MessageTooLarge { .. } => "message_size",
            Self::BinaryFrame => "binary_frame",
            Self::InvalidTickInterval(_) => "tick_interval",
        }
    }
}

/// Validate WebSocket message size.
///
/// # Errors
///
/// Returns [`ValidationError::MessageTooLarge`] if the message exceeds 1 MiB.
pub fn validate_message_size(size: usize) -> Result<(), ValidationError> {
    if size > MAX_WS_MESSAGE_SIZE {
        return Err(ValidationError::MessageTooLarge { size });
    }
    Ok(())
}

/// Validate the timer tick interval.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidTickInterval`] outside 1..=1000 ms.
pub fn validate_tick_interval(tick_ms: u64) -> Result<(), ValidationError> {
    if !(MIN_TICK_MS..=MAX_TICK_MS).contains(&tick_ms) {
        return Err(ValidationError::InvalidTickInterval(tick_ms));
    }
    Ok(())
}
