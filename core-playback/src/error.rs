//! # Playback Error Types
//!
//! Synchronous errors returned by engine operations, plus the failure payload
//! carried by the `Error` playback state.

use bridge_traits::{BridgeError, RendererError, RendererErrorCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid queue operations. Never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Queue is empty")]
    EmptyQueue,

    #[error("Index {index} out of bounds for queue of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Duplicate index {0} in removal set")]
    DuplicateIndex(usize),

    #[error("Cannot move item from {from} to {to}: {reason}")]
    InvalidMove {
        from: usize,
        to: usize,
        reason: String,
    },
}

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Attempted an operation that needs a current item on an empty queue.
    #[error("No current item")]
    NoCurrentItem,
}

impl PlaybackError {
    /// Returns `true` if this error came from queue validation.
    pub fn is_queue_error(&self) -> bool {
        matches!(self, PlaybackError::Queue(_))
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Failure attached to [`PlaybackState::Error`](crate::types::PlaybackState::Error).
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct PlaybackFailure {
    pub code: RendererErrorCode,
    pub message: String,
}

impl PlaybackFailure {
    pub fn new(code: RendererErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Only network-class failures (timeout, connection lost, offline,
    /// host unreachable, DNS) are worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.code.is_transient()
    }

    /// Converts a control-call error into a failure payload.
    pub fn from_bridge(err: &BridgeError) -> Self {
        match err.as_renderer_error() {
            Some(renderer) => renderer.clone().into(),
            None => Self::new(RendererErrorCode::Other("bridge".to_string()), err.to_string()),
        }
    }
}

impl From<RendererError> for PlaybackFailure {
    fn from(err: RendererError) -> Self {
        Self {
            code: err.code,
            message: err.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_errors_convert() {
        let err: PlaybackError = QueueError::EmptyQueue.into();
        assert!(err.is_queue_error());
        assert_eq!(err.to_string(), "Queue error: Queue is empty");
    }

    #[test]
    fn failure_from_bridge_keeps_renderer_code() {
        let bridge = BridgeError::Renderer(RendererError::new(
            RendererErrorCode::NetworkConnectionLost,
            "lost",
        ));
        let failure = PlaybackFailure::from_bridge(&bridge);
        assert_eq!(failure.code, RendererErrorCode::NetworkConnectionLost);
        assert!(failure.is_retryable());
    }

    #[test]
    fn non_renderer_bridge_errors_are_terminal() {
        let bridge = BridgeError::OperationFailed("audio session denied".into());
        let failure = PlaybackFailure::from_bridge(&bridge);
        assert!(!failure.is_retryable());
        assert!(failure.message.contains("audio session denied"));
    }
}
