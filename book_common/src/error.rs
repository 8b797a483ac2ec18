//! Error types shared between the feeder and the relay.
//!
//! The `FeedError` enum unifies the failure cases of the whole pipeline: frame decoding,
//! bus and socket I/O, JSON encoding of outbound messages, configuration validation and
//! lock poisoning. Every crate in the workspace propagates this single error type.
use std::io;
use std::sync::PoisonError;

use thiserror::Error;

/// Unified error type shared by feeder and relay.
#[derive(Error, Debug)]
pub enum FeedError {
    /// I/O error originating from sockets or files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic formatting/validation error with a human-readable message.
    #[error("Format error: {0}")]
    Format(String),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Binary frame is shorter than its header or than its declared record count implies.
    #[error("Malformed frame: need {needed} bytes, got {actual}")]
    MalformedFrame {
        /// Minimum length implied by the header (or the header itself).
        needed: usize,
        /// Actual buffer length.
        actual: usize,
    },

    /// Order batch frame carries a message type this consumer does not understand.
    #[error("Unsupported message type: {0}")]
    UnsupportedMessageType(u8),

    /// A configuration value is out of range or cannot be parsed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Transport-level failure (bus datagram, WebSocket handshake or send).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Error indicating a poisoned mutex/lock was encountered.
    #[error("Mutex Lock Poisoned: {0}")]
    MutexLock(String),
}

impl<T> From<PoisonError<T>> for FeedError {
    fn from(err: PoisonError<T>) -> Self {
        FeedError::MutexLock(err.to_string())
    }
}

impl FeedError {
    /// Whether the error comes from a frame that could not be decoded, as opposed to a
    /// failure further down the pipeline.
    pub fn is_frame_error(&self) -> bool {
        matches!(
            self,
            FeedError::MalformedFrame { .. } | FeedError::UnsupportedMessageType(_)
        )
    }
}
