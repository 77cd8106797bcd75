//! Error types for node control encoding and time parsing.

use thiserror::Error;

use crate::wire::GENERIC_CODEC_UNSUPPORTED;

/// A result type using `CodecError`.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors produced when rendering or parsing timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    /// The input is not an RFC 3339 timestamp.
    #[error("invalid timestamp {value:?}: {reason}")]
    Invalid {
        /// The rejected input.
        value: String,
        /// Why the parser rejected it.
        reason: String,
    },

    /// The year has no four-digit RFC 3339 form.
    #[error("timestamp year {year} is outside 0000-9999")]
    OutOfRange {
        /// The year of the rejected timestamp.
        year: i32,
    },
}

/// Errors that can occur while encoding or decoding wire payloads.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The value could not be written to the wire format.
    #[error("encode error: {0}")]
    Encode(String),

    /// The payload is not a valid encoding.
    #[error("decode error: {0}")]
    Decode(String),

    /// The payload exceeds the configured size limit.
    #[error("payload of {size} bytes exceeds limit of {max} bytes")]
    PayloadTooLarge {
        /// Size of the rejected payload.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// `NodeControls` was pushed through the generic serde path.
    #[error("{}", GENERIC_CODEC_UNSUPPORTED)]
    UnsupportedGenericCodec,
}

impl CodecError {
    /// Build an encode error, recognizing use of the disabled generic path.
    pub(crate) fn encode(message: String) -> Self {
        if message.contains(GENERIC_CODEC_UNSUPPORTED) {
            Self::UnsupportedGenericCodec
        } else {
            Self::Encode(message)
        }
    }

    /// Build a decode error, recognizing use of the disabled generic path.
    pub(crate) fn decode(message: String) -> Self {
        if message.contains(GENERIC_CODEC_UNSUPPORTED) {
            Self::UnsupportedGenericCodec
        } else {
            Self::Decode(message)
        }
    }

    /// Check whether this error is a programming error rather than bad input.
    #[must_use]
    pub const fn is_misuse(&self) -> bool {
        matches!(self, Self::UnsupportedGenericCodec)
    }
}
