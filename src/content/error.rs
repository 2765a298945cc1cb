//! Content loading errors.

use thiserror::Error;

use crate::tileset::ContentKey;

/// Failure reaching the raw bytes of a content payload.
///
/// Fetch failures are transient by nature (network, filesystem) and are
/// always worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The content does not exist at its source.
    #[error("content {0} not found")]
    NotFound(ContentKey),

    /// The transport failed before the payload was fully read.
    #[error("transport failure fetching {key}: {message}")]
    Transport { key: ContentKey, message: String },
}

/// Failure decoding fetched bytes into usable content.
///
/// Decode failures are likely to recur for the same payload, so callers
/// apply a retry budget rather than retrying indefinitely.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The payload is structurally invalid.
    #[error("malformed payload for {key}: {message}")]
    Malformed { key: ContentKey, message: String },

    /// The payload format is recognized but not supported.
    #[error("unsupported content format for {key}: {message}")]
    Unsupported { key: ContentKey, message: String },
}

/// Terminal failure reason for a decode job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl ContentError {
    /// Returns true if the failure happened while decoding, meaning a retry
    /// with identical input is likely to fail again.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}
