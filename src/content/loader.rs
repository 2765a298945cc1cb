//! The content loader trait and decoded payload type.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use super::error::{DecodeError, FetchError};
use crate::tileset::ContentKey;

/// Boxed future returned by [`ContentLoader::fetch_raw`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Bytes, FetchError>> + Send + 'a>>;

/// Decoded tile content, opaque to the core.
///
/// The core only needs the payload's approximate resident size for cache
/// accounting; what the bytes mean is the renderer's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedContent {
    data: Bytes,
}

impl DecodedContent {
    /// Wraps decoded bytes as cacheable content.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Returns the decoded payload.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Returns the approximate resident size in bytes.
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }
}

/// Collaborator supplying raw bytes and format-specific decoding.
///
/// Both operations run inside a worker slot, off the control thread.
/// Implementations must return a definite outcome for every call; the error
/// variants are part of the contract, panics are not.
pub trait ContentLoader: Send + Sync + 'static {
    /// Fetches the raw payload for `key` from its source.
    fn fetch_raw<'a>(&'a self, key: &'a ContentKey) -> FetchFuture<'a>;

    /// Decodes raw bytes into renderable content.
    ///
    /// Decoding is CPU-bound and synchronous; it runs on the worker slot
    /// that fetched the bytes.
    fn decode(&self, key: &ContentKey, raw: Bytes) -> Result<DecodedContent, DecodeError>;
}
