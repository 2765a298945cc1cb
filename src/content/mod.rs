//! Content loading collaborator seam and error taxonomy.
//!
//! The core never parses tile payloads itself. Format-specific parsers and
//! the network/filesystem layer plug in through the [`ContentLoader`] trait,
//! which is invoked inside a worker slot. The core only sees opaque
//! [`DecodedContent`] payloads and the errors defined here.

mod error;
mod loader;

pub use error::{ContentError, DecodeError, FetchError};
pub use loader::{ContentLoader, DecodedContent, FetchFuture};
