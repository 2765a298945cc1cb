//! TileStream - streaming core for hierarchical tiled datasets
//!
//! This library implements the scheduling, caching, and concurrency contract
//! around fetching, decoding, and evicting tile content for a tree of
//! spatially nested tiles. Rendering, format parsing, and camera math are
//! collaborators supplied by the caller through traits.
//!
//! # High-Level API
//!
//! For most use cases, the [`service`] module provides a simplified facade:
//!
//! ```ignore
//! use tilestream::service::TileStreamService;
//! use tilestream::config::EngineConfig;
//! use tilestream::traversal::ViewState;
//!
//! let config = EngineConfig::default();
//! let mut service = TileStreamService::new(tileset, loader, evaluator, config);
//!
//! // Once per frame: decide what to load, keep, or release.
//! service.update(&ViewState::new([0.0, 0.0, 1000.0]));
//! ```
//!
//! The pieces are also usable individually: [`worker::WorkerPool`] bounds
//! concurrent decodes, [`cache::ContentCache`] coalesces and evicts decoded
//! content, and [`traversal::TilesetTraverser`] walks the tile tree each
//! update pass.

pub mod cache;
pub mod config;
pub mod content;
pub mod logging;
pub mod service;
pub mod tileset;
pub mod traversal;
pub mod worker;

/// Version of the TileStream library.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
