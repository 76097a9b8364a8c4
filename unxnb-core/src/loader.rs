//! The content-loader seam.
//!
//! Decoding the binary container format is delegated entirely to an external
//! collaborator behind [`ContentLoader`]. The orchestrator asks it to decode
//! one container at a time and tells it to release its cache after every
//! file, because loaders are assumed to retain references that would
//! otherwise grow unbounded across a full content tree.

use crate::asset::DecodedAsset;
use thiserror::Error;

/// An error decoding a binary container: corrupt data or a genuinely
/// unsupported binary encoding.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{0}")]
    Malformed(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Decodes binary containers into in-memory asset values.
pub trait ContentLoader {
    /// Decode the container identified by `asset_key` (the content-relative
    /// path without the container extension).
    fn load(&mut self, asset_key: &str) -> Result<DecodedAsset, LoadError>;

    /// Release every cached decoded asset. Called after each file to bound
    /// peak memory across the run.
    fn unload(&mut self);
}
