//! # unxnb-core
//!
//! Core engine for unxnb: converts a game's compiled XNB content containers
//! into editable, portable file formats (PNG images, JSON/YAML data, TMX
//! tile maps, raw XML), mirroring the content folder's directory structure
//! under an export folder.
//!
//! The crate is built around a small set of seams:
//!
//! - [`ContentLoader`] decodes one binary container into a [`DecodedAsset`].
//!   Parsing the container format itself is the loader's business; this
//!   crate only consumes the decoded value.
//! - [`AssetWriter`] converts one decoded asset into one or more output
//!   files. Writers are dispatched through an ordered [`WriterRegistry`];
//!   the first writer whose predicate matches wins.
//! - [`Unpacker`] orchestrates the run: enumerate containers, decode,
//!   dispatch, fall back to a verbatim copy when anything fails, and report
//!   progress through a caller-supplied [`ProgressReporter`]. A single
//!   file's failure never aborts the run.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use unxnb_core::{ContentLoader, DecodedAsset, LoadError, NullReporter, UnpackOptions, Unpacker};
//! use std::path::Path;
//!
//! // A real loader decodes the container; this one refuses everything,
//! // which makes the unpacker mirror the raw files verbatim.
//! struct RawOnlyLoader;
//!
//! impl ContentLoader for RawOnlyLoader {
//!     fn load(&mut self, _asset_key: &str) -> Result<DecodedAsset, LoadError> {
//!         Err(LoadError::Malformed("no decoder linked into this build".into()))
//!     }
//!     fn unload(&mut self) {}
//! }
//!
//! let options = UnpackOptions::default();
//! let unpacker = Unpacker::new(&options);
//!
//! let mut loader = RawOnlyLoader;
//! let mut reporter = NullReporter;
//! let summary = unpacker.run(
//!     &mut loader,
//!     &mut reporter,
//!     Path::new("Content"),
//!     Path::new("Content (unpacked)"),
//!     None,
//! )?;
//!
//! println!("Unpacked {} files", summary.total_files);
//! # Ok::<(), unxnb_core::StartError>(())
//! ```

pub mod asset;
pub mod loader;
pub mod platform;
pub mod progress;
pub mod unpack;
pub mod writers;

pub use asset::{
    DecodedAsset, Glyph, GlyphData, Kerning, Layer, Rect, Size, SpriteFont, SurfaceFormat, Texture,
    Tile, TileMap, TileSheet, XmlSource,
};
pub use loader::{ContentLoader, LoadError};
pub use platform::Platform;
pub use progress::{NullReporter, ProgressReporter, ProgressStep, UnpackFailedReason};
pub use unpack::{AssetRecord, RunSummary, StartError, UnpackOutcome, Unpacker};
pub use writers::data::DataFormat;
pub use writers::tile_map::{MapFormat, TmxDataEncoding};
pub use writers::{AssetWriter, WriterError, WriterRegistry};

/// Version information for the core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration for an unpack run.
#[derive(Debug, Clone)]
pub struct UnpackOptions {
    /// Output format for structured-data assets (and font metadata).
    pub data_format: DataFormat,
    /// Output documents produced per tile-map asset, each independently enabled.
    pub map_formats: Vec<MapFormat>,
    /// Tile-data encoding used inside TMX documents.
    pub tmx_encoding: TmxDataEncoding,
    /// The platform whose content variant is being unpacked. Selects the
    /// sprite-font glyph extraction strategy.
    pub platform: Platform,
}

impl Default for UnpackOptions {
    fn default() -> Self {
        Self {
            data_format: DataFormat::Json,
            map_formats: vec![MapFormat::Tmx],
            tmx_encoding: TmxDataEncoding::Csv,
            platform: Platform::detect(),
        }
    }
}
