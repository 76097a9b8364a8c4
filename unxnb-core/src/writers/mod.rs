//! Asset writers and the ordered dispatch registry.

pub mod data;
pub mod sprite_font;
pub mod texture;
pub mod tile_map;
pub mod xml_source;

use crate::asset::DecodedAsset;
use crate::UnpackOptions;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use data::{DataFormat, DataWriter};
pub use sprite_font::SpriteFontWriter;
pub use texture::TextureWriter;
pub use tile_map::TileMapWriter;
pub use xml_source::XmlSourceWriter;

/// An error converting a matched asset to its output files.
#[derive(Debug, Error)]
pub enum WriterError {
    /// An expected, conversion-specific fault (e.g. a platform-variant
    /// field could not be located). Reported as a write error.
    #[error("{reason}")]
    Write { reason: String },

    /// A filesystem fault while writing output. Reported as a write error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Any other unexpected fault. Reported as an unknown error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WriterError {
    /// Shorthand for [`WriterError::Write`].
    pub fn write(reason: impl Into<String>) -> Self {
        WriterError::Write {
            reason: reason.into(),
        }
    }
}

/// Converts one kind of decoded asset into one or more output files.
pub trait AssetWriter {
    /// Whether the writer can handle a given asset.
    fn can_write(&self, asset: &DecodedAsset) -> bool;

    /// Convert the asset to disk.
    ///
    /// `to_path_stem` is the absolute output path without a file extension;
    /// the writer appends format-appropriate extensions. `relative_path` is
    /// the container's path within the content folder, with its original
    /// extension.
    ///
    /// The asset is borrowed mutably so writers can apply scoped
    /// mutate-then-restore corrections (the tile-map writer does); any
    /// mutation must be undone before returning, on every path.
    fn write(
        &self,
        asset: &mut DecodedAsset,
        to_path_stem: &Path,
        relative_path: &str,
    ) -> Result<(), WriterError>;
}

/// An explicit, caller-constructed ordered list of writers.
///
/// Dispatch picks the first writer whose predicate matches, so registration
/// order is a correctness invariant: narrow, cheap-to-test writers come
/// before broad ones, and the generic data writer comes last since it would
/// otherwise shadow every mapping- or sequence-shaped asset.
pub struct WriterRegistry {
    writers: Vec<Box<dyn AssetWriter>>,
}

impl WriterRegistry {
    /// Build a registry from an explicit ordered writer list.
    pub fn new(writers: Vec<Box<dyn AssetWriter>>) -> Self {
        Self { writers }
    }

    /// The standard writer set in its required order.
    pub fn standard(options: &UnpackOptions) -> Self {
        Self::new(vec![
            Box::new(TileMapWriter::new(
                options.map_formats.clone(),
                options.tmx_encoding,
            )),
            Box::new(SpriteFontWriter::new(options.platform, options.data_format)),
            Box::new(TextureWriter),
            Box::new(XmlSourceWriter),
            // checked last: its predicate accepts any mapping or sequence
            Box::new(DataWriter::new(options.data_format)),
        ])
    }

    /// Find the first writer whose predicate accepts the asset, in
    /// registration order.
    pub fn dispatch(&self, asset: &DecodedAsset) -> Option<&dyn AssetWriter> {
        self.writers
            .iter()
            .find(|writer| writer.can_write(asset))
            .map(|writer| writer.as_ref())
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }
}

/// Append `.{extension}` to a path stem without touching any dots already in
/// the file name.
pub(crate) fn path_with_extension(stem: &Path, extension: &str) -> PathBuf {
    let mut raw = OsString::from(stem.as_os_str());
    raw.push(".");
    raw.push(extension);
    PathBuf::from(raw)
}
