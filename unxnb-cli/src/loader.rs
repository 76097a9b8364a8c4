//! The loader shipped with the standalone binary.

use unxnb_core::{ContentLoader, DecodedAsset, LoadError};

/// A loader with no container decoder behind it.
///
/// Every file decodes to an unrecognized kind, so the unpacker exports a
/// verbatim copy of each container and the run produces a raw mirror of the
/// content folder. Embedders that link a real decoder replace this through
/// the [`ContentLoader`] seam.
pub struct PassthroughLoader;

impl ContentLoader for PassthroughLoader {
    fn load(&mut self, _asset_key: &str) -> Result<DecodedAsset, LoadError> {
        Ok(DecodedAsset::Other {
            type_name: "binary container".to_string(),
        })
    }

    fn unload(&mut self) {}
}
