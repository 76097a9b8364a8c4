//! Writes raw XML payloads to disk verbatim.

use crate::asset::DecodedAsset;
use crate::writers::{path_with_extension, AssetWriter, WriterError};
use std::fs;
use std::path::Path;

/// Writes raw markup assets (e.g. bitmap-font descriptor sources) to disk.
/// No transformation; the payload goes out byte for byte.
pub struct XmlSourceWriter;

impl AssetWriter for XmlSourceWriter {
    fn can_write(&self, asset: &DecodedAsset) -> bool {
        matches!(asset, DecodedAsset::XmlSource(_))
    }

    fn write(
        &self,
        asset: &mut DecodedAsset,
        to_path_stem: &Path,
        _relative_path: &str,
    ) -> Result<(), WriterError> {
        let DecodedAsset::XmlSource(value) = asset else {
            return Err(WriterError::write("expected an XML source asset"));
        };

        fs::write(path_with_extension(to_path_stem, "xml"), &value.source)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::XmlSource;

    #[test]
    fn writes_payload_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let source = "<font>\n  <info face=\"SmallFont\"/>\n</font>";
        let mut asset = DecodedAsset::XmlSource(XmlSource {
            source: source.to_string(),
        });

        XmlSourceWriter
            .write(&mut asset, &dir.path().join("SmallFont"), "Fonts/SmallFont.xnb")
            .unwrap();

        let written = fs::read_to_string(dir.path().join("SmallFont.xml")).unwrap();
        assert_eq!(written, source);
    }
}
