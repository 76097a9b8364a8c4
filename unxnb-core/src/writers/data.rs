//! Writes generic mapping and sequence assets to structured text.

use crate::asset::DecodedAsset;
use crate::writers::{path_with_extension, AssetWriter, WriterError};
use anyhow::Context;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// An output format for structured data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    /// Pretty-printed JSON.
    Json,
    /// YAML.
    Yaml,
}

impl DataFormat {
    /// The conventional file extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            DataFormat::Json => "json",
            DataFormat::Yaml => "yaml",
        }
    }

    /// Serialize a value to an indentation-pretty-printed document.
    pub fn serialize<T: Serialize>(self, value: &T) -> anyhow::Result<String> {
        match self {
            DataFormat::Json => {
                serde_json::to_string_pretty(value).context("can't serialize value to JSON")
            }
            DataFormat::Yaml => serde_yaml::to_string(value).context("can't serialize value to YAML"),
        }
    }
}

/// Writes mapping and sequence assets to disk.
///
/// This is the catch-all writer: its predicate accepts any mapping or
/// sequence value, so it must be registered last or it would shadow every
/// narrower asset kind.
pub struct DataWriter {
    format: DataFormat,
}

impl DataWriter {
    pub fn new(format: DataFormat) -> Self {
        Self { format }
    }
}

impl AssetWriter for DataWriter {
    fn can_write(&self, asset: &DecodedAsset) -> bool {
        matches!(asset, DecodedAsset::Data(value) if value.is_object() || value.is_array())
    }

    fn write(
        &self,
        asset: &mut DecodedAsset,
        to_path_stem: &Path,
        _relative_path: &str,
    ) -> Result<(), WriterError> {
        let DecodedAsset::Data(value) = asset else {
            return Err(WriterError::write("expected a data asset"));
        };

        let serialized = self.format.serialize(value)?;
        fs::write(
            path_with_extension(to_path_stem, self.format.extension()),
            serialized,
        )?;
        Ok(())
    }
}
