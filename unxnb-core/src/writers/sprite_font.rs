//! Writes bitmap-font assets to disk: the glyph atlas as PNG plus a
//! structured-data file with the reconstructed glyph table.

use crate::asset::{DecodedAsset, Glyph, GlyphData, SpriteFont, Texture};
use crate::platform::Platform;
use crate::writers::{path_with_extension, texture, AssetWriter, DataFormat, WriterError};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Extracts the backing texture and glyph table from a decoded font.
///
/// The font's internal layout differs between platform content variants, so
/// extraction is a strategy selected at writer construction rather than a
/// runtime field lookup. Both implementations normalize to the same
/// [`Glyph`] table shape.
trait GlyphSource {
    fn extract_texture<'a>(&self, font: &'a SpriteFont) -> Result<&'a Texture, WriterError>;
    fn extract_glyphs(&self, font: &SpriteFont) -> Result<Vec<Glyph>, WriterError>;
}

/// The DirectX content variant exposes a ready-made glyph table.
struct TableGlyphSource;

impl GlyphSource for TableGlyphSource {
    fn extract_texture<'a>(&self, font: &'a SpriteFont) -> Result<&'a Texture, WriterError> {
        Ok(&font.texture)
    }

    fn extract_glyphs(&self, font: &SpriteFont) -> Result<Vec<Glyph>, WriterError> {
        match &font.glyphs {
            GlyphData::Table(glyphs) => Ok(glyphs.clone()),
            GlyphData::Arrays { .. } => Err(WriterError::write(
                "can't find the font's glyph table accessor in this content variant",
            )),
        }
    }
}

/// The OpenGL content variant stores three parallel arrays indexed in
/// character order: glyph bounds, cropping, and kerning triples.
struct ArrayGlyphSource;

impl GlyphSource for ArrayGlyphSource {
    fn extract_texture<'a>(&self, font: &'a SpriteFont) -> Result<&'a Texture, WriterError> {
        Ok(&font.texture)
    }

    fn extract_glyphs(&self, font: &SpriteFont) -> Result<Vec<Glyph>, WriterError> {
        let GlyphData::Arrays {
            glyph_bounds,
            cropping,
            kerning,
        } = &font.glyphs
        else {
            return Err(WriterError::write(
                "can't find the font's internal glyph arrays in this content variant",
            ));
        };

        let count = font.characters.len();
        if glyph_bounds.len() != count || cropping.len() != count || kerning.len() != count {
            return Err(WriterError::write(format!(
                "font glyph arrays are inconsistent: {count} characters but {}/{}/{} bounds/cropping/kerning entries",
                glyph_bounds.len(),
                cropping.len(),
                kerning.len()
            )));
        }

        Ok(font
            .characters
            .iter()
            .zip(glyph_bounds)
            .zip(cropping)
            .zip(kerning)
            .map(|(((&character, &bounds), &cropping), &kerning)| Glyph {
                character,
                bounds_in_texture: bounds,
                cropping,
                left_side_bearing: kerning.left_side_bearing,
                width: kerning.width,
                right_side_bearing: kerning.right_side_bearing,
                width_including_bearings: kerning.left_side_bearing
                    + kerning.width
                    + kerning.right_side_bearing,
            })
            .collect())
    }
}

/// The font metadata document written next to the atlas image.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct FontData<'a> {
    line_spacing: i32,
    spacing: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_character: Option<char>,
    characters: &'a [char],
    glyphs: &'a [Glyph],
}

/// Writes bitmap-font assets to disk.
pub struct SpriteFontWriter {
    source: Box<dyn GlyphSource>,
    data_format: DataFormat,
}

impl SpriteFontWriter {
    pub fn new(platform: Platform, data_format: DataFormat) -> Self {
        let source: Box<dyn GlyphSource> = match platform {
            Platform::Windows => Box::new(TableGlyphSource),
            Platform::Linux | Platform::Mac => Box::new(ArrayGlyphSource),
        };
        Self {
            source,
            data_format,
        }
    }
}

impl AssetWriter for SpriteFontWriter {
    fn can_write(&self, asset: &DecodedAsset) -> bool {
        matches!(asset, DecodedAsset::SpriteFont(_))
    }

    fn write(
        &self,
        asset: &mut DecodedAsset,
        to_path_stem: &Path,
        _relative_path: &str,
    ) -> Result<(), WriterError> {
        let DecodedAsset::SpriteFont(font) = asset else {
            return Err(WriterError::write("expected a sprite font asset"));
        };

        // save the atlas using the texture pixel contract
        let atlas = self.source.extract_texture(font)?;
        texture::write_png(atlas, &path_with_extension(to_path_stem, "png"))?;

        // reconstruct and save the glyph table
        let glyphs = self.source.extract_glyphs(font)?;
        let data = FontData {
            line_spacing: font.line_spacing,
            spacing: font.spacing,
            default_character: font.default_character,
            characters: &font.characters,
            glyphs: &glyphs,
        };

        let serialized = self.data_format.serialize(&data)?;
        fs::write(
            path_with_extension(to_path_stem, self.data_format.extension()),
            serialized,
        )?;
        Ok(())
    }
}
