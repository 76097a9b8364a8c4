//! The decoded asset model.
//!
//! A [`ContentLoader`](crate::ContentLoader) turns one binary container into
//! one [`DecodedAsset`]. The enum is a closed set: one variant per supported
//! asset kind, plus a catch-all for kinds nothing here knows how to convert.
//! Writers match on the variant tag, so there is no open-ended type testing
//! anywhere in the dispatch path.

use serde::Serialize;

/// A decoded in-memory asset value, produced by the content loader.
#[derive(Debug, Clone)]
pub enum DecodedAsset {
    /// A 2D pixel buffer.
    Texture(Texture),
    /// A bitmap font: glyph atlas texture plus per-character metrics.
    SpriteFont(SpriteFont),
    /// A tile map: layered tile grids plus tilesheet references.
    TileMap(TileMap),
    /// A generic mapping or sequence value.
    Data(serde_json::Value),
    /// A raw XML payload embedded in the container (e.g. a bitmap font
    /// descriptor source).
    XmlSource(XmlSource),
    /// An asset kind with no converter. Carries the loader-reported type
    /// name for error messages.
    Other { type_name: String },
}

impl DecodedAsset {
    /// A short human-readable name for the asset's type, used in progress
    /// and error messages.
    pub fn type_name(&self) -> &str {
        match self {
            DecodedAsset::Texture(_) => "Texture2D",
            DecodedAsset::SpriteFont(_) => "SpriteFont",
            DecodedAsset::TileMap(_) => "Map",
            DecodedAsset::Data(_) => "Data",
            DecodedAsset::XmlSource(_) => "XmlSource",
            DecodedAsset::Other { type_name } => type_name,
        }
    }
}

/// How a texture's pixel data is encoded in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceFormat {
    /// 8-bit RGBA, alpha-premultiplied by the content build step.
    Rgba8,
    /// Block-compressed BC2. Can't be handed to the image encoder directly;
    /// must be decompressed first.
    Dxt3,
}

/// A decoded 2D texture.
#[derive(Debug, Clone)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub format: SurfaceFormat,
    /// Raw pixel data in `format` layout.
    pub data: Vec<u8>,
}

impl Texture {
    /// Create an RGBA8 texture from raw premultiplied pixel data.
    pub fn rgba8(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format: SurfaceFormat::Rgba8,
            data,
        }
    }
}

/// An integer rectangle in texture space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// An integer width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Horizontal layout metrics for one glyph: the space before the glyph, the
/// glyph's own width, and the space after it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Kerning {
    pub left_side_bearing: f32,
    pub width: f32,
    pub right_side_bearing: f32,
}

/// One normalized glyph table entry. Both platform-variant extraction paths
/// produce this shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Glyph {
    pub character: char,
    /// Where the glyph's pixels live in the atlas texture.
    pub bounds_in_texture: Rect,
    /// Padding applied when the glyph is rendered.
    pub cropping: Rect,
    pub left_side_bearing: f32,
    pub width: f32,
    pub right_side_bearing: f32,
    /// `left_side_bearing + width + right_side_bearing`.
    pub width_including_bearings: f32,
}

/// The glyph metrics as they appear inside the decoded font, which differs
/// between platform content variants.
#[derive(Debug, Clone)]
pub enum GlyphData {
    /// Three parallel arrays indexed in character order (the layout used by
    /// the OpenGL content variant).
    Arrays {
        glyph_bounds: Vec<Rect>,
        cropping: Vec<Rect>,
        kerning: Vec<Kerning>,
    },
    /// A ready-made glyph table (the layout exposed by the DirectX variant's
    /// glyph accessor).
    Table(Vec<Glyph>),
}

/// A decoded bitmap font.
#[derive(Debug, Clone)]
pub struct SpriteFont {
    /// The backing glyph atlas.
    pub texture: Texture,
    pub line_spacing: i32,
    pub spacing: f32,
    pub default_character: Option<char>,
    /// The characters the font supports, in glyph order.
    pub characters: Vec<char>,
    pub glyphs: GlyphData,
}

/// One tile reference in a layer grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tile {
    /// Id of the tilesheet the tile comes from.
    pub tilesheet_id: String,
    /// Zero-based tile index within that sheet.
    pub index: u32,
}

/// One layer of a tile map.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Layer {
    pub id: String,
    pub visible: bool,
    /// Layer dimensions, in tiles.
    pub layer_size: Size,
    /// Tile dimensions, in pixels. The engine overwrites this at load time
    /// to match its render tile size; the map writer restores the authored
    /// value around encoding.
    pub tile_size: Size,
    /// Row-major grid of `layer_size.width * layer_size.height` tiles.
    pub tiles: Vec<Option<Tile>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<(String, String)>,
}

/// A tilesheet referenced by a map.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TileSheet {
    pub id: String,
    /// Path to the sheet image. May have been rewritten to an absolute or
    /// normalized form at load time; the map writer recomputes the original
    /// map-folder-relative form before encoding.
    pub image_source: String,
    /// Sheet dimensions, in tiles.
    pub sheet_size: Size,
    /// Tile dimensions, in pixels.
    pub tile_size: Size,
    pub margin: Size,
    pub spacing: Size,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<(String, String)>,
}

/// A decoded tile map.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TileMap {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<(String, String)>,
    pub tilesheets: Vec<TileSheet>,
    pub layers: Vec<Layer>,
}

/// A raw XML payload.
#[derive(Debug, Clone)]
pub struct XmlSource {
    pub source: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_match_variants() {
        assert_eq!(
            DecodedAsset::Texture(Texture::rgba8(1, 1, vec![0; 4])).type_name(),
            "Texture2D"
        );
        assert_eq!(
            DecodedAsset::Data(serde_json::json!({})).type_name(),
            "Data"
        );
        assert_eq!(
            DecodedAsset::Other {
                type_name: "Effect".to_string()
            }
            .type_name(),
            "Effect"
        );
    }

    #[test]
    fn rect_serializes_pascal_case() {
        let json = serde_json::to_value(Rect::new(1, 2, 3, 4)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"X": 1, "Y": 2, "Width": 3, "Height": 4})
        );
    }
}
