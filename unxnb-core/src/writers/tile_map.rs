//! Writes tile-map assets to disk.
//!
//! The engine adjusts two things in memory when it loads a map, and the
//! encoder must see the authored values instead:
//!
//! 1. every layer's tile size is overwritten to the fixed render tile size;
//! 2. tilesheet image-source paths may be rewritten to an absolute or
//!    normalized form.
//!
//! Both corrections are applied under a scoped guard that snapshots the
//! load-time values and restores them on every exit path, so the shared map
//! value is bit-for-bit unchanged after the writer returns, success or
//! failure.

use crate::asset::{DecodedAsset, Size, TileMap};
use crate::writers::{path_with_extension, AssetWriter, WriterError};
use base64::Engine;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fmt;
use std::fs;
use std::io::Write as _;
use std::path::Path;

/// The authored size of a tile in the tilesheet, before the load-time
/// override (render tile size divided by the zoom factor).
const AUTHORED_TILE_SIZE: Size = Size {
    width: 16,
    height: 16,
};

/// An output document format for tile maps. Each configured format produces
/// one document per map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapFormat {
    /// A TMX map document with per-layer tile data.
    Tmx,
    /// The corrected map serialized as pretty JSON.
    Json,
}

impl MapFormat {
    pub fn extension(self) -> &'static str {
        match self {
            MapFormat::Tmx => "tmx",
            MapFormat::Json => "json",
        }
    }
}

impl fmt::Display for MapFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MapFormat::Tmx => "TMX",
            MapFormat::Json => "JSON",
        };
        write!(f, "{name}")
    }
}

/// The tile-data encoding used inside TMX layer elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TmxDataEncoding {
    /// A row/column grid of comma-separated global tile ids.
    Csv,
    /// Little-endian u32 global ids, gzip-compressed and base64-encoded.
    Base64Gzip,
}

/// Writes tile-map assets to disk.
pub struct TileMapWriter {
    formats: Vec<MapFormat>,
    tmx_encoding: TmxDataEncoding,
    /// The formats this writer has an encoder for. Requesting a format
    /// outside this set is a write error.
    encoders: Vec<MapFormat>,
}

impl TileMapWriter {
    pub fn new(formats: Vec<MapFormat>, tmx_encoding: TmxDataEncoding) -> Self {
        Self {
            formats,
            tmx_encoding,
            encoders: vec![MapFormat::Tmx, MapFormat::Json],
        }
    }

    /// Restrict the registered encoder set. Lets tests exercise the
    /// missing-encoder failure path.
    #[cfg(test)]
    fn with_encoders(mut self, encoders: Vec<MapFormat>) -> Self {
        self.encoders = encoders;
        self
    }

    fn encode_all(&self, map: &TileMap, to_path_stem: &Path) -> Result<(), WriterError> {
        for &format in &self.formats {
            if !self.encoders.contains(&format) {
                return Err(WriterError::write(format!(
                    "no encoder is registered for the {format} map format"
                )));
            }

            let document = match format {
                MapFormat::Tmx => {
                    // the TMX emitter is compact; indent before the final write
                    indent_xml(&encode_tmx(map, self.tmx_encoding)?)
                }
                MapFormat::Json => serde_json::to_string_pretty(map)
                    .map_err(|err| WriterError::write(format!("can't serialize map: {err}")))?,
            };

            fs::write(path_with_extension(to_path_stem, format.extension()), document)?;
        }
        Ok(())
    }
}

impl AssetWriter for TileMapWriter {
    fn can_write(&self, asset: &DecodedAsset) -> bool {
        matches!(asset, DecodedAsset::TileMap(_))
    }

    fn write(
        &self,
        asset: &mut DecodedAsset,
        to_path_stem: &Path,
        relative_path: &str,
    ) -> Result<(), WriterError> {
        let DecodedAsset::TileMap(map) = asset else {
            return Err(WriterError::write("expected a tile map asset"));
        };

        let guard = LoadFixupGuard::apply(map, relative_path);
        self.encode_all(guard.map(), to_path_stem)
        // guard drops here, restoring the load-time values
    }
}

/// Scoped undo of the engine's load-time map corrections.
///
/// On construction: snapshots every layer tile size and tilesheet image
/// source, then rewrites them to their authored forms. On drop: restores the
/// snapshots, whether encoding succeeded or not.
struct LoadFixupGuard<'a> {
    map: &'a mut TileMap,
    saved_tile_sizes: Vec<Size>,
    saved_image_sources: Vec<String>,
}

impl<'a> LoadFixupGuard<'a> {
    fn apply(map: &'a mut TileMap, relative_path: &str) -> Self {
        let saved_tile_sizes = map.layers.iter().map(|layer| layer.tile_size).collect();
        let saved_image_sources = map
            .tilesheets
            .iter()
            .map(|sheet| sheet.image_source.clone())
            .collect();

        for layer in &mut map.layers {
            layer.tile_size = AUTHORED_TILE_SIZE;
        }

        let map_dir = map_directory(relative_path);
        for sheet in &mut map.tilesheets {
            sheet.image_source = original_image_source(&sheet.image_source, map_dir);
        }

        Self {
            map,
            saved_tile_sizes,
            saved_image_sources,
        }
    }

    fn map(&self) -> &TileMap {
        self.map
    }
}

impl Drop for LoadFixupGuard<'_> {
    fn drop(&mut self) {
        for (layer, size) in self.map.layers.iter_mut().zip(&self.saved_tile_sizes) {
            layer.tile_size = *size;
        }
        for (sheet, source) in self
            .map
            .tilesheets
            .iter_mut()
            .zip(self.saved_image_sources.drain(..))
        {
            sheet.image_source = source;
        }
    }
}

/// The directory portion of a content-relative path, or `""` for a
/// root-level file.
fn map_directory(relative_path: &str) -> &str {
    match relative_path.rfind(['/', '\\']) {
        Some(idx) => &relative_path[..idx],
        None => "",
    }
}

/// Recompute a tilesheet's original map-folder-relative image source.
///
/// The load-time path is checked for the map's own directory as a prefix,
/// case-insensitively; a matching prefix (plus its separator) is stripped.
/// Anything else is returned unchanged.
fn original_image_source(image_source: &str, map_dir: &str) -> String {
    if !map_dir.is_empty() {
        if let Some(prefix) = image_source.get(..map_dir.len()) {
            let separator = image_source.as_bytes().get(map_dir.len());
            if prefix.eq_ignore_ascii_case(map_dir) && matches!(separator, Some(b'/') | Some(b'\\'))
            {
                return image_source[map_dir.len() + 1..].to_string();
            }
        }
    }

    image_source.to_string()
}

/// Global tile id assignment: tilesheets get contiguous id ranges in map
/// order, starting at 1; 0 means "no tile".
fn first_gids(map: &TileMap) -> Vec<u32> {
    let mut gids = Vec::with_capacity(map.tilesheets.len());
    let mut next = 1u32;
    for sheet in &map.tilesheets {
        gids.push(next);
        next += (sheet.sheet_size.width.max(0) * sheet.sheet_size.height.max(0)) as u32;
    }
    gids
}

/// Encode a map as a compact (unindented) TMX document.
fn encode_tmx(map: &TileMap, encoding: TmxDataEncoding) -> Result<String, WriterError> {
    let gids = first_gids(map);
    let sheet_gid = |tilesheet_id: &str| -> Option<u32> {
        map.tilesheets
            .iter()
            .position(|sheet| sheet.id == tilesheet_id)
            .map(|idx| gids[idx])
    };

    let map_size = map
        .layers
        .first()
        .map(|layer| layer.layer_size)
        .unwrap_or(Size::new(0, 0));
    let tile_size = map
        .layers
        .first()
        .map(|layer| layer.tile_size)
        .unwrap_or(AUTHORED_TILE_SIZE);

    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    xml.push_str(&format!(
        "<map version=\"1.4\" orientation=\"orthogonal\" renderorder=\"right-down\" width=\"{}\" height=\"{}\" tilewidth=\"{}\" tileheight=\"{}\">",
        map_size.width, map_size.height, tile_size.width, tile_size.height
    ));

    write_tmx_properties(&mut xml, &map.properties);

    for (sheet, first_gid) in map.tilesheets.iter().zip(&gids) {
        xml.push_str(&format!(
            "<tileset firstgid=\"{}\" name=\"{}\" tilewidth=\"{}\" tileheight=\"{}\" tilecount=\"{}\" columns=\"{}\" margin=\"{}\" spacing=\"{}\">",
            first_gid,
            escape_xml(&sheet.id),
            sheet.tile_size.width,
            sheet.tile_size.height,
            sheet.sheet_size.width * sheet.sheet_size.height,
            sheet.sheet_size.width,
            sheet.margin.width,
            sheet.spacing.width,
        ));
        xml.push_str(&format!(
            "<image source=\"{}\"/>",
            escape_xml(&sheet.image_source)
        ));
        write_tmx_properties(&mut xml, &sheet.properties);
        xml.push_str("</tileset>");
    }

    for layer in &map.layers {
        let visible = if layer.visible { "" } else { " visible=\"0\"" };
        xml.push_str(&format!(
            "<layer name=\"{}\" width=\"{}\" height=\"{}\"{visible}>",
            escape_xml(&layer.id),
            layer.layer_size.width,
            layer.layer_size.height,
        ));
        write_tmx_properties(&mut xml, &layer.properties);

        let mut global_ids = Vec::with_capacity(layer.tiles.len());
        for tile in &layer.tiles {
            let gid = match tile {
                Some(tile) => {
                    let base = sheet_gid(&tile.tilesheet_id).ok_or_else(|| {
                        WriterError::write(format!(
                            "layer '{}' references unknown tilesheet '{}'",
                            layer.id, tile.tilesheet_id
                        ))
                    })?;
                    base + tile.index
                }
                None => 0,
            };
            global_ids.push(gid);
        }

        match encoding {
            TmxDataEncoding::Csv => {
                xml.push_str("<data encoding=\"csv\">");
                let width = layer.layer_size.width.max(1) as usize;
                let rows: Vec<String> = global_ids
                    .chunks(width)
                    .map(|row| {
                        row.iter()
                            .map(|gid| gid.to_string())
                            .collect::<Vec<_>>()
                            .join(",")
                    })
                    .collect();
                xml.push_str(&rows.join(",\n"));
                xml.push_str("</data>");
            }
            TmxDataEncoding::Base64Gzip => {
                xml.push_str("<data encoding=\"base64\" compression=\"gzip\">");
                let mut bytes = Vec::with_capacity(global_ids.len() * 4);
                for gid in &global_ids {
                    bytes.extend_from_slice(&gid.to_le_bytes());
                }
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&bytes)?;
                let compressed = encoder.finish()?;
                xml.push_str(&base64::engine::general_purpose::STANDARD.encode(compressed));
                xml.push_str("</data>");
            }
        }

        xml.push_str("</layer>");
    }

    xml.push_str("</map>");
    Ok(xml)
}

fn write_tmx_properties(xml: &mut String, properties: &[(String, String)]) {
    if properties.is_empty() {
        return;
    }
    xml.push_str("<properties>");
    for (name, value) in properties {
        xml.push_str(&format!(
            "<property name=\"{}\" value=\"{}\"/>",
            escape_xml(name),
            escape_xml(value)
        ));
    }
    xml.push_str("</properties>");
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Re-indent a compact XML document, one element per line.
///
/// Text content is placed on its own lines at the current depth; the TMX
/// readers we care about ignore surrounding whitespace in tile data.
pub(crate) fn indent_xml(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len() * 2);
    let mut depth = 0usize;
    let mut rest = xml;

    while let Some(start) = rest.find('<') {
        let text = rest[..start].trim();
        if !text.is_empty() {
            for line in text.lines() {
                push_indented(&mut out, depth, line.trim());
            }
        }

        let Some(end) = rest[start..].find('>') else {
            break;
        };
        let tag = &rest[start..start + end + 1];

        let is_declaration = tag.starts_with("<?");
        let is_closing = tag.starts_with("</");
        let is_self_closing = tag.ends_with("/>");

        if is_closing {
            depth = depth.saturating_sub(1);
        }
        push_indented(&mut out, depth, tag);
        if !is_declaration && !is_closing && !is_self_closing {
            depth += 1;
        }

        rest = &rest[start + end + 1..];
    }

    out
}

fn push_indented(out: &mut String, depth: usize, line: &str) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push_str(line);
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{Layer, Tile, TileSheet};

    fn town_map() -> TileMap {
        let tiles = vec![
            Some(Tile {
                tilesheet_id: "outdoor".to_string(),
                index: 0,
            }),
            None,
            Some(Tile {
                tilesheet_id: "outdoor".to_string(),
                index: 5,
            }),
            Some(Tile {
                tilesheet_id: "outdoor".to_string(),
                index: 1,
            }),
        ];

        TileMap {
            id: "Town".to_string(),
            properties: vec![("Music".to_string(), "TownTheme".to_string())],
            tilesheets: vec![TileSheet {
                id: "outdoor".to_string(),
                // rewritten at load time to include the map's own folder
                image_source: "maps/town/sheet.png".to_string(),
                sheet_size: Size::new(4, 4),
                tile_size: Size::new(16, 16),
                margin: Size::new(0, 0),
                spacing: Size::new(0, 0),
                properties: vec![],
            }],
            layers: vec![Layer {
                id: "Back".to_string(),
                visible: true,
                layer_size: Size::new(2, 2),
                tile_size: Size::new(64, 64), // load-time override
                tiles,
                properties: vec![],
            }],
        }
    }

    fn write_town(
        writer: &TileMapWriter,
        map: TileMap,
        dir: &Path,
    ) -> (Result<(), WriterError>, TileMap) {
        let mut asset = DecodedAsset::TileMap(map);
        let result = writer.write(&mut asset, &dir.join("town"), "maps/town.xnb");
        let DecodedAsset::TileMap(map) = asset else {
            unreachable!()
        };
        (result, map)
    }

    #[test]
    fn image_source_is_recomputed_relative_to_map_folder() {
        assert_eq!(
            original_image_source("maps/town/sheet.png", map_directory("maps/town.xnb")),
            "town/sheet.png"
        );
    }

    #[test]
    fn image_source_prefix_match_is_case_insensitive() {
        assert_eq!(
            original_image_source("Maps\\town\\sheet.png", map_directory("maps/town.xnb")),
            "town\\sheet.png"
        );
    }

    #[test]
    fn image_source_without_matching_prefix_is_unchanged() {
        assert_eq!(
            original_image_source("tilesheets/sheet.png", map_directory("maps/town.xnb")),
            "tilesheets/sheet.png"
        );
        assert_eq!(
            original_image_source("sheet.png", map_directory("town.xnb")),
            "sheet.png"
        );
    }

    #[test]
    fn tile_sizes_are_restored_after_a_successful_write() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TileMapWriter::new(vec![MapFormat::Tmx], TmxDataEncoding::Csv);

        let (result, map) = write_town(&writer, town_map(), dir.path());
        result.unwrap();

        // the load-time override and image source must both be back
        assert_eq!(map.layers[0].tile_size, Size::new(64, 64));
        assert_eq!(map.tilesheets[0].image_source, "maps/town/sheet.png");
    }

    #[test]
    fn tile_sizes_are_restored_when_encoding_fails() {
        let dir = tempfile::tempdir().unwrap();
        let writer =
            TileMapWriter::new(vec![MapFormat::Tmx], TmxDataEncoding::Csv).with_encoders(vec![]);

        let (result, map) = write_town(&writer, town_map(), dir.path());
        let err = result.unwrap_err();
        assert!(matches!(err, WriterError::Write { .. }));

        assert_eq!(map.layers[0].tile_size, Size::new(64, 64));
        assert_eq!(map.tilesheets[0].image_source, "maps/town/sheet.png");
    }

    #[test]
    fn missing_encoder_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TileMapWriter::new(vec![MapFormat::Json], TmxDataEncoding::Csv)
            .with_encoders(vec![MapFormat::Tmx]);

        let (result, _) = write_town(&writer, town_map(), dir.path());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("no encoder is registered"));
    }

    #[test]
    fn tmx_document_uses_authored_tile_size_and_csv_grid() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TileMapWriter::new(vec![MapFormat::Tmx], TmxDataEncoding::Csv);

        let (result, _) = write_town(&writer, town_map(), dir.path());
        result.unwrap();

        let tmx = fs::read_to_string(dir.path().join("town.tmx")).unwrap();
        assert!(tmx.contains("tilewidth=\"16\""));
        assert!(tmx.contains("source=\"town/sheet.png\""));
        assert!(tmx.contains("firstgid=\"1\""));
        // gids: index 0 -> 1, empty -> 0, index 5 -> 6, index 1 -> 2
        assert!(tmx.contains("1,0"));
        assert!(tmx.contains("6,2"));
        // indented output, one element per line
        assert!(tmx.contains("\n  <layer"));
    }

    #[test]
    fn base64_gzip_layer_data_round_trips() {
        use std::io::Read;

        let xml = encode_tmx(&town_map(), TmxDataEncoding::Base64Gzip).unwrap();
        let start = xml.find("compression=\"gzip\">").unwrap() + "compression=\"gzip\">".len();
        let end = xml[start..].find("</data>").unwrap() + start;

        let compressed = base64::engine::general_purpose::STANDARD
            .decode(&xml[start..end])
            .unwrap();
        let mut decoder = flate2::read::GzDecoder::new(&compressed[..]);
        let mut bytes = Vec::new();
        decoder.read_to_end(&mut bytes).unwrap();

        let gids: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes(chunk.try_into().unwrap()))
            .collect();
        assert_eq!(gids, vec![1, 0, 6, 2]);
    }

    #[test]
    fn multiple_formats_each_produce_a_document() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TileMapWriter::new(
            vec![MapFormat::Tmx, MapFormat::Json],
            TmxDataEncoding::Csv,
        );

        let (result, _) = write_town(&writer, town_map(), dir.path());
        result.unwrap();

        assert!(dir.path().join("town.tmx").exists());
        let json = fs::read_to_string(dir.path().join("town.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        // the JSON document sees the authored values too
        assert_eq!(value["Layers"][0]["TileSize"]["Width"], 16);
        assert_eq!(value["Tilesheets"][0]["ImageSource"], "town/sheet.png");
    }

    #[test]
    fn indent_xml_nests_elements_and_keeps_text() {
        let indented = indent_xml("<?xml version=\"1.0\"?><map><layer><data>1,2</data></layer></map>");
        let expected = "<?xml version=\"1.0\"?>\n<map>\n  <layer>\n    <data>\n      1,2\n    </data>\n  </layer>\n</map>\n";
        assert_eq!(indented, expected);
    }
}
