//! Writes texture assets to disk as PNG.

use crate::asset::{DecodedAsset, SurfaceFormat, Texture};
use crate::writers::{path_with_extension, AssetWriter, WriterError};
use image::{ImageBuffer, Rgba};
use std::path::Path;
use tracing::debug;

/// Writes 2D pixel-buffer assets to disk.
pub struct TextureWriter;

impl AssetWriter for TextureWriter {
    fn can_write(&self, asset: &DecodedAsset) -> bool {
        matches!(asset, DecodedAsset::Texture(_))
    }

    fn write(
        &self,
        asset: &mut DecodedAsset,
        to_path_stem: &Path,
        _relative_path: &str,
    ) -> Result<(), WriterError> {
        let DecodedAsset::Texture(texture) = asset else {
            return Err(WriterError::write("expected a texture asset"));
        };

        write_png(texture, &path_with_extension(to_path_stem, "png"))
    }
}

/// Encode a texture to a lossless PNG, reversing the alpha premultiplication
/// applied by the content build step.
pub(crate) fn write_png(texture: &Texture, to_path: &Path) -> Result<(), WriterError> {
    let mut pixels = decode_pixels(texture)?;
    unpremultiply(&mut pixels);

    let image =
        ImageBuffer::<Rgba<u8>, _>::from_raw(texture.width, texture.height, pixels).ok_or_else(
            || {
                WriterError::write(format!(
                    "pixel buffer doesn't match the {}x{} texture dimensions",
                    texture.width, texture.height
                ))
            },
        )?;

    image
        .save_with_format(to_path, image::ImageFormat::Png)
        .map_err(|err| WriterError::write(format!("can't encode PNG: {err}")))?;

    debug!("wrote texture to {}", to_path.display());
    Ok(())
}

/// Get the texture's pixels as straight RGBA8 rows.
///
/// DXT3 surfaces can't be handed to the PNG encoder directly, so they take a
/// detour through a BC2 block decode first; the pixel contract afterwards is
/// the same as for uncompressed surfaces.
fn decode_pixels(texture: &Texture) -> Result<Vec<u8>, WriterError> {
    match texture.format {
        SurfaceFormat::Rgba8 => {
            let expected = texture.width as usize * texture.height as usize * 4;
            if texture.data.len() != expected {
                return Err(WriterError::write(format!(
                    "texture has {} bytes of pixel data, expected {}",
                    texture.data.len(),
                    expected
                )));
            }
            Ok(texture.data.clone())
        }
        SurfaceFormat::Dxt3 => decode_bc2(&texture.data, texture.width, texture.height),
    }
}

/// Decompress BC2 (DXT3) block data to RGBA8.
fn decode_bc2(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, WriterError> {
    const BLOCK_SIZE: usize = 16;

    if width == 0 || height == 0 {
        return Ok(Vec::new());
    }

    let blocks_x = ((width + 3) / 4) as usize;
    let blocks_y = ((height + 3) / 4) as usize;
    let required_len = blocks_x * blocks_y * BLOCK_SIZE;

    if data.len() < required_len {
        return Err(WriterError::write(format!(
            "compressed texture data is too small: expected at least {} bytes, found {}",
            required_len,
            data.len()
        )));
    }

    let mut rgba = vec![0u8; width as usize * height as usize * 4];
    let mut block_rgba = [0u8; 4 * 4 * 4];
    let row_pitch = width as usize * 4;

    for block_y in 0..blocks_y {
        for block_x in 0..blocks_x {
            let offset = (block_y * blocks_x + block_x) * BLOCK_SIZE;
            let block = &data[offset..offset + BLOCK_SIZE];
            block_rgba.fill(0);
            bcdec_rs::bc2(block, &mut block_rgba, 4 * 4);

            for row in 0..4 {
                let dest_y = block_y * 4 + row;
                if dest_y >= height as usize {
                    continue;
                }

                let dest_x = block_x * 4;
                let copy_pixels = (width as usize - dest_x).min(4);
                let src = &block_rgba[row * 16..row * 16 + copy_pixels * 4];
                let dest_start = dest_y * row_pitch + dest_x * 4;
                rgba[dest_start..dest_start + copy_pixels * 4].copy_from_slice(src);
            }
        }
    }

    Ok(rgba)
}

/// Reverse alpha premultiplication in place.
///
/// For every pixel with non-zero alpha, each color channel becomes
/// `round(C * 255 / A)` clamped to a byte. Fully transparent pixels are left
/// untouched since their color is meaningless.
pub(crate) fn unpremultiply(pixels: &mut [u8]) {
    for pixel in pixels.chunks_exact_mut(4) {
        let alpha = pixel[3] as u32;
        if alpha == 0 {
            continue;
        }
        for channel in &mut pixel[..3] {
            let scaled = (*channel as u32 * 255 + alpha / 2) / alpha;
            *channel = scaled.min(255) as u8;
        }
    }
}
