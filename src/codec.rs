//! PNG loading and saving
//!
//! Direct-color images go through `image`. Indexed images requested with a
//! palette are read with the `png` crate so the raw indices survive.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use log::{debug, warn};

use crate::error::{Result, TextureError};
use crate::rasterizer::{Color, Texture};

/// Options for [`Texture::load`] and [`Texture::from_png_bytes`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Keep the palette of indexed PNGs instead of expanding to RGBA
    pub palette: bool,
}

impl Texture {
    /// Load a texture from a PNG file
    pub fn load<P: AsRef<Path>>(path: P, options: LoadOptions) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let tex = Self::from_png_bytes(&bytes, options)?;
        debug!(
            "loaded texture {} ({}x{}, palette: {})",
            path.display(),
            tex.width()?,
            tex.height()?,
            tex.has_palette()?
        );
        Ok(tex)
    }

    /// Decode PNG bytes
    pub fn from_png_bytes(bytes: &[u8], options: LoadOptions) -> Result<Self> {
        if options.palette {
            if let Some(tex) = decode_indexed(bytes)? {
                return Ok(tex);
            }
        }

        let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        let pixels: Vec<Color> = rgba
            .pixels()
            .map(|p| Color::with_alpha(p[0], p[1], p[2], p[3]))
            .collect();

        Self::from_pixels(width as usize, height as usize, pixels)
    }

    /// Encode as an 8-bit RGBA PNG
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let (width, height) = self.size()?;
        let raw: Vec<u8> = self.pixels()?.iter().flat_map(|c| c.to_bytes()).collect();
        let len = raw.len();
        let img = image::RgbaImage::from_raw(width as u32, height as u32, raw).ok_or(
            TextureError::InvalidDataSize {
                expected: width * height * 4,
                actual: len,
            },
        )?;
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)?;
        Ok(out)
    }

    /// Save as an 8-bit RGBA PNG file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_png_bytes()?;
        fs::write(path, bytes)?;
        debug!("saved texture {}", path.display());
        Ok(())
    }
}

/// Decode an indexed PNG keeping its indices. `None` if the image is not indexed.
fn decode_indexed(bytes: &[u8]) -> Result<Option<Texture>> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::IDENTITY);
    let mut reader = decoder.read_info()?;

    let info = reader.info();
    if info.color_type != png::ColorType::Indexed {
        return Ok(None);
    }
    let depth = info.bit_depth as usize;
    let plte = info.palette.as_ref().map(|p| p.to_vec()).unwrap_or_default();
    let trns = info.trns.as_ref().map(|t| t.to_vec()).unwrap_or_default();

    let palette: Vec<Color> = plte
        .chunks_exact(3)
        .enumerate()
        .map(|(i, rgb)| Color::with_alpha(rgb[0], rgb[1], rgb[2], trns.get(i).copied().unwrap_or(255)))
        .collect();

    let mut buf = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut buf)?;
    let (width, height) = (frame.width as usize, frame.height as usize);

    let per_byte = 8 / depth;
    let mask = ((1u16 << depth) - 1) as u8;
    let mut indices = Vec::with_capacity(width * height);
    for row in buf.chunks(frame.line_size).take(height) {
        for x in 0..width {
            let byte = row[x / per_byte];
            let shift = 8 - depth * (x % per_byte + 1);
            indices.push((byte >> shift) & mask);
        }
    }

    if let Some(&max) = indices.iter().max() {
        if max as usize >= palette.len() {
            warn!(
                "palette index {} out of range for {} palette entries, treating as transparent",
                max,
                palette.len()
            );
        }
    }

    Texture::from_indexed(width, height, indices, palette).map(Some)
}
