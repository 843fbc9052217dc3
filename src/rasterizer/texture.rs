//! Texture storage
//!
//! A texture is a fixed-size row-major RGBA buffer. Paletted textures keep
//! their per-pixel indices as the source of truth and re-derive the RGBA
//! buffer after every palette or hue change.

use log::debug;

use super::types::Color;
use crate::error::{Result, TextureError};

#[derive(Debug, Clone)]
pub(crate) enum Storage {
    Direct(Vec<Color>),
    Indexed {
        indices: Vec<u8>,
        palette: Vec<Color>,
        /// Derived from `palette[indices[i]]`, never written directly
        pixels: Vec<Color>,
    },
}

impl Storage {
    fn pixels(&self) -> &[Color] {
        match self {
            Storage::Direct(pixels) => pixels,
            Storage::Indexed { pixels, .. } => pixels,
        }
    }

    fn resync(&mut self) {
        if let Storage::Indexed { indices, palette, pixels } = self {
            for (px, &idx) in pixels.iter_mut().zip(indices.iter()) {
                *px = palette.get(idx as usize).copied().unwrap_or(Color::TRANSPARENT);
            }
        }
    }
}

/// Read-only pixel view used as a blit source
#[derive(Clone, Copy)]
pub(crate) struct Source<'a> {
    pub pixels: &'a [Color],
    pub width: usize,
    pub height: usize,
}

/// Writable pixel view of a non-paletted texture
pub(crate) struct Canvas<'a> {
    pub pixels: &'a mut [Color],
    pub width: usize,
    pub height: usize,
}

/// Mutable 2D raster canvas
#[derive(Debug, Clone)]
pub struct Texture {
    width: usize,
    height: usize,
    /// `None` once disposed
    storage: Option<Storage>,
}

/// Clip a rect against a `width` x `height` area.
/// A negative origin shrinks the extent. Returns `None` if nothing is left.
///
/// Takes `i64` so callers can pass sums of extreme `i32` coordinates.
pub(crate) fn clip_rect(
    width: usize,
    height: usize,
    mut x: i64,
    mut y: i64,
    mut w: i64,
    mut h: i64,
) -> Option<(i32, i32, i32, i32)> {
    let (tw, th) = (width as i64, height as i64);
    if x < 0 {
        w += x;
        x = 0;
    }
    if y < 0 {
        h += y;
        y = 0;
    }
    if tw <= x || th <= y {
        return None;
    }
    w = w.min(tw - x);
    h = h.min(th - y);
    if w <= 0 || h <= 0 {
        return None;
    }
    Some((x as i32, y as i32, w as i32, h as i32))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    R,
    G,
    B,
    A,
}

fn parse_format(format: &str) -> Result<Vec<Channel>> {
    format
        .chars()
        .map(|c| match c {
            'r' => Ok(Channel::R),
            'g' => Ok(Channel::G),
            'b' => Ok(Channel::B),
            'a' => Ok(Channel::A),
            other => Err(TextureError::InvalidFormat(other)),
        })
        .collect()
}

impl Texture {
    /// Create a fully transparent texture
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(TextureError::InvalidSize { width, height });
        }
        Ok(Self {
            width,
            height,
            storage: Some(Storage::Direct(vec![Color::TRANSPARENT; width * height])),
        })
    }

    /// Create a texture from row-major pixels
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<Color>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(TextureError::InvalidSize { width, height });
        }
        if pixels.len() != width * height {
            return Err(TextureError::InvalidDataSize {
                expected: width * height,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            storage: Some(Storage::Direct(pixels)),
        })
    }

    /// Create a paletted texture from per-pixel palette indices
    pub fn from_indexed(
        width: usize,
        height: usize,
        indices: Vec<u8>,
        palette: Vec<Color>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(TextureError::InvalidSize { width, height });
        }
        if indices.len() != width * height {
            return Err(TextureError::InvalidDataSize {
                expected: width * height,
                actual: indices.len(),
            });
        }
        let mut storage = Storage::Indexed {
            pixels: vec![Color::TRANSPARENT; indices.len()],
            indices,
            palette,
        };
        storage.resync();
        Ok(Self {
            width,
            height,
            storage: Some(storage),
        })
    }

    /// Create a checkerboard test texture with `cell`-sized squares
    pub fn checkerboard(
        width: usize,
        height: usize,
        cell: usize,
        color1: Color,
        color2: Color,
    ) -> Result<Self> {
        let cell = cell.max(1);
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let checker = ((x / cell) + (y / cell)) % 2 == 0;
                pixels.push(if checker { color1 } else { color2 });
            }
        }
        Self::from_pixels(width, height, pixels)
    }

    pub(crate) fn storage(&self) -> Result<&Storage> {
        self.storage.as_ref().ok_or(TextureError::Disposed)
    }

    pub(crate) fn source(&self) -> Result<Source<'_>> {
        let storage = self.storage()?;
        Ok(Source {
            pixels: storage.pixels(),
            width: self.width,
            height: self.height,
        })
    }

    /// Writable view; fails on disposed or paletted textures
    pub(crate) fn canvas(&mut self) -> Result<Canvas<'_>> {
        match self.storage.as_mut() {
            None => Err(TextureError::Disposed),
            Some(Storage::Indexed { .. }) => Err(TextureError::PaletteLocked),
            Some(Storage::Direct(pixels)) => Ok(Canvas {
                pixels,
                width: self.width,
                height: self.height,
            }),
        }
    }

    pub fn width(&self) -> Result<usize> {
        self.storage()?;
        Ok(self.width)
    }

    pub fn height(&self) -> Result<usize> {
        self.storage()?;
        Ok(self.height)
    }

    pub fn size(&self) -> Result<(usize, usize)> {
        self.storage()?;
        Ok((self.width, self.height))
    }

    pub fn is_disposed(&self) -> bool {
        self.storage.is_none()
    }

    /// Release the pixel buffers. Every later access fails with `Disposed`.
    pub fn dispose(&mut self) {
        if self.storage.take().is_some() {
            debug!("disposed {}x{} texture", self.width, self.height);
        }
    }

    pub fn has_palette(&self) -> Result<bool> {
        Ok(matches!(self.storage()?, Storage::Indexed { .. }))
    }

    /// Row-major pixels (derived pixels for paletted textures)
    pub fn pixels(&self) -> Result<&[Color]> {
        Ok(self.storage()?.pixels())
    }

    pub fn get_pixel(&self, x: i32, y: i32) -> Result<Color> {
        let src = self.source()?;
        if x < 0 || src.width as i32 <= x || y < 0 || src.height as i32 <= y {
            return Err(TextureError::OutOfRange { x, y });
        }
        Ok(src.pixels[x as usize + y as usize * src.width])
    }

    /// Overwrite a pixel. Out-of-bounds coordinates are ignored.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) -> Result<()> {
        let canvas = self.canvas()?;
        if x < 0 || canvas.width as i32 <= x || y < 0 || canvas.height as i32 <= y {
            return Ok(());
        }
        canvas.pixels[x as usize + y as usize * canvas.width] = color;
        Ok(())
    }

    pub fn fill(&mut self, color: Color) -> Result<()> {
        self.canvas()?.pixels.fill(color);
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.fill(Color::TRANSPARENT)
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) -> Result<()> {
        let canvas = self.canvas()?;
        let Some((x, y, w, h)) =
            clip_rect(canvas.width, canvas.height, x.into(), y.into(), w.into(), h.into())
        else {
            return Ok(());
        };
        for row in y..y + h {
            let start = x as usize + row as usize * canvas.width;
            canvas.pixels[start..start + w as usize].fill(color);
        }
        Ok(())
    }

    /// Serialize pixels as one byte per format character per pixel
    pub fn dump(&self, format: &str) -> Result<Vec<u8>> {
        let channels = parse_format(format)?;
        let pixels = self.pixels()?;
        let mut out = Vec::with_capacity(pixels.len() * channels.len());
        for px in pixels {
            for ch in &channels {
                out.push(match ch {
                    Channel::R => px.r,
                    Channel::G => px.g,
                    Channel::B => px.b,
                    Channel::A => px.a,
                });
            }
        }
        Ok(out)
    }

    /// Inverse of [`Texture::dump`]. Channels missing from `format` keep
    /// their current values.
    pub fn undump(&mut self, data: &[u8], format: &str) -> Result<()> {
        let channels = parse_format(format)?;
        let canvas = self.canvas()?;
        let expected = canvas.pixels.len() * channels.len();
        if data.len() != expected {
            return Err(TextureError::InvalidDataSize {
                expected,
                actual: data.len(),
            });
        }
        if channels.is_empty() {
            return Ok(());
        }
        for (px, chunk) in canvas.pixels.iter_mut().zip(data.chunks_exact(channels.len())) {
            for (ch, &byte) in channels.iter().zip(chunk) {
                match ch {
                    Channel::R => px.r = byte,
                    Channel::G => px.g = byte,
                    Channel::B => px.b = byte,
                    Channel::A => px.a = byte,
                }
            }
        }
        Ok(())
    }

    /// The palette of a paletted texture, `None` otherwise
    pub fn palette(&self) -> Result<Option<&[Color]>> {
        Ok(match self.storage()? {
            Storage::Indexed { palette, .. } => Some(palette.as_slice()),
            Storage::Direct(_) => None,
        })
    }

    /// Palette indices of a paletted texture, `None` otherwise
    pub fn indices(&self) -> Result<Option<&[u8]>> {
        Ok(match self.storage()? {
            Storage::Indexed { indices, .. } => Some(indices.as_slice()),
            Storage::Direct(_) => None,
        })
    }

    pub fn change_palette(&self, colors: &[Color]) -> Result<Texture> {
        let mut copy = self.clone();
        copy.change_palette_in_place(colors)?;
        Ok(copy)
    }

    /// Replace palette entries in order. Entries past the end of `colors`
    /// become transparent black; extra colors are ignored.
    pub fn change_palette_in_place(&mut self, colors: &[Color]) -> Result<()> {
        let storage = self.storage.as_mut().ok_or(TextureError::Disposed)?;
        let Storage::Indexed { palette, .. } = storage else {
            return Err(TextureError::NoPalette);
        };
        for (i, entry) in palette.iter_mut().enumerate() {
            *entry = colors.get(i).copied().unwrap_or(Color::TRANSPARENT);
        }
        storage.resync();
        Ok(())
    }

    pub fn change_hue(&self, angle: f64) -> Result<Texture> {
        let mut copy = self.clone();
        copy.change_hue_in_place(angle)?;
        Ok(copy)
    }

    /// Rotate every pixel's hue (or every palette entry's) by `angle` radians.
    ///
    /// Integer truncation makes `change_hue(t)` followed by `change_hue(-t)`
    /// lossy by up to a couple of units per channel.
    pub fn change_hue_in_place(&mut self, angle: f64) -> Result<()> {
        let storage = self.storage.as_mut().ok_or(TextureError::Disposed)?;
        if angle == 0.0 {
            return Ok(());
        }
        match storage {
            Storage::Direct(pixels) => {
                for px in pixels.iter_mut() {
                    *px = px.rotate_hue(angle);
                }
            }
            Storage::Indexed { palette, .. } => {
                for entry in palette.iter_mut() {
                    *entry = entry.rotate_hue(angle);
                }
                storage.resync();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn gradient(width: usize, height: usize) -> Texture {
        let mut pixels = Vec::with_capacity(width * height);
        for i in 0..width * height {
            let v = (i * 37) as u8;
            pixels.push(Color::with_alpha(v, v.wrapping_mul(3), 255 - v, v ^ 0x5a));
        }
        Texture::from_pixels(width, height, pixels).unwrap()
    }

    fn paletted() -> Texture {
        let palette = vec![Color::RED, Color::GREEN, Color::with_alpha(10, 20, 30, 0)];
        Texture::from_indexed(3, 2, vec![0, 1, 2, 2, 1, 0], palette).unwrap()
    }

    #[test]
    fn test_new() {
        let tex = Texture::new(123, 456).unwrap();
        assert_eq!(tex.width().unwrap(), 123);
        assert_eq!(tex.height().unwrap(), 456);
        assert_eq!(tex.size().unwrap(), (123, 456));
        assert_eq!(tex.get_pixel(5, 5).unwrap(), Color::TRANSPARENT);
        assert!(matches!(Texture::new(0, 4), Err(TextureError::InvalidSize { .. })));
        assert!(matches!(Texture::new(4, 0), Err(TextureError::InvalidSize { .. })));
    }

    #[test]
    fn test_disposed_accessors_fail() {
        let mut tex = Texture::new(4, 4).unwrap();
        tex.dispose();
        assert!(tex.is_disposed());
        assert!(matches!(tex.width(), Err(TextureError::Disposed)));
        assert!(matches!(tex.size(), Err(TextureError::Disposed)));
        assert!(matches!(tex.get_pixel(0, 0), Err(TextureError::Disposed)));
        assert!(matches!(tex.fill(Color::RED), Err(TextureError::Disposed)));
        assert!(matches!(tex.dump("rgba"), Err(TextureError::Disposed)));
        assert!(matches!(tex.change_hue(1.0), Err(TextureError::Disposed)));
        // a second dispose is harmless
        tex.dispose();
    }

    #[test]
    fn test_get_and_set_pixel() {
        let mut tex = Texture::new(3, 3).unwrap();
        tex.set_pixel(1, 2, Color::BLUE).unwrap();
        assert_eq!(tex.get_pixel(1, 2).unwrap(), Color::BLUE);
        tex.set_pixel(-1, 0, Color::RED).unwrap();
        tex.set_pixel(3, 0, Color::RED).unwrap();
        assert!(tex.pixels().unwrap().iter().all(|c| *c != Color::RED));
        assert!(matches!(tex.get_pixel(3, 0), Err(TextureError::OutOfRange { x: 3, y: 0 })));
        assert!(tex.get_pixel(0, -1).is_err());
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut tex = Texture::new(4, 4).unwrap();
        tex.fill_rect(-1, -1, 3, 3, Color::RED).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                let expected = if x < 2 && y < 2 { Color::RED } else { Color::TRANSPARENT };
                assert_eq!(tex.get_pixel(x, y).unwrap(), expected);
            }
        }
        tex.fill_rect(3, 3, 100, 100, Color::BLUE).unwrap();
        assert_eq!(tex.get_pixel(3, 3).unwrap(), Color::BLUE);
        tex.fill_rect(4, 0, 2, 2, Color::GREEN).unwrap();
        tex.fill_rect(0, 0, 0, 2, Color::GREEN).unwrap();
        assert!(tex.pixels().unwrap().iter().all(|c| *c != Color::GREEN));
    }

    #[test]
    fn test_clip_rect() {
        assert_eq!(clip_rect(10, 10, -2, 3, 5, 20), Some((0, 3, 3, 7)));
        assert_eq!(clip_rect(10, 10, 10, 0, 5, 5), None);
        assert_eq!(clip_rect(10, 10, -5, 0, 5, 5), None);
    }

    #[test]
    fn test_clip_rect_extreme_coordinates() {
        let (min, max) = (i32::MIN as i64, i32::MAX as i64);
        assert_eq!(clip_rect(10, 10, min, 0, max, 5), None);
        assert_eq!(clip_rect(10, 10, -5, -5, max, max), Some((0, 0, 10, 10)));
        assert_eq!(clip_rect(10, 10, max, max, max, max), None);
        assert_eq!(clip_rect(10, 10, 3, 4, min, 5), None);

        let mut tex = Texture::new(4, 4).unwrap();
        tex.fill_rect(i32::MIN, i32::MIN, i32::MAX, i32::MAX, Color::RED).unwrap();
        assert!(tex.pixels().unwrap().iter().all(|c| *c == Color::TRANSPARENT));
        tex.fill_rect(-1, 2, i32::MAX, i32::MAX, Color::RED).unwrap();
        assert_eq!(tex.get_pixel(0, 1).unwrap(), Color::TRANSPARENT);
        assert_eq!(tex.get_pixel(3, 3).unwrap(), Color::RED);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut a = Texture::new(2, 2).unwrap();
        a.fill(Color::RED).unwrap();
        let b = a.clone();
        a.fill(Color::BLUE).unwrap();
        assert_eq!(b.get_pixel(0, 0).unwrap(), Color::RED);

        let p = paletted();
        let mut q = p.clone();
        q.change_palette_in_place(&[Color::WHITE]).unwrap();
        assert_eq!(p.palette().unwrap().unwrap()[0], Color::RED);
    }

    #[test]
    fn test_dump() {
        let mut tex = Texture::new(2, 1).unwrap();
        tex.set_pixel(0, 0, Color::with_alpha(1, 2, 3, 4)).unwrap();
        tex.set_pixel(1, 0, Color::with_alpha(5, 6, 7, 8)).unwrap();
        assert_eq!(tex.dump("rgba").unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(tex.dump("ag").unwrap(), vec![4, 2, 8, 6]);
        assert_eq!(tex.dump("").unwrap(), Vec::<u8>::new());
        assert!(matches!(tex.dump("rgbx"), Err(TextureError::InvalidFormat('x'))));
    }

    #[test]
    fn test_dump_undump_roundtrip() {
        let orig = gradient(7, 5);
        for format in ["rgba", "argb", "bgr", "a", "gbar", ""] {
            let mut tex = orig.clone();
            let data = tex.dump(format).unwrap();
            tex.undump(&data, format).unwrap();
            assert_eq!(tex.pixels().unwrap(), orig.pixels().unwrap(), "format {format}");
        }
    }

    #[test]
    fn test_undump_partial_channels() {
        let mut tex = Texture::new(2, 1).unwrap();
        tex.fill(Color::with_alpha(9, 9, 9, 9)).unwrap();
        tex.undump(&[100, 200], "g").unwrap();
        assert_eq!(tex.get_pixel(0, 0).unwrap(), Color::with_alpha(9, 100, 9, 9));
        assert_eq!(tex.get_pixel(1, 0).unwrap(), Color::with_alpha(9, 200, 9, 9));
    }

    #[test]
    fn test_undump_rejects_bad_size() {
        let mut tex = Texture::new(2, 2).unwrap();
        assert!(matches!(
            tex.undump(&[0; 15], "rgba"),
            Err(TextureError::InvalidDataSize { expected: 16, actual: 15 })
        ));
    }

    #[test]
    fn test_paletted_rejects_direct_writes() {
        let mut tex = paletted();
        assert!(matches!(tex.set_pixel(0, 0, Color::BLUE), Err(TextureError::PaletteLocked)));
        assert!(matches!(tex.fill(Color::BLUE), Err(TextureError::PaletteLocked)));
        assert!(matches!(tex.clear(), Err(TextureError::PaletteLocked)));
        assert!(matches!(tex.undump(&[0; 6], "r"), Err(TextureError::PaletteLocked)));
        // reads still work
        assert_eq!(tex.get_pixel(1, 0).unwrap(), Color::GREEN);
        assert_eq!(tex.dump("r").unwrap(), vec![255, 0, 10, 10, 0, 255]);
    }

    #[test]
    fn test_change_palette_resyncs() {
        let tex = paletted();
        let changed = tex.change_palette(&[Color::BLUE, Color::WHITE]).unwrap();
        assert_eq!(changed.get_pixel(0, 0).unwrap(), Color::BLUE);
        assert_eq!(changed.get_pixel(1, 0).unwrap(), Color::WHITE);
        // missing entries become transparent black
        assert_eq!(changed.get_pixel(2, 0).unwrap(), Color::TRANSPARENT);
        assert_eq!(changed.palette().unwrap().unwrap().len(), 3);
        // original untouched
        assert_eq!(tex.get_pixel(0, 0).unwrap(), Color::RED);
    }

    #[test]
    fn test_change_palette_requires_palette() {
        let mut tex = Texture::new(2, 2).unwrap();
        assert!(matches!(tex.change_palette_in_place(&[]), Err(TextureError::NoPalette)));
        assert!(tex.palette().unwrap().is_none());
    }

    #[test]
    fn test_change_hue_zero_is_noop() {
        let orig = gradient(8, 8);
        let tex = orig.change_hue(0.0).unwrap();
        assert_eq!(tex.pixels().unwrap(), orig.pixels().unwrap());
    }

    #[test]
    fn test_change_hue_third_turn() {
        let orig = gradient(8, 8);
        let tex = orig.change_hue(PI * 2.0 / 3.0).unwrap();
        for (p1, p2) in orig.pixels().unwrap().iter().zip(tex.pixels().unwrap()) {
            assert!((p1.b as i32 - p2.r as i32).abs() <= 1);
            assert!((p1.r as i32 - p2.g as i32).abs() <= 1);
            assert!((p1.g as i32 - p2.b as i32).abs() <= 1);
            assert_eq!(p1.a, p2.a);
        }
    }

    #[test]
    fn test_change_hue_roundtrip_is_close() {
        let orig = gradient(8, 8);
        let mut tex = orig.clone();
        tex.change_hue_in_place(1.1).unwrap();
        tex.change_hue_in_place(-1.1).unwrap();
        for (p1, p2) in orig.pixels().unwrap().iter().zip(tex.pixels().unwrap()) {
            assert!((p1.r as i32 - p2.r as i32).abs() <= 3);
            assert!((p1.g as i32 - p2.g as i32).abs() <= 3);
            assert!((p1.b as i32 - p2.b as i32).abs() <= 3);
            assert_eq!(p1.a, p2.a);
        }
    }

    #[test]
    fn test_change_hue_on_palette() {
        let mut tex = paletted();
        tex.change_hue_in_place(PI * 2.0 / 3.0).unwrap();
        let palette = tex.palette().unwrap().unwrap().to_vec();
        assert_eq!(palette[0], Color::GREEN);
        for (i, &idx) in tex.indices().unwrap().unwrap().iter().enumerate() {
            assert_eq!(tex.pixels().unwrap()[i], palette[idx as usize]);
        }
    }
}
