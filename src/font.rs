//! Text rendering through a pluggable glyph engine
//!
//! The crate does not rasterize glyphs itself. A [`FontEngine`] turns text
//! into a single-channel coverage bitmap, and [`Texture::render_text`]
//! composites that bitmap in a solid color.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::debug;

use crate::error::{Result, TextureError};
use crate::rasterizer::{div255, Color, RenderingOptions, Texture};

/// Identity of a loaded font face
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontKey {
    pub path: PathBuf,
    pub size: u32,
    pub bold: bool,
    pub italic: bool,
    /// Face index inside a TrueType collection
    pub ttc_index: u32,
}

impl FontKey {
    pub fn new<P: Into<PathBuf>>(path: P, size: u32) -> Self {
        Self {
            path: path.into(),
            size,
            bold: false,
            italic: false,
            ttc_index: 0,
        }
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    pub fn ttc_index(mut self, index: u32) -> Self {
        self.ttc_index = index;
        self
    }
}

/// Row-major coverage values, 0 = empty, 255 = fully covered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphBitmap {
    pub width: usize,
    pub height: usize,
    pub coverage: Vec<u8>,
}

/// Glyph rasterization backend
pub trait FontEngine {
    type Font;

    fn load(&self, path: &Path, key: &FontKey) -> Result<Self::Font>;

    /// Pixel size of `text` when rendered
    fn measure(&self, font: &Self::Font, text: &str) -> (usize, usize);

    /// Render `text`. Without anti-aliasing every coverage value is 0 or 255.
    fn rasterize(&self, font: &Self::Font, text: &str, anti_alias: bool) -> GlyphBitmap;
}

/// Loaded fonts keyed by [`FontKey`]
pub struct FontCache<E: FontEngine> {
    engine: E,
    fonts: HashMap<FontKey, Rc<E::Font>>,
}

impl<E: FontEngine> FontCache<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            fonts: HashMap::new(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Whether a font file exists at `path`
    pub fn exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    /// Fetch a cached font or load it through the engine
    pub fn get_or_load(&mut self, key: &FontKey) -> Result<Rc<E::Font>> {
        if let Some(font) = self.fonts.get(key) {
            return Ok(Rc::clone(font));
        }
        if !Self::exists(&key.path) {
            return Err(TextureError::FontNotFound(key.path.clone()));
        }
        debug!(
            "loading font {} (size {}, bold {}, italic {}, ttc {})",
            key.path.display(),
            key.size,
            key.bold,
            key.italic,
            key.ttc_index
        );
        let font = Rc::new(self.engine.load(&key.path, key)?);
        self.fonts.insert(key.clone(), Rc::clone(&font));
        Ok(font)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Drop every cached font. Fonts still held elsewhere stay alive.
    pub fn clear(&mut self) {
        self.fonts.clear();
    }
}

impl Texture {
    /// Draw `text` in `color` with its top-left corner at `(x, y)`
    #[allow(clippy::too_many_arguments)]
    pub fn render_text<E: FontEngine>(
        &mut self,
        text: &str,
        x: i32,
        y: i32,
        engine: &E,
        font: &E::Font,
        color: Color,
        anti_alias: bool,
    ) -> Result<()> {
        self.canvas()?;
        if text.is_empty() {
            return Ok(());
        }
        let (width, height) = engine.measure(font, text);
        if width == 0 || height == 0 {
            return Ok(());
        }
        let glyphs = engine.rasterize(font, text, anti_alias);

        let mut pixels = vec![Color::TRANSPARENT; width * height];
        for j in 0..height.min(glyphs.height) {
            for i in 0..width.min(glyphs.width) {
                let v = glyphs.coverage.get(i + j * glyphs.width).copied().unwrap_or(0);
                if v == 0 {
                    continue;
                }
                let a = if color.a == 255 {
                    v
                } else {
                    div255(v as i32 * color.a as i32) as u8
                };
                pixels[i + j * width] = Color { a, ..color };
            }
        }
        let text_texture = Texture::from_pixels(width, height, pixels)?;
        self.render_texture(&text_texture, x, y, &RenderingOptions::default())
    }
}
