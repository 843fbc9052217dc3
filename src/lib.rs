//! bonnie-canvas: software 2D texture rasterizer
//!
//! Textures are CPU-side RGBA buffers. Drawing composites with coverage
//! accumulation, blits go through an affine sampler with tone, saturation
//! and blend modes, and a mode-7 renderer projects a texture onto a ground
//! plane.
//!
//! ```no_run
//! use bonnie_canvas::{Color, RenderingOptions, Texture};
//!
//! let mut screen = Texture::new(320, 240)?;
//! let mut sprite = Texture::new(16, 16)?;
//! sprite.fill(Color::RED)?;
//! let options = RenderingOptions { angle: 0.5, center_x: 8, center_y: 8, ..Default::default() };
//! screen.render_texture(&sprite, 100, 80, &options)?;
//! # Ok::<(), bonnie_canvas::TextureError>(())
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod font;
pub mod rasterizer;

pub use codec::LoadOptions;
pub use error::{ConfigError, Result, TextureError};
pub use font::{FontCache, FontEngine, FontKey, GlyphBitmap};
pub use rasterizer::{
    AffineMatrix, BlendMode, Blur, Camera, Color, ColorCache, MatrixForm, PerspectiveOptions,
    Projection, RenderingOptions, Texture, Vec3,
};
