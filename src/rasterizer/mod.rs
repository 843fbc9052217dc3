//! Software 2D rasterizer
//!
//! Features:
//! - Coverage-accumulating alpha compositing
//! - Affine blits with tone, saturation and blend modes
//! - Paletted textures with palette swaps and hue rotation
//! - Mode-7 ground-plane projection

mod math;
mod types;
mod texture;
mod render;
mod blit;
mod perspective;

pub use math::*;
pub use types::*;
pub use texture::Texture;
pub use render::render_pixel;
pub use blit::{MatrixForm, RenderingOptions};
pub use perspective::{Camera, PerspectiveOptions, Projection};
