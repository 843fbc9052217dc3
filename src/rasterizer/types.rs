//! Core types for the rasterizer

use std::collections::VecDeque;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TextureError};

/// RGBA color (0-255 per channel)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0, a: 255 };
    pub const GREEN: Color = Color { r: 0, g: 255, b: 0, a: 255 };
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255, a: 255 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Build a color from unchecked integers, rejecting anything outside 0..=255
    pub fn checked(r: i32, g: i32, b: i32, a: i32) -> Result<Self> {
        let ok = |v: i32| (0..=255).contains(&v);
        if ok(r) && ok(g) && ok(b) && ok(a) {
            Ok(Self::with_alpha(r as u8, g as u8, b as u8, a as u8))
        } else {
            Err(TextureError::InvalidColor { r, g, b, a })
        }
    }

    /// Packed RGBA (red in the high byte)
    pub fn to_u32(self) -> u32 {
        ((self.r as u32) << 24) | ((self.g as u32) << 16) | ((self.b as u32) << 8) | (self.a as u32)
    }

    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Rotate the hue by `angle` radians using the 6-sector HSV formula.
    /// Black and gray colors have no hue and are returned unchanged.
    pub fn rotate_hue(self, angle: f64) -> Self {
        let (r, g, b) = (self.r, self.g, self.b);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        if max == 0 || max == min {
            return self;
        }
        let delta255 = (max - min) as f64;
        let v = max as f64 / 255.0;
        let s = delta255 / max as f64;
        let mut h = if max == r {
            (g as f64 - b as f64) / delta255
        } else if max == g {
            2.0 + (b as f64 - r as f64) / delta255
        } else {
            4.0 + (r as f64 - g as f64) / delta255
        };
        h = (h + angle * 6.0 / (2.0 * std::f64::consts::PI)).rem_euclid(6.0);

        let sector = h as i32;
        let f = h - sector as f64;
        let v255 = max;
        let aa255 = (v * (1.0 - s) * 255.0) as u8;
        let bb255 = (v * (1.0 - s * f) * 255.0) as u8;
        let cc255 = (v * (1.0 - s * (1.0 - f)) * 255.0) as u8;
        let (r, g, b) = match sector {
            0 => (v255, cc255, aa255),
            1 => (bb255, v255, aa255),
            2 => (aa255, v255, cc255),
            3 => (aa255, bb255, v255),
            4 => (cc255, aa255, v255),
            _ => (v255, aa255, bb255),
        };
        Self { r, g, b, a: self.a }
    }
}

impl Hash for Color {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.to_u32());
    }
}

/// Integer divide by 255, truncating
#[inline]
pub fn div255(x: i32) -> i32 {
    x / 255
}

/// Blend `src` over `dst` with weight `a` (0-255), truncating.
/// `alpha(s, d, 255) == s` and `alpha(s, d, 0) == d`.
#[inline]
pub fn alpha(src: u8, dst: u8, a: i32) -> u8 {
    let src = src as i32;
    let dst = dst as i32;
    div255((dst << 8) - dst + (src - dst) * a) as u8
}

/// Compositing mode for textured rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Copy source including alpha
    None,
    /// Coverage-accumulating alpha blend
    #[default]
    Alpha,
    /// Saturating add, weighted by source alpha
    Add,
    /// Saturating subtract, weighted by source alpha
    Sub,
    /// Destination alpha := source red
    Mask,
}

/// Depth fog for perspective rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Blur {
    #[default]
    None,
    /// Fade distant ground samples out to whatever is behind them
    Background,
    /// Fade distant ground samples toward a fixed color
    Color(Color),
}

/// Caller-owned intern cache for colors.
///
/// Most recently used entries sit at the front. Lookups only promise value
/// equality; `Color` is `Copy`, so the cache exists to bound churn in
/// callers that build colors from loose integers every frame.
#[derive(Debug, Clone)]
pub struct ColorCache {
    entries: VecDeque<Color>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl ColorCache {
    pub const DEFAULT_CAPACITY: usize = 128;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            hits: 0,
            misses: 0,
        }
    }

    /// Validate and intern a color
    pub fn get(&mut self, r: i32, g: i32, b: i32, a: i32) -> Result<Color> {
        let color = Color::checked(r, g, b, a)?;
        if let Some(pos) = self.entries.iter().position(|c| *c == color) {
            self.hits += 1;
            if pos > 0 {
                self.entries.remove(pos);
                self.entries.push_front(color);
            }
            return Ok(color);
        }
        self.misses += 1;
        if self.entries.len() == self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(color);
        Ok(color)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for ColorCache {
    fn default() -> Self {
        Self::new()
    }
}
