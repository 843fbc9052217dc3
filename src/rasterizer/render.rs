//! Coverage compositing and primitive drawing
//!
//! Every primitive here composites with [`render_pixel`] rather than
//! overwriting, so alpha coverage accumulates.

use super::texture::{clip_rect, Texture};
use super::types::{alpha, Color};
use crate::error::Result;

/// Composite `src` onto `dst`.
///
/// A fully transparent destination is replaced outright. Otherwise the
/// destination keeps the larger alpha and color channels are blended by
/// the source alpha.
#[inline]
pub fn render_pixel(dst: &mut Color, src: Color) {
    if dst.a == 0 {
        *dst = src;
        return;
    }
    let a = src.a as i32;
    dst.a = dst.a.max(src.a);
    dst.r = alpha(src.r, dst.r, a);
    dst.g = alpha(src.g, dst.g, a);
    dst.b = alpha(src.b, dst.b, a);
}

impl Texture {
    /// Composite a single pixel. Out-of-bounds coordinates are ignored.
    pub fn render_pixel(&mut self, x: i32, y: i32, color: Color) -> Result<()> {
        let canvas = self.canvas()?;
        if x < 0 || canvas.width as i32 <= x || y < 0 || canvas.height as i32 <= y {
            return Ok(());
        }
        render_pixel(&mut canvas.pixels[x as usize + y as usize * canvas.width], color);
        Ok(())
    }

    /// Draw a line using Bresenham's algorithm, both endpoints included
    pub fn render_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, color: Color) -> Result<()> {
        let canvas = self.canvas()?;
        let (w, h) = (canvas.width as i64, canvas.height as i64);
        let mut plot = |x: i64, y: i64| {
            if 0 <= x && x < w && 0 <= y && y < h {
                render_pixel(&mut canvas.pixels[(x + y * w) as usize], color);
            }
        };

        let (x1, y1, x2, y2) = (x1 as i64, y1 as i64, x2 as i64, y2 as i64);
        if (y2 - y1).abs() <= (x2 - x1).abs() {
            bresenham((x1, y1), (x2, y2), w, |x, y| plot(x, y));
        } else {
            bresenham((y1, x1), (y2, x2), h, |y, x| plot(x, y));
        }
        Ok(())
    }

    /// Composite a filled rect, clipped to the texture
    pub fn render_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) -> Result<()> {
        let canvas = self.canvas()?;
        let Some((x, y, w, h)) =
            clip_rect(canvas.width, canvas.height, x.into(), y.into(), w.into(), h.into())
        else {
            return Ok(());
        };
        for row in y..y + h {
            let start = x as usize + row as usize * canvas.width;
            for px in &mut canvas.pixels[start..start + w as usize] {
                render_pixel(px, color);
            }
        }
        Ok(())
    }
}

/// Walk a line along its major axis, calling `plot(major, minor)`.
///
/// Steps where the major coordinate lies outside `0..extent` are skipped
/// without iterating; the error term is advanced in closed form.
fn bresenham(from: (i64, i64), to: (i64, i64), extent: i64, mut plot: impl FnMut(i64, i64)) {
    let (a1, b1) = from;
    let (a2, b2) = to;
    let da = (a2 - a1).abs();
    let db = (b2 - b1).abs();
    let sa = if a1 <= a2 { 1 } else { -1 };
    let sb = if b1 <= b2 { 1 } else { -1 };

    // steps 0..=da visit a1 + sa * step
    let (first, last) = if sa > 0 {
        ((-a1).max(0), da.min(extent - 1 - a1))
    } else {
        ((a1 - (extent - 1)).max(0), da.min(a1))
    };
    if last < first {
        return;
    }

    let limit = da << 1;
    let mut e = da;
    let mut b = b1;
    if first > 0 {
        let total = da as i128 + ((db as i128) << 1) * first as i128;
        b += sb * (total / limit as i128) as i64;
        e = (total % limit as i128) as i64;
    }
    let mut a = a1 + sa * first;
    for _ in first..=last {
        plot(a, b);
        a += sa;
        e += db << 1;
        if limit <= e {
            e -= limit;
            b += sb;
        }
    }
}
