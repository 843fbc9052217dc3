//! Texture-to-texture blitting
//!
//! Plain copies and alpha blends with no transform take a direct row loop.
//! Everything else walks the destination bounding box and samples the
//! source through the inverse affine transform in 16.16 fixed point.

use log::trace;
use serde::{Deserialize, Serialize, Serializer};

use super::math::AffineMatrix;
use super::texture::{clip_rect, Canvas, Source, Texture};
use super::types::{alpha, div255, BlendMode, Color};
use crate::error::{Result, TextureError};

/// Linear part of a user-supplied transform, `[a, b, c, d]` or `[[a, b], [c, d]]`
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MatrixForm {
    Flat([f64; 4]),
    Rows([[f64; 2]; 2]),
}

// Arrays serialize as tuples by default; write sequences so the output
// reads back in the same bracket form.
impl Serialize for MatrixForm {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            MatrixForm::Flat(m) => serializer.collect_seq(m.iter()),
            MatrixForm::Rows(rows) => serializer.collect_seq(rows.iter().map(|r| r.as_slice())),
        }
    }
}

impl Default for MatrixForm {
    fn default() -> Self {
        MatrixForm::Flat([1.0, 0.0, 0.0, 1.0])
    }
}

impl MatrixForm {
    pub fn to_affine(self) -> AffineMatrix {
        let [a, b, c, d] = match self {
            MatrixForm::Flat(m) => m,
            MatrixForm::Rows([[a, b], [c, d]]) => [a, b, c, d],
        };
        AffineMatrix::new(a, b, c, d, 0.0, 0.0)
    }
}

/// Options for [`Texture::render_texture`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderingOptions {
    pub src_x: i32,
    pub src_y: i32,
    /// Defaults to the source width minus `src_x`
    pub src_width: Option<i32>,
    /// Defaults to the source height minus `src_y`
    pub src_height: Option<i32>,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Radians
    pub angle: f64,
    pub center_x: i32,
    pub center_y: i32,
    pub matrix: MatrixForm,
    pub alpha: u8,
    pub blend_type: BlendMode,
    pub tone_red: i32,
    pub tone_green: i32,
    pub tone_blue: i32,
    pub saturation: i32,
}

impl Default for RenderingOptions {
    fn default() -> Self {
        Self {
            src_x: 0,
            src_y: 0,
            src_width: None,
            src_height: None,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            center_x: 0,
            center_y: 0,
            matrix: MatrixForm::default(),
            alpha: 255,
            blend_type: BlendMode::Alpha,
            tone_red: 0,
            tone_green: 0,
            tone_blue: 0,
            saturation: 255,
        }
    }
}

impl RenderingOptions {
    /// Reject tones outside -255..=255 and saturation outside 0..=255
    pub fn validate(&self) -> Result<()> {
        let tone_ok = |t: i32| (-255..=255).contains(&t);
        if tone_ok(self.tone_red)
            && tone_ok(self.tone_green)
            && tone_ok(self.tone_blue)
            && (0..=255).contains(&self.saturation)
        {
            Ok(())
        } else {
            Err(TextureError::InvalidTone {
                red: self.tone_red,
                green: self.tone_green,
                blue: self.tone_blue,
                saturation: self.saturation,
            })
        }
    }

    fn is_plain(&self) -> bool {
        self.matrix.to_affine().is_identity_linear()
            && self.scale_x == 1.0
            && self.scale_y == 1.0
            && self.angle == 0.0
            && self.tone_red == 0
            && self.tone_green == 0
            && self.tone_blue == 0
            && self.saturation == 255
            && matches!(self.blend_type, BlendMode::Alpha | BlendMode::None)
    }

    /// Forward transform from source-rect space to destination space
    fn forward_matrix(&self, dst_x: i32, dst_y: i32) -> AffineMatrix {
        let m = self.matrix.to_affine();
        let (cx, cy) = (self.center_x as f64, self.center_y as f64);
        let mut mat = AffineMatrix {
            tx: m.a * -cx + m.b * -cy,
            ty: m.c * -cx + m.d * -cy,
            ..m
        };
        if self.scale_x != 1.0 {
            mat.a *= self.scale_x;
            mat.b *= self.scale_x;
            mat.tx *= self.scale_x;
        }
        if self.scale_y != 1.0 {
            mat.c *= self.scale_y;
            mat.d *= self.scale_y;
            mat.ty *= self.scale_y;
        }
        if self.angle != 0.0 {
            let (sin, cos) = self.angle.sin_cos();
            let m = mat;
            mat.a = cos * m.a - sin * m.c;
            mat.b = cos * m.b - sin * m.d;
            mat.c = sin * m.a + cos * m.c;
            mat.d = sin * m.b + cos * m.d;
            mat.tx = cos * m.tx - sin * m.ty;
            mat.ty = sin * m.tx + cos * m.ty;
        }
        mat.tx += cx + dst_x as f64;
        mat.ty += cy + dst_y as f64;
        mat
    }
}

/// Clipped source rect in source pixel coordinates
#[derive(Debug, Clone, Copy)]
struct SrcRect {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
}

impl Texture {
    /// Draw `src` onto this texture with its top-left at `(x, y)`
    pub fn render_texture(
        &mut self,
        src: &Texture,
        x: i32,
        y: i32,
        options: &RenderingOptions,
    ) -> Result<()> {
        self.canvas()?;
        let source = src.source()?;
        options.validate()?;
        let Some(rect) = source_rect(&source, options) else {
            trace!("render_texture: empty source rect");
            return Ok(());
        };
        let mut canvas = self.canvas()?;
        if options.is_plain() {
            fast_blit(&source, &mut canvas, rect, x, y, options.alpha, options.blend_type);
        } else {
            affine_blit(&source, &mut canvas, rect, x, y, options);
        }
        Ok(())
    }

    /// Draw this texture onto itself. The source is a snapshot taken before
    /// any pixel is written.
    pub fn render_self(&mut self, x: i32, y: i32, options: &RenderingOptions) -> Result<()> {
        self.canvas()?;
        options.validate()?;
        let snapshot = self.pixels()?.to_vec();
        let mut canvas = self.canvas()?;
        let source = Source {
            pixels: &snapshot,
            width: canvas.width,
            height: canvas.height,
        };
        let Some(rect) = source_rect(&source, options) else {
            trace!("render_self: empty source rect");
            return Ok(());
        };
        affine_blit(&source, &mut canvas, rect, x, y, options);
        Ok(())
    }
}

fn source_rect(src: &Source<'_>, options: &RenderingOptions) -> Option<SrcRect> {
    let (x, y) = (i64::from(options.src_x), i64::from(options.src_y));
    let w = options.src_width.map_or(src.width as i64 - x, i64::from);
    let h = options.src_height.map_or(src.height as i64 - y, i64::from);
    clip_rect(src.width, src.height, x, y, w, h)
        .map(|(x, y, w, h)| SrcRect { x, y, w, h })
}

fn fast_blit(
    src: &Source<'_>,
    dst: &mut Canvas<'_>,
    rect: SrcRect,
    dst_x: i32,
    dst_y: i32,
    opacity: u8,
    mode: BlendMode,
) {
    let (mut src_x, mut src_y) = (i64::from(rect.x), i64::from(rect.y));
    let (mut src_w, mut src_h) = (i64::from(rect.w), i64::from(rect.h));
    let (mut dst_x, mut dst_y) = (i64::from(dst_x), i64::from(dst_y));
    let (dst_tw, dst_th) = (dst.width as i64, dst.height as i64);

    if dst_x < 0 {
        src_x -= dst_x;
        src_w += dst_x;
        if src.width as i64 <= src_x || src_w <= 0 {
            trace!("render_texture: source pushed off the left edge");
            return;
        }
        dst_x = 0;
    } else if dst_tw <= dst_x {
        trace!("render_texture: destination x {} past width {}", dst_x, dst_tw);
        return;
    }
    if dst_y < 0 {
        src_y -= dst_y;
        src_h += dst_y;
        if src.height as i64 <= src_y || src_h <= 0 {
            trace!("render_texture: source pushed off the top edge");
            return;
        }
        dst_y = 0;
    } else if dst_th <= dst_y {
        trace!("render_texture: destination y {} past height {}", dst_y, dst_th);
        return;
    }

    let width = src_w.min(dst_tw - dst_x) as usize;
    let height = src_h.min(dst_th - dst_y) as usize;

    for j in 0..height {
        let s = src_x as usize + (src_y as usize + j) * src.width;
        let d = dst_x as usize + (dst_y as usize + j) * dst.width;
        let src_row = &src.pixels[s..s + width];
        let dst_row = &mut dst.pixels[d..d + width];

        match mode {
            BlendMode::None => dst_row.copy_from_slice(src_row),
            _ if opacity == 255 => {
                for (d, s) in dst_row.iter_mut().zip(src_row) {
                    if s.a == 255 || d.a == 0 {
                        *d = *s;
                    } else if s.a != 0 {
                        blend_over(d, s, s.a);
                    }
                }
            }
            _ if opacity > 0 => {
                for (d, s) in dst_row.iter_mut().zip(src_row) {
                    let beta = div255(s.a as i32 * opacity as i32) as u8;
                    if d.a == 0 {
                        *d = Color::with_alpha(s.r, s.g, s.b, beta);
                    } else if beta != 0 {
                        blend_over(d, s, beta);
                    }
                }
            }
            _ => {}
        }
    }
}

#[inline]
fn blend_over(dst: &mut Color, src: &Color, beta: u8) {
    let b = beta as i32;
    dst.a = dst.a.max(beta);
    dst.r = alpha(src.r, dst.r, b);
    dst.g = alpha(src.g, dst.g, b);
    dst.b = alpha(src.b, dst.b, b);
}

#[inline]
fn apply_tone(c: u8, tone: i32) -> u8 {
    match tone.signum() {
        1 => alpha(255, c, tone),
        -1 => alpha(0, c, -tone),
        _ => c,
    }
}

fn affine_blit(
    src: &Source<'_>,
    dst: &mut Canvas<'_>,
    rect: SrcRect,
    dst_x: i32,
    dst_y: i32,
    options: &RenderingOptions,
) {
    let mat = options.forward_matrix(dst_x, dst_y);
    if !mat.is_finite() {
        trace!("render_texture: non-finite transform {:?}", mat);
        return;
    }
    let Some(inv) = mat.try_invert() else {
        trace!("render_texture: singular transform {:?}", mat);
        return;
    };

    let (sw, sh) = (rect.w as f64, rect.h as f64);
    let corners = [
        (mat.tx, mat.ty),
        (mat.b * sh + mat.tx, mat.d * sh + mat.ty),
        (mat.a * sw + mat.tx, mat.c * sw + mat.ty),
        (mat.a * sw + mat.b * sh + mat.tx, mat.c * sw + mat.d * sh + mat.ty),
    ];
    let mut x0 = corners.iter().map(|c| c.0).fold(f64::INFINITY, f64::min);
    let mut y0 = corners.iter().map(|c| c.1).fold(f64::INFINITY, f64::min);
    let x1 = corners.iter().map(|c| c.0).fold(f64::NEG_INFINITY, f64::max);
    let y1 = corners.iter().map(|c| c.1).fold(f64::NEG_INFINITY, f64::max);

    let (dst_tw, dst_th) = (dst.width as i32, dst.height as i32);
    if dst_tw as f64 <= x0 || dst_th as f64 <= y0 || x1 < 0.0 || y1 < 0.0 {
        trace!("render_texture: transformed bounds miss the destination");
        return;
    }

    let mut ox = inv.a * (x0 + 0.5) + inv.b * (y0 + 0.5) + inv.tx + rect.x as f64;
    let mut oy = inv.c * (x0 + 0.5) + inv.d * (y0 + 0.5) + inv.ty + rect.y as f64;
    // per destination column / per destination row
    let (dxx, dxy) = (inv.a, inv.c);
    let (dyx, dyy) = (inv.b, inv.d);

    if x0 < 0.0 {
        ox -= x0 * dxx;
        oy -= x0 * dxy;
        x0 = 0.0;
    }
    if y0 < 0.0 {
        ox -= y0 * dyx;
        oy -= y0 * dyy;
        y0 = 0.0;
    }
    let (x0, y0) = (x0 as i32, y0 as i32);
    let dst_w = dst_tw.min(x1 as i32) - x0;
    let dst_h = dst_th.min(y1 as i32) - y0;

    // Near-zero scales invert to steps too large for 16.16; every sample
    // would land outside the source anyway.
    let span = (dst_w.max(0) as f64 + dst_h.max(0) as f64 + 1.0) * 65536.0;
    let bound = (i64::MAX / 4) as f64;
    let steps_fit = [dxx, dxy, dyx, dyy].iter().all(|v| v.abs() * span < bound);
    let origin_fits = [ox, oy].iter().all(|v| (v * 65536.0).abs() < bound);
    if !(steps_fit && origin_fits) {
        trace!("render_texture: inverse transform overflows fixed point {:?}", inv);
        return;
    }

    let fixed = |v: f64| (v * 65536.0) as i64;
    let (ox16, oy16) = (fixed(ox), fixed(oy));
    let (dxx16, dxy16) = (fixed(dxx), fixed(dxy));
    let (dyx16, dyy16) = (fixed(dyx), fixed(dyy));

    let (sx1, sy1) = (rect.x as i64, rect.y as i64);
    let (sx2, sy2) = (sx1 + rect.w as i64, sy1 + rect.h as i64);
    let opacity = options.alpha as i32;
    let mode = options.blend_type;

    for j in 0..dst_h.max(0) {
        let mut si16 = ox16 + j as i64 * dyx16;
        let mut sj16 = oy16 + j as i64 * dyy16;
        let row = (x0 + (y0 + j) * dst_tw) as usize;
        for i in 0..dst_w.max(0) {
            let si = si16 >> 16;
            let sj = sj16 >> 16;
            si16 += dxx16;
            sj16 += dxy16;

            if !(sx1 <= si && si < sx2 && sy1 <= sj && sj < sy2) {
                if (si < sx1 && dxx <= 0.0)
                    || (sx2 <= si && 0.0 <= dxx)
                    || (sj < sy1 && dxy <= 0.0)
                    || (sy2 <= sj && 0.0 <= dxy)
                {
                    break;
                }
                continue;
            }

            let s = src.pixels[si as usize + sj as usize * src.width];
            let d = &mut dst.pixels[row + i as usize];
            if mode == BlendMode::Mask {
                d.a = s.r;
                continue;
            }

            let (mut r, mut g, mut b) = (s.r, s.g, s.b);
            if options.saturation < 255 {
                let y = ((6969 * r as i32 + 23434 * g as i32 + 2365 * b as i32) / 32768) as u8;
                r = alpha(r, y, options.saturation);
                g = alpha(g, y, options.saturation);
                b = alpha(b, y, options.saturation);
            }
            r = apply_tone(r, options.tone_red);
            g = apply_tone(g, options.tone_green);
            b = apply_tone(b, options.tone_blue);

            if mode == BlendMode::None {
                *d = Color::with_alpha(r, g, b, s.a);
                continue;
            }

            let beta = div255(s.a as i32 * opacity);
            if d.a == 0 {
                let (nr, ng, nb) = match mode {
                    BlendMode::Add => (
                        (r as i32 + d.r as i32).min(255),
                        (g as i32 + d.g as i32).min(255),
                        (b as i32 + d.b as i32).min(255),
                    ),
                    BlendMode::Sub => (
                        (d.r as i32 - r as i32).max(0),
                        (d.g as i32 - g as i32).max(0),
                        (d.b as i32 - b as i32).max(0),
                    ),
                    _ => (r as i32, g as i32, b as i32),
                };
                *d = Color::with_alpha(nr as u8, ng as u8, nb as u8, beta as u8);
            } else {
                d.a = d.a.max(beta as u8);
                match mode {
                    BlendMode::Add => {
                        d.r = (div255(r as i32 * beta) + d.r as i32).min(255) as u8;
                        d.g = (div255(g as i32 * beta) + d.g as i32).min(255) as u8;
                        d.b = (div255(b as i32 * beta) + d.b as i32).min(255) as u8;
                    }
                    BlendMode::Sub => {
                        d.r = (d.r as i32 - div255(r as i32 * beta)).max(0) as u8;
                        d.g = (d.g as i32 - div255(g as i32 * beta)).max(0) as u8;
                        d.b = (d.b as i32 - div255(b as i32 * beta)).max(0) as u8;
                    }
                    _ => {
                        d.r = alpha(r, d.r, beta);
                        d.g = alpha(g, d.g, beta);
                        d.b = alpha(b, d.b, beta);
                    }
                }
            }
        }
    }
}
