//! Mode-7 style ground-plane projection
//!
//! Ground space puts the source texture on the x-z plane with y up. The
//! camera sits at `(camera_x, camera_height, camera_y)`; with all angles
//! zero it looks horizontally toward -z.

use log::trace;
use serde::{Deserialize, Serialize};

use super::math::Vec3;
use super::render::render_pixel;
use super::texture::Texture;
use super::types::{alpha, div255, Blur, Color};
use crate::error::{Result, TextureError};

/// Options for [`Texture::render_in_perspective`] and
/// [`Texture::transform_in_perspective`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PerspectiveOptions {
    pub camera_x: i32,
    pub camera_y: i32,
    pub camera_height: f64,
    pub camera_yaw: f64,
    pub camera_pitch: f64,
    pub camera_roll: f64,
    /// Horizontal field of view in radians, exclusive range (0, PI)
    pub view_angle: f64,
    /// Screen point the view axis passes through. Defaults to the center.
    pub intersection_x: Option<i32>,
    pub intersection_y: Option<i32>,
    /// Tile the ground texture infinitely
    #[serde(rename = "loop")]
    pub wrap: bool,
    pub blur: Blur,
}

impl Default for PerspectiveOptions {
    fn default() -> Self {
        Self {
            camera_x: 0,
            camera_y: 0,
            camera_height: 0.0,
            camera_yaw: 0.0,
            camera_pitch: 0.0,
            camera_roll: 0.0,
            view_angle: std::f64::consts::FRAC_PI_4,
            intersection_x: None,
            intersection_y: None,
            wrap: false,
            blur: Blur::None,
        }
    }
}

impl PerspectiveOptions {
    pub fn validate(&self) -> Result<()> {
        let va = self.view_angle;
        if !va.is_finite() || va <= 0.0 || std::f64::consts::PI <= va {
            return Err(TextureError::InvalidViewAngle(va));
        }
        Ok(())
    }

    fn intersection(&self, width: usize, height: usize) -> (i32, i32) {
        (
            self.intersection_x.unwrap_or((width >> 1) as i32),
            self.intersection_y.unwrap_or((height >> 1) as i32),
        )
    }

    /// Distance from the eye to the screen plane, in pixels
    fn screen_distance(&self, width: usize) -> f64 {
        width as f64 / (2.0 * (self.view_angle / 2.0).tan())
    }
}

/// Camera orientation and the screen basis it induces in ground space
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,

    // Computed basis vectors
    /// One screen pixel to the right
    pub basis_x: Vec3,
    /// One screen pixel down
    pub basis_y: Vec3,
    /// View direction
    pub basis_z: Vec3,
}

impl Camera {
    pub fn new(yaw: f64, pitch: f64, roll: f64) -> Self {
        let mut cam = Self {
            yaw,
            pitch,
            roll,
            basis_x: Vec3::new(1.0, 0.0, 0.0),
            basis_y: Vec3::new(0.0, -1.0, 0.0),
            basis_z: Vec3::new(0.0, 0.0, -1.0),
        };
        cam.update_basis();
        cam
    }

    pub fn from_options(options: &PerspectiveOptions) -> Self {
        Self::new(options.camera_yaw, options.camera_pitch, options.camera_roll)
    }

    pub fn update_basis(&mut self) {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        let (sr, cr) = self.roll.sin_cos();

        self.basis_x = Vec3 {
            x: cr * cy + sr * sp * sy,
            y: sr * -cp,
            z: cr * sy - sr * sp * cy,
        };
        self.basis_y = Vec3 {
            x: -sr * cy + cr * sp * sy,
            y: cr * -cp,
            z: -sr * sy - cr * sp * cy,
        };
        self.basis_z = Vec3 {
            x: cp * sy,
            y: sp,
            z: -cp * cy,
        };
    }

    /// Rotate a ground-space offset from the camera into view space
    /// (yaw first, then pitch about the camera height).
    pub fn to_view(&self, offset: Vec3, camera_height: f64) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        let x = cy * offset.x + sy * offset.z;
        let z = -sy * offset.x + cy * offset.z;
        let dy = offset.y - camera_height;
        Vec3 {
            x,
            y: sp * z + cp * dy + camera_height,
            z: cp * z - sp * dy,
        }
    }
}

/// Screen position of a ground-space point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// `None` when the coordinate does not fit in an `i32`
    pub x: Option<i32>,
    pub y: Option<i32>,
    /// Screen pixels per ground unit at that depth
    pub scale: f64,
}

impl Texture {
    /// Draw `src` as an infinite ground plane seen from the camera.
    ///
    /// A zero camera height draws nothing.
    pub fn render_in_perspective(&mut self, src: &Texture, options: &PerspectiveOptions) -> Result<()> {
        let source = src.source()?;
        let canvas = self.canvas()?;
        options.validate()?;
        if options.camera_height == 0.0 {
            trace!("render_in_perspective: camera height is zero");
            return Ok(());
        }

        let (dst_w, dst_h) = (canvas.width, canvas.height);
        let (src_w, src_h) = (source.width as i32, source.height as i32);
        let camera = Camera::from_options(options);
        let distance = options.screen_distance(dst_w);
        let (ix, iy) = options.intersection(dst_w, dst_h);

        let intersection = camera.basis_z * distance + Vec3::new(0.0, options.camera_height, 0.0);
        let screen_o = intersection - camera.basis_x * ix as f64 - camera.basis_y * iy as f64;
        let h = options.camera_height as i32;
        let hf = h as f64;

        for j in 0..dst_h {
            let mut p = screen_o + camera.basis_y * j as f64;
            let row = j * dst_w;
            for i in 0..dst_w {
                let visible = hf != p.y && ((0 < h && p.y < hf) || (h < 0 && hf < p.y));
                if visible {
                    let scale = hf / (hf - p.y);
                    let mut sx = (p.x * scale + options.camera_x as f64) as i32;
                    let mut sz = (p.z * scale + options.camera_y as f64) as i32;
                    if options.wrap {
                        sx = sx.rem_euclid(src_w);
                        sz = sz.rem_euclid(src_h);
                    }
                    if 0 <= sx && sx < src_w && 0 <= sz && sz < src_h {
                        let texel = source.pixels[(sx + sz * src_w) as usize];
                        let dst = &mut canvas.pixels[row + i];
                        match options.blur {
                            Blur::Background if scale > 1.0 => {
                                let rate = (255.0 * (1.0 / scale)) as i32;
                                let faded = Color { a: div255(texel.a as i32 * rate) as u8, ..texel };
                                render_pixel(dst, faded);
                            }
                            Blur::Color(fog) if scale > 1.0 => {
                                let rate = (255.0 * (1.0 / scale)) as i32;
                                let fogged = Color {
                                    r: alpha(texel.r, fog.r, rate),
                                    g: alpha(texel.g, fog.g, rate),
                                    b: alpha(texel.b, fog.b, rate),
                                    a: alpha(texel.a, fog.a, rate),
                                };
                                render_pixel(dst, fogged);
                            }
                            _ => render_pixel(dst, texel),
                        }
                    }
                }
                p = p + camera.basis_x;
            }
        }
        Ok(())
    }

    /// Project ground point `(x, y)` at `height` onto this texture's screen.
    ///
    /// Returns `None` when the point lies in the camera's own depth plane.
    pub fn transform_in_perspective(
        &self,
        x: i32,
        y: i32,
        height: f64,
        options: &PerspectiveOptions,
    ) -> Result<Option<Projection>> {
        let (width, tex_height) = self.size()?;
        options.validate()?;

        let camera = Camera::from_options(options);
        let offset = Vec3::new(
            x as f64 - options.camera_x as f64,
            height,
            y as f64 - options.camera_y as f64,
        );
        let view = camera.to_view(offset, options.camera_height);
        if view.z == 0.0 {
            return Ok(None);
        }

        let scale = -options.screen_distance(width) / view.z;
        let sx = view.x * scale;
        let sy = (options.camera_height - view.y) * scale;
        let (sr, cr) = options.camera_roll.sin_cos();
        let (ix, iy) = options.intersection(width, tex_height);
        let px = (cr * sx + sr * sy + ix as f64) as i64;
        let py = (-sr * sx + cr * sy + iy as f64) as i64;
        Ok(Some(Projection {
            x: i32::try_from(px).ok(),
            y: i32::try_from(py).ok(),
            scale,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn near(a: Vec3, b: Vec3) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9 && (a.z - b.z).abs() < 1e-9
    }

    fn uniform(width: usize, height: usize, color: Color) -> Texture {
        Texture::from_pixels(width, height, vec![color; width * height]).unwrap()
    }

    fn screen_options() -> PerspectiveOptions {
        PerspectiveOptions {
            camera_height: 100.0,
            view_angle: FRAC_PI_2,
            intersection_x: Some(0),
            intersection_y: Some(0),
            ..Default::default()
        }
    }

    #[test]
    fn test_camera_basis_is_orthonormal() {
        for (yaw, pitch, roll) in [(0.0, 0.0, 0.0), (0.3, -0.7, 1.1), (2.5, 1.2, -0.4)] {
            let cam = Camera::new(yaw, pitch, roll);
            assert!(cam.basis_x.dot(cam.basis_y).abs() < 1e-9);
            assert!(cam.basis_x.dot(cam.basis_z).abs() < 1e-9);
            assert!(cam.basis_y.dot(cam.basis_z).abs() < 1e-9);
            assert!((cam.basis_x.dot(cam.basis_x) - 1.0).abs() < 1e-9);
            assert!(near(cam.basis_x.cross(cam.basis_y), cam.basis_z));
        }
    }

    #[test]
    fn test_transform_reference_points() {
        let screen = Texture::new(200, 100).unwrap();
        let options = screen_options();

        let p = screen.transform_in_perspective(0, -200, 0.0, &options).unwrap().unwrap();
        assert_eq!((p.x, p.y), (Some(0), Some(50)));
        assert!((p.scale - 0.5).abs() < 1e-9);

        let p = screen.transform_in_perspective(200, -200, 0.0, &options).unwrap().unwrap();
        assert_eq!((p.x, p.y), (Some(100), Some(50)));
        assert!((p.scale - 0.5).abs() < 1e-9);

        let p = screen.transform_in_perspective(200, -400, 0.0, &options).unwrap().unwrap();
        assert_eq!((p.x, p.y), (Some(50), Some(25)));
        assert!((p.scale - 0.25).abs() < 1e-9);

        let shifted = PerspectiveOptions {
            intersection_x: Some(12),
            intersection_y: Some(34),
            ..options
        };
        let p = screen.transform_in_perspective(0, -200, 0.0, &shifted).unwrap().unwrap();
        assert_eq!((p.x, p.y), (Some(12), Some(84)));
    }

    #[test]
    fn test_transform_in_camera_plane_is_none() {
        let screen = Texture::new(200, 100).unwrap();
        let result = screen.transform_in_perspective(7, 0, 100.0, &screen_options()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_transform_overflow_is_none() {
        let screen = Texture::new(200, 100).unwrap();
        let p = screen
            .transform_in_perspective(i32::MAX, -1, 0.0, &screen_options())
            .unwrap()
            .unwrap();
        assert_eq!(p.x, None);
        assert!(p.y.is_some());
    }

    #[test]
    fn test_transform_validates_view_angle() {
        let screen = Texture::new(10, 10).unwrap();
        for va in [0.0, PI, -1.0, f64::NAN] {
            let options = PerspectiveOptions { view_angle: va, ..screen_options() };
            assert!(matches!(
                screen.transform_in_perspective(0, 0, 0.0, &options),
                Err(TextureError::InvalidViewAngle(_))
            ));
        }
    }

    #[test]
    fn test_zero_height_is_noop() {
        let ground = uniform(4, 4, Color::RED);
        let mut screen = Texture::new(8, 8).unwrap();
        let options = PerspectiveOptions { wrap: true, camera_pitch: -FRAC_PI_2, ..Default::default() };
        screen.render_in_perspective(&ground, &options).unwrap();
        assert!(screen.pixels().unwrap().iter().all(|c| *c == Color::TRANSPARENT));
    }

    #[test]
    fn test_invalid_view_angle_rejected_before_drawing() {
        let ground = uniform(4, 4, Color::RED);
        let mut screen = Texture::new(8, 8).unwrap();
        let options = PerspectiveOptions {
            camera_height: 10.0,
            view_angle: PI,
            wrap: true,
            ..Default::default()
        };
        assert!(matches!(
            screen.render_in_perspective(&ground, &options),
            Err(TextureError::InvalidViewAngle(_))
        ));
        assert!(screen.pixels().unwrap().iter().all(|c| *c == Color::TRANSPARENT));
    }

    #[test]
    fn test_horizontal_view_fills_below_horizon() {
        let ground = uniform(4, 4, Color::RED);
        let mut screen = Texture::new(8, 8).unwrap();
        let options = PerspectiveOptions { camera_height: 100.0, wrap: true, ..Default::default() };
        screen.render_in_perspective(&ground, &options).unwrap();
        for y in 0..8 {
            for x in 0..8 {
                let expected = if y > 4 { Color::RED } else { Color::TRANSPARENT };
                assert_eq!(screen.get_pixel(x, y).unwrap(), expected, "({x}, {y})");
            }
        }
    }

    #[test]
    fn test_negative_height_fills_above_horizon() {
        let ground = uniform(4, 4, Color::BLUE);
        let mut screen = Texture::new(8, 8).unwrap();
        let options = PerspectiveOptions { camera_height: -100.0, wrap: true, ..Default::default() };
        screen.render_in_perspective(&ground, &options).unwrap();
        for y in 0..8 {
            let expected = if y < 4 { Color::BLUE } else { Color::TRANSPARENT };
            assert_eq!(screen.get_pixel(3, y).unwrap(), expected, "row {y}");
        }
    }

    #[test]
    fn test_without_wrap_samples_stay_in_bounds() {
        let ground = uniform(8, 8, Color::GREEN);
        let mut screen = Texture::new(8, 8).unwrap();
        let options = PerspectiveOptions {
            camera_height: 100.0,
            camera_y: 200,
            view_angle: FRAC_PI_2,
            ..Default::default()
        };
        screen.render_in_perspective(&ground, &options).unwrap();
        // row 6 sits at scale 50, putting only the centre column on the texture
        for y in 0..8 {
            for x in 0..8 {
                let expected = if (x, y) == (4, 6) { Color::GREEN } else { Color::TRANSPARENT };
                assert_eq!(screen.get_pixel(x, y).unwrap(), expected, "({x}, {y})");
            }
        }
    }

    #[test]
    fn test_blur_background_fades_alpha() {
        let ground = uniform(4, 4, Color::with_alpha(200, 100, 50, 255));
        let mut screen = Texture::new(8, 8).unwrap();
        let options = PerspectiveOptions {
            camera_height: 100.0,
            view_angle: FRAC_PI_2,
            wrap: true,
            blur: Blur::Background,
            ..Default::default()
        };
        screen.render_in_perspective(&ground, &options).unwrap();
        // row 6: scale 50, rate 5
        assert_eq!(screen.get_pixel(2, 6).unwrap(), Color::with_alpha(200, 100, 50, 5));
    }

    #[test]
    fn test_blur_color_fogs_toward_color() {
        let ground = uniform(4, 4, Color::with_alpha(200, 100, 50, 255));
        let mut screen = Texture::new(8, 8).unwrap();
        let options = PerspectiveOptions {
            camera_height: 100.0,
            view_angle: FRAC_PI_2,
            wrap: true,
            blur: Blur::Color(Color::BLACK),
            ..Default::default()
        };
        screen.render_in_perspective(&ground, &options).unwrap();
        assert_eq!(screen.get_pixel(2, 6).unwrap(), Color::with_alpha(3, 1, 0, 255));
    }

    #[test]
    fn test_paletted_destination_rejected() {
        let ground = uniform(2, 2, Color::RED);
        let mut screen = Texture::from_indexed(2, 2, vec![0; 4], vec![Color::BLACK]).unwrap();
        let options = PerspectiveOptions { camera_height: 10.0, ..Default::default() };
        assert!(matches!(
            screen.render_in_perspective(&ground, &options),
            Err(TextureError::PaletteLocked)
        ));
    }
}
