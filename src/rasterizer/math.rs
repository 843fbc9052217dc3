//! Vector and affine matrix math

use std::ops::{Add, Mul, Sub};

/// 3D vector in ground space (x/z on the ground plane, y up)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn scale(self, s: f64) -> Vec3 {
        Vec3 {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, s: f64) -> Vec3 {
        self.scale(s)
    }
}

/// 2x3 affine transform: `(x, y) -> (a*x + b*y + tx, c*x + d*y + ty)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineMatrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Default for AffineMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl AffineMatrix {
    pub const IDENTITY: AffineMatrix = AffineMatrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub fn new(a: f64, b: f64, c: f64, d: f64, tx: f64, ty: f64) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    pub fn is_regular(&self) -> bool {
        self.determinant() != 0.0
    }

    pub fn is_finite(&self) -> bool {
        [self.a, self.b, self.c, self.d, self.tx, self.ty]
            .iter()
            .all(|v| v.is_finite())
    }

    /// True when the linear part is the identity (translation ignored)
    pub fn is_identity_linear(&self) -> bool {
        self.a == 1.0 && self.b == 0.0 && self.c == 0.0 && self.d == 1.0
    }

    /// Replace `self` with `m2` applied after `self`
    pub fn concat(&mut self, m2: &AffineMatrix) {
        let m1 = *self;
        *self = AffineMatrix {
            a: m2.a * m1.a + m2.b * m1.c,
            b: m2.a * m1.b + m2.b * m1.d,
            c: m2.c * m1.a + m2.d * m1.c,
            d: m2.c * m1.b + m2.d * m1.d,
            tx: m2.a * m1.tx + m2.b * m1.ty + m2.tx,
            ty: m2.c * m1.tx + m2.d * m1.ty + m2.ty,
        };
    }

    /// Inverse transform, or `None` if the matrix is singular
    pub fn try_invert(&self) -> Option<AffineMatrix> {
        let det = self.determinant();
        if det == 0.0 {
            return None;
        }
        let a = self.d / det;
        let b = -self.b / det;
        let c = -self.c / det;
        let d = self.a / det;
        Some(AffineMatrix {
            a,
            b,
            c,
            d,
            tx: a * -self.tx + b * -self.ty,
            ty: c * -self.tx + d * -self.ty,
        })
    }

    /// Invert in place.
    ///
    /// # Panics
    ///
    /// Panics if the determinant is exactly zero. Callers are expected to
    /// check [`AffineMatrix::is_regular`] first.
    pub fn invert(&mut self) {
        match self.try_invert() {
            Some(inv) => *self = inv,
            None => panic!("invalid affine matrix: determinant is zero"),
        }
    }

    pub fn transform(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.b * y + self.tx,
            self.c * x + self.d * y + self.ty,
        )
    }
}
