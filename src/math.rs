//! Minimal rigid-transform algebra for calibration queries.
//!
//! Just enough linear algebra to compose and invert stream extrinsics and
//! transform points between stream coordinate frames. All types are plain
//! `Copy` values with no failure modes.

use std::ops::{Add, Mul};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Float3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Column-major 3x3 matrix: `x`, `y`, `z` are the columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Float3x3 {
    pub x: Float3,
    pub y: Float3,
    pub z: Float3,
}

/// Rigid transform: `p' = orientation * p + position`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub orientation: Float3x3,
    pub position: Float3,
}

impl Float3 {
    pub const ZERO: Float3 = Float3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Float3 { x, y, z }
    }
}

impl Add for Float3 {
    type Output = Float3;
    fn add(self, b: Float3) -> Float3 {
        Float3::new(self.x + b.x, self.y + b.y, self.z + b.z)
    }
}

impl Mul<f32> for Float3 {
    type Output = Float3;
    fn mul(self, b: f32) -> Float3 {
        Float3::new(self.x * b, self.y * b, self.z * b)
    }
}

impl Float3x3 {
    pub const IDENTITY: Float3x3 = Float3x3 {
        x: Float3 { x: 1.0, y: 0.0, z: 0.0 },
        y: Float3 { x: 0.0, y: 1.0, z: 0.0 },
        z: Float3 { x: 0.0, y: 0.0, z: 1.0 },
    };

    pub fn transpose(&self) -> Float3x3 {
        Float3x3 {
            x: Float3::new(self.x.x, self.y.x, self.z.x),
            y: Float3::new(self.x.y, self.y.y, self.z.y),
            z: Float3::new(self.x.z, self.y.z, self.z.z),
        }
    }
}

impl Mul<Float3> for Float3x3 {
    type Output = Float3;
    fn mul(self, b: Float3) -> Float3 {
        self.x * b.x + self.y * b.y + self.z * b.z
    }
}

impl Mul for Float3x3 {
    type Output = Float3x3;
    fn mul(self, b: Float3x3) -> Float3x3 {
        Float3x3 {
            x: self * b.x,
            y: self * b.y,
            z: self * b.z,
        }
    }
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        orientation: Float3x3::IDENTITY,
        position: Float3::ZERO,
    };

    /// Apply this transform to a point.
    pub fn transform(&self, p: Float3) -> Float3 {
        self.orientation * p + self.position
    }

    /// Inverse transform. Valid because calibration orientations are
    /// orthonormal, so the inverse rotation is the transpose.
    pub fn inverse(&self) -> Pose {
        let inv = self.orientation.transpose();
        Pose {
            orientation: inv,
            position: inv * (self.position * -1.0),
        }
    }
}

/// Composition: applying `a * b` is applying `b`, then `a`.
impl Mul for Pose {
    type Output = Pose;
    fn mul(self, b: Pose) -> Pose {
        Pose {
            orientation: self.orientation * b.orientation,
            position: self.transform(b.position),
        }
    }
}
