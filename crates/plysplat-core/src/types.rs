//! Common types used across plysplat
//!
//! `SourcePoint` is one Gaussian as stored in a training-output PLY file;
//! `SplatRecord` is the same Gaussian after conversion, ready to be packed
//! into a 32-byte `.splat` record.

use serde::{Deserialize, Serialize};

/// Size in bytes of one packed `.splat` record
pub const SPLAT_RECORD_SIZE: usize = 32;

/// 3D vector (position, normal, scale)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };
    pub const ONE: Self = Self { x: 1.0, y: 1.0, z: 1.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn from_array(v: [f32; 3]) -> Self {
        Self { x: v[0], y: v[1], z: v[2] }
    }

    pub fn to_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl Default for Vec3 {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub const ZERO: Self = Self {
        min: Vec3::ZERO,
        max: Vec3::ZERO,
    };

    /// An inverted box that any expanded point will replace
    pub const EMPTY: Self = Self {
        min: Vec3 { x: f32::MAX, y: f32::MAX, z: f32::MAX },
        max: Vec3 { x: f32::MIN, y: f32::MIN, z: f32::MIN },
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Bounds of a set of points, `None` when the set is empty
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Option<Self> {
        let mut bbox = Self::EMPTY;
        let mut any = false;
        for point in points {
            bbox.expand(*point);
            any = true;
        }
        any.then_some(bbox)
    }

    pub fn expand(&mut self, point: Vec3) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.min.z = self.min.z.min(point.z);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.max.z = self.max.z.max(point.z);
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Color in RGBA format (0-255 per channel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// One Gaussian as read from the source point set.
///
/// Every field is raw training output: scale is a log-scale, opacity is a
/// pre-sigmoid logit, rotation is an unnormalized quaternion and color is
/// stored as spherical-harmonic coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePoint {
    /// `x`, `y`, `z`
    pub position: Vec3,
    /// `nx`, `ny`, `nz`; carried through parsing but never written out
    pub normal: Vec3,
    /// `f_dc_0..2`, zeroth-order SH coefficient per color channel
    pub harmonic_dc: [f32; 3],
    /// `f_rest_*`, higher-order SH coefficients
    pub harmonic_rest: Vec<f32>,
    /// `opacity`, logit
    pub opacity_raw: f32,
    /// `scale_0..2`, natural-log scale per axis
    pub scale_log: [f32; 3],
    /// `rot_0..3`
    pub rotation_raw: [f32; 4],
}

impl Default for SourcePoint {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            normal: Vec3::ZERO,
            harmonic_dc: [0.0; 3],
            harmonic_rest: Vec::new(),
            opacity_raw: 0.0,
            scale_log: [0.0; 3],
            rotation_raw: [0.0; 4],
        }
    }
}

/// One Gaussian in renderer-ready form; packs to `SPLAT_RECORD_SIZE` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplatRecord {
    pub position: Vec3,
    /// Linear scale, `exp` of the source log-scale
    pub scale: Vec3,
    /// RGB from the DC harmonic, alpha from the opacity logit
    pub color: Color,
    /// Quaternion components quantized as `r * 128 + 128`
    pub rotation: [u8; 4],
}
