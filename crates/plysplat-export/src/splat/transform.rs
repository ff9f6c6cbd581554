//! Gaussian to splat record conversion
//!
//! Every function here is total: clipping happens before the byte cast, and
//! `as u8` saturates (NaN becomes 0), so no input can make a point fail.

use plysplat_core::{Color, SourcePoint, SplatRecord, Vec3};

/// Normalization of the zeroth-order real spherical harmonic, `1 / (2 * sqrt(pi))`
pub const SH_C0: f64 = 0.28209479177387814;

/// Log-scale to linear scale, per axis
pub fn linear_scale(scale_log: [f32; 3]) -> Vec3 {
    Vec3::new(scale_log[0].exp(), scale_log[1].exp(), scale_log[2].exp())
}

/// DC harmonic coefficients to 8-bit RGB.
///
/// The clip is applied in the 0-1 domain, before scaling to bytes.
pub fn sh_to_rgb(harmonic_dc: [f32; 3]) -> [u8; 3] {
    harmonic_dc.map(|dc| ((dc as f64 * SH_C0 + 0.5).clamp(0.0, 1.0) * 255.0) as u8)
}

/// Opacity logit to 8-bit alpha through a logistic sigmoid.
///
/// The exponential is taken at the stored `f32` precision; the rest of the
/// sigmoid is evaluated in `f64`. Bytes near a truncation boundary depend on
/// that split.
pub fn opacity_to_alpha(opacity_raw: f32) -> u8 {
    let falloff = f64::from((-opacity_raw).exp());
    let sigmoid = (1.0 / (1.0 + falloff)) * 255.0;
    sigmoid.clamp(0.0, 255.0) as u8
}

/// Quaternion components in roughly [-1, 1] to bytes centred on 128.
///
/// Components are quantized as given; a non-unit quaternion is not
/// normalized first.
pub fn quantize_rotation(rotation_raw: [f32; 4]) -> [u8; 4] {
    rotation_raw.map(|r| (r * 128.0 + 128.0).clamp(0.0, 255.0) as u8)
}

/// Convert one source Gaussian into its renderer-ready record
pub fn transform(point: &SourcePoint) -> SplatRecord {
    let [r, g, b] = sh_to_rgb(point.harmonic_dc);

    SplatRecord {
        position: point.position,
        scale: linear_scale(point.scale_log),
        color: Color::new(r, g, b, opacity_to_alpha(point.opacity_raw)),
        rotation: quantize_rotation(point.rotation_raw),
    }
}
