//! Light values and their GPU record format
//!
//! A [`Light`] only describes *what* a light emits. Where it sits and how it
//! is oriented belongs to the scene object that carries it, and is supplied
//! separately when the light is packed into the light uniform buffer.
//!
//! # Record layout
//!
//! Each light occupies [`Light::ENCODED_SIZE`] bytes laid out for a std140
//! uniform block:
//!
//! | Offset | Field | Size |
//! |---|---|---|
//! | 0 | light type (`int`, -1 = unused) | 4 |
//! | 16 | color (`vec3`) | 12 |
//! | 28 | intensity (`float`) | 4 |
//! | 32 | position (`vec3`) | 12 |
//! | 48 | rotation (`vec3`) | 12 |
//! | 60 | inner cutoff (`float`) | 4 |
//! | 64 | outer cutoff (`float`) | 4 |
//!
//! The light shaders declare the same block; both sides must change together.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{SceneError, SceneResult};
use crate::foundation::math::{utils, Vec3};

/// Byte offsets of the fields inside one light record
pub mod layout {
    /// `int` light type
    pub const LIGHT_TYPE: usize = 0;
    /// `vec3` color (std140 aligns vec3 to 16 bytes)
    pub const COLOR: usize = 16;
    /// `float` intensity, packed into the tail of the color vec4 slot
    pub const INTENSITY: usize = 28;
    /// `vec3` world position
    pub const POSITION: usize = 32;
    /// `vec3` Euler rotation in radians
    pub const ROTATION: usize = 48;
    /// `float` cosine of the inner cone half-angle
    pub const INNER_CUTOFF: usize = 60;
    /// `float` cosine of the outer cone half-angle
    pub const OUTER_CUTOFF: usize = 64;
    /// Size of a whole record, padded to the 16-byte array stride
    pub const RECORD_SIZE: usize = 80;

    pub(crate) const SCALAR: usize = 4;
    pub(crate) const VEC3: usize = 12;

    const _: () = {
        assert!(LIGHT_TYPE + SCALAR <= COLOR);
        assert!(COLOR % 16 == 0);
        assert!(COLOR + VEC3 <= INTENSITY);
        assert!(INTENSITY + SCALAR <= POSITION);
        assert!(POSITION % 16 == 0);
        assert!(POSITION + VEC3 <= ROTATION);
        assert!(ROTATION % 16 == 0);
        assert!(ROTATION + VEC3 <= INNER_CUTOFF);
        assert!(INNER_CUTOFF + SCALAR <= OUTER_CUTOFF);
        assert!(OUTER_CUTOFF + SCALAR <= RECORD_SIZE);
        assert!(RECORD_SIZE % 16 == 0);
    };
}

/// Kind of light, with the integer tags the shaders switch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum LightType {
    /// Unused slot / no light
    #[default]
    Invalid = -1,
    /// Omnidirectional point light
    Point = 0,
    /// Parallel rays (sun)
    Directional = 1,
    /// Cone of light
    Spot = 2,
    /// Area light
    Area = 3,
}

impl LightType {
    /// Integer tag written into the GPU record
    pub const fn raw(self) -> i32 {
        self as i32
    }

    /// Parse a GPU tag
    pub const fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            -1 => Some(Self::Invalid),
            0 => Some(Self::Point),
            1 => Some(Self::Directional),
            2 => Some(Self::Spot),
            3 => Some(Self::Area),
            _ => None,
        }
    }
}

impl fmt::Display for LightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Invalid => "invalid",
            Self::Point => "point",
            Self::Directional => "directional",
            Self::Spot => "spot",
            Self::Area => "area",
        };
        f.write_str(name)
    }
}

/// Non-positional attributes of a light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    light_type: LightType,
    color: Vec3,
    intensity: f32,
    inner_cutoff: f32,
    outer_cutoff: f32,
}

impl Light {
    /// Bytes one light occupies in the light uniform buffer
    pub const ENCODED_SIZE: usize = layout::RECORD_SIZE;

    /// The "no light" value carried by every non-light scene object
    pub const SENTINEL: Self = Self {
        light_type: LightType::Invalid,
        color: Vec3::new(1.0, 1.0, 1.0),
        intensity: 1.0,
        inner_cutoff: 0.976_296,
        outer_cutoff: 0.953_717,
    };

    /// Create a light with the default spot cone
    pub fn new(light_type: LightType, color: Vec3, intensity: f32) -> Self {
        let (inner_cutoff, outer_cutoff) = Self::default_cutoffs();
        Self {
            light_type,
            color,
            intensity,
            inner_cutoff,
            outer_cutoff,
        }
    }

    /// Point light
    pub fn point(color: Vec3, intensity: f32) -> Self {
        Self::new(LightType::Point, color, intensity)
    }

    /// Directional light
    pub fn directional(color: Vec3, intensity: f32) -> Self {
        Self::new(LightType::Directional, color, intensity)
    }

    /// Spot light with cone half-angles given in degrees
    pub fn spot(color: Vec3, intensity: f32, inner_degrees: f32, outer_degrees: f32) -> Self {
        Self::new(LightType::Spot, color, intensity).with_cutoffs(
            utils::deg_to_rad(inner_degrees).cos(),
            utils::deg_to_rad(outer_degrees).cos(),
        )
    }

    /// Replace the cone cutoffs (cosines of the half-angles)
    #[must_use]
    pub fn with_cutoffs(mut self, inner_cutoff: f32, outer_cutoff: f32) -> Self {
        self.inner_cutoff = inner_cutoff;
        self.outer_cutoff = outer_cutoff;
        self
    }

    /// `cos(12.5°)` and `cos(17.5°)`
    pub fn default_cutoffs() -> (f32, f32) {
        (
            utils::deg_to_rad(12.5).cos(),
            utils::deg_to_rad(17.5).cos(),
        )
    }

    /// Bytes one light occupies in the light uniform buffer
    pub const fn encoded_size() -> usize {
        Self::ENCODED_SIZE
    }

    /// Light type
    pub fn light_type(&self) -> LightType {
        self.light_type
    }

    /// Whether this is the "no light" value
    pub fn is_sentinel(&self) -> bool {
        self.light_type == LightType::Invalid
    }

    /// Emitted color
    pub fn color(&self) -> Vec3 {
        self.color
    }

    /// Intensity multiplier
    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Cosine of the inner cone half-angle
    pub fn inner_cutoff(&self) -> f32 {
        self.inner_cutoff
    }

    /// Cosine of the outer cone half-angle
    pub fn outer_cutoff(&self) -> f32 {
        self.outer_cutoff
    }

    /// Write this light into the first [`Self::ENCODED_SIZE`] bytes of `bytes`
    ///
    /// `position` and `rotation` come from the scene object carrying the
    /// light. Padding bytes are zeroed. Nothing outside the record is read or
    /// written, and a slice shorter than one record is rejected untouched.
    pub fn encode_into(&self, bytes: &mut [u8], position: &Vec3, rotation: &Vec3) -> SceneResult<()> {
        let record = record_mut(bytes)?;
        record.fill(0);
        write_i32(record, layout::LIGHT_TYPE, self.light_type.raw());
        write_vec3(record, layout::COLOR, &self.color);
        write_f32(record, layout::INTENSITY, self.intensity);
        write_vec3(record, layout::POSITION, position);
        write_vec3(record, layout::ROTATION, rotation);
        write_f32(record, layout::INNER_CUTOFF, self.inner_cutoff);
        write_f32(record, layout::OUTER_CUTOFF, self.outer_cutoff);
        Ok(())
    }

    /// Write an unused-slot record (type -1, everything else zero)
    pub fn encode_sentinel(bytes: &mut [u8]) -> SceneResult<()> {
        let record = record_mut(bytes)?;
        record.fill(0);
        write_i32(record, layout::LIGHT_TYPE, LightType::Invalid.raw());
        Ok(())
    }
}

impl Default for Light {
    fn default() -> Self {
        Self::new(LightType::Invalid, Vec3::new(1.0, 1.0, 1.0), 1.0)
    }
}

/// A light record decoded back from buffer bytes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightRecord {
    /// Raw type tag
    pub light_type: i32,
    /// Color
    pub color: Vec3,
    /// Intensity
    pub intensity: f32,
    /// Position of the carrying object
    pub position: Vec3,
    /// Rotation of the carrying object
    pub rotation: Vec3,
    /// Inner cutoff
    pub inner_cutoff: f32,
    /// Outer cutoff
    pub outer_cutoff: f32,
}

impl LightRecord {
    /// Decode the record stored in the first [`Light::ENCODED_SIZE`] bytes
    pub fn read(bytes: &[u8]) -> SceneResult<Self> {
        let record = bytes.get(..Light::ENCODED_SIZE).ok_or(SceneError::BufferTooSmall {
            required: Light::ENCODED_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self {
            light_type: read_i32(record, layout::LIGHT_TYPE),
            color: read_vec3(record, layout::COLOR),
            intensity: read_f32(record, layout::INTENSITY),
            position: read_vec3(record, layout::POSITION),
            rotation: read_vec3(record, layout::ROTATION),
            inner_cutoff: read_f32(record, layout::INNER_CUTOFF),
            outer_cutoff: read_f32(record, layout::OUTER_CUTOFF),
        })
    }

    /// Whether the record marks an unused slot
    pub fn is_sentinel(&self) -> bool {
        self.light_type == LightType::Invalid.raw()
    }

    /// The light value, if the type tag is known
    pub fn light(&self) -> Option<Light> {
        let light_type = LightType::from_raw(self.light_type)?;
        Some(Light::new(light_type, self.color, self.intensity).with_cutoffs(self.inner_cutoff, self.outer_cutoff))
    }
}

fn record_mut(bytes: &mut [u8]) -> SceneResult<&mut [u8]> {
    let actual = bytes.len();
    bytes.get_mut(..Light::ENCODED_SIZE).ok_or(SceneError::BufferTooSmall {
        required: Light::ENCODED_SIZE,
        actual,
    })
}

pub(crate) fn write_i32(bytes: &mut [u8], offset: usize, value: i32) {
    bytes[offset..offset + layout::SCALAR].copy_from_slice(bytemuck::bytes_of(&value));
}

fn write_f32(bytes: &mut [u8], offset: usize, value: f32) {
    bytes[offset..offset + layout::SCALAR].copy_from_slice(bytemuck::bytes_of(&value));
}

fn write_vec3(bytes: &mut [u8], offset: usize, value: &Vec3) {
    bytes[offset..offset + layout::VEC3].copy_from_slice(bytemuck::cast_slice(value.as_slice()));
}

pub(crate) fn read_i32(bytes: &[u8], offset: usize) -> i32 {
    bytemuck::pod_read_unaligned(&bytes[offset..offset + layout::SCALAR])
}

fn read_f32(bytes: &[u8], offset: usize) -> f32 {
    bytemuck::pod_read_unaligned(&bytes[offset..offset + layout::SCALAR])
}

fn read_vec3(bytes: &[u8], offset: usize) -> Vec3 {
    Vec3::new(
        read_f32(bytes, offset),
        read_f32(bytes, offset + layout::SCALAR),
        read_f32(bytes, offset + 2 * layout::SCALAR),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let light = Light::default();
        assert_eq!(light.light_type(), LightType::Invalid);
        assert!(light.is_sentinel());
        assert_eq!(light.color(), Vec3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(light.intensity(), 1.0);
        assert_relative_eq!(light.inner_cutoff(), 12.5_f32.to_radians().cos());
        assert_relative_eq!(light.outer_cutoff(), 17.5_f32.to_radians().cos());
    }

    #[test]
    fn test_sentinel_constant_matches_default() {
        let default = Light::default();
        let sentinel = Light::SENTINEL;
        assert_eq!(sentinel.light_type(), default.light_type());
        assert_relative_eq!(sentinel.inner_cutoff(), default.inner_cutoff(), epsilon = 1e-5);
        assert_relative_eq!(sentinel.outer_cutoff(), default.outer_cutoff(), epsilon = 1e-5);
    }

    #[test]
    fn test_encoded_size_is_fixed() {
        assert_eq!(Light::encoded_size(), 80);
        assert_eq!(Light::ENCODED_SIZE, layout::RECORD_SIZE);
    }

    #[test]
    fn test_raw_tags() {
        assert_eq!(LightType::Invalid.raw(), -1);
        assert_eq!(LightType::Point.raw(), 0);
        assert_eq!(LightType::Directional.raw(), 1);
        assert_eq!(LightType::Spot.raw(), 2);
        assert_eq!(LightType::Area.raw(), 3);
        assert_eq!(LightType::from_raw(2), Some(LightType::Spot));
        assert_eq!(LightType::from_raw(4), None);
    }

    #[test]
    fn test_encode_then_read_back() {
        let lights = [
            Light::point(Vec3::new(1.0, 0.5, 0.25), 2.0),
            Light::directional(Vec3::new(0.9, 0.9, 1.0), 0.3),
            Light::spot(Vec3::new(1.0, 1.0, 1.0), 4.0, 10.0, 20.0),
            Light::new(LightType::Area, Vec3::new(0.0, 1.0, 0.0), 7.5).with_cutoffs(0.1, 0.2),
        ];
        let position = Vec3::new(1.0, 1.5, 1.0);
        let rotation = Vec3::new(0.0, -1.57, 3.14);

        for light in lights {
            let mut bytes = [0xAA_u8; Light::ENCODED_SIZE];
            light.encode_into(&mut bytes, &position, &rotation).unwrap();

            let record = LightRecord::read(&bytes).unwrap();
            assert_eq!(record.light_type, light.light_type().raw());
            assert_eq!(record.color, light.color());
            assert_eq!(record.intensity, light.intensity());
            assert_eq!(record.position, position);
            assert_eq!(record.rotation, rotation);
            assert_eq!(record.inner_cutoff, light.inner_cutoff());
            assert_eq!(record.outer_cutoff, light.outer_cutoff());
            assert_eq!(record.light(), Some(light));
        }
    }

    #[test]
    fn test_raw_bytes_at_documented_offsets() {
        let light = Light::point(Vec3::new(0.25, 0.5, 0.75), 2.0);
        let mut bytes = [0_u8; Light::ENCODED_SIZE];
        light
            .encode_into(&mut bytes, &Vec3::new(1.0, 1.5, 1.0), &Vec3::zeros())
            .unwrap();

        assert_eq!(&bytes[0..4], &0_i32.to_ne_bytes());
        assert_eq!(&bytes[16..20], &0.25_f32.to_ne_bytes());
        assert_eq!(&bytes[24..28], &0.75_f32.to_ne_bytes());
        assert_eq!(&bytes[28..32], &2.0_f32.to_ne_bytes());
        assert_eq!(&bytes[32..36], &1.0_f32.to_ne_bytes());
        assert_eq!(&bytes[36..40], &1.5_f32.to_ne_bytes());
        // Padding between the type and the color stays zero
        assert!(bytes[4..16].iter().all(|b| *b == 0));
        assert!(bytes[68..80].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_encode_stays_inside_record() {
        let light = Light::point(Vec3::new(1.0, 1.0, 1.0), 1.0);
        let mut bytes = [0xEE_u8; Light::ENCODED_SIZE + 16];
        light
            .encode_into(&mut bytes, &Vec3::zeros(), &Vec3::zeros())
            .unwrap();
        assert!(bytes[Light::ENCODED_SIZE..].iter().all(|b| *b == 0xEE));
    }

    #[test]
    fn test_short_slice_rejected_untouched() {
        let light = Light::point(Vec3::new(1.0, 1.0, 1.0), 1.0);
        let mut bytes = [0x11_u8; 64];
        let result = light.encode_into(&mut bytes, &Vec3::zeros(), &Vec3::zeros());
        assert!(matches!(result, Err(SceneError::BufferTooSmall { required: 80, actual: 64 })));
        assert!(bytes.iter().all(|b| *b == 0x11));
        assert!(LightRecord::read(&bytes).is_err());
    }

    #[test]
    fn test_sentinel_record() {
        let mut bytes = [0xFF_u8; Light::ENCODED_SIZE];
        Light::encode_sentinel(&mut bytes).unwrap();
        let record = LightRecord::read(&bytes).unwrap();
        assert!(record.is_sentinel());
        assert_eq!(record.color, Vec3::zeros());
        assert_eq!(record.light().map(|l| l.light_type()), Some(LightType::Invalid));
    }
}
