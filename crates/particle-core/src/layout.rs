//! Byte layouts shared with GPU buffers.

use glam::{Mat4, Vec2};

use crate::particle::{Particle, ParticleState};

/// View a `#[repr(C)]` value as bytes for a buffer upload.
///
/// # Safety
///
/// Only implement on `#[repr(C)]` types whose fields are plain numeric
/// types (or arrays of them) with no implicit padding.
pub unsafe trait AsBytes: Sized {
    /// View `self` as a byte slice of length `size_of::<Self>()`.
    fn as_bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self as *const Self as *const u8, std::mem::size_of::<Self>()) }
    }
}

/// View a slice of plain values as bytes.
pub fn slice_as_bytes<T: AsBytes>(values: &[T]) -> &[u8] {
    // SAFETY: `T: AsBytes` has no padding, so every byte is initialised.
    unsafe { std::slice::from_raw_parts(values.as_ptr() as *const u8, std::mem::size_of_val(values)) }
}

/// Column-major 4x4 matrix as stored in vertex buffers and SSBOs.
pub type RawMat4 = [[f32; 4]; 4];

/// One particle as laid out in the compute kernel's std430 buffers.
///
/// ```text
/// offset  0  trajectory_a
///         4  trajectory_b
///         8  position (vec2, 8-aligned)
///        16  transform (mat4, 16-aligned)
///        80  rate
///        84  opacity
///        88  opacity_decay_rate
///        92  padding to the 16-byte struct alignment
/// ```
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComputeParticle {
    pub trajectory_a: f32,
    pub trajectory_b: f32,
    pub position: [f32; 2],
    pub transform: RawMat4,
    pub rate: f32,
    pub opacity: f32,
    pub opacity_decay_rate: f32,
    pub _padding: f32,
}

const _: () = assert!(std::mem::size_of::<ComputeParticle>() == 96);

// SAFETY: repr(C), f32 fields only, explicit tail padding field.
unsafe impl AsBytes for ComputeParticle {}

// SAFETY: plain numbers and arrays of them.
unsafe impl AsBytes for f32 {}
unsafe impl AsBytes for u32 {}
unsafe impl AsBytes for [f32; 4] {}
unsafe impl AsBytes for RawMat4 {}

impl From<&Particle> for ComputeParticle {
    fn from(particle: &Particle) -> Self {
        Self {
            trajectory_a: particle.trajectory_a,
            trajectory_b: particle.trajectory_b,
            position: particle.position.to_array(),
            transform: particle.local_transform.to_cols_array_2d(),
            rate: particle.rate,
            opacity: particle.opacity,
            opacity_decay_rate: particle.opacity_decay_rate,
            _padding: 0.0,
        }
    }
}

impl From<&ComputeParticle> for Particle {
    fn from(raw: &ComputeParticle) -> Self {
        Self {
            trajectory_a: raw.trajectory_a,
            trajectory_b: raw.trajectory_b,
            position: Vec2::from_array(raw.position),
            rate: raw.rate,
            opacity: raw.opacity,
            opacity_decay_rate: raw.opacity_decay_rate,
            local_transform: Mat4::from_cols_array_2d(&raw.transform),
            state: ParticleState::Active,
        }
    }
}

/// Byte stride of one per-instance transform.
pub const INSTANCE_TRANSFORM_STRIDE: usize = std::mem::size_of::<RawMat4>();

/// Byte stride of one per-instance opacity.
pub const INSTANCE_OPACITY_STRIDE: usize = std::mem::size_of::<f32>();

/// Byte offset of column `column` inside a per-instance transform.
pub const fn transform_column_offset(column: usize) -> usize {
    column * std::mem::size_of::<[f32; 4]>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpawnRanges;
    use crate::random::DrawSeed;
    use std::mem::offset_of;

    #[test]
    fn matches_std430_offsets() {
        assert_eq!(offset_of!(ComputeParticle, trajectory_a), 0);
        assert_eq!(offset_of!(ComputeParticle, trajectory_b), 4);
        assert_eq!(offset_of!(ComputeParticle, position), 8);
        assert_eq!(offset_of!(ComputeParticle, transform), 16);
        assert_eq!(offset_of!(ComputeParticle, rate), 80);
        assert_eq!(offset_of!(ComputeParticle, opacity), 84);
        assert_eq!(offset_of!(ComputeParticle, opacity_decay_rate), 88);
    }

    #[test]
    fn instance_strides_match_attributes() {
        assert_eq!(INSTANCE_TRANSFORM_STRIDE, 64);
        assert_eq!(INSTANCE_OPACITY_STRIDE, 4);
        assert_eq!(transform_column_offset(3), 48);
    }

    #[test]
    fn particle_survives_the_mirror() {
        let mut particle = Particle::spawn(1, Mat4::from_rotation_z(0.5), DrawSeed::new(1.0, 1), &SpawnRanges::default());
        particle.position = Vec2::new(3.0, -2.0);
        let raw = ComputeParticle::from(&particle);
        assert_eq!(Particle::from(&raw), particle);
    }

    #[test]
    fn byte_view_covers_whole_slice() {
        let particles = [ComputeParticle::from(&Particle::spawn(
            0,
            Mat4::IDENTITY,
            DrawSeed::new(0.0, 0),
            &SpawnRanges::default(),
        )); 3];
        assert_eq!(slice_as_bytes(&particles).len(), 3 * 96);
        assert_eq!(particles[0].as_bytes().len(), 96);
    }
}
