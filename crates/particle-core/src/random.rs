//! Seeded draws shared by the host simulation and the compute kernel.
//!
//! The compute stage has no general random engine, so both sides derive
//! their values from the same hash of `(slot + time, draw)`:
//!
//! ```text
//! uv    = (time + slot * 0.7548777, draw + 0.5698403)
//! h(uv) = fract(sin(dot(uv, (12.9898, 78.233))) * 43758.5453)
//! value = min + h(uv) * (max - min)
//! ```
//!
//! `particle_update.comp` implements the identical expression, so a host run
//! and a kernel run fed the same clock produce the same particles (up to the
//! GPU's `sin` precision).

use glam::Vec2;
use std::ops::Range;

const SLOT_STRIDE: f32 = 0.754_877_7;
const DRAW_OFFSET: f32 = 0.569_840_3;
const HASH_DIR: Vec2 = Vec2::new(12.9898, 78.233);
const HASH_SCALE: f32 = 43_758.547;

/// Index of each of the four respawn draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Draw {
    TrajectoryA = 0,
    TrajectoryB = 1,
    Rate = 2,
    OpacityDecay = 3,
}

/// `fract(sin(dot(uv, (12.9898, 78.233))) * 43758.5453)`, in `[0, 1)`.
#[inline]
pub fn hash01(uv: Vec2) -> f32 {
    let v = uv.dot(HASH_DIR).sin() * HASH_SCALE;
    let f = v - v.floor();
    // `v - floor(v)` rounds up to exactly 1.0 for tiny negative `v`.
    if f >= 1.0 {
        0.0
    } else {
        f
    }
}

/// The seed a single particle respawn draws from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawSeed {
    pub time: f32,
    pub slot: u32,
}

impl DrawSeed {
    pub fn new(time: f32, slot: usize) -> Self {
        Self {
            time,
            slot: slot as u32,
        }
    }

    pub fn uv(&self, draw: Draw) -> Vec2 {
        Vec2::new(
            self.time + self.slot as f32 * SLOT_STRIDE,
            draw as u32 as f32 + DRAW_OFFSET,
        )
    }

    /// A value in `range`, `range.start` inclusive.
    pub fn sample(&self, draw: Draw, range: &Range<f32>) -> f32 {
        range.start + hash01(self.uv(draw)) * (range.end - range.start)
    }
}
