//! Compile-time defaults and the per-emitter configuration built from them.

use anyhow::{ensure, Result};
use std::ops::Range;

/// Particles per emitter.
pub const DEFAULT_PARTICLE_COUNT: u32 = 1000;

/// Emitters spawned at start-up by the demo.
pub const DEFAULT_EMITTER_COUNT: u32 = 1;

/// Invocations per compute work group (`local_size_x` in the kernel).
pub const WORK_GROUP_SIZE: u32 = 64;

/// Converts NDC deltas back into path-local units.
pub const DEFAULT_SCALE_FACTOR: f32 = 0.025;

/// Uniform scale baked into a freshly spawned emitter's transform.
pub const DEFAULT_EMITTER_SCALE: f32 = 0.025;

/// Per-step rate increase used by [`RatePolicy::Accelerate`].
pub const DEFAULT_RATE_INCREASE: f32 = 0.01;

/// Texture slots the particle fragment shader can sample from.
pub const MAX_TEXTURE_SLOTS: u32 = 4;

pub const TRAJECTORY_A_RANGE: Range<f32> = 0.01..0.1;
pub const TRAJECTORY_B_RANGE: Range<f32> = 4.4..4.5;
pub const RATE_RANGE: Range<f32> = 10.5..30.0;
pub const OPACITY_DECAY_RANGE: Range<f32> = 0.05..0.1;

/// Ranges the four respawn draws are taken from. All are magnitudes; signs
/// are applied by the respawn rule.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRanges {
    pub trajectory_a: Range<f32>,
    pub trajectory_b: Range<f32>,
    pub rate: Range<f32>,
    pub opacity_decay: Range<f32>,
}

impl Default for SpawnRanges {
    fn default() -> Self {
        Self {
            trajectory_a: TRAJECTORY_A_RANGE,
            trajectory_b: TRAJECTORY_B_RANGE,
            rate: RATE_RANGE,
            opacity_decay: OPACITY_DECAY_RANGE,
        }
    }
}

impl SpawnRanges {
    pub fn validate(&self) -> Result<()> {
        for (name, range) in [
            ("trajectory_a", &self.trajectory_a),
            ("trajectory_b", &self.trajectory_b),
            ("rate", &self.rate),
            ("opacity_decay", &self.opacity_decay),
        ] {
            ensure!(
                range.start.is_finite() && range.end.is_finite(),
                "{name} range must be finite, got {range:?}"
            );
            ensure!(
                range.start > 0.0 && range.start <= range.end,
                "{name} range must be positive and ordered, got {range:?}"
            );
        }
        Ok(())
    }
}

/// Whether a particle's rate grows after spawn.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RatePolicy {
    #[default]
    Constant,
    /// `rate += sign(rate) * increase` every step.
    Accelerate { increase: f32 },
}

impl RatePolicy {
    /// Per-step increase handed to the compute kernel; zero means constant.
    pub fn increase(&self) -> f32 {
        match *self {
            RatePolicy::Constant => 0.0,
            RatePolicy::Accelerate { increase } => increase,
        }
    }
}

/// Everything needed to build one emitter.
#[derive(Debug, Clone, PartialEq)]
pub struct EmitterConfig {
    pub particle_count: u32,
    pub scale_factor: f32,
    pub emitter_scale: f32,
    pub texture_count: u32,
    pub ranges: SpawnRanges,
    pub rate_policy: RatePolicy,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            particle_count: DEFAULT_PARTICLE_COUNT,
            scale_factor: DEFAULT_SCALE_FACTOR,
            emitter_scale: DEFAULT_EMITTER_SCALE,
            texture_count: 2,
            ranges: SpawnRanges::default(),
            rate_policy: RatePolicy::Constant,
        }
    }
}

impl EmitterConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.particle_count > 0, "particle_count must be at least 1");
        ensure!(
            self.scale_factor.is_finite() && self.scale_factor > 0.0,
            "scale_factor must be positive, got {}",
            self.scale_factor
        );
        ensure!(
            self.emitter_scale.is_finite() && self.emitter_scale > 0.0,
            "emitter_scale must be positive, got {}",
            self.emitter_scale
        );
        ensure!(
            (1..=MAX_TEXTURE_SLOTS).contains(&self.texture_count),
            "texture_count must be within 1..={MAX_TEXTURE_SLOTS}, got {}",
            self.texture_count
        );
        if let RatePolicy::Accelerate { increase } = self.rate_policy {
            ensure!(
                increase.is_finite() && increase >= 0.0,
                "rate increase must be non-negative, got {increase}"
            );
        }
        self.ranges.validate()
    }
}

/// Work groups needed to cover `particle_count` invocations.
pub fn dispatch_groups(particle_count: u32) -> u32 {
    particle_count.div_ceil(WORK_GROUP_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        EmitterConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_empty_emitters() {
        let config = EmitterConfig {
            particle_count: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_ranges() {
        let mut config = EmitterConfig::default();
        config.ranges.rate = 30.0..10.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("rate"));
    }

    #[test]
    fn rejects_signed_ranges() {
        let mut config = EmitterConfig::default();
        config.ranges.trajectory_b = -4.5..4.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_too_many_textures() {
        let config = EmitterConfig {
            texture_count: MAX_TEXTURE_SLOTS + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn dispatch_covers_every_particle() {
        assert_eq!(dispatch_groups(1), 1);
        assert_eq!(dispatch_groups(64), 1);
        assert_eq!(dispatch_groups(65), 2);
        assert_eq!(dispatch_groups(1000), 16);
        assert_eq!(dispatch_groups(0), 0);
    }

    #[test]
    fn constant_policy_has_no_increase() {
        assert_eq!(RatePolicy::Constant.increase(), 0.0);
        assert_eq!(RatePolicy::Accelerate { increase: 0.25 }.increase(), 0.25);
    }
}
