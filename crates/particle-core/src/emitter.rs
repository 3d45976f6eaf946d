//! Emitter state: a fixed-size particle collection sharing one origin.
//!
//! This is the GPU-independent half of an emitter pool. The GL crate wraps
//! it together with the buffers the emitter renders from.

use anyhow::{Context, Result};
use glam::{Mat4, Vec2, Vec3};
use rand::Rng;
use tracing::debug;

use crate::config::{EmitterConfig, RatePolicy, SpawnRanges};
use crate::layout::ComputeParticle;
use crate::particle::Particle;
use crate::random::DrawSeed;
use crate::registry::Emitter;

/// The seed clock wraps here so `f32` keeps sub-millisecond resolution.
pub const CLOCK_WRAP: f32 = 1024.0;

/// How far from the edges random placement may land, in NDC.
const RANDOM_PLACEMENT_EXTENT: f32 = 0.9;

/// `translate(ndc) * scale(emitter_scale)`.
pub fn placement_transform(ndc: Vec2, emitter_scale: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(ndc.x, ndc.y, 0.0)) * Mat4::from_scale(Vec3::splat(emitter_scale))
}

/// A uniformly random NDC position away from the viewport edges.
pub fn random_placement<R: Rng>(rng: &mut R) -> Vec2 {
    Vec2::new(
        rng.random_range(-RANDOM_PLACEMENT_EXTENT..RANDOM_PLACEMENT_EXTENT),
        rng.random_range(-RANDOM_PLACEMENT_EXTENT..RANDOM_PLACEMENT_EXTENT),
    )
}

/// Per-step values copied out of the state before the particles are
/// borrowed mutably.
#[derive(Debug, Clone)]
pub struct StepParams {
    pub emitter_transform: Mat4,
    pub base_transform: Mat4,
    pub scale_factor: f32,
    pub rate_policy: RatePolicy,
    pub ranges: SpawnRanges,
    pub destroy_requested: bool,
    pub time: f32,
}

#[derive(Debug, Clone)]
pub struct EmitterState {
    config: EmitterConfig,
    particles: Vec<Particle>,
    emitter_transform: Mat4,
    particle_base_transform: Mat4,
    destroy_requested: bool,
    clock: f32,
}

impl EmitterState {
    /// Build `config.particle_count` active, fully opaque particles.
    ///
    /// `clock` seeds the first draws; pools spawned at different times get
    /// different particles.
    pub fn new(config: EmitterConfig, emitter_transform: Mat4, clock: f32) -> Result<Self> {
        config.validate().context("invalid emitter configuration")?;

        let clock = clock.rem_euclid(CLOCK_WRAP);
        let particle_base_transform = Mat4::IDENTITY;
        let particles = (0..config.particle_count as usize)
            .map(|slot| Particle::spawn(slot, particle_base_transform, DrawSeed::new(clock, slot), &config.ranges))
            .collect();

        debug!(count = config.particle_count, clock, "emitter state created");

        Ok(Self {
            config,
            particles,
            emitter_transform,
            particle_base_transform,
            destroy_requested: false,
            clock,
        })
    }

    /// An emitter centred on `ndc`, scaled by the configured emitter scale.
    pub fn at(config: EmitterConfig, ndc: Vec2, clock: f32) -> Result<Self> {
        let transform = placement_transform(ndc, config.emitter_scale);
        Self::new(config, transform, clock)
    }

    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    /// Host copy of the particles. Under compute simulation the live data
    /// sits in GPU buffers; this copy keeps its spawn-time values and is only
    /// truncated to the survivor count.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut Vec<Particle> {
        &mut self.particles
    }

    pub fn emitter_transform(&self) -> &Mat4 {
        &self.emitter_transform
    }

    pub fn emitter_transform_mut(&mut self) -> &mut Mat4 {
        &mut self.emitter_transform
    }

    /// Transform given to particles when they respawn.
    pub fn particle_base_transform(&self) -> &Mat4 {
        &self.particle_base_transform
    }

    pub fn particle_base_transform_mut(&mut self) -> &mut Mat4 {
        &mut self.particle_base_transform
    }

    pub fn scale_factor(&self) -> f32 {
        self.config.scale_factor
    }

    pub fn clock(&self) -> f32 {
        self.clock
    }

    /// Step the seed clock and return the new value.
    pub fn advance_clock(&mut self, dt: f32) -> f32 {
        self.clock = (self.clock + dt).rem_euclid(CLOCK_WRAP);
        self.clock
    }

    /// Advance the clock by `dt` and snapshot everything one step needs.
    pub fn begin_step(&mut self, dt: f32) -> StepParams {
        let time = self.advance_clock(dt);
        StepParams {
            emitter_transform: self.emitter_transform,
            base_transform: self.particle_base_transform,
            scale_factor: self.config.scale_factor,
            rate_policy: self.config.rate_policy,
            ranges: self.config.ranges.clone(),
            destroy_requested: self.destroy_requested,
            time,
        }
    }

    /// Particle state in the compute kernel's layout.
    pub fn compute_particles(&self) -> Vec<ComputeParticle> {
        self.particles.iter().map(ComputeParticle::from).collect()
    }

    /// Shrink to `count` particles. Used when the authoritative particle
    /// state lives on the GPU and only the survivor count comes back.
    pub fn truncate_particles(&mut self, count: usize) {
        self.particles.truncate(count);
    }
}

impl Emitter for EmitterState {
    fn request_destroy(&mut self) {
        if !self.destroy_requested {
            debug!(remaining = self.particles.len(), "emitter destroy requested");
        }
        self.destroy_requested = true;
    }

    fn is_destroy_requested(&self) -> bool {
        self.destroy_requested
    }

    fn is_destroyed(&self) -> bool {
        self.destroy_requested && self.particles.is_empty()
    }

    fn particle_count(&self) -> usize {
        self.particles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::ParticleState;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config(count: u32) -> EmitterConfig {
        EmitterConfig {
            particle_count: count,
            ..Default::default()
        }
    }

    #[test]
    fn new_pool_is_full_and_opaque() {
        let state = EmitterState::new(config(250), Mat4::IDENTITY, 0.0).unwrap();
        assert_eq!(state.particle_count(), 250);
        assert!(state
            .particles()
            .iter()
            .all(|p| p.state == ParticleState::Active && p.opacity == 1.0));
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(EmitterState::new(config(0), Mat4::IDENTITY, 0.0).is_err());
    }

    #[test]
    fn destroy_is_sticky() {
        let mut state = EmitterState::new(config(4), Mat4::IDENTITY, 0.0).unwrap();
        assert!(!state.is_destroy_requested());
        state.request_destroy();
        state.request_destroy();
        assert!(state.is_destroy_requested());
        assert!(!state.is_destroyed());
    }

    #[test]
    fn destroyed_only_once_empty() {
        let mut state = EmitterState::new(config(2), Mat4::IDENTITY, 0.0).unwrap();
        state.truncate_particles(0);
        assert!(!state.is_destroyed());
        state.request_destroy();
        assert!(state.is_destroyed());
    }

    #[test]
    fn placement_centres_on_ndc() {
        let transform = placement_transform(Vec2::new(-0.5, 0.25), 0.1);
        assert_eq!(transform.w_axis.truncate(), Vec3::new(-0.5, 0.25, 0.0));
        assert_eq!(transform.x_axis.x, 0.1);
    }

    #[test]
    fn random_placement_stays_inside() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let p = random_placement(&mut rng);
            assert!(p.x.abs() <= RANDOM_PLACEMENT_EXTENT && p.y.abs() <= RANDOM_PLACEMENT_EXTENT);
        }
    }

    #[test]
    fn clock_wraps() {
        let mut state = EmitterState::new(config(1), Mat4::IDENTITY, CLOCK_WRAP - 0.5).unwrap();
        let t = state.advance_clock(1.0);
        assert!((t - 0.5).abs() < 1e-3);
    }

    #[test]
    fn step_params_snapshot_destroy_flag() {
        let mut state = EmitterState::new(config(1), Mat4::IDENTITY, 0.0).unwrap();
        state.request_destroy();
        let params = state.begin_step(0.016);
        assert!(params.destroy_requested);
        assert!((params.time - 0.016).abs() < 1e-6);
    }
}
