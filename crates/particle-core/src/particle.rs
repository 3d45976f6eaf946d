//! Per-particle simulation state and its lifecycle transitions.

use glam::{Mat4, Vec2, Vec3};

use crate::config::{RatePolicy, SpawnRanges};
use crate::random::{Draw, DrawSeed};
use crate::trajectory;
use crate::viewport::ViewportContext;

/// Outcome of the particle's most recent step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParticleState {
    /// Following its path.
    #[default]
    Active,
    /// The last step left the viewport or faded out.
    Retiring,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub trajectory_a: f32,
    pub trajectory_b: f32,
    /// Position along the path, in path-local units.
    pub position: Vec2,
    /// Signed advance speed along the path's x axis. Shares the sign of
    /// `trajectory_b`.
    pub rate: f32,
    pub opacity: f32,
    pub opacity_decay_rate: f32,
    /// Applied on top of the emitter transform.
    pub local_transform: Mat4,
    pub state: ParticleState,
}

/// `-1.0` for negative values and `-0.0`, `1.0` otherwise.
#[inline]
pub(crate) fn sign(value: f32) -> f32 {
    if value.is_sign_negative() {
        -1.0
    } else {
        1.0
    }
}

impl Particle {
    /// A freshly spawned particle for slot `slot`.
    pub fn spawn(slot: usize, base_transform: Mat4, seed: DrawSeed, ranges: &SpawnRanges) -> Self {
        let mut particle = Self {
            trajectory_a: 0.0,
            trajectory_b: 0.0,
            position: Vec2::ZERO,
            rate: 0.0,
            opacity: 0.0,
            opacity_decay_rate: 0.0,
            local_transform: Mat4::IDENTITY,
            state: ParticleState::Active,
        };
        particle.respawn(slot, base_transform, seed, ranges);
        particle
    }

    /// Reinitialise in place.
    ///
    /// Odd slots launch left (negative `trajectory_b`), even slots right;
    /// the rate takes the same sign.
    pub fn respawn(&mut self, slot: usize, base_transform: Mat4, seed: DrawSeed, ranges: &SpawnRanges) {
        let trajectory_a = seed.sample(Draw::TrajectoryA, &ranges.trajectory_a);

        let magnitude_b = seed.sample(Draw::TrajectoryB, &ranges.trajectory_b);
        let trajectory_b = if slot & 1 == 1 { -magnitude_b } else { magnitude_b };

        let magnitude_rate = seed.sample(Draw::Rate, &ranges.rate);
        let rate = sign(trajectory_b) * magnitude_rate;

        self.trajectory_a = trajectory_a;
        self.trajectory_b = trajectory_b;
        self.position = Vec2::ZERO;
        self.rate = rate;
        self.opacity = 1.0;
        self.opacity_decay_rate = seed.sample(Draw::OpacityDecay, &ranges.opacity_decay);
        self.local_transform = base_transform;
        self.state = ParticleState::Active;
    }

    /// Advance along the path and fade.
    pub fn integrate(&mut self, dt: f32, policy: RatePolicy) {
        if let RatePolicy::Accelerate { increase } = policy {
            self.rate += sign(self.rate) * increase;
        }

        self.position.x += self.rate * dt;
        self.position.y = trajectory::advance(self.position.x, self.trajectory_a, self.trajectory_b);
        self.opacity -= self.opacity_decay_rate * dt;
    }

    /// `emitter * translate(ndc(position) / scale_factor) * local`.
    ///
    /// The NDC delta is divided by the scale factor before the translation
    /// is built, so the emitter's own scale maps path units back onto the
    /// screen.
    pub fn screen_transform(&self, emitter_transform: &Mat4, scale_factor: f32, viewport: &ViewportContext) -> Mat4 {
        let offset = viewport.cartesian_to_ndc(self.position) / scale_factor;
        *emitter_transform * Mat4::from_translation(Vec3::new(offset.x, offset.y, 0.0)) * self.local_transform
    }

    pub fn rate_matches_direction(&self) -> bool {
        sign(self.rate) == sign(self.trajectory_b)
    }
}

/// Screen-space position carried by a transform's translation column.
#[inline]
pub fn screen_position(transform: &Mat4) -> Vec2 {
    Vec2::new(transform.w_axis.x, transform.w_axis.y)
}

/// Off the bottom of the viewport or fully transparent.
///
/// A non-finite screen height (a path that overflowed) also retires.
#[inline]
pub fn should_retire(screen_y: f32, opacity: f32) -> bool {
    !screen_y.is_finite() || screen_y < -1.0 || opacity < 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn(slot: usize) -> Particle {
        Particle::spawn(slot, Mat4::IDENTITY, DrawSeed::new(0.5, slot), &SpawnRanges::default())
    }

    #[test]
    fn fresh_particles_are_opaque_and_at_origin() {
        let particle = spawn(3);
        assert_eq!(particle.opacity, 1.0);
        assert_eq!(particle.position, Vec2::ZERO);
        assert_eq!(particle.state, ParticleState::Active);
    }

    #[test]
    fn slot_parity_picks_direction() {
        assert!(spawn(0).trajectory_b > 0.0);
        assert!(spawn(1).trajectory_b < 0.0);
        assert!(spawn(2).rate > 0.0);
        assert!(spawn(5).rate < 0.0);
    }

    #[test]
    fn rate_sign_follows_trajectory_b() {
        for slot in 0..256 {
            assert!(spawn(slot).rate_matches_direction(), "slot {slot}");
        }
    }

    #[test]
    fn draws_respect_ranges() {
        let ranges = SpawnRanges::default();
        for slot in 0..256 {
            let p = spawn(slot);
            assert!(p.trajectory_a >= ranges.trajectory_a.start && p.trajectory_a <= ranges.trajectory_a.end);
            assert!(p.trajectory_b.abs() >= ranges.trajectory_b.start && p.trajectory_b.abs() <= ranges.trajectory_b.end);
            assert!(p.rate.abs() >= ranges.rate.start && p.rate.abs() <= ranges.rate.end);
            assert!(p.opacity_decay_rate >= ranges.opacity_decay.start && p.opacity_decay_rate <= ranges.opacity_decay.end);
        }
    }

    #[test]
    fn respawn_applies_base_transform() {
        let base = Mat4::from_rotation_z(0.3);
        let mut particle = spawn(0);
        particle.respawn(0, base, DrawSeed::new(2.0, 0), &SpawnRanges::default());
        assert_eq!(particle.local_transform, base);
    }

    #[test]
    fn acceleration_keeps_direction() {
        let mut left = spawn(1);
        let before = left.rate;
        left.integrate(0.016, RatePolicy::Accelerate { increase: 0.5 });
        assert!(left.rate < before);
        assert!(left.rate_matches_direction());
    }

    #[test]
    fn constant_policy_keeps_rate() {
        let mut particle = spawn(0);
        let before = particle.rate;
        particle.integrate(0.016, RatePolicy::Constant);
        assert_eq!(particle.rate, before);
    }

    #[test]
    fn integrate_fades() {
        let mut particle = spawn(4);
        let before = particle.opacity;
        particle.integrate(0.1, RatePolicy::Constant);
        assert!(particle.opacity < before);
    }

    #[test]
    fn retirement_boundary_is_strict() {
        assert!(!should_retire(-1.0, 0.5));
        assert!(should_retire(-1.000_000_1, 0.5));
        assert!(should_retire(-1.0001, 0.5));
        assert!(!should_retire(0.0, 0.0));
        assert!(should_retire(0.0, -f32::EPSILON));
    }

    #[test]
    fn non_finite_heights_retire() {
        assert!(should_retire(f32::NAN, 1.0));
        assert!(should_retire(f32::NEG_INFINITY, 1.0));
        assert!(should_retire(f32::INFINITY, 1.0));
    }

    #[test]
    fn origin_particle_sits_on_emitter() {
        let particle = spawn(0);
        let emitter = Mat4::from_translation(Vec3::new(0.25, -0.5, 0.0));
        let transform = particle.screen_transform(&emitter, 0.05, &ViewportContext::new(800, 600));
        assert_eq!(screen_position(&transform), Vec2::new(0.25, -0.5));
    }

    #[test]
    fn scale_factor_cancels_emitter_scale() {
        let mut particle = spawn(0);
        particle.position = Vec2::new(40.0, 30.0);
        let emitter = Mat4::from_scale(Vec3::splat(0.05));
        let transform = particle.screen_transform(&emitter, 0.05, &ViewportContext::new(800, 600));
        let screen = screen_position(&transform);
        assert!((screen.x - 0.1).abs() < 1e-6);
        assert!((screen.y - 0.1).abs() < 1e-6);
    }
}
