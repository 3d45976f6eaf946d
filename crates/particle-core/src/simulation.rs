//! Host-side simulation step.
//!
//! Advances every particle once, recycles or drops the ones that retire,
//! and writes each survivor's screen transform and opacity straight into
//! the instance sink at its compacted slot.

use glam::Mat4;
use tracing::trace;

use crate::emitter::EmitterState;
use crate::layout::RawMat4;
use crate::particle::{should_retire, ParticleState};
use crate::random::DrawSeed;
use crate::viewport::ViewportContext;

/// Destination for per-instance render data.
pub trait InstanceSink {
    /// Store the instance data of the particle drawn at `slot`.
    fn write(&mut self, slot: usize, transform: &Mat4, opacity: f32);
}

/// Instance data written into two parallel slices, typically mapped GPU
/// buffer ranges.
pub struct InstanceSlices<'a> {
    pub transforms: &'a mut [RawMat4],
    pub opacities: &'a mut [f32],
}

impl InstanceSink for InstanceSlices<'_> {
    fn write(&mut self, slot: usize, transform: &Mat4, opacity: f32) {
        self.transforms[slot] = transform.to_cols_array_2d();
        self.opacities[slot] = opacity;
    }
}

/// Growable sink, handy when no GPU buffer is involved.
impl InstanceSink for Vec<(Mat4, f32)> {
    fn write(&mut self, slot: usize, transform: &Mat4, opacity: f32) {
        if slot == self.len() {
            self.push((*transform, opacity));
        } else {
            self[slot] = (*transform, opacity);
        }
    }
}

/// What one step did to an emitter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Particles drawn this frame.
    pub survivors: usize,
    pub respawned: usize,
    pub removed: usize,
}

/// Run one host simulation step over `state`.
///
/// A retiring particle is reset in place, or dropped when its emitter has
/// a pending destroy request. Dropped particles are not written, so the
/// first `survivors` sink slots always hold the current instances.
pub fn advance_host(
    state: &mut EmitterState,
    dt: f32,
    viewport: &ViewportContext,
    sink: &mut impl InstanceSink,
) -> StepReport {
    let params = state.begin_step(dt);
    let mut report = StepReport::default();
    let mut slot = 0;

    state.particles_mut().retain_mut(|particle| {
        particle.integrate(dt, params.rate_policy);

        let transform = particle.screen_transform(&params.emitter_transform, params.scale_factor, viewport);
        let retire = should_retire(transform.w_axis.y, particle.opacity);

        if retire && params.destroy_requested {
            report.removed += 1;
            return false;
        }

        sink.write(slot, &transform, particle.opacity);

        if retire {
            particle.respawn(slot, params.base_transform, DrawSeed::new(params.time, slot), &params.ranges);
            particle.state = ParticleState::Retiring;
            report.respawned += 1;
        } else {
            particle.state = ParticleState::Active;
        }

        slot += 1;
        true
    });

    report.survivors = slot;
    trace!(?report, "host step");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmitterConfig;
    use crate::registry::Emitter;
    use glam::Vec3;

    fn state(count: u32) -> EmitterState {
        let config = EmitterConfig {
            particle_count: count,
            ..Default::default()
        };
        EmitterState::new(config, Mat4::from_scale(Vec3::splat(0.025)), 0.0).unwrap()
    }

    #[test]
    fn writes_one_instance_per_particle() {
        let mut state = state(32);
        let mut sink: Vec<(Mat4, f32)> = Vec::new();
        let report = advance_host(&mut state, 0.016, &ViewportContext::new(800, 600), &mut sink);
        assert_eq!(report.survivors, 32);
        assert_eq!(sink.len(), 32);
    }

    #[test]
    fn slices_receive_columns() {
        let mut state = state(2);
        let mut transforms = [[[0.0; 4]; 4]; 2];
        let mut opacities = [0.0; 2];
        let mut sink = InstanceSlices {
            transforms: &mut transforms,
            opacities: &mut opacities,
        };
        advance_host(&mut state, 0.016, &ViewportContext::new(800, 600), &mut sink);
        assert!(opacities.iter().all(|o| *o > 0.9 && *o < 1.0));
        assert!(transforms.iter().all(|t| t[3][3] == 1.0));
    }

    #[test]
    fn faded_particles_respawn_when_alive() {
        let mut state = state(8);
        for particle in state.particles_mut().iter_mut() {
            particle.opacity = 0.0;
            particle.opacity_decay_rate = 1.0;
        }
        let mut sink: Vec<(Mat4, f32)> = Vec::new();
        let report = advance_host(&mut state, 0.1, &ViewportContext::new(800, 600), &mut sink);
        assert_eq!(report.respawned, 8);
        assert_eq!(state.particle_count(), 8);
        assert!(state
            .particles()
            .iter()
            .all(|p| p.opacity == 1.0 && p.state == ParticleState::Retiring));
    }

    #[test]
    fn faded_particles_drop_when_destroying() {
        let mut state = state(8);
        for (i, particle) in state.particles_mut().iter_mut().enumerate() {
            if i % 2 == 0 {
                particle.opacity = 0.0;
                particle.opacity_decay_rate = 1.0;
            }
        }
        state.request_destroy();
        let mut sink: Vec<(Mat4, f32)> = Vec::new();
        let report = advance_host(&mut state, 0.1, &ViewportContext::new(800, 600), &mut sink);
        assert_eq!(report.removed, 4);
        assert_eq!(report.survivors, 4);
        assert_eq!(state.particle_count(), 4);
        assert_eq!(sink.len(), 4);
    }

    #[test]
    fn removal_neither_skips_nor_repeats() {
        let mut state = state(6);
        for particle in state.particles_mut().iter_mut() {
            particle.opacity = 0.0;
            particle.opacity_decay_rate = 1.0;
        }
        state.request_destroy();
        let mut sink: Vec<(Mat4, f32)> = Vec::new();
        let report = advance_host(&mut state, 0.1, &ViewportContext::new(800, 600), &mut sink);
        assert_eq!(report.removed, 6);
        assert!(state.is_destroyed());
        assert!(sink.is_empty());
    }
}
