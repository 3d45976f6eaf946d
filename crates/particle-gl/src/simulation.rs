//! Where an emitter's particles are advanced: on the host, or in the
//! compute kernel.

use anyhow::{Context, Result};
use particle_core::config::dispatch_groups;
use particle_core::kernel::KernelUniforms;
use particle_core::layout::RawMat4;
use particle_core::registry::Emitter;
use particle_core::simulation::{advance_host, InstanceSlices};
use particle_core::ViewportContext;
use tracing::trace;

use crate::pool::EmitterPool;
use crate::resources::SharedResources;
use crate::sync::{barrier_compute_to_draw, Fence};

/// Storage buffer binding points used by `particle_update.comp`.
pub mod binding {
    pub const INPUT_PARTICLES: u32 = 0;
    pub const OUTPUT_PARTICLES: u32 = 1;
    pub const OUTPUT_TRANSFORMS: u32 = 2;
    pub const OUTPUT_OPACITIES: u32 = 3;
    pub const SURVIVORS: u32 = 4;
}

pub trait SimulationStrategy {
    fn name(&self) -> &'static str;

    /// Whether pools need [`ComputeBuffers`](crate::pool::ComputeBuffers).
    fn uses_compute_buffers(&self) -> bool {
        false
    }

    /// Advance `pool` by `dt` and leave its instance buffers holding exactly
    /// `pool.instance_count()` instances.
    fn update(
        &self,
        resources: &SharedResources,
        pool: &mut EmitterPool,
        dt: f32,
        viewport: &ViewportContext,
    ) -> Result<()>;

    /// Called once the pool's draw has been issued.
    fn after_draw(&self, _pool: &mut EmitterPool) -> Result<()> {
        Ok(())
    }
}

/// Simulate on the CPU and stream the results through mapped buffers.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostSimulation;

impl SimulationStrategy for HostSimulation {
    fn name(&self) -> &'static str {
        "host"
    }

    fn update(
        &self,
        _resources: &SharedResources,
        pool: &mut EmitterPool,
        dt: f32,
        viewport: &ViewportContext,
    ) -> Result<()> {
        let count = pool.state.particle_count();
        if count == 0 {
            pool.instance_count = 0;
            return Ok(());
        }

        let mut transforms = pool.transforms.map_write::<RawMat4>(count)?;
        let mut opacities = pool.opacities.map_write::<f32>(count)?;
        let mut sink = InstanceSlices {
            transforms: &mut transforms,
            opacities: &mut opacities,
        };

        let report = advance_host(&mut pool.state, dt, viewport, &mut sink);
        pool.instance_count = report.survivors;
        Ok(())
    }
}

/// Simulate in `particle_update.comp` and draw straight from its output.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeviceSimulation;

impl SimulationStrategy for DeviceSimulation {
    fn name(&self) -> &'static str {
        "device"
    }

    fn uses_compute_buffers(&self) -> bool {
        true
    }

    fn update(
        &self,
        resources: &SharedResources,
        pool: &mut EmitterPool,
        dt: f32,
        viewport: &ViewportContext,
    ) -> Result<()> {
        let program = resources
            .compute_program()
            .context("device simulation needs the compute program")?;
        let compute = pool
            .compute
            .as_ref()
            .context("pool was created without compute buffers")?;

        let count = pool.state.particle_count() as u32;
        let u = KernelUniforms::for_step(&mut pool.state, dt, viewport, count);
        if count == 0 {
            pool.instance_count = 0;
            return Ok(());
        }

        program.bind();
        program.set("EmitterTransform", u.emitter_transform)?;
        program.set("ParticleTransform", u.particle_transform)?;
        program.set("WindowWidth", u.window_width)?;
        program.set("WindowHeight", u.window_height)?;
        program.set("ParticleScaleFactor", u.scale_factor)?;
        program.set("DeltaTime", u.delta_time)?;
        program.set("Time", u.time)?;
        program.set("ParticleCount", u.particle_count)?;
        program.set("DestroyRequested", u32::from(u.destroy_requested))?;
        program.set("RateIncrease", u.rate_increase)?;
        program.set("TrajectoryARange", range_uniform(&u.ranges.trajectory_a))?;
        program.set("TrajectoryBRange", range_uniform(&u.ranges.trajectory_b))?;
        program.set("RateRange", range_uniform(&u.ranges.rate))?;
        program.set("OpacityDecayRange", range_uniform(&u.ranges.opacity_decay))?;

        compute.survivors.write(0, &0u32.to_ne_bytes())?;

        compute.input.bind_base(gl::SHADER_STORAGE_BUFFER, binding::INPUT_PARTICLES);
        compute.output.bind_base(gl::SHADER_STORAGE_BUFFER, binding::OUTPUT_PARTICLES);
        pool.transforms.bind_base(gl::SHADER_STORAGE_BUFFER, binding::OUTPUT_TRANSFORMS);
        pool.opacities.bind_base(gl::SHADER_STORAGE_BUFFER, binding::OUTPUT_OPACITIES);
        compute.survivors.bind_base(gl::SHADER_STORAGE_BUFFER, binding::SURVIVORS);

        program.dispatch(dispatch_groups(count));
        barrier_compute_to_draw();
        Fence::insert().wait()?;

        let survivors = if u.destroy_requested {
            compute.survivors.read_u32(0)?.min(count)
        } else {
            count
        };
        trace!(count, survivors, "compute step");

        pool.state.truncate_particles(survivors as usize);
        pool.instance_count = survivors as usize;
        Ok(())
    }

    fn after_draw(&self, pool: &mut EmitterPool) -> Result<()> {
        let compute = pool
            .compute
            .as_ref()
            .context("pool was created without compute buffers")?;
        compute.input.copy_from(&compute.output, compute.output.size())
    }
}

fn range_uniform(range: &std::ops::Range<f32>) -> glam::Vec2 {
    glam::Vec2::new(range.start, range.end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings_are_distinct() {
        let all = [
            binding::INPUT_PARTICLES,
            binding::OUTPUT_PARTICLES,
            binding::OUTPUT_TRANSFORMS,
            binding::OUTPUT_OPACITIES,
            binding::SURVIVORS,
        ];
        for (i, a) in all.iter().enumerate() {
            assert!(all[i + 1..].iter().all(|b| b != a));
        }
    }

    #[test]
    fn strategies_name_themselves() {
        assert_eq!(HostSimulation.name(), "host");
        assert_eq!(DeviceSimulation.name(), "device");
        assert!(DeviceSimulation.uses_compute_buffers());
        assert!(!HostSimulation.uses_compute_buffers());
    }

    #[test]
    fn ranges_pack_into_vec2() {
        assert_eq!(range_uniform(&(0.5..2.0)), glam::Vec2::new(0.5, 2.0));
    }
}
