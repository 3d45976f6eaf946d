//! Host reference for `particle_update.comp`.
//!
//! [`invoke`] performs exactly what one compute invocation does, on the
//! same [`ComputeParticle`] layout and buffer roles:
//!
//! | binding | role |
//! |---|---|
//! | 0 | input particles (read) |
//! | 1 | output particles (write) |
//! | 2 | output screen transforms (write, drawn as instance data) |
//! | 3 | output opacities (write, drawn as instance data) |
//! | 4 | survivor counter (atomic) |
//!
//! Without a destroy request every particle keeps its slot. With one,
//! retiring particles are dropped and survivors are packed through the
//! counter; [`dispatch`] packs them in invocation order, which the GPU
//! does not guarantee, so only the set of outputs is comparable there.

use glam::{Mat4, Vec2, Vec3};

use crate::config::{dispatch_groups, SpawnRanges, WORK_GROUP_SIZE};
use crate::emitter::EmitterState;
use crate::layout::{ComputeParticle, RawMat4};
use crate::particle::{should_retire, sign};
use crate::random::{Draw, DrawSeed};
use crate::registry::Emitter;
use crate::trajectory;
use crate::viewport::ViewportContext;

/// Every uniform the kernel reads.
#[derive(Debug, Clone)]
pub struct KernelUniforms {
    pub emitter_transform: Mat4,
    pub particle_transform: Mat4,
    pub window_width: u32,
    pub window_height: u32,
    pub scale_factor: f32,
    pub delta_time: f32,
    pub time: f32,
    pub particle_count: u32,
    pub destroy_requested: bool,
    pub rate_increase: f32,
    pub ranges: SpawnRanges,
}

impl KernelUniforms {
    /// Advance the state's clock by `dt` and collect this frame's uniforms.
    pub fn for_step(state: &mut EmitterState, dt: f32, viewport: &ViewportContext, particle_count: u32) -> Self {
        let destroy_requested = state.is_destroy_requested();
        let params = state.begin_step(dt);
        Self {
            emitter_transform: params.emitter_transform,
            particle_transform: params.base_transform,
            window_width: viewport.width,
            window_height: viewport.height,
            scale_factor: params.scale_factor,
            delta_time: dt,
            time: params.time,
            particle_count,
            destroy_requested,
            rate_increase: params.rate_policy.increase(),
            ranges: params.ranges,
        }
    }
}

/// The four output buffers of one dispatch.
#[derive(Debug, Clone)]
pub struct KernelOutputs {
    pub particles: Vec<ComputeParticle>,
    pub transforms: Vec<RawMat4>,
    pub opacities: Vec<f32>,
    pub survivors: u32,
}

impl KernelOutputs {
    pub fn with_capacity(count: usize) -> Self {
        let empty = ComputeParticle {
            trajectory_a: 0.0,
            trajectory_b: 0.0,
            position: [0.0; 2],
            transform: [[0.0; 4]; 4],
            rate: 0.0,
            opacity: 0.0,
            opacity_decay_rate: 0.0,
            _padding: 0.0,
        };
        Self {
            particles: vec![empty; count],
            transforms: vec![[[0.0; 4]; 4]; count],
            opacities: vec![0.0; count],
            survivors: 0,
        }
    }
}

fn respawn(particle: &mut ComputeParticle, slot: u32, u: &KernelUniforms) {
    let seed = DrawSeed { time: u.time, slot };

    particle.trajectory_a = seed.sample(Draw::TrajectoryA, &u.ranges.trajectory_a);

    let magnitude_b = seed.sample(Draw::TrajectoryB, &u.ranges.trajectory_b);
    particle.trajectory_b = if slot & 1 == 1 { -magnitude_b } else { magnitude_b };

    particle.rate = sign(particle.trajectory_b) * seed.sample(Draw::Rate, &u.ranges.rate);
    particle.position = [0.0, 0.0];
    particle.opacity = 1.0;
    particle.opacity_decay_rate = seed.sample(Draw::OpacityDecay, &u.ranges.opacity_decay);
    particle.transform = u.particle_transform.to_cols_array_2d();
}

/// One invocation with global id `index`.
pub fn invoke(index: u32, input: &[ComputeParticle], u: &KernelUniforms, out: &mut KernelOutputs) {
    if index >= u.particle_count {
        return;
    }

    let mut p = input[index as usize];

    if u.rate_increase > 0.0 {
        p.rate += sign(p.rate) * u.rate_increase;
    }

    p.position[0] += p.rate * u.delta_time;
    p.position[1] = trajectory::advance(p.position[0], p.trajectory_a, p.trajectory_b);
    p.opacity -= p.opacity_decay_rate * u.delta_time;

    let size = Vec2::new(u.window_width.max(1) as f32, u.window_height.max(1) as f32);
    let offset = (2.0 * Vec2::from_array(p.position) / size) / u.scale_factor;
    let screen = u.emitter_transform
        * Mat4::from_translation(Vec3::new(offset.x, offset.y, 0.0))
        * Mat4::from_cols_array_2d(&p.transform);

    let retire = should_retire(screen.w_axis.y, p.opacity);
    if retire && u.destroy_requested {
        return;
    }

    let packed = out.survivors;
    out.survivors += 1;
    let slot = if u.destroy_requested { packed } else { index };

    out.transforms[slot as usize] = screen.to_cols_array_2d();
    out.opacities[slot as usize] = p.opacity;

    if retire {
        respawn(&mut p, slot, u);
    }

    out.particles[slot as usize] = p;
}

/// Every work group of one dispatch, in invocation order.
pub fn dispatch(input: &[ComputeParticle], u: &KernelUniforms) -> KernelOutputs {
    let mut out = KernelOutputs::with_capacity(input.len());
    let invocations = dispatch_groups(u.particle_count) * WORK_GROUP_SIZE;
    for index in 0..invocations {
        invoke(index, input, u, &mut out);
    }
    out
}
