//! An emitter together with the GPU buffers it draws from.

use anyhow::{Context, Result};
use glam::{Mat4, Vec2};
use particle_core::emitter::placement_transform;
use particle_core::layout::{slice_as_bytes, ComputeParticle, INSTANCE_OPACITY_STRIDE, INSTANCE_TRANSFORM_STRIDE};
use particle_core::registry::Emitter;
use particle_core::{EmitterConfig, EmitterState, ViewportContext};
use tracing::debug;

use crate::buffer::GpuBuffer;
use crate::render;
use crate::resources::SharedResources;
use crate::simulation::SimulationStrategy;
use crate::vertex_array::{BufferLayout, VertexArray};

/// Storage buffers used only by the compute path.
#[derive(Debug)]
pub struct ComputeBuffers {
    /// Binding 0, read by the kernel.
    pub input: GpuBuffer,
    /// Binding 1, copied back over `input` after the draw.
    pub output: GpuBuffer,
    /// Binding 4, one `uint` incremented per surviving particle.
    pub survivors: GpuBuffer,
}

impl ComputeBuffers {
    pub fn new(particles: &[ComputeParticle]) -> Result<Self> {
        let bytes = slice_as_bytes(particles);
        Ok(Self {
            input: GpuBuffer::new(gl::SHADER_STORAGE_BUFFER, bytes.len(), Some(bytes), gl::DYNAMIC_COPY)
                .context("allocating the input particle buffer")?,
            output: GpuBuffer::new(gl::SHADER_STORAGE_BUFFER, bytes.len(), None, gl::DYNAMIC_COPY)
                .context("allocating the output particle buffer")?,
            survivors: GpuBuffer::new(gl::SHADER_STORAGE_BUFFER, std::mem::size_of::<u32>(), None, gl::DYNAMIC_READ)
                .context("allocating the survivor counter")?,
        })
    }
}

pub struct EmitterPool {
    pub(crate) state: EmitterState,
    /// Per-instance screen transforms: mapped by the host path, written as
    /// binding 2 by the compute path.
    pub(crate) transforms: GpuBuffer,
    /// Per-instance opacities, binding 3 on the compute path.
    pub(crate) opacities: GpuBuffer,
    pub(crate) compute: Option<ComputeBuffers>,
    pub(crate) instance_count: usize,
    vertex_array: VertexArray,
}

impl EmitterPool {
    pub fn new(
        config: EmitterConfig,
        emitter_transform: Mat4,
        clock: f32,
        resources: &SharedResources,
        strategy: &dyn SimulationStrategy,
    ) -> Result<Self> {
        let state = EmitterState::new(config, emitter_transform, clock)?;
        let count = state.particle_count();

        let transforms = GpuBuffer::new(gl::ARRAY_BUFFER, count * INSTANCE_TRANSFORM_STRIDE, None, gl::DYNAMIC_DRAW)
            .context("allocating instance transforms")?;
        let opacities = GpuBuffer::new(gl::ARRAY_BUFFER, count * INSTANCE_OPACITY_STRIDE, None, gl::DYNAMIC_DRAW)
            .context("allocating instance opacities")?;

        let compute = if strategy.uses_compute_buffers() {
            Some(ComputeBuffers::new(&state.compute_particles())?)
        } else {
            None
        };

        let vertex_array = VertexArray::new();
        vertex_array.attach(resources.quad(), &BufferLayout::quad());
        vertex_array.attach(&transforms, &BufferLayout::instance_transforms());
        vertex_array.attach(&opacities, &BufferLayout::instance_opacities());

        debug!(count, strategy = strategy.name(), "emitter pool created");

        Ok(Self {
            state,
            transforms,
            opacities,
            compute,
            instance_count: 0,
            vertex_array,
        })
    }

    /// A pool centred on `ndc`.
    pub fn at(
        config: EmitterConfig,
        ndc: Vec2,
        clock: f32,
        resources: &SharedResources,
        strategy: &dyn SimulationStrategy,
    ) -> Result<Self> {
        let transform = placement_transform(ndc, config.emitter_scale);
        Self::new(config, transform, clock, resources, strategy)
    }

    /// With a compute strategy, particle fields here are stale; only the
    /// count and emitter-level state track the GPU.
    pub fn state(&self) -> &EmitterState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut EmitterState {
        &mut self.state
    }

    /// Instances drawn by the most recent frame.
    pub fn instance_count(&self) -> usize {
        self.instance_count
    }

    /// Simulate one step, then draw the result.
    pub fn frame(
        &mut self,
        resources: &SharedResources,
        strategy: &dyn SimulationStrategy,
        dt: f32,
        viewport: &ViewportContext,
    ) -> Result<()> {
        strategy.update(resources, self, dt, viewport)?;

        // The update may have switched to the compute program.
        render::bind(resources, &self.vertex_array)?;
        render::draw(self.instance_count);

        strategy.after_draw(self)
    }
}

impl Emitter for EmitterPool {
    fn request_destroy(&mut self) {
        self.state.request_destroy();
    }

    fn is_destroy_requested(&self) -> bool {
        self.state.is_destroy_requested()
    }

    fn is_destroyed(&self) -> bool {
        self.state.is_destroyed()
    }

    fn particle_count(&self) -> usize {
        self.state.particle_count()
    }
}
