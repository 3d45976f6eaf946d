//! Instanced particle draws.

use anyhow::Result;
use tracing::trace;

use crate::resources::{SharedResources, QUAD_VERTEX_COUNT};
use crate::vertex_array::VertexArray;

/// Alpha blending used for every particle draw.
pub fn enable_blending() {
    unsafe {
        gl::Enable(gl::BLEND);
        gl::BlendFunc(gl::SRC_ALPHA, gl::ONE_MINUS_SRC_ALPHA);
    }
}

/// Make the particle program, `instances` and the shared textures current.
///
/// `instances` must already source the quad and the emitter's per-instance
/// transform and opacity buffers.
pub fn bind(resources: &SharedResources, instances: &VertexArray) -> Result<()> {
    let program = resources.particle_program();
    program.bind();
    instances.bind();

    for (unit, texture) in resources.textures().iter().enumerate() {
        texture.bind(unit as u32);
        program.set(&format!("Textures[{unit}]"), unit as i32)?;
    }
    program.set("TextureCount", resources.texture_count() as i32)?;
    Ok(())
}

/// Draw `instance_count` quads. Nothing is issued for zero.
pub fn draw(instance_count: usize) {
    if instance_count == 0 {
        return;
    }
    trace!(instance_count, "draw particles");
    unsafe {
        gl::DrawArraysInstanced(gl::TRIANGLES, 0, QUAD_VERTEX_COUNT, instance_count as i32);
        gl::BindVertexArray(0);
    }
}
