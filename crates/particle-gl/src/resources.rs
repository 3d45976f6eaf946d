//! GL objects shared by every emitter.
//!
//! Emitters never own these; they borrow the table when they are set up
//! and when they draw.

use anyhow::{ensure, Context, Result};
use particle_core::config::MAX_TEXTURE_SLOTS;
use tracing::{debug, info};

use crate::buffer::GpuBuffer;
use crate::shader::{ComputeProgram, ShaderProgram};
use crate::texture::Texture;

pub const PARTICLE_VERTEX_SHADER: &str = include_str!("../shaders/particle.vert");
pub const PARTICLE_FRAGMENT_SHADER: &str = include_str!("../shaders/particle.frag");
pub const PARTICLE_COMPUTE_SHADER: &str = include_str!("../shaders/particle_update.comp");

/// A full quad as two triangles: position xy, then uv.
pub const QUAD_VERTICES: [[f32; 4]; 6] = [
    [-1.0, -1.0, 0.0, 0.0],
    [1.0, -1.0, 1.0, 0.0],
    [1.0, 1.0, 1.0, 1.0],
    [1.0, 1.0, 1.0, 1.0],
    [-1.0, 1.0, 0.0, 1.0],
    [-1.0, -1.0, 0.0, 0.0],
];

pub const QUAD_VERTEX_COUNT: i32 = QUAD_VERTICES.len() as i32;

pub struct SharedResources {
    particle_program: ShaderProgram,
    compute_program: Option<ComputeProgram>,
    quad: GpuBuffer,
    textures: Vec<Texture>,
}

impl SharedResources {
    /// Build the render program, the quad and, when `with_compute` is set,
    /// the update kernel.
    pub fn new(textures: Vec<Texture>, with_compute: bool) -> Result<Self> {
        ensure!(!textures.is_empty(), "at least one particle texture is required");
        ensure!(
            textures.len() <= MAX_TEXTURE_SLOTS as usize,
            "{} textures given, the particle shader samples at most {MAX_TEXTURE_SLOTS}",
            textures.len()
        );

        let particle_program = ShaderProgram::new(PARTICLE_VERTEX_SHADER, PARTICLE_FRAGMENT_SHADER)?;
        let compute_program = with_compute
            .then(|| ComputeProgram::new(PARTICLE_COMPUTE_SHADER))
            .transpose()?;
        let quad = GpuBuffer::with_data(gl::ARRAY_BUFFER, &QUAD_VERTICES, gl::STATIC_DRAW)
            .context("uploading the particle quad")?;

        info!(
            textures = textures.len(),
            compute = compute_program.is_some(),
            "shared particle resources ready"
        );

        Ok(Self {
            particle_program,
            compute_program,
            quad,
            textures,
        })
    }

    pub fn particle_program(&self) -> &ShaderProgram {
        &self.particle_program
    }

    pub fn compute_program(&self) -> Option<&ComputeProgram> {
        self.compute_program.as_ref()
    }

    pub fn quad(&self) -> &GpuBuffer {
        &self.quad
    }

    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    pub fn texture_count(&self) -> u32 {
        self.textures.len() as u32
    }
}

impl Drop for SharedResources {
    fn drop(&mut self) {
        debug!("releasing shared particle resources");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_covers_the_unit_square_of_uvs() {
        for vertex in QUAD_VERTICES {
            assert_eq!(vertex[2], (vertex[0] + 1.0) / 2.0);
            assert_eq!(vertex[3], (vertex[1] + 1.0) / 2.0);
        }
        assert_eq!(QUAD_VERTEX_COUNT, 6);
    }

    #[test]
    fn shaders_agree_on_the_kernel_contract() {
        assert!(PARTICLE_COMPUTE_SHADER.contains("local_size_x = 64"));
        assert!(PARTICLE_COMPUTE_SHADER.contains("0.7548777"));
        assert!(PARTICLE_COMPUTE_SHADER.contains("43758.5453"));
        assert!(PARTICLE_FRAGMENT_SHADER.contains("Textures[4]"));
        assert!(PARTICLE_VERTEX_SHADER.contains("layout(location = 4) in mat4 Transform"));
    }
}
