//! Vertex array objects and the attribute layouts recorded into them.

use gl::types::{GLsizei, GLuint};
use particle_core::layout::{INSTANCE_OPACITY_STRIDE, INSTANCE_TRANSFORM_STRIDE};

use crate::buffer::GpuBuffer;

/// Attribute locations shared with `particle.vert`.
pub mod location {
    pub const POSITION: u32 = 0;
    pub const UV: u32 = 1;
    pub const OPACITY: u32 = 2;
    /// First of four consecutive locations, one per matrix column.
    pub const TRANSFORM: u32 = 4;
}

/// One float attribute inside an interleaved buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutElement {
    pub location: u32,
    pub components: u32,
    pub offset: usize,
    /// 0 advances per vertex, 1 per instance.
    pub divisor: u32,
}

/// Interleaved float attributes, in buffer order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferLayout {
    elements: Vec<LayoutElement>,
    stride: usize,
}

impl BufferLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attribute of `components` floats.
    pub fn push_f32(mut self, location: u32, components: u32, divisor: u32) -> Self {
        self.elements.push(LayoutElement {
            location,
            components,
            offset: self.stride,
            divisor,
        });
        self.stride += components as usize * std::mem::size_of::<f32>();
        self
    }

    pub fn elements(&self) -> &[LayoutElement] {
        &self.elements
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The 6-vertex quad: position then UV.
    pub fn quad() -> Self {
        Self::new()
            .push_f32(location::POSITION, 2, 0)
            .push_f32(location::UV, 2, 0)
    }

    /// One column-major mat4 per instance, spread over four locations.
    pub fn instance_transforms() -> Self {
        (0..4).fold(Self::new(), |layout, column| {
            layout.push_f32(location::TRANSFORM + column, 4, 1)
        })
    }

    /// One float opacity per instance.
    pub fn instance_opacities() -> Self {
        Self::new().push_f32(location::OPACITY, 1, 1)
    }
}

/// An owned vertex array object.
#[derive(Debug)]
pub struct VertexArray {
    name: GLuint,
}

impl VertexArray {
    pub fn new() -> Self {
        let mut name = 0;
        unsafe { gl::GenVertexArrays(1, &mut name) };
        Self { name }
    }

    pub fn bind(&self) {
        unsafe { gl::BindVertexArray(self.name) };
    }

    /// Record `layout` as sourced from `buffer`.
    pub fn attach(&self, buffer: &GpuBuffer, layout: &BufferLayout) {
        unsafe {
            gl::BindVertexArray(self.name);
            buffer.bind_as(gl::ARRAY_BUFFER);
            for element in layout.elements() {
                gl::VertexAttribPointer(
                    element.location,
                    element.components as i32,
                    gl::FLOAT,
                    gl::FALSE,
                    layout.stride() as GLsizei,
                    element.offset as *const _,
                );
                gl::EnableVertexAttribArray(element.location);
                gl::VertexAttribDivisor(element.location, element.divisor);
            }
            gl::BindVertexArray(0);
            gl::BindBuffer(gl::ARRAY_BUFFER, 0);
        }
    }
}

impl Default for VertexArray {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for VertexArray {
    fn drop(&mut self) {
        unsafe { gl::DeleteVertexArrays(1, &self.name) };
    }
}

const _: () = assert!(INSTANCE_TRANSFORM_STRIDE == 4 * 4 * std::mem::size_of::<f32>());
const _: () = assert!(INSTANCE_OPACITY_STRIDE == std::mem::size_of::<f32>());

#[cfg(test)]
mod tests {
    use super::*;
    use particle_core::layout::transform_column_offset;

    #[test]
    fn quad_layout_interleaves_position_and_uv() {
        let layout = BufferLayout::quad();
        assert_eq!(layout.stride(), 16);
        assert_eq!(layout.elements()[1].offset, 8);
        assert!(layout.elements().iter().all(|e| e.divisor == 0));
    }

    #[test]
    fn transform_columns_match_instance_stride() {
        let layout = BufferLayout::instance_transforms();
        assert_eq!(layout.stride(), INSTANCE_TRANSFORM_STRIDE);
        for (column, element) in layout.elements().iter().enumerate() {
            assert_eq!(element.location, location::TRANSFORM + column as u32);
            assert_eq!(element.offset, transform_column_offset(column));
            assert_eq!(element.divisor, 1);
        }
    }

    #[test]
    fn opacity_is_one_float_per_instance() {
        let layout = BufferLayout::instance_opacities();
        assert_eq!(layout.stride(), INSTANCE_OPACITY_STRIDE);
        assert_eq!(layout.elements()[0].location, location::OPACITY);
    }
}
