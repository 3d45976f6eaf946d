//! OpenGL side of the particle system.
//!
//! - [`SharedResources`] holds the programs, quad and textures every
//!   emitter draws with.
//! - [`EmitterPool`] owns one emitter's state and its instance buffers.
//! - [`SimulationStrategy`] advances a pool, either on the host
//!   ([`HostSimulation`]) or in a compute shader ([`DeviceSimulation`]).
//!
//! Everything here expects the GL function pointers to be loaded and a
//! context to be current on the calling thread.

pub mod buffer;
pub mod debug;
pub mod pool;
pub mod render;
pub mod resources;
pub mod shader;
pub mod simulation;
pub mod sync;
pub mod texture;
pub mod vertex_array;

pub use buffer::GpuBuffer;
pub use pool::EmitterPool;
pub use resources::SharedResources;
pub use shader::{ComputeProgram, ShaderProgram};
pub use simulation::{DeviceSimulation, HostSimulation, SimulationStrategy};
pub use texture::Texture;
