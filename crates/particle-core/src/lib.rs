//! GL-free half of the particle system.
//!
//! Everything here runs without a graphics context: the trajectory and
//! particle model, the seeded draws shared with the compute kernel, the
//! byte layouts of the GPU buffers, the host simulation step, a host
//! reference of the compute kernel and the emitter registry.

pub mod config;
pub mod emitter;
pub mod kernel;
pub mod layout;
pub mod particle;
pub mod random;
pub mod registry;
pub mod simulation;
pub mod trajectory;
pub mod viewport;

pub use config::{EmitterConfig, RatePolicy, SpawnRanges};
pub use emitter::{EmitterState, StepParams};
pub use layout::{AsBytes, ComputeParticle, RawMat4};
pub use particle::{Particle, ParticleState};
pub use random::{Draw, DrawSeed};
pub use registry::{Emitter, EmitterId, EmitterRegistry, FrameReport};
pub use simulation::{advance_host, InstanceSink, InstanceSlices, StepReport};
pub use viewport::ViewportContext;
