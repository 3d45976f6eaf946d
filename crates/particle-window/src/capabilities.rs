//! What the current context can run.

use glium::{Api, CapabilitiesSource, Version};

/// Compute shaders and shader storage buffers are core from 4.3.
pub const COMPUTE_VERSION: (u8, u8) = (4, 3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlCapabilities {
    pub version: Version,
    pub compute: bool,
}

/// `true` for desktop GL at or above [`COMPUTE_VERSION`].
pub fn supports_compute(version: &Version) -> bool {
    match *version {
        Version(Api::Gl, major, minor) => (major, minor) >= COMPUTE_VERSION,
        Version(Api::GlEs, ..) => false,
    }
}

pub fn detect(ctx: &impl CapabilitiesSource) -> GlCapabilities {
    let version = *ctx.get_version();
    let glsl_430 = ctx
        .get_capabilities()
        .supported_glsl_versions
        .iter()
        .any(|v| matches!(v, Version(Api::Gl, 4, 3)));

    GlCapabilities {
        version,
        compute: supports_compute(&version) && glsl_430,
    }
}
