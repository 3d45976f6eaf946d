//! GPU/host synchronisation.

use anyhow::{bail, Result};
use gl::types::GLsync;

/// A fence inserted after submitted GPU work.
#[derive(Debug)]
pub struct Fence(GLsync);

impl Fence {
    /// Fence everything submitted so far.
    pub fn insert() -> Self {
        Self(unsafe { gl::FenceSync(gl::SYNC_GPU_COMMANDS_COMPLETE, 0) })
    }

    /// Block until the fenced work completes.
    pub fn wait(self) -> Result<()> {
        let status = unsafe { gl::ClientWaitSync(self.0, gl::SYNC_FLUSH_COMMANDS_BIT, u64::MAX) };
        if status == gl::WAIT_FAILED {
            bail!("glClientWaitSync failed");
        }
        Ok(())
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe { gl::DeleteSync(self.0) };
    }
}

/// Make compute writes visible to vertex fetch, buffer copies and reads.
pub fn barrier_compute_to_draw() {
    unsafe {
        gl::MemoryBarrier(
            gl::SHADER_STORAGE_BARRIER_BIT | gl::VERTEX_ATTRIB_ARRAY_BARRIER_BIT | gl::BUFFER_UPDATE_BARRIER_BIT,
        );
    }
}
