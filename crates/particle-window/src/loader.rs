//! Raw GL function loading for the `gl` crate.

use std::sync::Once;

static GL_INIT_ONCE: Once = Once::new();

/// Load GL function pointers exactly once via `gl_loader`.
///
/// A context must be current; pointers resolved here are shared by every
/// later `gl::*` call in the process.
pub fn load_gl() {
    GL_INIT_ONCE.call_once(|| {
        gl_loader::init_gl();
        gl::load_with(|s| gl_loader::get_proc_address(s).cast());
        tracing::debug!("GL function pointers loaded");
    });
}
