//! A window with a current OpenGL context, for drawing with raw `gl`.
//!
//! glium creates the window and the context; rendering itself goes through
//! the `gl` crate, whose pointers are loaded by [`loader::load_gl`]. glium
//! is only asked for presentation, resizing and capability queries.

use anyhow::{anyhow, Result};
use glium::backend::glutin::SimpleWindowBuilder;
use glium::backend::Facade;
use glium::glutin::surface::WindowSurface;
use glium::Display;
use tracing::{debug, info};
use winit::event_loop::ActiveEventLoop;
use winit::window::Window;

pub mod capabilities;
pub mod loader;

pub use capabilities::GlCapabilities;

pub struct GlWindow {
    window: Window,
    display: Display<WindowSurface>,
    capabilities: GlCapabilities,
}

impl GlWindow {
    /// Open a window and make its context current.
    pub fn new(event_loop: &ActiveEventLoop, title: &str, (width, height): (u32, u32)) -> Result<Self> {
        let (window, display) = SimpleWindowBuilder::new()
            .with_title(title)
            .with_inner_size(width, height)
            .build(event_loop);

        loader::load_gl();

        let ctx = display.get_context();
        info!(
            version = ctx.get_opengl_version_string(),
            renderer = ctx.get_opengl_renderer_string(),
            "OpenGL context created"
        );

        let capabilities = capabilities::detect(&**ctx);
        debug!(?capabilities, "context capabilities");

        Ok(Self {
            window,
            display,
            capabilities,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn capabilities(&self) -> GlCapabilities {
        self.capabilities
    }

    /// Framebuffer size in pixels.
    pub fn size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    /// Follow a framebuffer resize.
    pub fn resize(&self, width: u32, height: u32) {
        self.display.resize((width, height));
        unsafe { gl::Viewport(0, 0, width as i32, height as i32) };
    }

    pub fn clear(&self, [r, g, b, a]: [f32; 4]) {
        unsafe {
            gl::ClearColor(r, g, b, a);
            gl::Clear(gl::COLOR_BUFFER_BIT);
        }
    }

    pub fn swap_buffers(&self) -> Result<()> {
        self.display
            .swap_buffers()
            .map_err(|err| anyhow!("swapping buffers failed: {err:?}"))
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }
}
