//! The window, its event handling and the per-frame driver.

use std::time::Instant;

use anyhow::{Context, Result};
use glam::Vec2;
use particle_core::emitter::random_placement;
use particle_core::{EmitterConfig, EmitterRegistry, ViewportContext};
use particle_gl::debug as gl_debug;
use particle_gl::{render, DeviceSimulation, EmitterPool, HostSimulation, SharedResources, SimulationStrategy, Texture};
use particle_window::GlWindow;
use tracing::{debug, error, info, trace, warn};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowId;

use crate::cli::{Cli, Strategy};
use crate::sprites;

/// Longest step fed to the simulation, so a stalled frame does not launch
/// every particle off screen at once.
const MAX_FRAME_DT: f32 = 0.1;

const BACKGROUND: [f32; 4] = [0.02, 0.02, 0.05, 1.0];

/// Everything that needs a live GL context. Fields drop in order, so the
/// window (and its context) goes last.
struct Scene {
    registry: EmitterRegistry<EmitterPool>,
    resources: SharedResources,
    strategy: Box<dyn SimulationStrategy>,
    config: EmitterConfig,
    viewport: ViewportContext,
    started: Instant,
    last_frame: Instant,
    window: GlWindow,
}

impl Scene {
    fn new(event_loop: &ActiveEventLoop, cli: &Cli) -> Result<Self> {
        let window = GlWindow::new(event_loop, "Particle fountain", (cli.width, cli.height))?;
        gl_debug::install_debug_output();
        render::enable_blending();

        let capabilities = window.capabilities();
        let strategy: Box<dyn SimulationStrategy> = match cli.strategy {
            Strategy::Device if capabilities.compute => Box::new(DeviceSimulation),
            Strategy::Device => {
                warn!(version = ?capabilities.version, "compute shaders unavailable, simulating on the host");
                Box::new(HostSimulation)
            }
            Strategy::Host => Box::new(HostSimulation),
        };

        let textures = load_textures(cli)?;
        let config = cli.emitter_config(textures.len() as u32);
        config.validate().context("invalid emitter settings")?;
        let resources = SharedResources::new(textures, strategy.uses_compute_buffers())?;

        let (width, height) = window.size();
        window.resize(width, height);

        let now = Instant::now();
        let mut scene = Self {
            registry: EmitterRegistry::new(),
            resources,
            strategy,
            config,
            viewport: ViewportContext::new(width, height),
            started: now,
            last_frame: now,
            window,
        };

        for i in 0..cli.emitters {
            let ndc = if i == 0 { Vec2::ZERO } else { random_placement(&mut rand::rng()) };
            scene.spawn(ndc)?;
        }

        info!(
            strategy = scene.strategy.name(),
            emitters = scene.registry.len(),
            particles = scene.config.particle_count,
            "scene ready"
        );
        Ok(scene)
    }

    fn clock(&self) -> f32 {
        self.started.elapsed().as_secs_f32()
    }

    fn spawn(&mut self, ndc: Vec2) -> Result<()> {
        let pool = EmitterPool::at(
            self.config.clone(),
            ndc,
            self.clock(),
            &self.resources,
            self.strategy.as_ref(),
        )?;
        let id = self.registry.spawn(pool);
        debug!(%id, x = ndc.x, y = ndc.y, "spawned");
        Ok(())
    }

    fn spawn_logged(&mut self, ndc: Vec2) {
        if let Err(err) = self.spawn(ndc) {
            error!("spawning an emitter failed: {err:#}");
        }
    }

    fn mouse(&mut self, button: MouseButton) {
        match button {
            MouseButton::Left => self.spawn_logged(self.viewport.cursor_ndc()),
            MouseButton::Right => match self.registry.request_destroy_last() {
                Some(id) => debug!(%id, "destroy requested"),
                None => debug!("no live emitter to destroy"),
            },
            _ => {}
        }
    }

    fn key(&mut self, event_loop: &ActiveEventLoop, key: &Key) {
        match key {
            Key::Named(NamedKey::Space) => self.spawn_logged(random_placement(&mut rand::rng())),
            Key::Named(NamedKey::Escape) => event_loop.exit(),
            Key::Character(c) if c.eq_ignore_ascii_case("c") => {
                let requested = self.registry.request_destroy_all();
                debug!(requested, "destroy requested for every emitter");
            }
            _ => {}
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.viewport.resize(width, height);
        self.window.resize(width, height);
    }

    fn redraw(&mut self) -> Result<()> {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32().min(MAX_FRAME_DT);
        self.last_frame = now;

        gl_debug::drain_errors("between frames");
        self.window.clear(BACKGROUND);

        let resources = &self.resources;
        let strategy = self.strategy.as_ref();
        let viewport = self.viewport;
        let report = self.registry.frame(|_, pool| {
            pool.frame(resources, strategy, dt, &viewport)?;
            gl_debug::check_errors("emitter frame")
        });
        trace!(?report, particles = self.registry.total_particles(), dt, "frame");

        self.window.swap_buffers()
    }
}

fn load_textures(cli: &Cli) -> Result<Vec<Texture>> {
    if cli.textures.is_empty() {
        return [sprites::glow(sprites::SPRITE_SIZE), sprites::spark(sprites::SPRITE_SIZE)]
            .iter()
            .map(Texture::from_image)
            .collect();
    }
    cli.textures.iter().map(Texture::from_path).collect()
}

pub struct App {
    cli: Cli,
    scene: Option<Scene>,
    error: Option<anyhow::Error>,
}

impl App {
    pub fn new(cli: Cli) -> Self {
        Self {
            cli,
            scene: None,
            error: None,
        }
    }

    /// The error that stopped the event loop, if any.
    pub fn finish(self) -> Result<()> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        self.error = Some(err);
        self.scene = None;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.scene.is_some() {
            return;
        }
        match Scene::new(event_loop, &self.cli) {
            Ok(scene) => self.scene = Some(scene),
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => scene.resize(size.width, size.height),
            WindowEvent::CursorMoved { position, .. } => {
                scene.viewport.cursor = Vec2::new(position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button,
                ..
            } => scene.mouse(button),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => scene.key(event_loop, &logical_key),
            WindowEvent::RedrawRequested => {
                if let Err(err) = scene.redraw() {
                    self.fail(event_loop, err);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(scene) = &self.scene {
            scene.window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(scene) = self.scene.take() {
            info!(emitters = scene.registry.len(), "shutting down");
        }
    }
}
