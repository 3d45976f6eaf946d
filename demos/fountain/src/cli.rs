use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use particle_core::config::{DEFAULT_EMITTER_COUNT, DEFAULT_PARTICLE_COUNT, DEFAULT_RATE_INCREASE};
use particle_core::{EmitterConfig, RatePolicy};

/// Where particles are simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// On the CPU, streamed into mapped vertex buffers
    Host,
    /// In a compute shader (needs OpenGL 4.3)
    Device,
}

#[derive(Debug, Parser)]
#[command(name = "fountain")]
#[command(about = "Parabolic particle fountains. Left click spawns, right click destroys.", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Simulation strategy; falls back to host when compute is unavailable
    #[arg(long, value_enum, default_value_t = Strategy::Device)]
    pub strategy: Strategy,

    /// Particles per emitter
    #[arg(short = 'n', long, default_value_t = DEFAULT_PARTICLE_COUNT)]
    pub particles: u32,

    /// Emitters spawned at start-up
    #[arg(short, long, default_value_t = DEFAULT_EMITTER_COUNT)]
    pub emitters: u32,

    /// Let particles speed up every step, optionally by a given amount
    #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_RATE_INCREASE_ARG)]
    pub accelerate: Option<f32>,

    /// Window width in pixels
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Window height in pixels
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Sprite image; repeat for up to four. Built-in sprites are used when omitted
    #[arg(short, long = "texture", value_name = "PATH")]
    pub textures: Vec<PathBuf>,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// `DEFAULT_RATE_INCREASE` as clap reads it.
const DEFAULT_RATE_INCREASE_ARG: &str = "0.01";

impl Cli {
    /// Emitter settings for `texture_count` loaded sprites.
    pub fn emitter_config(&self, texture_count: u32) -> EmitterConfig {
        EmitterConfig {
            particle_count: self.particles,
            texture_count,
            rate_policy: match self.accelerate {
                Some(increase) => RatePolicy::Accelerate { increase },
                None => RatePolicy::Constant,
            },
            ..Default::default()
        }
    }

    /// Filter used when the flags ask for a level, `None` to defer to
    /// `RUST_LOG`.
    pub fn log_filter(&self) -> Option<&'static str> {
        if self.quiet {
            return Some("error");
        }
        match self.verbose {
            0 => None,
            1 => Some("debug"),
            _ => Some("trace"),
        }
    }
}
