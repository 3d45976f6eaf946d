//! Ownership of live emitters.
//!
//! Destroying an emitter is a two-phase affair: a request stops its
//! particles from respawning, and the emitter is reaped on the first frame
//! after its last particle is gone.

use std::fmt;

use anyhow::Result;
use tracing::{debug, error};

/// The lifecycle surface the registry needs from an emitter.
pub trait Emitter {
    /// Stop respawning. Idempotent.
    fn request_destroy(&mut self);

    fn is_destroy_requested(&self) -> bool;

    /// Destroy was requested and no particles remain.
    fn is_destroyed(&self) -> bool;

    fn particle_count(&self) -> usize;
}

/// Stable handle of a spawned emitter. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EmitterId(u64);

impl fmt::Display for EmitterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "emitter#{}", self.0)
    }
}

/// Per-frame bookkeeping returned by [`EmitterRegistry::frame`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Emitters updated and drawn.
    pub ran: usize,
    /// Emitters removed because they finished destroying.
    pub reaped: usize,
    /// Emitters removed because their frame returned an error.
    pub failed: usize,
}

/// Emitters in spawn order.
pub struct EmitterRegistry<E> {
    emitters: Vec<(EmitterId, E)>,
    next_id: u64,
}

impl<E> Default for EmitterRegistry<E> {
    fn default() -> Self {
        Self {
            emitters: Vec::new(),
            next_id: 0,
        }
    }
}

impl<E: Emitter> EmitterRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, emitter: E) -> EmitterId {
        let id = EmitterId(self.next_id);
        self.next_id += 1;
        debug!(%id, particles = emitter.particle_count(), "emitter spawned");
        self.emitters.push((id, emitter));
        id
    }

    /// Returns `false` for unknown ids.
    pub fn request_destroy(&mut self, id: EmitterId) -> bool {
        match self.get_mut(id) {
            Some(emitter) => {
                emitter.request_destroy();
                true
            }
            None => false,
        }
    }

    /// Request destroy on the most recently spawned emitter that is not
    /// already being destroyed.
    pub fn request_destroy_last(&mut self) -> Option<EmitterId> {
        let (id, emitter) = self
            .emitters
            .iter_mut()
            .rev()
            .find(|(_, emitter)| !emitter.is_destroy_requested())?;
        emitter.request_destroy();
        Some(*id)
    }

    /// Request destroy on every emitter. Returns how many were newly asked.
    pub fn request_destroy_all(&mut self) -> usize {
        let mut requested = 0;
        for (_, emitter) in self.emitters.iter_mut() {
            if !emitter.is_destroy_requested() {
                emitter.request_destroy();
                requested += 1;
            }
        }
        requested
    }

    /// Run one frame.
    ///
    /// Emitters that have finished destroying are reaped without running.
    /// Every other emitter runs `step` once, in spawn order; an emitter
    /// whose step fails is logged and removed so one bad pool cannot stall
    /// the rest.
    pub fn frame<F>(&mut self, mut step: F) -> FrameReport
    where
        F: FnMut(EmitterId, &mut E) -> Result<()>,
    {
        let mut report = FrameReport::default();

        self.emitters.retain_mut(|(id, emitter)| {
            if emitter.is_destroyed() {
                debug!(%id, "emitter reaped");
                report.reaped += 1;
                return false;
            }

            match step(*id, emitter) {
                Ok(()) => {
                    report.ran += 1;
                    true
                }
                Err(err) => {
                    error!(%id, "emitter frame failed, removing: {err:#}");
                    report.failed += 1;
                    false
                }
            }
        });

        report
    }

    pub fn len(&self) -> usize {
        self.emitters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitters.is_empty()
    }

    pub fn contains(&self, id: EmitterId) -> bool {
        self.emitters.iter().any(|(other, _)| *other == id)
    }

    pub fn get(&self, id: EmitterId) -> Option<&E> {
        self.emitters.iter().find(|(other, _)| *other == id).map(|(_, e)| e)
    }

    pub fn get_mut(&mut self, id: EmitterId) -> Option<&mut E> {
        self.emitters.iter_mut().find(|(other, _)| *other == id).map(|(_, e)| e)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EmitterId, &E)> {
        self.emitters.iter().map(|(id, e)| (*id, e))
    }

    pub fn total_particles(&self) -> usize {
        self.emitters.iter().map(|(_, e)| e.particle_count()).sum()
    }
}
