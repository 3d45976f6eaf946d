use glam::{Mat4, Vec2, Vec3};
use particle_core::kernel::{self, KernelUniforms};
use particle_core::registry::{Emitter, EmitterRegistry};
use particle_core::trajectory;
use particle_core::{advance_host, EmitterConfig, EmitterState, ParticleState, ViewportContext};

fn single_particle_emitter() -> EmitterState {
    let config = EmitterConfig {
        particle_count: 1,
        scale_factor: 0.05,
        ..Default::default()
    };
    let mut state = EmitterState::new(config, Mat4::from_scale(Vec3::splat(0.05)), 0.0).unwrap();
    let particle = &mut state.particles_mut()[0];
    particle.trajectory_a = 0.05;
    particle.trajectory_b = 4.45;
    particle.rate = 20.0;
    particle.opacity_decay_rate = 0.05;
    state
}

#[test]
fn particle_follows_the_parabola() {
    let mut state = single_particle_emitter();
    let viewport = ViewportContext::new(800, 600);
    let mut sink: Vec<(Mat4, f32)> = Vec::new();
    let mut last_x = 0.0;

    for step in 0..50 {
        let report = advance_host(&mut state, 0.016, &viewport, &mut sink);
        assert_eq!(report.survivors, 1);
        assert_eq!(report.respawned, 0, "step {step}");

        let particle = &state.particles()[0];
        assert_eq!(particle.state, ParticleState::Active);
        assert!(particle.position.x > last_x, "step {step}");
        assert_eq!(
            particle.position.y,
            trajectory::advance(particle.position.x, 0.05, 4.45)
        );
        last_x = particle.position.x;
    }

    assert!((last_x - 16.0).abs() < 1e-3);

    // scale(0.05) and scale_factor 0.05 cancel, leaving the plain NDC offset.
    let screen = sink[0].0.w_axis;
    let expected = viewport.cartesian_to_ndc(state.particles()[0].position);
    assert!((screen.x - expected.x).abs() < 1e-5);
    assert!((screen.y - expected.y).abs() < 1e-5);
}

#[test]
fn destroyed_emitter_drains_then_is_reaped() {
    let config = EmitterConfig {
        particle_count: 16,
        ..Default::default()
    };
    let viewport = ViewportContext::new(800, 600);
    let mut registry = EmitterRegistry::new();
    let id = registry.spawn(EmitterState::at(config, Vec2::ZERO, 0.0).unwrap());
    let keep = registry.spawn(EmitterState::at(EmitterConfig::default(), Vec2::new(0.5, 0.5), 3.0).unwrap());

    registry.frame(|_, state| {
        advance_host(state, 0.1, &viewport, &mut Vec::<(Mat4, f32)>::new());
        Ok(())
    });
    assert!(registry.request_destroy(id));

    let mut previous = registry.get(id).unwrap().particle_count();
    let mut frames = 0;
    while registry.contains(id) {
        frames += 1;
        assert!(frames < 1000, "emitter never drained");

        let was_destroyed = registry.get(id).unwrap().is_destroyed();
        let report = registry.frame(|frame_id, state| {
            let step = advance_host(state, 0.1, &viewport, &mut Vec::<(Mat4, f32)>::new());
            if frame_id == id {
                assert_eq!(step.respawned, 0);
            }
            Ok(())
        });

        if was_destroyed {
            assert_eq!(report.reaped, 1);
            break;
        }

        let state = registry.get(id).unwrap();
        assert!(state.particle_count() <= previous);
        assert_eq!(state.is_destroyed(), state.particle_count() == 0);
        previous = state.particle_count();
    }

    assert!(!registry.contains(id));
    assert!(registry.contains(keep));
    assert_eq!(registry.get(keep).unwrap().particle_count(), 1000);
}

#[test]
fn opacity_only_rises_on_respawn() {
    let config = EmitterConfig {
        particle_count: 128,
        ..Default::default()
    };
    let mut state = EmitterState::new(config, Mat4::from_scale(Vec3::splat(0.025)), 5.0).unwrap();
    let viewport = ViewportContext::new(1024, 768);
    let mut sink: Vec<(Mat4, f32)> = Vec::new();
    let mut opacities: Vec<f32> = state.particles().iter().map(|p| p.opacity).collect();

    for _ in 0..600 {
        advance_host(&mut state, 0.05, &viewport, &mut sink);
        for (slot, particle) in state.particles().iter().enumerate() {
            match particle.state {
                ParticleState::Active => assert!(particle.opacity <= opacities[slot]),
                ParticleState::Retiring => assert_eq!(particle.opacity, 1.0),
            }
            assert!(particle.rate_matches_direction());
            opacities[slot] = particle.opacity;
        }
    }
}

#[test]
fn untouched_emitter_is_never_destroyed() {
    let config = EmitterConfig {
        particle_count: 8,
        ..Default::default()
    };
    let mut state = EmitterState::new(config, Mat4::IDENTITY, 0.0).unwrap();
    let viewport = ViewportContext::new(640, 480);
    for _ in 0..200 {
        advance_host(&mut state, 0.1, &viewport, &mut Vec::<(Mat4, f32)>::new());
    }
    assert_eq!(state.particle_count(), 8);
    assert!(!state.is_destroyed());
}

/// One motionless particle whose screen y equals the emitter's own y.
fn parked_at(y: f32) -> EmitterState {
    let config = EmitterConfig {
        particle_count: 1,
        ..Default::default()
    };
    let mut state = EmitterState::new(config, Mat4::from_translation(Vec3::new(0.0, y, 0.0)), 0.0).unwrap();
    let particle = &mut state.particles_mut()[0];
    particle.rate = 0.0;
    particle.opacity_decay_rate = 0.05;
    state
}

#[test]
fn bottom_edge_is_still_on_screen() {
    let viewport = ViewportContext::new(800, 600);
    let mut sink: Vec<(Mat4, f32)> = Vec::new();

    let mut edge = parked_at(-1.0);
    let report = advance_host(&mut edge, 0.016, &viewport, &mut sink);
    assert_eq!(sink[0].0.w_axis.y, -1.0);
    assert_eq!(report.respawned, 0);
    assert_eq!(edge.particles()[0].state, ParticleState::Active);

    let mut below = parked_at(-1.000_000_1);
    let report = advance_host(&mut below, 0.016, &viewport, &mut sink);
    assert_eq!(report.respawned, 1);
    assert_eq!(below.particles()[0].state, ParticleState::Retiring);
}

#[test]
fn kernel_bottom_edge_is_still_on_screen() {
    let viewport = ViewportContext::new(800, 600);
    let step = |mut state: EmitterState| {
        let input = state.compute_particles();
        let uniforms = KernelUniforms::for_step(&mut state, 0.016, &viewport, 1);
        kernel::dispatch(&input, &uniforms)
    };

    let edge = step(parked_at(-1.0));
    assert_eq!(edge.transforms[0][3][1], -1.0);
    assert!(edge.particles[0].opacity < 1.0, "edge particle was respawned");

    let below = step(parked_at(-1.000_000_1));
    assert_eq!(below.particles[0].opacity, 1.0);
    assert_eq!(below.survivors, 1);
}
