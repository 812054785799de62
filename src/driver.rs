use std::sync::Arc;
use std::time::Instant;

use glam::Vec3;
use log::{info, warn};

use crate::error::EngineError;
use crate::input::InputPublisher;
use crate::render::Renderer;
use crate::scene::Sphere;
use crate::uniforms::UniformSync;
use crate::world::World;

/// Longest wall-clock gap a single tick will integrate. Anything longer (a
/// stall under a debugger, a minimized window) would teleport the camera.
pub const MAX_TICK_SECONDS: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Rendering,
    Stopped,
}

/// Per-frame orchestrator.
///
/// Each tick samples input once, integrates the camera, pushes whatever
/// uniforms went stale, and issues one trace dispatch plus one blit pass.
/// Scene mutations arriving between ticks go through the methods below,
/// which pair the world change with the matching uniform push.
pub struct FrameDriver {
    world: World,
    uniforms: UniformSync,
    renderer: Renderer,
    input: Arc<InputPublisher>,
    phase: Phase,
    last_tick: Option<Instant>,
}

impl FrameDriver {
    pub fn new(
        world: World,
        uniforms: UniformSync,
        renderer: Renderer,
        input: Arc<InputPublisher>,
    ) -> Self {
        Self {
            world,
            uniforms,
            renderer,
            input,
            phase: Phase::Idle,
            last_tick: None,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn is_rendering(&self) -> bool {
        self.phase == Phase::Rendering
    }

    /// Uploads the whole uniform set and begins accepting ticks.
    ///
    /// Starting an already rendering driver is a no-op; a driver stopped by
    /// teardown or device loss stays stopped.
    pub fn start(&mut self) -> Result<(), EngineError> {
        match self.phase {
            Phase::Rendering => Ok(()),
            Phase::Stopped => Err(EngineError::DriverStopped),
            Phase::Idle => {
                let (width, height) = self.world.camera().viewport();
                self.uniforms.push_canvas_size(width, height);
                self.uniforms.push_camera(self.world.camera());
                self.uniforms.push_spheres(self.world.spheres());
                self.uniforms.push_light(&self.world.light());
                self.phase = Phase::Rendering;
                self.last_tick = None;
                info!("frame driver rendering");
                Ok(())
            }
        }
    }

    pub fn stop(&mut self) {
        self.phase = Phase::Stopped;
    }

    /// Runs one tick: input snapshot, camera integration, uniform pushes,
    /// one traced frame. Called once per redraw.
    pub fn run_frame(&mut self) -> Result<(), EngineError> {
        if self.phase != Phase::Rendering {
            return Err(EngineError::DriverStopped);
        }

        let now = Instant::now();
        let delta_time = compute_delta(self.last_tick, now);
        self.last_tick = Some(now);

        let snapshot = self.input.snapshot();
        if self.world.advance(delta_time, &snapshot) {
            self.uniforms.push_camera(self.world.camera());
        }
        // Committed every frame, moved or not, so the next delta starts here.
        self.input.commit_mouse_position(snapshot.mouse_position);

        match self.renderer.render_frame() {
            Ok(()) => Ok(()),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("surface lost, reconfiguring and skipping the frame");
                self.renderer.restore_surface();
                Ok(())
            }
            Err(wgpu::SurfaceError::Timeout) => {
                info!("surface timed out, skipping the frame");
                Ok(())
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                self.phase = Phase::Stopped;
                Err(EngineError::DeviceLost {
                    reason: "out of GPU memory acquiring the next frame".into(),
                })
            }
        }
    }

    pub fn add_sphere(&mut self, sphere: Sphere) -> Option<usize> {
        let index = self.world.add_sphere(sphere);
        if index.is_some() {
            self.uniforms.push_spheres(self.world.spheres());
        }
        index
    }

    pub fn add_default_sphere(&mut self) -> Option<usize> {
        self.add_sphere(Sphere::default())
    }

    pub fn update_sphere_at(&mut self, index: usize, sphere: Sphere) -> Result<(), EngineError> {
        self.world.update_sphere_at(index, sphere)?;
        self.uniforms.push_spheres(self.world.spheres());
        Ok(())
    }

    pub fn delete_sphere(&mut self, index: usize) -> Result<(), EngineError> {
        self.world.delete_sphere(index)?;
        self.uniforms.push_spheres(self.world.spheres());
        Ok(())
    }

    pub fn set_directional_light(&mut self, direction: Vec3) {
        self.world.set_directional_light(direction);
        self.uniforms.push_light(&self.world.light());
    }

    pub fn set_camera_properties(
        &mut self,
        fov: f32,
        near: f32,
        far: f32,
    ) -> Result<(), EngineError> {
        self.world.set_camera_properties(fov, near, far)?;
        self.uniforms.push_camera(self.world.camera());
        Ok(())
    }

    /// Propagates a window resize to the camera, the uniform set, and the
    /// surface. Unchanged or zero sizes fall out without GPU work.
    pub fn notify_resize(&mut self, width: u32, height: u32) {
        if self.world.resize_viewport(width, height) {
            self.uniforms.push_canvas_size(width, height);
            self.uniforms.push_camera(self.world.camera());
        }
        self.renderer.resize(width, height);
    }
}

fn compute_delta(last_tick: Option<Instant>, now: Instant) -> f32 {
    match last_tick {
        Some(previous) => now
            .duration_since(previous)
            .as_secs_f32()
            .min(MAX_TICK_SECONDS),
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn first_frame_integrates_zero_seconds() {
        assert_eq!(compute_delta(None, Instant::now()), 0.0);
    }

    #[test]
    fn long_stalls_are_clamped() {
        let now = Instant::now();
        let previous = now - Duration::from_secs(10);
        assert_eq!(compute_delta(Some(previous), now), MAX_TICK_SECONDS);
    }

    #[test]
    fn ordinary_frames_pass_through_unclamped() {
        let now = Instant::now();
        let previous = now - Duration::from_millis(16);
        let delta = compute_delta(Some(previous), now);
        assert!((delta - 0.016).abs() < 1e-3);
    }
}
