use glam::{Mat4, Quat, Vec3};

use crate::error::EngineError;
use crate::input::{InputSnapshot, NavKey};

const WORLD_UP: Vec3 = Vec3::Y;

/// First-person perspective camera.
///
/// The four cached matrices are recomputed synchronously whenever position,
/// orientation, projection parameters, or the viewport change, so readers
/// never observe a matrix that disagrees with the camera fields.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    forward: Vec3,
    vertical_fov: f32,
    near_clip: f32,
    far_clip: f32,
    viewport_width: u32,
    viewport_height: u32,
    projection: Mat4,
    inverse_projection: Mat4,
    view: Mat4,
    inverse_view: Mat4,
}

impl Camera {
    pub const DEFAULT_FOV: f32 = 45.0;
    pub const DEFAULT_NEAR: f32 = 0.1;
    pub const DEFAULT_FAR: f32 = 100.0;
    pub const DEFAULT_POSITION: Vec3 = Vec3::new(0.0, 0.0, 3.0);
    pub const DEFAULT_FORWARD: Vec3 = Vec3::new(0.0, 0.0, -1.0);

    /// World units per second while a navigation key is held.
    pub const MOVE_RATE: f32 = 5.0;
    /// Radians of rotation per pixel of mouse travel.
    pub const LOOK_SENSITIVITY: f32 = 0.003;
    /// The forward vector may not pitch past this elevation.
    pub const MAX_PITCH_DEGREES: f32 = 89.0;

    pub fn new(
        vertical_fov: f32,
        near_clip: f32,
        far_clip: f32,
        viewport_width: u32,
        viewport_height: u32,
    ) -> Result<Self, EngineError> {
        validate_projection(vertical_fov, near_clip, far_clip)?;
        if viewport_width == 0 || viewport_height == 0 {
            return Err(EngineError::invalid_camera(format!(
                "viewport must be non-empty, got {viewport_width}x{viewport_height}"
            )));
        }

        let mut camera = Self {
            position: Self::DEFAULT_POSITION,
            forward: Self::DEFAULT_FORWARD,
            vertical_fov,
            near_clip,
            far_clip,
            viewport_width,
            viewport_height,
            projection: Mat4::IDENTITY,
            inverse_projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            inverse_view: Mat4::IDENTITY,
        };
        camera.recompute_projection();
        camera.recompute_view();
        Ok(camera)
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn vertical_fov(&self) -> f32 {
        self.vertical_fov
    }

    pub fn near_clip(&self) -> f32 {
        self.near_clip
    }

    pub fn far_clip(&self) -> f32 {
        self.far_clip
    }

    pub fn viewport(&self) -> (u32, u32) {
        (self.viewport_width, self.viewport_height)
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn inverse_projection(&self) -> Mat4 {
        self.inverse_projection
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn inverse_view(&self) -> Mat4 {
        self.inverse_view
    }

    /// Moves the camera without changing its orientation.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.recompute_view();
    }

    /// Adopts a new viewport size, recomputing the projection.
    ///
    /// Calls with the current size return without touching the matrices, and
    /// zero-sized viewports (a minimized window) are ignored outright. The
    /// return value reports whether anything changed.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        if width == self.viewport_width && height == self.viewport_height {
            return false;
        }
        self.viewport_width = width;
        self.viewport_height = height;
        self.recompute_projection();
        true
    }

    /// Replaces the projection parameters, leaving pose and view untouched.
    ///
    /// Invalid combinations are rejected with the camera state unchanged.
    pub fn update_properties(
        &mut self,
        vertical_fov: f32,
        near_clip: f32,
        far_clip: f32,
    ) -> Result<(), EngineError> {
        validate_projection(vertical_fov, near_clip, far_clip)?;
        self.vertical_fov = vertical_fov;
        self.near_clip = near_clip;
        self.far_clip = far_clip;
        self.recompute_projection();
        Ok(())
    }

    /// Integrates one frame of navigation input.
    ///
    /// Held keys translate the camera at [`Self::MOVE_RATE`] units per
    /// second along the current basis; while look is active, mouse travel
    /// since the previous frame yaws about world up and pitches about the
    /// current right vector at [`Self::LOOK_SENSITIVITY`] radians per pixel.
    /// Returns whether the pose changed (and the view was recomputed).
    pub fn integrate(&mut self, delta_time: f32, input: &InputSnapshot) -> bool {
        let speed = Self::MOVE_RATE * delta_time;
        let right = self.forward.cross(WORLD_UP).normalize();
        let mut moved = false;

        if input.is_down(NavKey::Forward) {
            self.position += self.forward * speed;
            moved = true;
        }
        if input.is_down(NavKey::Backward) {
            self.position -= self.forward * speed;
            moved = true;
        }
        if input.is_down(NavKey::StrafeLeft) {
            self.position -= right * speed;
            moved = true;
        }
        if input.is_down(NavKey::StrafeRight) {
            self.position += right * speed;
            moved = true;
        }
        if input.is_down(NavKey::Down) {
            self.position -= WORLD_UP * speed;
            moved = true;
        }
        if input.is_down(NavKey::Up) {
            self.position += WORLD_UP * speed;
            moved = true;
        }

        if input.look_active {
            let delta = input.mouse_delta();
            if delta != glam::Vec2::ZERO {
                let yaw_delta = delta.x * Self::LOOK_SENSITIVITY;
                let pitch_delta = self.clamp_pitch(delta.y * Self::LOOK_SENSITIVITY);
                let rotation = Quat::from_rotation_y(-yaw_delta)
                    * Quat::from_axis_angle(right, -pitch_delta);
                self.forward = (rotation * self.forward).normalize();
                moved = true;
            }
        }

        if moved {
            self.recompute_view();
        }
        moved
    }

    /// Limits a pitch delta so the new elevation stays inside the clamp.
    ///
    /// The right vector is horizontal (it is `forward x world_up`), so a
    /// rotation about it by `-delta` shifts the elevation angle
    /// `asin(forward.y)` by exactly `-delta`.
    fn clamp_pitch(&self, pitch_delta: f32) -> f32 {
        let max_pitch = Self::MAX_PITCH_DEGREES.to_radians();
        let elevation = self.forward.y.clamp(-1.0, 1.0).asin();
        pitch_delta.clamp(elevation - max_pitch, elevation + max_pitch)
    }

    fn recompute_projection(&mut self) {
        let aspect = self.viewport_width as f32 / self.viewport_height as f32;
        self.projection = Mat4::perspective_rh_gl(
            self.vertical_fov.to_radians(),
            aspect,
            self.near_clip,
            self.far_clip,
        );
        self.inverse_projection = self.projection.inverse();
    }

    fn recompute_view(&mut self) {
        self.view = Mat4::look_at_rh(self.position, self.position + self.forward, WORLD_UP);
        self.inverse_view = self.view.inverse();
    }
}

fn validate_projection(
    vertical_fov: f32,
    near_clip: f32,
    far_clip: f32,
) -> Result<(), EngineError> {
    if !(vertical_fov > 0.0 && vertical_fov < 180.0) {
        return Err(EngineError::invalid_camera(format!(
            "vertical fov must be in (0, 180) degrees, got {vertical_fov}"
        )));
    }
    if !(near_clip > 0.0) {
        return Err(EngineError::invalid_camera(format!(
            "near plane must be positive, got {near_clip}"
        )));
    }
    if !(near_clip < far_clip) {
        return Err(EngineError::invalid_camera(format!(
            "near plane {near_clip} must be closer than far plane {far_clip}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputPublisher;
    use glam::Vec2;

    fn test_camera() -> Camera {
        Camera::new(45.0, 0.1, 100.0, 800, 600).unwrap()
    }

    fn max_abs_diff(a: Mat4, b: Mat4) -> f32 {
        a.to_cols_array()
            .iter()
            .zip(b.to_cols_array().iter())
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f32::max)
    }

    #[test]
    fn matrices_invert_each_other() {
        let camera = test_camera();
        let proj_round_trip = camera.projection() * camera.inverse_projection();
        let view_round_trip = camera.view() * camera.inverse_view();
        assert!(max_abs_diff(proj_round_trip, Mat4::IDENTITY) < 1e-4);
        assert!(max_abs_diff(view_round_trip, Mat4::IDENTITY) < 1e-4);
    }

    #[test]
    fn rejects_bad_projection_parameters() {
        assert!(Camera::new(45.0, 0.0, 100.0, 800, 600).is_err());
        assert!(Camera::new(45.0, 10.0, 1.0, 800, 600).is_err());
        assert!(Camera::new(-5.0, 0.1, 100.0, 800, 600).is_err());
        assert!(Camera::new(45.0, 0.1, 100.0, 0, 600).is_err());

        let mut camera = test_camera();
        let before = camera.projection();
        assert!(camera.update_properties(45.0, 50.0, 10.0).is_err());
        assert_eq!(camera.projection().to_cols_array(), before.to_cols_array());
        assert_eq!(camera.near_clip(), 0.1);
    }

    #[test]
    fn resize_is_idempotent() {
        let mut camera = test_camera();
        assert!(camera.resize(1024, 768));
        let first = camera.projection();

        assert!(!camera.resize(1024, 768));
        assert_eq!(camera.projection().to_cols_array(), first.to_cols_array());

        assert!(!camera.resize(0, 768));
        assert_eq!(camera.viewport(), (1024, 768));
    }

    #[test]
    fn update_properties_leaves_view_alone() {
        let mut camera = test_camera();
        let view_before = camera.view();
        let projection_before = camera.projection();

        camera.update_properties(60.0, 0.1, 100.0).unwrap();
        assert_eq!(camera.view().to_cols_array(), view_before.to_cols_array());
        assert!(max_abs_diff(camera.projection(), projection_before) > 1e-6);
    }

    #[test]
    fn forward_key_moves_along_view_direction() {
        let mut camera = test_camera();
        let input = InputPublisher::new();
        input.set_key(NavKey::Forward, true);

        let moved = camera.integrate(0.016, &input.snapshot());
        assert!(moved);

        let expected = Camera::DEFAULT_POSITION + Camera::DEFAULT_FORWARD * (5.0 * 0.016);
        assert!((camera.position() - expected).length() < 1e-6);
        assert_eq!(camera.forward(), Camera::DEFAULT_FORWARD);

        let recentered = camera.view().transform_point3(camera.position());
        assert!(recentered.length() < 1e-5);
    }

    #[test]
    fn strafe_and_vertical_keys_use_the_camera_basis() {
        let input = InputPublisher::new();

        let mut camera = test_camera();
        input.set_key(NavKey::StrafeRight, true);
        camera.integrate(0.1, &input.snapshot());
        assert!(camera.position().x > 0.0);
        assert_eq!(camera.position().y, 0.0);
        input.set_key(NavKey::StrafeRight, false);

        let mut camera = test_camera();
        input.set_key(NavKey::Up, true);
        camera.integrate(0.1, &input.snapshot());
        assert!(camera.position().y > 0.0);
        input.set_key(NavKey::Up, false);

        let mut camera = test_camera();
        input.set_key(NavKey::Down, true);
        camera.integrate(0.1, &input.snapshot());
        assert!(camera.position().y < 0.0);
    }

    #[test]
    fn idle_input_reports_no_motion() {
        let mut camera = test_camera();
        let input = InputPublisher::new();
        let view_before = camera.view();

        assert!(!camera.integrate(0.016, &input.snapshot()));
        assert_eq!(camera.view().to_cols_array(), view_before.to_cols_array());
    }

    #[test]
    fn horizontal_mouse_travel_yaws_without_pitch() {
        let mut camera = test_camera();
        let input = InputPublisher::new();
        input.set_look_active(true);
        input.set_mouse_position(Vec2::new(10.0, 0.0));

        assert!(camera.integrate(0.016, &input.snapshot()));

        let forward = camera.forward();
        assert!((forward.length() - 1.0).abs() < 1e-5);
        assert!(forward.y.abs() < 1e-6);
        // +x mouse travel turns the camera to the right of -z.
        assert!((forward.x - (10.0 * Camera::LOOK_SENSITIVITY).sin()).abs() < 1e-4);
    }

    #[test]
    fn look_requires_the_look_button() {
        let mut camera = test_camera();
        let input = InputPublisher::new();
        input.set_mouse_position(Vec2::new(250.0, 250.0));

        assert!(!camera.integrate(0.016, &input.snapshot()));
        assert_eq!(camera.forward(), Camera::DEFAULT_FORWARD);
    }

    #[test]
    fn pitch_never_crosses_the_poles() {
        let mut camera = test_camera();
        let input = InputPublisher::new();
        input.set_look_active(true);

        let max_elevation = Camera::MAX_PITCH_DEGREES.to_radians();
        for step in 1..=4 {
            input.set_mouse_position(Vec2::new(0.0, step as f32 * 1.0e5));
            let snapshot = input.snapshot();
            camera.integrate(0.016, &snapshot);
            input.commit_mouse_position(snapshot.mouse_position);

            let elevation = camera.forward().y.asin();
            assert!((camera.forward().length() - 1.0).abs() < 1e-4);
            assert!(elevation >= -max_elevation - 1e-4);
        }

        for step in 1..=4 {
            input.set_mouse_position(Vec2::new(0.0, -(step as f32) * 1.0e5));
            let snapshot = input.snapshot();
            camera.integrate(0.016, &snapshot);
            input.commit_mouse_position(snapshot.mouse_position);

            let elevation = camera.forward().y.asin();
            assert!(elevation <= max_elevation + 1e-4);
        }
    }
}
