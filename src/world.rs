use glam::Vec3;
use log::{debug, warn};

use crate::camera::Camera;
use crate::error::EngineError;
use crate::input::InputSnapshot;
use crate::scene::{DirectionalLight, SceneConfig, Sphere, SphereRegistry};

/// CPU-side world state: camera, sphere registry, directional light.
///
/// The world never touches the GPU. The frame driver pairs each mutation
/// with the matching uniform push, and headless mode uses the world alone.
#[derive(Debug, Clone)]
pub struct World {
    camera: Camera,
    spheres: SphereRegistry,
    light: DirectionalLight,
}

impl World {
    /// Builds the world a scene config describes, at the given viewport.
    pub fn from_config(
        config: &SceneConfig,
        viewport_width: u32,
        viewport_height: u32,
    ) -> Result<Self, EngineError> {
        let mut camera = Camera::new(
            config.camera.fov,
            config.camera.near,
            config.camera.far,
            viewport_width,
            viewport_height,
        )?;
        camera.set_position(config.camera.position);

        let mut spheres = SphereRegistry::new();
        for sphere in &config.spheres {
            if spheres.add(*sphere).is_none() {
                warn!("scene config exceeds sphere capacity, ignoring the rest");
                break;
            }
        }

        Ok(Self {
            camera,
            spheres,
            light: config.light,
        })
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn spheres(&self) -> &SphereRegistry {
        &self.spheres
    }

    pub fn light(&self) -> DirectionalLight {
        self.light
    }

    /// Integrates one frame of input into the camera.
    ///
    /// Frames without any active input leave the camera untouched, so idle
    /// frames cost no matrix work and no camera upload. Returns whether the
    /// camera changed.
    pub fn advance(&mut self, delta_time: f32, input: &InputSnapshot) -> bool {
        if !input.any_active() {
            return false;
        }
        self.camera.integrate(delta_time, input)
    }

    pub fn add_sphere(&mut self, sphere: Sphere) -> Option<usize> {
        let index = self.spheres.add(sphere);
        match index {
            Some(index) => debug!("added sphere in slot {index}"),
            None => debug!("sphere registry full, add refused"),
        }
        index
    }

    pub fn add_default_sphere(&mut self) -> Option<usize> {
        self.add_sphere(Sphere::default())
    }

    pub fn update_sphere_at(&mut self, index: usize, sphere: Sphere) -> Result<(), EngineError> {
        self.spheres.update_at(index, sphere)
    }

    pub fn delete_sphere(&mut self, index: usize) -> Result<(), EngineError> {
        self.spheres.delete(index)?;
        debug!("deleted sphere in slot {index}");
        Ok(())
    }

    pub fn set_directional_light(&mut self, direction: Vec3) {
        self.light.direction = direction;
    }

    pub fn set_camera_properties(
        &mut self,
        fov: f32,
        near: f32,
        far: f32,
    ) -> Result<(), EngineError> {
        self.camera.update_properties(fov, near, far)
    }

    /// Forwards a viewport change to the camera; true when it took effect.
    pub fn resize_viewport(&mut self, width: u32, height: u32) -> bool {
        self.camera.resize(width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputPublisher, NavKey};
    use crate::scene::MAX_SPHERES;

    fn demo_world() -> World {
        World::from_config(&SceneConfig::demo(), 800, 600).unwrap()
    }

    #[test]
    fn from_config_seeds_camera_and_spheres() {
        let world = demo_world();
        assert_eq!(world.camera().position(), Camera::DEFAULT_POSITION);
        assert_eq!(world.camera().viewport(), (800, 600));
        assert_eq!(world.spheres().len_existing(), 3);
        assert_eq!(world.light().direction, Vec3::new(-1.0, -1.0, -1.0));
    }

    #[test]
    fn from_config_rejects_bad_camera_values() {
        let mut config = SceneConfig::demo();
        config.camera.near = -1.0;
        assert!(World::from_config(&config, 800, 600).is_err());
    }

    #[test]
    fn oversized_config_fills_exactly_to_capacity() {
        let mut config = SceneConfig::default();
        config.spheres = vec![Sphere::default(); MAX_SPHERES + 10];
        let world = World::from_config(&config, 800, 600).unwrap();
        assert_eq!(world.spheres().len_existing(), MAX_SPHERES);
    }

    #[test]
    fn advance_without_input_leaves_the_camera_alone() {
        let mut world = demo_world();
        let input = InputPublisher::new();
        let view_before = world.camera().view();

        assert!(!world.advance(0.016, &input.snapshot()));
        assert_eq!(
            world.camera().view().to_cols_array(),
            view_before.to_cols_array()
        );
    }

    #[test]
    fn advance_with_input_moves_the_camera() {
        let mut world = demo_world();
        let input = InputPublisher::new();
        input.set_key(NavKey::Backward, true);

        assert!(world.advance(0.5, &input.snapshot()));
        assert!(world.camera().position().z > Camera::DEFAULT_POSITION.z);
    }

    #[test]
    fn mutations_flow_through_to_the_registry() {
        let mut world = demo_world();
        let index = world.add_default_sphere().unwrap();
        assert_eq!(index, 3);

        world.delete_sphere(index).unwrap();
        assert!(!world.spheres().slots()[index].exists);
        assert!(world.delete_sphere(MAX_SPHERES).is_err());

        world.set_directional_light(Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(world.light().direction, Vec3::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn camera_property_errors_leave_state_unchanged() {
        let mut world = demo_world();
        let projection = world.camera().projection();

        assert!(world.set_camera_properties(45.0, 5.0, 2.0).is_err());
        assert_eq!(
            world.camera().projection().to_cols_array(),
            projection.to_cols_array()
        );
    }
}
