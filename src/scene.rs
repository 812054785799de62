use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::error::EngineError;

/// Number of sphere slots, in the registry and in the GPU-side arrays alike.
pub const MAX_SPHERES: usize = 50;

/// Scene primitive: a sphere with a flat RGBA albedo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    #[serde(default)]
    pub center: Vec3,
    #[serde(default = "default_radius")]
    pub radius: f32,
    #[serde(default = "default_albedo")]
    pub albedo: [f32; 4],
}

impl Default for Sphere {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            radius: default_radius(),
            albedo: default_albedo(),
        }
    }
}

fn default_radius() -> f32 {
    1.0
}

fn default_albedo() -> [f32; 4] {
    [1.0, 1.0, 1.0, 1.0]
}

/// One registry slot: sphere data plus the existence flag.
///
/// Slots whose `exists` flag is clear keep their last sphere data; the data
/// carries no meaning until the slot is reused.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SphereSlot {
    pub sphere: Sphere,
    pub exists: bool,
}

/// Fixed-capacity sphere table with stable slot indices.
///
/// A slot index identifies the same sphere for the whole session: deletion
/// clears the existence flag without renumbering, and addition fills the
/// lowest vacant slot.
#[derive(Debug, Clone)]
pub struct SphereRegistry {
    slots: [SphereSlot; MAX_SPHERES],
}

impl Default for SphereRegistry {
    fn default() -> Self {
        Self {
            slots: [SphereSlot::default(); MAX_SPHERES],
        }
    }
}

impl SphereRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a sphere in the lowest vacant slot.
    ///
    /// Returns the slot index, or `None` when every slot is occupied.
    pub fn add(&mut self, sphere: Sphere) -> Option<usize> {
        let index = self.slots.iter().position(|slot| !slot.exists)?;
        self.slots[index] = SphereSlot {
            sphere,
            exists: true,
        };
        Some(index)
    }

    pub fn add_default(&mut self) -> Option<usize> {
        self.add(Sphere::default())
    }

    /// Overwrites the slot at `index` and marks it existing.
    pub fn update_at(&mut self, index: usize, sphere: Sphere) -> Result<(), EngineError> {
        let slot = self.slot_mut(index)?;
        *slot = SphereSlot {
            sphere,
            exists: true,
        };
        Ok(())
    }

    /// Clears the existence flag at `index`; the slot may be reused later.
    pub fn delete(&mut self, index: usize) -> Result<(), EngineError> {
        self.slot_mut(index)?.exists = false;
        Ok(())
    }

    /// All slots in index order, vacant ones included.
    pub fn slots(&self) -> &[SphereSlot] {
        &self.slots
    }

    pub fn len_existing(&self) -> usize {
        self.slots.iter().filter(|slot| slot.exists).count()
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut SphereSlot, EngineError> {
        self.slots
            .get_mut(index)
            .ok_or(EngineError::SphereIndexOutOfBounds {
                index,
                capacity: MAX_SPHERES,
            })
    }
}

/// Single directional light. The direction is used as-is, not normalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    pub direction: Vec3,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-1.0, -1.0, -1.0),
        }
    }
}

/// Camera parameters as they appear in a scene file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_fov")]
    pub fov: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
    #[serde(default = "default_camera_position")]
    pub position: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: default_fov(),
            near: default_near(),
            far: default_far(),
            position: default_camera_position(),
        }
    }
}

fn default_fov() -> f32 {
    Camera::DEFAULT_FOV
}

fn default_near() -> f32 {
    Camera::DEFAULT_NEAR
}

fn default_far() -> f32 {
    Camera::DEFAULT_FAR
}

fn default_camera_position() -> Vec3 {
    Camera::DEFAULT_POSITION
}

/// Startup description of the world, loaded from a JSON scene file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SceneConfig {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub light: DirectionalLight,
    #[serde(default)]
    pub spheres: Vec<Sphere>,
}

impl SceneConfig {
    /// Parses a JSON scene description.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("invalid scene JSON")?;
        if config.spheres.len() > MAX_SPHERES {
            return Err(anyhow!(
                "scene lists {} spheres, capacity is {MAX_SPHERES}",
                config.spheres.len()
            ));
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read scene file {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("in scene file {}", path.display()))
    }

    /// The built-in scene used when no scene file is given: two small
    /// spheres over a large ground sphere.
    pub fn demo() -> Self {
        Self {
            camera: CameraConfig::default(),
            light: DirectionalLight::default(),
            spheres: vec![
                Sphere {
                    center: Vec3::new(0.0, 0.0, 0.0),
                    radius: 1.0,
                    albedo: [1.0, 0.2, 0.6, 1.0],
                },
                Sphere {
                    center: Vec3::new(2.0, 3.0, -5.0),
                    radius: 1.0,
                    albedo: [0.2, 0.5, 1.0, 1.0],
                },
                Sphere {
                    center: Vec3::new(0.0, -30.0, 0.0),
                    radius: 28.0,
                    albedo: [0.2, 0.8, 0.3, 1.0],
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    {
        "camera": { "fov": 90.0, "position": [0.0, 1.0, 5.0] },
        "light": { "direction": [0.0, -1.0, 0.0] },
        "spheres": [
            { "center": [0.0, 0.0, -2.0], "radius": 0.5, "albedo": [1.0, 0.0, 0.0, 1.0] },
            { "center": [1.0, 0.0, -2.0] }
        ]
    }
    "#;

    #[test]
    fn parse_scene_fills_in_defaults() {
        let config = SceneConfig::from_json(SAMPLE).unwrap();
        assert_eq!(config.camera.fov, 90.0);
        assert_eq!(config.camera.near, Camera::DEFAULT_NEAR);
        assert_eq!(config.camera.position, Vec3::new(0.0, 1.0, 5.0));
        assert_eq!(config.light.direction, Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(config.spheres.len(), 2);
        assert_eq!(config.spheres[1].radius, 1.0);
        assert_eq!(config.spheres[1].albedo, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(SceneConfig::from_json("{ \"spheres\": [ { } ").is_err());
    }

    #[test]
    fn overfull_scene_is_an_error() {
        let spheres: Vec<String> = (0..=MAX_SPHERES).map(|_| "{}".to_string()).collect();
        let json = format!("{{ \"spheres\": [{}] }}", spheres.join(","));
        assert!(SceneConfig::from_json(&json).is_err());
    }

    #[test]
    fn add_fills_slots_in_order_until_full() {
        let mut registry = SphereRegistry::new();
        for expected in 0..MAX_SPHERES {
            assert_eq!(registry.add_default(), Some(expected));
        }
        assert_eq!(registry.add_default(), None);
        assert_eq!(registry.len_existing(), MAX_SPHERES);
    }

    #[test]
    fn delete_clears_only_the_named_slot() {
        let mut registry = SphereRegistry::new();
        for _ in 0..3 {
            registry.add_default();
        }
        registry.delete(1).unwrap();

        let slots = registry.slots();
        assert!(slots[0].exists);
        assert!(!slots[1].exists);
        assert!(slots[2].exists);
        assert_eq!(registry.len_existing(), 2);
    }

    #[test]
    fn deleted_slot_is_reused_by_add() {
        let mut registry = SphereRegistry::new();
        for _ in 0..3 {
            registry.add_default();
        }
        registry.delete(1).unwrap();
        assert_eq!(registry.add_default(), Some(1));
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        let mut registry = SphereRegistry::new();
        registry.add_default();

        let err = registry.update_at(MAX_SPHERES, Sphere::default());
        assert_eq!(
            err,
            Err(EngineError::SphereIndexOutOfBounds {
                index: MAX_SPHERES,
                capacity: MAX_SPHERES,
            })
        );
        assert!(registry.delete(usize::MAX).is_err());
        assert_eq!(registry.len_existing(), 1);
    }

    #[test]
    fn update_resurrects_a_deleted_slot() {
        let mut registry = SphereRegistry::new();
        registry.add_default();
        registry.delete(0).unwrap();

        let replacement = Sphere {
            center: Vec3::new(4.0, 0.0, 0.0),
            radius: 2.0,
            albedo: [0.0, 0.0, 1.0, 1.0],
        };
        registry.update_at(0, replacement).unwrap();

        let slot = registry.slots()[0];
        assert!(slot.exists);
        assert_eq!(slot.sphere, replacement);
    }

    #[test]
    fn demo_scene_matches_the_documented_layout() {
        let demo = SceneConfig::demo();
        assert_eq!(demo.spheres.len(), 3);
        assert_eq!(demo.spheres[0].center, Vec3::ZERO);
        assert_eq!(demo.spheres[1].center, Vec3::new(2.0, 3.0, -5.0));
        assert_eq!(demo.spheres[2].radius, 28.0);
    }

    #[test]
    fn demo_spheres_occupy_the_first_three_slots() {
        let mut registry = SphereRegistry::new();
        for (expected, sphere) in SceneConfig::demo().spheres.into_iter().enumerate() {
            assert_eq!(registry.add(sphere), Some(expected));
        }

        let slots = registry.slots();
        assert!(slots[..3].iter().all(|slot| slot.exists));
        assert!(slots[3..].iter().all(|slot| !slot.exists));
        assert_eq!(slots[1].sphere.center, Vec3::new(2.0, 3.0, -5.0));
        assert_eq!(slots[2].sphere.center, Vec3::new(0.0, -30.0, 0.0));
        assert_eq!(
            [slots[0].sphere.radius, slots[1].sphere.radius, slots[2].sphere.radius],
            [1.0, 1.0, 28.0]
        );
    }
}
