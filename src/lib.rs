//! Real-time GPU ray tracer over a small dynamic sphere scene.
//!
//! The crate splits the CPU-side world (first-person camera, fixed-capacity
//! sphere registry, one directional light) from the GPU plumbing that keeps
//! uniform buffers mirroring it, so the state engine stays testable without
//! a device.  The `glint` binary wires everything to a window and event
//! loop; headless tools can use [`World`] on its own.

pub mod camera;
pub mod driver;
pub mod error;
pub mod input;
pub mod render;
pub mod scene;
pub mod uniforms;
pub mod world;

pub use camera::Camera;
pub use driver::FrameDriver;
pub use error::EngineError;
pub use input::{InputPublisher, InputSnapshot, NavKey};
pub use render::{GpuContext, Renderer};
pub use scene::{DirectionalLight, SceneConfig, Sphere, SphereRegistry, SphereSlot, MAX_SPHERES};
pub use uniforms::UniformSync;
pub use world::World;
