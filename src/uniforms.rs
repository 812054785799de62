use std::mem;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::camera::Camera;
use crate::render::GpuContext;
use crate::scene::{DirectionalLight, SphereRegistry, MAX_SPHERES};

/// Existence flags are uploaded in 4-wide groups; WGSL sees the buffer as
/// `array<vec4<u32>, FLAG_GROUPS>` because uniform arrays need 16-byte
/// element strides.
pub const FLAG_GROUPS: usize = (MAX_SPHERES + 3) / 4;

/// Camera block as the compute shader declares it: the two inverse matrices
/// first (ray generation reads only those), then the forward matrices, then
/// the world-space eye position.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    pub inverse_projection: [[f32; 4]; 4],
    pub inverse_view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub position: [f32; 3],
    pub _pad: f32,
}

impl CameraUniform {
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            inverse_projection: camera.inverse_projection().to_cols_array_2d(),
            inverse_view: camera.inverse_view().to_cols_array_2d(),
            projection: camera.projection().to_cols_array_2d(),
            view: camera.view().to_cols_array_2d(),
            position: camera.position().to_array(),
            _pad: 0.0,
        }
    }
}

/// One sphere slot as the shader sees it: 32 bytes, radius packed into the
/// fourth float of the center vector's 16-byte row.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SphereUniform {
    pub center: [f32; 3],
    pub radius: f32,
    pub albedo: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CanvasSizeUniform {
    pub width: f32,
    pub height: f32,
}

/// Light direction padded to a 16-byte allocation for the WGSL `vec3<f32>`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightUniform {
    pub direction: [f32; 3],
    pub _pad: f32,
}

impl LightUniform {
    pub fn from_light(light: &DirectionalLight) -> Self {
        Self {
            direction: light.direction.to_array(),
            _pad: 0.0,
        }
    }
}

/// Every slot in index order, vacant ones included; the shader skips slots
/// whose existence flag is clear, so their stale contents never shade.
pub fn pack_spheres(registry: &SphereRegistry) -> [SphereUniform; MAX_SPHERES] {
    let mut packed = [SphereUniform::zeroed(); MAX_SPHERES];
    for (slot, out) in registry.slots().iter().zip(packed.iter_mut()) {
        *out = SphereUniform {
            center: slot.sphere.center.to_array(),
            radius: slot.sphere.radius,
            albedo: slot.sphere.albedo,
        };
    }
    packed
}

pub fn pack_existence(registry: &SphereRegistry) -> [[u32; 4]; FLAG_GROUPS] {
    let mut groups = [[0u32; 4]; FLAG_GROUPS];
    for (index, slot) in registry.slots().iter().enumerate() {
        groups[index / 4][index % 4] = slot.exists as u32;
    }
    groups
}

/// Owns the uniform buffers the tracer binds and keeps them mirroring the
/// CPU-side scene.
///
/// Every push is a full-buffer rewrite; at 50 slots the whole set is under
/// two kilobytes, so diffing would cost more than it saves. A buffer is
/// stale for at most the frame in which its source object mutated.
pub struct UniformSync {
    context: Arc<GpuContext>,
    canvas_size: wgpu::Buffer,
    camera: wgpu::Buffer,
    spheres: wgpu::Buffer,
    sphere_flags: wgpu::Buffer,
    sphere_capacity: wgpu::Buffer,
    light: wgpu::Buffer,
}

impl UniformSync {
    pub fn new(context: Arc<GpuContext>) -> Self {
        let device = context.device();
        let sync = Self {
            canvas_size: create_uniform_buffer(
                device,
                "canvas size uniform",
                mem::size_of::<CanvasSizeUniform>(),
            ),
            camera: create_uniform_buffer(
                device,
                "camera uniform",
                mem::size_of::<CameraUniform>(),
            ),
            spheres: create_uniform_buffer(
                device,
                "sphere array uniform",
                mem::size_of::<SphereUniform>() * MAX_SPHERES,
            ),
            sphere_flags: create_uniform_buffer(
                device,
                "sphere existence uniform",
                mem::size_of::<[u32; 4]>() * FLAG_GROUPS,
            ),
            sphere_capacity: create_uniform_buffer(
                device,
                "sphere capacity uniform",
                mem::size_of::<u32>(),
            ),
            light: create_uniform_buffer(
                device,
                "directional light uniform",
                mem::size_of::<LightUniform>(),
            ),
            context,
        };
        sync.push_capacity();
        sync
    }

    pub fn push_canvas_size(&self, width: u32, height: u32) {
        let uniform = CanvasSizeUniform {
            width: width as f32,
            height: height as f32,
        };
        self.write(&self.canvas_size, bytemuck::bytes_of(&uniform));
    }

    pub fn push_camera(&self, camera: &Camera) {
        let uniform = CameraUniform::from_camera(camera);
        self.write(&self.camera, bytemuck::bytes_of(&uniform));
    }

    /// Rewrites the sphere array and its existence flags together, so a
    /// dispatch never sees one without the other.
    pub fn push_spheres(&self, registry: &SphereRegistry) {
        let spheres = pack_spheres(registry);
        let flags = pack_existence(registry);
        self.write(&self.spheres, bytemuck::cast_slice(&spheres));
        self.write(&self.sphere_flags, bytemuck::cast_slice(&flags));
    }

    pub fn push_light(&self, light: &DirectionalLight) {
        let uniform = LightUniform::from_light(light);
        self.write(&self.light, bytemuck::bytes_of(&uniform));
    }

    fn push_capacity(&self) {
        self.write(&self.sphere_capacity, bytemuck::bytes_of(&(MAX_SPHERES as u32)));
    }

    fn write(&self, buffer: &wgpu::Buffer, bytes: &[u8]) {
        self.context.queue().write_buffer(buffer, 0, bytes);
    }

    pub fn canvas_size_buffer(&self) -> &wgpu::Buffer {
        &self.canvas_size
    }

    pub fn camera_buffer(&self) -> &wgpu::Buffer {
        &self.camera
    }

    pub fn sphere_buffer(&self) -> &wgpu::Buffer {
        &self.spheres
    }

    pub fn sphere_flags_buffer(&self) -> &wgpu::Buffer {
        &self.sphere_flags
    }

    pub fn sphere_capacity_buffer(&self) -> &wgpu::Buffer {
        &self.sphere_capacity
    }

    pub fn light_buffer(&self) -> &wgpu::Buffer {
        &self.light
    }
}

fn create_uniform_buffer(device: &wgpu::Device, label: &str, size: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: size as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
