use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use log::info;
use parking_lot::RwLock;
use winit::window::Window;

/// Owned GPU handles: surface, device, queue, and the surface configuration.
///
/// Shared through an `Arc` with every component that creates or writes GPU
/// resources, so one window has exactly one device and there is no global
/// handle to reach for.
pub struct GpuContext {
    surface: wgpu::Surface,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: RwLock<wgpu::SurfaceConfiguration>,
    // Declared after the surface: the surface borrows the window's native
    // handle and must drop first.
    window: Arc<Window>,
}

impl GpuContext {
    /// Acquires an adapter and device for the window and configures its
    /// surface. Any failure here is fatal to interactive startup.
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("window has zero area"));
        }

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        // The Arc stored below keeps the window alive for the surface.
        let surface = unsafe { instance.create_surface(window.as_ref()) }
            .context("failed to create rendering surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;
        info!("rendering with {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("tracer-device"),
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps
                .present_modes
                .iter()
                .copied()
                .find(|mode| {
                    matches!(
                        mode,
                        wgpu::PresentMode::Mailbox | wgpu::PresentMode::Immediate
                    )
                })
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        Ok(Self {
            surface,
            device,
            queue,
            config: RwLock::new(config),
            window,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.read().format
    }

    pub fn surface_size(&self) -> (u32, u32) {
        let config = self.config.read();
        (config.width, config.height)
    }

    /// Reconfigures the surface for a new size; zero-area requests (a
    /// minimized window) are ignored. True when the size changed.
    pub fn resize(&self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        let mut config = self.config.write();
        if width == config.width && height == config.height {
            return false;
        }
        config.width = width;
        config.height = height;
        self.surface.configure(&self.device, &config);
        true
    }

    /// Reapplies the current configuration after a lost or outdated surface.
    pub fn reconfigure(&self) {
        let config = self.config.read();
        self.surface.configure(&self.device, &config);
    }

    pub fn acquire_frame(&self) -> Result<wgpu::SurfaceTexture, wgpu::SurfaceError> {
        self.surface.get_current_texture()
    }
}
