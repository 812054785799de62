use std::mem;
use std::num::NonZeroU64;
use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::render::context::GpuContext;
use crate::render::shaders;
use crate::scene::MAX_SPHERES;
use crate::uniforms::{
    CameraUniform, CanvasSizeUniform, LightUniform, SphereUniform, UniformSync, FLAG_GROUPS,
};

const WORKGROUP_SIZE: u32 = 8;

/// Clip-space quad (two triangles) rasterized by the blit pass.
const QUAD_VERTICES: [f32; 12] = [
    -1.0, -1.0, 1.0, -1.0, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0, 1.0, 1.0,
];
const QUAD_VERTEX_COUNT: u32 = (QUAD_VERTICES.len() / 2) as u32;

/// GPU frame pipeline: a compute pass traces the scene into a storage
/// texture, then a render pass blits that texture to the surface.
pub struct Renderer {
    context: Arc<GpuContext>,
    trace_pipeline: wgpu::ComputePipeline,
    blit_pipeline: wgpu::RenderPipeline,
    quad_vertices: wgpu::Buffer,
    sampler: wgpu::Sampler,
    scene_bind_group: wgpu::BindGroup,
    target_layout: wgpu::BindGroupLayout,
    blit_layout: wgpu::BindGroupLayout,
    target: TraceTarget,
}

impl Renderer {
    /// Builds both pipelines against the uniform set's buffers.
    pub fn new(context: Arc<GpuContext>, uniforms: &UniformSync) -> Self {
        let device = context.device();

        let trace_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("trace-shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::trace_source().into()),
        });
        let blit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("blit-shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::BLIT_SHADER.into()),
        });

        let scene_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene-bind-layout"),
            entries: &[
                uniform_entry(0, mem::size_of::<CanvasSizeUniform>()),
                uniform_entry(1, mem::size_of::<CameraUniform>()),
                uniform_entry(2, mem::size_of::<SphereUniform>() * MAX_SPHERES),
                uniform_entry(3, mem::size_of::<[u32; 4]>() * FLAG_GROUPS),
                uniform_entry(4, mem::size_of::<u32>()),
                uniform_entry(5, mem::size_of::<LightUniform>()),
            ],
        });

        let target_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("trace-target-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: TraceTarget::FORMAT,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            }],
        });

        let blit_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blit-bind-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let trace_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("trace-pipeline-layout"),
                bind_group_layouts: &[&scene_layout, &target_layout],
                push_constant_ranges: &[],
            });
        let trace_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("trace-pipeline"),
            layout: Some(&trace_pipeline_layout),
            module: &trace_shader,
            entry_point: "trace_main",
        });

        let blit_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("blit-pipeline-layout"),
            bind_group_layouts: &[&blit_layout],
            push_constant_ranges: &[],
        });
        let blit_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("blit-pipeline"),
            layout: Some(&blit_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &blit_shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: (2 * mem::size_of::<f32>()) as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32x2,
                        offset: 0,
                        shader_location: 0,
                    }],
                }],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &blit_shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: context.surface_format(),
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
        });

        let quad_vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("blit-quad-vertices"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("trace-sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene-bind-group"),
            layout: &scene_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.canvas_size_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: uniforms.camera_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniforms.sphere_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: uniforms.sphere_flags_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: uniforms.sphere_capacity_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: uniforms.light_buffer().as_entire_binding(),
                },
            ],
        });

        let (width, height) = context.surface_size();
        let target = TraceTarget::create(
            device,
            &target_layout,
            &blit_layout,
            &sampler,
            width,
            height,
        );

        Self {
            context,
            trace_pipeline,
            blit_pipeline,
            quad_vertices,
            sampler,
            scene_bind_group,
            target_layout,
            blit_layout,
            target,
        }
    }

    /// Resizes the surface and the trace texture together.
    pub fn resize(&mut self, width: u32, height: u32) {
        if !self.context.resize(width, height) {
            return;
        }
        let (width, height) = self.context.surface_size();
        self.target = TraceTarget::create(
            self.context.device(),
            &self.target_layout,
            &self.blit_layout,
            &self.sampler,
            width,
            height,
        );
    }

    /// Reapplies the surface configuration after a lost or outdated frame.
    /// The trace texture is still sized correctly, so it is kept.
    pub fn restore_surface(&self) {
        self.context.reconfigure();
    }

    /// Encodes one trace dispatch and one blit pass, then presents.
    pub fn render_frame(&mut self) -> Result<(), wgpu::SurfaceError> {
        let frame = self.context.acquire_frame()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device()
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("frame-encoder"),
                });

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("trace-pass"),
            });
            pass.set_pipeline(&self.trace_pipeline);
            pass.set_bind_group(0, &self.scene_bind_group, &[]);
            pass.set_bind_group(1, &self.target.trace_bind_group, &[]);
            pass.dispatch_workgroups(
                workgroup_count(self.target.width),
                workgroup_count(self.target.height),
                1,
            );
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("blit-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });
            pass.set_pipeline(&self.blit_pipeline);
            pass.set_bind_group(0, &self.target.blit_bind_group, &[]);
            pass.set_vertex_buffer(0, self.quad_vertices.slice(..));
            pass.draw(0..QUAD_VERTEX_COUNT, 0..1);
        }

        self.context.queue().submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

fn uniform_entry(binding: u32, size: usize) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(size as u64),
        },
        count: None,
    }
}

fn workgroup_count(pixels: u32) -> u32 {
    (pixels + WORKGROUP_SIZE - 1) / WORKGROUP_SIZE
}

struct TraceTarget {
    _texture: wgpu::Texture,
    trace_bind_group: wgpu::BindGroup,
    blit_bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

impl TraceTarget {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    fn create(
        device: &wgpu::Device,
        target_layout: &wgpu::BindGroupLayout,
        blit_layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        width: u32,
        height: u32,
    ) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("trace-target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let trace_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("trace-target-bind-group"),
            layout: target_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            }],
        });
        let blit_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("blit-bind-group"),
            layout: blit_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        Self {
            _texture: texture,
            trace_bind_group,
            blit_bind_group,
            width,
            height,
        }
    }
}
