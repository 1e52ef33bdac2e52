use anyhow::Result;
use wgpu::util::DeviceExt;

use crate::scene::{Camera, CameraUniform, DrawEntry, Light, LightUniform, Material, Vertex, MAX_UNIFORM_LIGHTS};

use super::capture::{write_mat4, UNIFORM_STRIDE};
use super::config::{LightStorage, PipelineConfig, ShadowMode};
use super::targets::MomentTargets;

/// Depth format for the final lighting pass.
pub const SCENE_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Depth compare bias for binary shadow mode. Moment mode needs no bias;
/// the moment solver absorbs quantization in its epsilon.
pub const HARD_SHADOW_BIAS: f32 = 0.005;

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct PassParams {
    shadow_mode: u32,
    specular_factor: f32,
    shadow_bias: f32,
    _pad: u32,
}

/// Final shaded pass: draws the scene from the camera against the caller's
/// color target, sampling the blurred moment layers for per-light
/// visibility.
pub struct LightingPass {
    pipeline: wgpu::RenderPipeline,
    target_format: wgpu::TextureFormat,

    camera_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,

    material_bgl: wgpu::BindGroupLayout,

    model_bgl: wgpu::BindGroupLayout,
    model_buffer: wgpu::Buffer,
    model_bind_group: wgpu::BindGroup,
    model_capacity: usize,

    light_buffer: wgpu::Buffer,
    light_bind_group: wgpu::BindGroup,
    light_slots: usize,

    depth: Option<(wgpu::TextureView, u32, u32)>,
}

impl LightingPass {
    pub fn new(
        device: &wgpu::Device,
        config: &PipelineConfig,
        targets: &MomentTargets,
        target_format: wgpu::TextureFormat,
    ) -> Result<Self> {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("umbra lighting shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/lighting.wgsl").into()),
        });

        let uniform_entry = |binding: u32,
                             visibility: wgpu::ShaderStages,
                             dynamic: bool,
                             size: u64| wgpu::BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: dynamic,
                min_binding_size: std::num::NonZeroU64::new(size),
            },
            count: None,
        };

        let frame_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("umbra lighting frame bgl"),
            entries: &[
                uniform_entry(
                    0,
                    wgpu::ShaderStages::VERTEX_FRAGMENT,
                    false,
                    std::mem::size_of::<CameraUniform>() as u64,
                ),
                uniform_entry(
                    1,
                    wgpu::ShaderStages::FRAGMENT,
                    false,
                    std::mem::size_of::<PassParams>() as u64,
                ),
            ],
        });

        let material_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("umbra material bgl"),
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
                uniform_entry(
                    2,
                    wgpu::ShaderStages::FRAGMENT,
                    false,
                    std::mem::size_of::<crate::scene::MaterialUniform>() as u64,
                ),
            ],
        });

        let model_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("umbra lighting model bgl"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX,
                true,
                std::mem::size_of::<[[f32; 4]; 4]>() as u64,
            )],
        });

        // The light list binds at a slot matching its storage strategy; the
        // shader declares both and each fragment entry point reads one.
        let light_slots = match config.light_storage {
            LightStorage::Storage => config.layer_capacity as usize,
            LightStorage::Uniform => MAX_UNIFORM_LIGHTS,
        };
        let light_buffer_size =
            16 + (light_slots * std::mem::size_of::<LightUniform>()) as u64;
        let light_list_entry = match config.light_storage {
            LightStorage::Storage => wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: std::num::NonZeroU64::new(light_buffer_size),
                },
                count: None,
            },
            LightStorage::Uniform => uniform_entry(
                1,
                wgpu::ShaderStages::FRAGMENT,
                false,
                light_buffer_size,
            ),
        };

        let light_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("umbra lighting light bgl"),
            entries: &[
                light_list_entry,
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("umbra lighting pipeline layout"),
            bind_group_layouts: &[&frame_bgl, &material_bgl, &model_bgl, &light_bgl],
            immediate_size: 0,
        });

        let fragment_entry = match config.light_storage {
            LightStorage::Storage => "fs_main",
            LightStorage::Uniform => "fs_main_uniform",
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("umbra lighting pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[Vertex::desc()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some(fragment_entry),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: SCENE_DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("umbra camera buffer"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let params = PassParams {
            shadow_mode: match config.shadow_mode {
                ShadowMode::Moment => 0,
                ShadowMode::Binary => 1,
            },
            specular_factor: config.specular_scale.factor(),
            shadow_bias: HARD_SHADOW_BIAS,
            _pad: 0,
        };
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("umbra lighting params"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("umbra lighting frame bind group"),
            layout: &frame_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        let light_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("umbra light list buffer"),
            size: light_buffer_size,
            usage: match config.light_storage {
                LightStorage::Storage => wgpu::BufferUsages::STORAGE,
                LightStorage::Uniform => wgpu::BufferUsages::UNIFORM,
            } | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let light_binding = match config.light_storage {
            LightStorage::Storage => 0,
            LightStorage::Uniform => 1,
        };
        let light_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("umbra lighting light bind group"),
            layout: &light_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: light_binding,
                    resource: light_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&targets.array_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&targets.sampler),
                },
            ],
        });

        let model_capacity = 64;
        let (model_buffer, model_bind_group) =
            Self::create_model_binding(device, &model_bgl, model_capacity);

        Ok(Self {
            pipeline,
            target_format,
            camera_buffer,
            frame_bind_group,
            material_bgl,
            model_bgl,
            model_buffer,
            model_bind_group,
            model_capacity,
            light_buffer,
            light_bind_group,
            light_slots,
            depth: None,
        })
    }

    /// Format this pass renders into; the caller's color view must match.
    #[inline]
    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.target_format
    }

    /// Builds a bind group for one material: diffuse texture, its sampler,
    /// and the packed material constants. A 1x1 transparent-black texture
    /// view here selects the material-color fallback in the shader.
    pub fn create_material_bind_group(
        &self,
        device: &wgpu::Device,
        texture_view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
        material: &Material,
    ) -> wgpu::BindGroup {
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("umbra material uniform"),
            contents: bytemuck::bytes_of(&material.uniform()),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("umbra material bind group"),
            layout: &self.material_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(texture_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform_buffer.as_entire_binding(),
                },
            ],
        })
    }

    fn create_model_binding(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("umbra lighting model buffer"),
            size: capacity as u64 * UNIFORM_STRIDE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("umbra lighting model bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: std::num::NonZeroU64::new(std::mem::size_of::<[[f32; 4]; 4]>() as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    fn ensure_model_capacity(&mut self, device: &wgpu::Device, required: usize) {
        if required <= self.model_capacity {
            return;
        }
        let new_cap = required.next_power_of_two().max(64);
        let (buffer, bind_group) = Self::create_model_binding(device, &self.model_bgl, new_cap);
        self.model_buffer = buffer;
        self.model_bind_group = bind_group;
        self.model_capacity = new_cap;
    }

    fn ensure_depth(&mut self, device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        if let Some((view, w, h)) = &self.depth {
            if *w == width && *h == height {
                return view.clone();
            }
        }
        log::debug!("scene depth buffer: {width}x{height}");
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("umbra scene depth"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SCENE_DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.depth = Some((view.clone(), width, height));
        view
    }

    /// Uploads camera, light list, and model matrices, then records the
    /// shaded pass into `color_view`.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        target_size: (u32, u32),
        clear_color: wgpu::Color,
        camera: &Camera,
        lights: &[Light],
        entries: &[DrawEntry<'_>],
    ) {
        let depth_view = self.ensure_depth(device, target_size.0, target_size.1);
        self.ensure_model_capacity(device, entries.len());

        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&camera.uniform()));

        // Light list: a 16-byte count header followed by the packed
        // entries; slots past the active count stay zeroed.
        let mut staged =
            vec![0u8; 16 + self.light_slots * std::mem::size_of::<LightUniform>()];
        let active = lights.len().min(self.light_slots) as u32;
        staged[..4].copy_from_slice(&active.to_le_bytes());
        for (i, light) in lights.iter().take(self.light_slots).enumerate() {
            let offset = 16 + i * std::mem::size_of::<LightUniform>();
            let uniform = light.uniform();
            let bytes = bytemuck::bytes_of(&uniform);
            staged[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
        queue.write_buffer(&self.light_buffer, 0, &staged);

        if !entries.is_empty() {
            let mut staged = vec![0u8; entries.len() * UNIFORM_STRIDE as usize];
            for (i, entry) in entries.iter().enumerate() {
                write_mat4(&mut staged, i, entry.model);
            }
            queue.write_buffer(&self.model_buffer, 0, &staged);
        }

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("umbra lighting pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.frame_bind_group, &[]);
        rpass.set_bind_group(3, &self.light_bind_group, &[]);

        for (entry_index, entry) in entries.iter().enumerate() {
            let model_offset = (entry_index as u64 * UNIFORM_STRIDE) as u32;
            rpass.set_bind_group(1, entry.material, &[]);
            rpass.set_bind_group(2, &self.model_bind_group, &[model_offset]);
            rpass.set_vertex_buffer(0, entry.mesh.vertex_buffer.slice(..));
            rpass.set_index_buffer(entry.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..entry.mesh.index_count, 0, 0..1);
        }
    }
}
