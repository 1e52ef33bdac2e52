use anyhow::Result;
use glam::Mat4;

use crate::scene::{DrawEntry, Light, Vertex};
use crate::shadow::encode_moments;

use super::config::{PipelineConfig, ShadowMode};
use super::targets::{MomentTargets, CAPTURE_DEPTH_FORMAT, MOMENT_FORMAT};

/// Stride for dynamic-offset uniform entries; matches the guaranteed
/// minimum `min_uniform_buffer_offset_alignment`.
pub(crate) const UNIFORM_STRIDE: u64 = 256;

/// Shadow capture pass: renders all opaque geometry once per light, from
/// that light's view-projection, into that light's moment layer.
///
/// Stateless between frames; re-recorded every frame for every light.
pub struct CapturePass {
    pipeline: wgpu::RenderPipeline,
    light_buffer: wgpu::Buffer,
    light_bind_group: wgpu::BindGroup,
    model_bgl: wgpu::BindGroupLayout,
    model_buffer: wgpu::Buffer,
    model_bind_group: wgpu::BindGroup,
    model_capacity: usize,
    clear_color: wgpu::Color,
}

impl CapturePass {
    pub fn new(device: &wgpu::Device, config: &PipelineConfig) -> Result<Self> {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("umbra capture shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/capture.wgsl").into()),
        });

        let mat4_size = std::num::NonZeroU64::new(std::mem::size_of::<[[f32; 4]; 4]>() as u64);

        let light_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("umbra capture light bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: mat4_size,
                },
                count: None,
            }],
        });

        let model_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("umbra capture model bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: mat4_size,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("umbra capture pipeline layout"),
            bind_group_layouts: &[&light_bgl, &model_bgl],
            immediate_size: 0,
        });

        let fragment_entry = match config.shadow_mode {
            ShadowMode::Moment => "fs_moments",
            ShadowMode::Binary => "fs_depth",
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("umbra capture pipeline"),
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
                    format: MOMENT_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: CAPTURE_DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let light_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("umbra capture light vp buffer"),
            size: config.layer_capacity as u64 * UNIFORM_STRIDE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let light_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("umbra capture light bind group"),
            layout: &light_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &light_buffer,
                    offset: 0,
                    size: mat4_size,
                }),
            }],
        });

        let model_capacity = 64;
        let (model_buffer, model_bind_group) =
            Self::create_model_binding(device, &model_bgl, model_capacity);

        // Background texels keep the clear value, which must read as "no
        // occluder until the far plane" so uncovered receivers stay lit.
        let clear_color = match config.shadow_mode {
            ShadowMode::Moment => {
                let far = encode_moments(1.0);
                wgpu::Color {
                    r: far.x as f64,
                    g: far.y as f64,
                    b: far.z as f64,
                    a: far.w as f64,
                }
            }
            ShadowMode::Binary => wgpu::Color {
                r: 1.0,
                g: 0.0,
                b: 0.0,
                a: 0.0,
            },
        };

        Ok(Self {
            pipeline,
            light_buffer,
            light_bind_group,
            model_bgl,
            model_buffer,
            model_bind_group,
            model_capacity,
            clear_color,
        })
    }

    fn create_model_binding(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("umbra capture model buffer"),
            size: capacity as u64 * UNIFORM_STRIDE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("umbra capture model bind group"),
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

    /// Uploads per-light and per-draw matrices and records one render pass
    /// per light. Each pass clears its layer, so lights whose geometry is
    /// entirely out of frustum still produce a well-defined "far plane"
    /// layer.
    pub fn record(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        targets: &MomentTargets,
        lights: &[Light],
        entries: &[DrawEntry<'_>],
    ) {
        self.ensure_model_capacity(device, entries.len());

        if !lights.is_empty() {
            let mut staged = vec![0u8; lights.len() * UNIFORM_STRIDE as usize];
            for (i, light) in lights.iter().enumerate() {
                write_mat4(&mut staged, i, light.view_proj);
            }
            queue.write_buffer(&self.light_buffer, 0, &staged);
        }

        if !entries.is_empty() {
            let mut staged = vec![0u8; entries.len() * UNIFORM_STRIDE as usize];
            for (i, entry) in entries.iter().enumerate() {
                write_mat4(&mut staged, i, entry.model);
            }
            queue.write_buffer(&self.model_buffer, 0, &staged);
        }

        for (light_index, _) in lights.iter().enumerate() {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("umbra capture pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &targets.layer_attachments[light_index],
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &targets.capture_depth,
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
            let light_offset = (light_index as u64 * UNIFORM_STRIDE) as u32;
            rpass.set_bind_group(0, &self.light_bind_group, &[light_offset]);

            for (entry_index, entry) in entries.iter().enumerate() {
                let model_offset = (entry_index as u64 * UNIFORM_STRIDE) as u32;
                rpass.set_bind_group(1, &self.model_bind_group, &[model_offset]);
                rpass.set_vertex_buffer(0, entry.mesh.vertex_buffer.slice(..));
                rpass.set_index_buffer(
                    entry.mesh.index_buffer.slice(..),
                    wgpu::IndexFormat::Uint32,
                );
                rpass.draw_indexed(0..entry.mesh.index_count, 0, 0..1);
            }
        }
    }
}

pub(crate) fn write_mat4(staged: &mut [u8], index: usize, matrix: Mat4) {
    let offset = index * UNIFORM_STRIDE as usize;
    let cols = matrix.to_cols_array_2d();
    let bytes = bytemuck::bytes_of(&cols);
    staged[offset..offset + bytes.len()].copy_from_slice(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn staged_matrices_land_at_stride_offsets() {
        let stride = UNIFORM_STRIDE as usize;
        let mut staged = vec![0u8; 2 * stride];
        let matrix = Mat4::from_cols(
            Vec4::new(1.0, 2.0, 3.0, 4.0),
            Vec4::new(5.0, 6.0, 7.0, 8.0),
            Vec4::new(9.0, 10.0, 11.0, 12.0),
            Vec4::new(13.0, 14.0, 15.0, 16.0),
        );

        write_mat4(&mut staged, 1, matrix);

        // Slot 0 stays untouched; slot 1 holds the column-major bytes.
        assert!(staged[..stride].iter().all(|&b| b == 0));
        let expected = matrix.to_cols_array_2d();
        assert_eq!(
            &staged[stride..stride + 64],
            bytemuck::bytes_of(&expected)
        );
    }
}
