use anyhow::Result;

use super::config::PipelineConfig;
use super::targets::{MomentTargets, MOMENT_FORMAT};

/// Workgroup edge length of the blur kernels; must match `blur.wgsl`.
const WORKGROUP_SIZE: u32 = 8;

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct BlurParams {
    radius: i32,
    width: i32,
    height: i32,
    _pad: i32,
}

/// Separable box blur over the moment layers.
///
/// Horizontal pass reads each moment layer and writes the scratch layer;
/// the vertical pass reads scratch and writes the moment layer back. The
/// two directions run in separate compute passes so every horizontal
/// write lands before any vertical read.
pub struct BlurPass {
    horizontal: wgpu::ComputePipeline,
    vertical: wgpu::ComputePipeline,
    horizontal_groups: Vec<wgpu::BindGroup>,
    vertical_groups: Vec<wgpu::BindGroup>,
    dispatch: u32,
}

impl BlurPass {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        config: &PipelineConfig,
        targets: &MomentTargets,
    ) -> Result<Self> {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("umbra blur shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/blur.wgsl").into()),
        });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("umbra blur bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: false },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::StorageTexture {
                            access: wgpu::StorageTextureAccess::WriteOnly,
                            format: MOMENT_FORMAT,
                            view_dimension: wgpu::TextureViewDimension::D2,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: std::num::NonZeroU64::new(
                                std::mem::size_of::<BlurParams>() as u64,
                            ),
                        },
                        count: None,
                    },
                ],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("umbra blur pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let compute_pipeline = |entry_point: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("umbra blur pipeline"),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(entry_point),
                compilation_options: Default::default(),
                cache: None,
            })
        };
        let horizontal = compute_pipeline("cs_horizontal");
        let vertical = compute_pipeline("cs_vertical");

        let params = BlurParams {
            radius: config.kernel_radius,
            width: targets.resolution as i32,
            height: targets.resolution as i32,
            _pad: 0,
        };
        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("umbra blur params"),
            size: std::mem::size_of::<BlurParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&params_buffer, 0, bytemuck::bytes_of(&params));

        let bind_group = |src: &wgpu::TextureView, dst: &wgpu::TextureView| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("umbra blur bind group"),
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(src),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(dst),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: params_buffer.as_entire_binding(),
                    },
                ],
            })
        };

        let layers = targets.layer_capacity as usize;
        let horizontal_groups = (0..layers)
            .map(|i| bind_group(&targets.layer_views[i], &targets.scratch_views[i]))
            .collect();
        let vertical_groups = (0..layers)
            .map(|i| bind_group(&targets.scratch_views[i], &targets.layer_views[i]))
            .collect();

        Ok(Self {
            horizontal,
            vertical,
            horizontal_groups,
            vertical_groups,
            dispatch: targets.resolution.div_ceil(WORKGROUP_SIZE),
        })
    }

    /// Blurs the first `layer_count` moment layers in place.
    pub fn record(&self, encoder: &mut wgpu::CommandEncoder, layer_count: usize) {
        let layer_count = layer_count.min(self.horizontal_groups.len());

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("umbra blur horizontal"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.horizontal);
            for group in &self.horizontal_groups[..layer_count] {
                pass.set_bind_group(0, group, &[]);
                pass.dispatch_workgroups(self.dispatch, self.dispatch, 1);
            }
        }

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("umbra blur vertical"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.vertical);
        for group in &self.vertical_groups[..layer_count] {
            pass.set_bind_group(0, group, &[]);
            pass.dispatch_workgroups(self.dispatch, self.dispatch, 1);
        }
    }
}
