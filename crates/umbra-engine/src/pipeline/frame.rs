use anyhow::{Context, Result};

use crate::error::PipelineError;
use crate::scene::{Camera, DrawEntry, Light, Material};

use super::blur::BlurPass;
use super::capture::CapturePass;
use super::config::{PipelineConfig, ShadowMode};
use super::lighting::LightingPass;
use super::targets::MomentTargets;

/// One frame's worth of input to [`ShadowPipeline::render`].
///
/// The color target and its size come from the caller (swapchain or
/// offscreen); the pipeline owns every intermediate target itself.
pub struct FrameDesc<'a> {
    pub color_view: &'a wgpu::TextureView,
    pub target_size: (u32, u32),
    pub clear_color: wgpu::Color,
    pub camera: &'a Camera,
    /// Active shadow-casting lights; at most `layer_capacity` of them.
    pub lights: &'a [Light],
    pub entries: &'a [DrawEntry<'a>],
}

/// The full shadowed-lighting pipeline: capture, blur, shade.
///
/// Construction allocates every GPU resource up front from a validated
/// [`PipelineConfig`]; per-frame work is upload-and-record only, so a
/// frame can fail solely on the light-count check.
pub struct ShadowPipeline {
    config: PipelineConfig,
    targets: MomentTargets,
    capture: CapturePass,
    blur: BlurPass,
    lighting: LightingPass,
}

impl ShadowPipeline {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        config: PipelineConfig,
        target_format: wgpu::TextureFormat,
    ) -> Result<Self> {
        config.validate().context("invalid pipeline configuration")?;

        let targets = MomentTargets::new(device, config.shadow_resolution, config.layer_capacity);
        let capture = CapturePass::new(device, &config).context("capture pass setup")?;
        let blur = BlurPass::new(device, queue, &config, &targets).context("blur pass setup")?;
        let lighting = LightingPass::new(device, &config, &targets, target_format)
            .context("lighting pass setup")?;

        log::info!(
            "shadow pipeline ready: {:?} shadows, {:?} lights, {} layers at {}^2",
            config.shadow_mode,
            config.light_storage,
            config.layer_capacity,
            config.shadow_resolution,
        );

        Ok(Self {
            config,
            targets,
            capture,
            blur,
            lighting,
        })
    }

    #[inline]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// See [`LightingPass::create_material_bind_group`].
    pub fn create_material_bind_group(
        &self,
        device: &wgpu::Device,
        texture_view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
        material: &Material,
    ) -> wgpu::BindGroup {
        self.lighting
            .create_material_bind_group(device, texture_view, sampler, material)
    }

    /// Renders one frame: per-light capture passes, the separable blur, and
    /// the final shaded pass, submitted as a single command buffer.
    ///
    /// Fails before recording anything if the light list does not fit the
    /// allocated layers; a frame is never partially rendered.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        frame: &FrameDesc<'_>,
    ) -> Result<(), PipelineError> {
        if frame.lights.len() > self.config.layer_capacity as usize {
            return Err(PipelineError::LightCountExceedsCapacity {
                active: frame.lights.len(),
                capacity: self.config.layer_capacity as usize,
            });
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("umbra frame encoder"),
        });

        self.capture.record(
            device,
            queue,
            &mut encoder,
            &self.targets,
            frame.lights,
            frame.entries,
        );

        // Binary layers hold raw depth and must stay sharp; only moment
        // layers are prefiltered.
        if self.config.shadow_mode == ShadowMode::Moment && self.config.kernel_radius > 0 {
            self.blur.record(&mut encoder, frame.lights.len());
        }

        self.lighting.record(
            device,
            queue,
            &mut encoder,
            frame.color_view,
            frame.target_size,
            frame.clear_color,
            frame.camera,
            frame.lights,
            frame.entries,
        );

        queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}
