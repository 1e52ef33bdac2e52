use crate::error::PipelineError;
use crate::lighting::SpecularScale;

/// How shadow layers are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadowMode {
    /// Four-moment layers, blurred before sampling (filterable soft
    /// shadows).
    #[default]
    Moment,
    /// Closest-depth layers with a binary compare (hard shadows, no blur).
    Binary,
}

/// Which light list storage the lighting pass binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightStorage {
    /// Read-only storage buffer, dynamically sized.
    #[default]
    Storage,
    /// Fixed-capacity uniform array for downlevel devices.
    Uniform,
}

impl LightStorage {
    /// Picks the storage strategy the device can actually bind.
    ///
    /// Mirrors the downlevel probe the renderer has always used: storage
    /// buffers are only trusted when the adapter reports the downlevel
    /// vertex-storage flag and the device exposes at least one storage
    /// buffer slot per stage.
    pub fn for_adapter(adapter: &wgpu::Adapter, device: &wgpu::Device) -> Self {
        let supports_storage = adapter
            .get_downlevel_capabilities()
            .flags
            .contains(wgpu::DownlevelFlags::VERTEX_STORAGE)
            && device.limits().max_storage_buffers_per_shader_stage > 0;

        if supports_storage {
            LightStorage::Storage
        } else {
            log::info!("device lacks fragment storage buffers; using fixed light array");
            LightStorage::Uniform
        }
    }
}

/// Setup-time configuration for the shadow/lighting pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub shadow_mode: ShadowMode,
    pub light_storage: LightStorage,
    /// Box blur radius; the kernel width `2 * radius + 1` must be positive.
    pub kernel_radius: i32,
    /// Number of shadow layers, one per shadow-casting light. Active light
    /// count may never exceed this.
    pub layer_capacity: u32,
    /// Square shadow map resolution per layer.
    pub shadow_resolution: u32,
    pub specular_scale: SpecularScale,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            shadow_mode: ShadowMode::Moment,
            light_storage: LightStorage::Storage,
            kernel_radius: crate::filter::KERNEL_RADIUS as i32,
            layer_capacity: 4,
            shadow_resolution: 1024,
            specular_scale: SpecularScale::Unscaled,
        }
    }
}

impl PipelineConfig {
    /// Rejects configurations that would otherwise fail mid-frame.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.kernel_radius < 0 {
            return Err(PipelineError::ZeroKernelWidth {
                radius: self.kernel_radius.unsigned_abs(),
            });
        }
        if self.layer_capacity == 0 {
            return Err(PipelineError::ZeroLayerCapacity);
        }
        if self.shadow_resolution == 0 {
            return Err(PipelineError::ZeroShadowResolution);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(PipelineConfig::default().validate(), Ok(()));
        assert_eq!(PipelineConfig::default().kernel_radius, 5);
    }

    #[test]
    fn negative_kernel_radius_is_rejected() {
        let config = PipelineConfig {
            kernel_radius: -3,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(PipelineError::ZeroKernelWidth { radius: 3 })
        );
    }

    #[test]
    fn zero_capacity_and_resolution_are_rejected() {
        let config = PipelineConfig {
            layer_capacity: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(PipelineError::ZeroLayerCapacity));

        let config = PipelineConfig {
            shadow_resolution: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(PipelineError::ZeroShadowResolution));
    }
}
