/// Texture format used for moment layers.
///
/// The optimized moment basis is conditioned precisely so four 16-bit float
/// channels are enough; the binary mode stores raw depth in the first
/// channel of the same format.
pub const MOMENT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Depth format for the capture pass.
pub const CAPTURE_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// GPU-side shadow targets: one moment layer per light plus the scratch
/// array the separable blur ping-pongs through.
///
/// Logically owned by the pipeline; layers live for one frame and are
/// never exposed past the frame boundary.
pub struct MomentTargets {
    /// Array texture holding one moment layer per light.
    pub moments: wgpu::Texture,
    /// Blur intermediate: horizontal output, vertical input.
    pub scratch: wgpu::Texture,
    /// Shared depth attachment for the capture pass (cleared per light).
    pub capture_depth: wgpu::TextureView,
    /// Per-layer render-attachment views into `moments`.
    pub layer_attachments: Vec<wgpu::TextureView>,
    /// Per-layer sampled views into `moments` (blur horizontal input,
    /// blur vertical output via `layer_storage`).
    pub layer_views: Vec<wgpu::TextureView>,
    /// Per-layer sampled views into `scratch`.
    pub scratch_views: Vec<wgpu::TextureView>,
    /// Full array view bound by the lighting pass.
    pub array_view: wgpu::TextureView,
    /// Clamp-to-edge sampler for shadow lookups.
    pub sampler: wgpu::Sampler,
    pub resolution: u32,
    pub layer_capacity: u32,
}

impl MomentTargets {
    pub fn new(device: &wgpu::Device, resolution: u32, layer_capacity: u32) -> Self {
        let size = wgpu::Extent3d {
            width: resolution,
            height: resolution,
            depth_or_array_layers: layer_capacity,
        };

        let moments = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("umbra moment layers"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: MOMENT_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::STORAGE_BINDING,
            view_formats: &[],
        });

        let scratch = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("umbra blur scratch"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: MOMENT_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::STORAGE_BINDING,
            view_formats: &[],
        });

        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("umbra capture depth"),
            size: wgpu::Extent3d {
                width: resolution,
                height: resolution,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: CAPTURE_DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let capture_depth = depth.create_view(&wgpu::TextureViewDescriptor::default());

        let layer_view = |texture: &wgpu::Texture, layer: u32, label: &str| {
            texture.create_view(&wgpu::TextureViewDescriptor {
                label: Some(label),
                dimension: Some(wgpu::TextureViewDimension::D2),
                base_array_layer: layer,
                array_layer_count: Some(1),
                ..Default::default()
            })
        };

        let layer_attachments = (0..layer_capacity)
            .map(|i| layer_view(&moments, i, "umbra moment attachment"))
            .collect();
        let layer_views = (0..layer_capacity)
            .map(|i| layer_view(&moments, i, "umbra moment layer"))
            .collect();
        let scratch_views = (0..layer_capacity)
            .map(|i| layer_view(&scratch, i, "umbra scratch layer"))
            .collect();

        let array_view = moments.create_view(&wgpu::TextureViewDescriptor {
            label: Some("umbra moment array"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("umbra shadow sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        log::debug!(
            "moment targets: {resolution}x{resolution}, {layer_capacity} layers"
        );

        Self {
            moments,
            scratch,
            capture_depth,
            layer_attachments,
            layer_views,
            scratch_views,
            array_view,
            sampler,
            resolution,
            layer_capacity,
        }
    }
}
