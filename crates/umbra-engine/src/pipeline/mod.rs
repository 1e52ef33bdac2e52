//! GPU pipeline: shadow capture, prefilter, and shaded draw.
//!
//! The pipeline runs three stages per frame over a caller-provided
//! device/queue pair:
//!
//! 1. **Capture** ([`capture`]) renders the scene once per light into that
//!    light's moment layer.
//! 2. **Blur** ([`blur`]) runs the separable box filter over each layer
//!    (moment mode only).
//! 3. **Lighting** ([`lighting`]) draws the camera view, sampling the
//!    blurred layers for per-light visibility.
//!
//! The WGSL kernels under `shaders/` mirror the CPU reference math in
//! [`crate::shadow`], [`crate::filter`], and [`crate::lighting`]
//! constant for constant; the CPU side is where the numerics are tested.

mod blur;
mod capture;
mod config;
mod frame;
mod lighting;
mod targets;

pub use blur::BlurPass;
pub use capture::CapturePass;
pub use config::{LightStorage, PipelineConfig, ShadowMode};
pub use frame::{FrameDesc, ShadowPipeline};
pub use lighting::{LightingPass, HARD_SHADOW_BIAS, SCENE_DEPTH_FORMAT};
pub use targets::{MomentTargets, CAPTURE_DEPTH_FORMAT, MOMENT_FORMAT};
