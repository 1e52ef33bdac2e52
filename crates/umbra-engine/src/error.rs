//! Pipeline configuration errors.
//!
//! Configuration problems are rejected at setup or at frame-record time,
//! before any pass touches the GPU. Per-sample numeric edge cases are never
//! reported through this type; they are clamped inside the shadow solver.

use thiserror::Error;

/// Errors surfaced while validating a [`crate::pipeline::PipelineConfig`]
/// or the per-frame inputs handed to the pass sequence.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// More active lights than shadow layers; the frame must be rejected
    /// before the capture pass runs, never silently truncated.
    #[error("light count {active} exceeds shadow layer capacity {capacity}")]
    LightCountExceedsCapacity { active: usize, capacity: usize },

    /// A blur radius whose kernel width `2 * radius + 1` would not cover at
    /// least one texel.
    #[error("blur kernel radius {radius} produces a degenerate kernel width")]
    ZeroKernelWidth { radius: u32 },

    /// A pipeline configured with no shadow layers cannot shade anything.
    #[error("shadow layer capacity must be at least 1")]
    ZeroLayerCapacity,

    /// Shadow maps need at least one texel per side.
    #[error("shadow map resolution must be at least 1")]
    ZeroShadowResolution,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_error_reports_both_counts() {
        // The layer capacity is configured as u32 but reported alongside
        // the usize light count; the frame check converts before erroring.
        let layer_capacity: u32 = 4;
        let err = PipelineError::LightCountExceedsCapacity {
            active: 6,
            capacity: layer_capacity as usize,
        };
        assert_eq!(
            err.to_string(),
            "light count 6 exceeds shadow layer capacity 4"
        );
    }
}
