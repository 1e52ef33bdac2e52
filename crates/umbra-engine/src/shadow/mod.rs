//! Moment shadow mapping: encoding, decoding and the intensity solver.
//!
//! The math here mirrors the WGSL in `pipeline/shaders` constant for
//! constant; the Rust side is the reference used by tests and by anything
//! that needs to evaluate shadows on the CPU.

mod layer;
mod moments;

pub use layer::MomentImage;
pub use moments::{
    decode_moments, encode_moments, hard_shadow, shadow_intensity, MOMENT_BASIS, MOMENT_BASIS_INV,
    MOMENT_BIAS, MOMENT_EPSILON,
};
