//! Umbra engine crate.
//!
//! This crate owns the lighting and shadowing core of the renderer: moment
//! shadow encoding/decoding, the separable blur filter, Blinn-Phong shading
//! and the GPU pass orchestration that ties them together. Window, surface
//! and asset management live in higher layers.

pub mod error;
pub mod logging;

pub mod scene;
pub mod shadow;
pub mod filter;
pub mod lighting;
pub mod pipeline;
