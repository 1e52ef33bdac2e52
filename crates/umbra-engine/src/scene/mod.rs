//! Per-frame scene inputs.
//!
//! These types are owned by the caller (scene graph, asset loader, camera
//! controller) and handed to the core read-only for the duration of one
//! frame. The core decides how a sample is lit and shadowed, never what to
//! draw.

mod camera;
mod light;
mod material;
mod mesh;

pub use camera::{Camera, CameraUniform};
pub use light::{Light, LightUniform, MAX_UNIFORM_LIGHTS};
pub use material::{Material, MaterialUniform};
pub use mesh::{DrawEntry, MeshBuffers, Vertex};
