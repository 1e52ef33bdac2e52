use glam::Vec3;

/// Surface material parameters.
///
/// `diffuse` and `dissolve` double as the fallback base color when a
/// diffuse texture sample comes back as transparent black (the engine's
/// "missing texture" convention, see [`crate::lighting::resolve_base_color`]).
#[derive(Debug, Clone, Copy)]
pub struct Material {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
    /// Opacity; 1.0 is fully opaque.
    pub dissolve: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Vec3::ONE,
            diffuse: Vec3::ONE,
            specular: Vec3::ZERO,
            shininess: 32.0,
            dissolve: 1.0,
        }
    }
}

impl Material {
    pub fn uniform(&self) -> MaterialUniform {
        MaterialUniform::from_material(self)
    }
}

/// GPU-side material block. Vec3 fields are padded to 16 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    /// x: shininess, y: dissolve, zw: padding.
    pub params: [f32; 4],
}

impl MaterialUniform {
    pub fn from_material(material: &Material) -> Self {
        Self {
            ambient: material.ambient.extend(0.0).to_array(),
            diffuse: material.diffuse.extend(0.0).to_array(),
            specular: material.specular.extend(0.0).to_array(),
            params: [material.shininess, material.dissolve, 0.0, 0.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_packs_shininess_and_dissolve() {
        let m = Material {
            shininess: 64.0,
            dissolve: 0.5,
            ..Default::default()
        };
        let u = m.uniform();
        assert_eq!(u.params[0], 64.0);
        assert_eq!(u.params[1], 0.5);
    }
}
