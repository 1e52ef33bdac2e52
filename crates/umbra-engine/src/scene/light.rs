use glam::{Mat4, Vec3, Vec4};

/// Capacity of the fixed-size light array used when the device cannot bind
/// read-only storage buffers in the fragment stage.
pub const MAX_UNIFORM_LIGHTS: usize = 10;

/// A point or oriented area light.
///
/// `view_proj` defines the light's personal shadow frustum and must be
/// recomputed by the owning layer whenever the light moves;
/// [`Light::recompute_view_proj`] is the stock helper for that.
#[derive(Debug, Clone, Copy)]
pub struct Light {
    /// Homogeneous world-space position.
    pub position: Vec4,
    /// Linear RGB.
    pub color: Vec3,
    /// World transform, used by oriented lights.
    pub world: Mat4,
    /// Light-space view-projection (the shadow frustum).
    pub view_proj: Mat4,
}

impl Light {
    /// Point light looking at the origin with a default shadow frustum.
    pub fn point(position: Vec3, color: Vec3) -> Self {
        let mut light = Self {
            position: position.extend(1.0),
            color,
            world: Mat4::IDENTITY,
            view_proj: Mat4::IDENTITY,
        };
        light.recompute_view_proj(Vec3::ZERO, 0.1, 100.0);
        light
    }

    /// Rebuilds the shadow frustum so the light looks at `target`.
    ///
    /// Falls back to a Z-up basis when the light sits on the vertical axis,
    /// where a Y-up look-at degenerates.
    pub fn recompute_view_proj(&mut self, target: Vec3, znear: f32, zfar: f32) {
        let eye = self.position.truncate();
        let dir = (target - eye).normalize_or_zero();
        let up = if dir.cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let view = Mat4::look_at_lh(eye, target, up);
        let projection = Mat4::perspective_lh(90f32.to_radians(), 1.0, znear, zfar);
        self.view_proj = projection * view;
    }

    pub fn uniform(&self) -> LightUniform {
        LightUniform::from_light(self)
    }
}

/// GPU-side light record, shared between the storage-buffer and the
/// fixed-array paths so both shade identically.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub pos: [f32; 4],
    pub color: [f32; 4],
    pub model_mat: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
}

impl LightUniform {
    pub fn from_light(light: &Light) -> Self {
        Self {
            pos: light.position.to_array(),
            color: [light.color.x, light.color.y, light.color.z, 1.0],
            model_mat: light.world.to_cols_array_2d(),
            view_proj: light.view_proj.to_cols_array_2d(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_light_has_finite_frustum() {
        let light = Light::point(Vec3::new(10.0, 5.0, 0.0), Vec3::ONE);
        for v in light.view_proj.to_cols_array() {
            assert!(v.is_finite());
        }
    }

    #[test]
    fn overhead_light_frustum_does_not_degenerate() {
        // Light straight above the origin: the Y-up look-at basis collapses
        // and the Z-up fallback must kick in.
        let light = Light::point(Vec3::new(0.0, 10.0, 0.0), Vec3::ONE);
        for v in light.view_proj.to_cols_array() {
            assert!(v.is_finite());
        }
    }

    #[test]
    fn uniform_layout_matches_cpu_light() {
        let light = Light::point(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.5, 0.25, 1.0));
        let u = light.uniform();
        assert_eq!(u.pos, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(u.color, [0.5, 0.25, 1.0, 1.0]);
        assert_eq!(u.view_proj, light.view_proj.to_cols_array_2d());
    }
}
