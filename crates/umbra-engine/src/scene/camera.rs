use glam::{Mat4, Vec3};

/// Camera state for one frame: a clip-space view-projection and the
/// world-space eye position used by the specular term.
///
/// Immutable for the duration of a frame; the owning layer recomputes it
/// between frames.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub view_proj: Mat4,
    pub eye: Vec3,
}

impl Camera {
    /// Builds a camera from a look-at description (left-handed, matching
    /// the rest of the engine's light frusta).
    pub fn look_at(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        fovy_radians: f32,
        aspect: f32,
        znear: f32,
        zfar: f32,
    ) -> Self {
        let view = Mat4::look_at_lh(eye, target, up);
        let projection = Mat4::perspective_lh(fovy_radians, aspect, znear, zfar);
        Self {
            view_proj: projection * view,
            eye,
        }
    }

    pub fn uniform(&self) -> CameraUniform {
        CameraUniform::from_camera(self)
    }
}

/// GPU-side camera block. `position` is padded to 16 bytes to match the
/// WGSL struct layout.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub position: [f32; 4],
}

impl CameraUniform {
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            view_proj: camera.view_proj.to_cols_array_2d(),
            position: [camera.eye.x, camera.eye.y, camera.eye.z, 1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_at_produces_finite_matrix() {
        let cam = Camera::look_at(
            Vec3::new(0.0, 1.0, 50.0),
            Vec3::ZERO,
            Vec3::Y,
            45f32.to_radians(),
            16.0 / 9.0,
            0.1,
            100.0,
        );
        for v in cam.view_proj.to_cols_array() {
            assert!(v.is_finite());
        }
    }

    #[test]
    fn uniform_carries_eye_position() {
        let cam = Camera {
            view_proj: Mat4::IDENTITY,
            eye: Vec3::new(1.0, 2.0, 3.0),
        };
        let u = cam.uniform();
        assert_eq!(u.position, [1.0, 2.0, 3.0, 1.0]);
    }
}
