//! Blinn-Phong shading against an abstract light list.
//!
//! The shading math is written once against [`LightSource`]; the two
//! storage strategies (dynamic storage buffer vs fixed-capacity uniform
//! array) only differ in how lights are held, never in how a sample is
//! shaded. The GPU entry points in `pipeline/shaders/lighting.wgsl` mirror
//! [`shade_sample`].

mod source;

pub use source::{LightSource, StorageLightList, UniformLightList};

use glam::{Vec3, Vec4};

use crate::scene::{Light, Material};

/// Constant ambient term added before any light is accumulated.
pub const AMBIENT: Vec3 = Vec3::new(0.3, 0.3, 0.3);

/// Specular exponent scaling.
///
/// The engine historically shipped variants using both `shininess` and
/// `10 * shininess`; neither is canonical, so the choice is an explicit
/// configuration toggle rather than a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpecularScale {
    #[default]
    Unscaled,
    Tenfold,
}

impl SpecularScale {
    #[inline]
    pub fn factor(self) -> f32 {
        match self {
            SpecularScale::Unscaled => 1.0,
            SpecularScale::Tenfold => 10.0,
        }
    }
}

/// Everything needed to shade one surface sample, minus the light list.
#[derive(Debug, Clone, Copy)]
pub struct ShadeInput {
    /// Interpolated surface normal; normalized inside [`shade_sample`].
    pub normal: Vec3,
    /// World-space sample position.
    pub world_pos: Vec3,
    /// World-space eye position.
    pub eye: Vec3,
    /// Raw diffuse texture sample (RGBA).
    pub base_sample: Vec4,
    pub material: Material,
    pub specular_scale: SpecularScale,
    /// Upper bound on how many lights are accumulated; `None` shades every
    /// light the source exposes.
    pub max_lights: Option<usize>,
}

/// Resolves the base color for a sample.
///
/// A sample of exactly transparent black means "no texture bound"; the
/// material's diffuse color and dissolve factor stand in. This is a
/// degrade-gracefully convention, not an error path.
#[inline]
pub fn resolve_base_color(sample: Vec4, material: &Material) -> Vec4 {
    if sample == Vec4::ZERO {
        material.diffuse.extend(material.dissolve)
    } else {
        sample
    }
}

/// Shades one surface sample: ambient plus Blinn-Phong diffuse and specular
/// per light, each attenuated by that light's shadow visibility.
///
/// `visibility` maps `(light index, light)` to the fraction of light that
/// reaches the sample, as produced by
/// [`crate::shadow::shadow_intensity`] or [`crate::shadow::hard_shadow`].
///
/// The loop bound is `min(active, capacity, max_lights)`; extra lights in
/// the list are ignored, matching the storage strategy contract.
pub fn shade_sample<S, F>(input: &ShadeInput, lights: &S, mut visibility: F) -> Vec4
where
    S: LightSource + ?Sized,
    F: FnMut(usize, &Light) -> f32,
{
    let base = resolve_base_color(input.base_sample, &input.material);
    let normal = input.normal.normalize_or_zero();
    let view_dir = (input.eye - input.world_pos).normalize_or_zero();

    let bound = lights
        .active_count()
        .min(lights.capacity())
        .min(input.max_lights.unwrap_or(usize::MAX));

    let exponent = input.material.shininess * input.specular_scale.factor();

    let mut acc = AMBIENT;
    for index in 0..bound {
        let Some(light) = lights.light_at(index) else {
            break;
        };

        // World-space light position is the stored position/model product.
        let light_pos = (light.world * light.position).truncate();
        let light_dir = (light_pos - input.world_pos).normalize_or_zero();
        let half_dir = (light_dir + view_dir).normalize_or_zero();

        let diffuse = normal.dot(light_dir).max(0.0);
        let specular = normal.dot(half_dir).max(0.0).powf(exponent) * input.material.specular;

        let lit = visibility(index, light);
        acc += light.color * (Vec3::splat(diffuse) + specular) * lit;
    }

    Vec4::new(acc.x, acc.y, acc.z, 1.0) * base
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::blur_image;
    use crate::shadow::{encode_moments, shadow_intensity, MomentImage};

    fn white_light(pos: Vec3) -> Light {
        Light::point(pos, Vec3::ONE)
    }

    fn plain_input() -> ShadeInput {
        ShadeInput {
            normal: Vec3::Y,
            world_pos: Vec3::ZERO,
            eye: Vec3::new(0.0, 5.0, 0.0),
            base_sample: Vec4::ONE,
            material: Material::default(),
            specular_scale: SpecularScale::Unscaled,
            max_lights: None,
        }
    }

    // ── base color fallback ───────────────────────────────────────────────

    #[test]
    fn transparent_black_sample_falls_back_to_material() {
        let material = Material {
            diffuse: Vec3::new(0.4, 0.3, 0.2),
            dissolve: 0.75,
            ..Default::default()
        };
        let resolved = resolve_base_color(Vec4::ZERO, &material);
        assert_eq!(resolved, Vec4::new(0.4, 0.3, 0.2, 0.75));

        // Any non-zero sample wins over the material.
        let sample = Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_eq!(resolve_base_color(sample, &material), sample);
    }

    #[test]
    fn unlit_sample_is_ambient_times_base() {
        let lights = StorageLightList::default();
        let out = shade_sample(&plain_input(), &lights, |_, _| 1.0);
        assert_eq!(out, Vec4::new(0.3, 0.3, 0.3, 1.0));
    }

    // ── storage strategy equivalence ──────────────────────────────────────

    #[test]
    fn storage_and_uniform_lists_shade_identically() {
        let lights: Vec<Light> = (0..8)
            .map(|i| {
                white_light(Vec3::new(i as f32 * 2.0 - 7.0, 4.0 + i as f32, 3.0))
            })
            .collect();

        let dynamic = StorageLightList::from(lights.clone());
        let fixed = UniformLightList::from_slice(&lights);

        let input = ShadeInput {
            normal: Vec3::new(0.2, 1.0, -0.1),
            world_pos: Vec3::new(1.0, 0.0, -2.0),
            ..plain_input()
        };

        let a = shade_sample(&input, &dynamic, |i, _| 1.0 / (i as f32 + 1.0));
        let b = shade_sample(&input, &fixed, |i, _| 1.0 / (i as f32 + 1.0));
        assert_eq!(a, b);
    }

    #[test]
    fn shading_ignores_lights_beyond_max_lights() {
        let mut lights: Vec<Light> = (0..3)
            .map(|i| white_light(Vec3::new(i as f32, 5.0, 0.0)))
            .collect();
        let input = ShadeInput {
            max_lights: Some(3),
            ..plain_input()
        };

        let before = shade_sample(&input, &StorageLightList::from(lights.clone()), |_, _| 1.0);

        // A blindingly bright fourth light must not change the result.
        lights.push(Light::point(Vec3::new(0.0, 5.0, 0.0), Vec3::splat(100.0)));
        let after = shade_sample(&input, &StorageLightList::from(lights), |_, _| 1.0);

        assert_eq!(before, after);
    }

    #[test]
    fn shadowed_light_contributes_nothing() {
        let lights = StorageLightList::from(vec![white_light(Vec3::new(0.0, 5.0, 0.0))]);
        let lit = shade_sample(&plain_input(), &lights, |_, _| 1.0);
        let dark = shade_sample(&plain_input(), &lights, |_, _| 0.0);
        assert!(lit.x > dark.x);
        assert_eq!(dark, Vec4::new(0.3, 0.3, 0.3, 1.0));
    }

    // ── end-to-end flat plane scenario ────────────────────────────────────

    #[test]
    fn overhead_light_on_flat_plane_is_bright_and_unshadowed() {
        // Single point light directly above a flat plane, camera straight
        // down, white diffuse material: ambient + full diffuse, negligible
        // specular (the material's specular color defaults to zero).
        let light = white_light(Vec3::new(0.0, 10.0, 0.0));

        // Capture: the plane is the closest surface everywhere, so every
        // texel stores the moments of the same light-space depth.
        let clip = light.view_proj * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let depth = (clip.z / clip.w) * 2.0 - 1.0;
        let captured = MomentImage::new(32, 32, encode_moments(depth));

        // Blur: uniform layer, so filtering must not disturb the moments.
        let blurred = blur_image(&captured, 5);

        let visibility = shadow_intensity(blurred.texel(16, 16), depth);
        assert!(visibility > 1.0 - 1e-3, "visibility {visibility}");

        let lights = StorageLightList::from(vec![light]);
        let out = shade_sample(&plain_input(), &lights, |_, _| visibility);

        // Ambient 0.3 + diffuse 1.0, equal channels, alpha 1.
        for channel in [out.x, out.y, out.z] {
            assert!((channel - 1.3).abs() < 1e-2, "channel {channel}");
        }
        assert_eq!(out.w, 1.0);
    }
}
