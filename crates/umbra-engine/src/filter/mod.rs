//! Separable box filter for moment layers.
//!
//! Two 1D convolutions (horizontal then vertical) replace a full 2D kernel,
//! O(k) work per texel instead of O(k²). This module is the reference for
//! the compute kernels in `pipeline/shaders/blur.wgsl`; the GPU version
//! must stay texel-for-texel equivalent.
//!
//! Sampling clamps to the image edge (never wraps), and each output texel
//! depends only on the input image, so texels within one direction pass are
//! independent. The caller sequences the passes: vertical input must be
//! fully materialized horizontal output.

use glam::Vec4;

use crate::shadow::MomentImage;

/// Default blur radius; kernel width is `2 * KERNEL_RADIUS + 1`.
pub const KERNEL_RADIUS: u32 = 5;

/// Convolves each row with a box kernel of the given radius.
pub fn blur_horizontal(src: &MomentImage, radius: u32) -> MomentImage {
    blur_axis(src, radius, |x, y, k| (x + k, y))
}

/// Convolves each column with a box kernel of the given radius.
pub fn blur_vertical(src: &MomentImage, radius: u32) -> MomentImage {
    blur_axis(src, radius, |x, y, k| (x, y + k))
}

/// Full separable blur: horizontal pass, then vertical pass over its output.
pub fn blur_image(src: &MomentImage, radius: u32) -> MomentImage {
    blur_vertical(&blur_horizontal(src, radius), radius)
}

fn blur_axis(
    src: &MomentImage,
    radius: u32,
    offset: impl Fn(i64, i64, i64) -> (i64, i64),
) -> MomentImage {
    let radius = radius as i64;
    let weight = 1.0 / (2 * radius + 1) as f32;

    let mut out = MomentImage::new(src.width(), src.height(), Vec4::ZERO);
    for y in 0..src.height() {
        for x in 0..src.width() {
            let mut sum = Vec4::ZERO;
            for k in -radius..=radius {
                let (sx, sy) = offset(x as i64, y as i64, k);
                sum += src.texel(sx, sy);
            }
            out.set_texel(x, y, sum * weight);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_vec4_near(a: Vec4, b: Vec4, epsilon: f32) {
        for i in 0..4 {
            assert_abs_diff_eq!(a[i], b[i], epsilon = epsilon);
        }
    }

    // ── idempotence on uniform input ──────────────────────────────────────

    #[test]
    fn uniform_layer_is_unchanged() {
        let fill = Vec4::new(0.25, -1.5, 3.0, 0.035955884801);
        let src = MomentImage::new(16, 12, fill);
        for radius in [1, 3, KERNEL_RADIUS, 9] {
            let out = blur_image(&src, radius);
            for y in 0..12 {
                for x in 0..16 {
                    assert_vec4_near(out.texel(x, y), fill, 1e-5);
                }
            }
        }
    }

    // ── edge clamping ─────────────────────────────────────────────────────

    #[test]
    fn corner_impulse_stays_within_kernel_radius() {
        let mut src = MomentImage::new(32, 32, Vec4::ZERO);
        src.set_texel(0, 0, Vec4::ONE);

        let r = KERNEL_RADIUS as i64;
        let out = blur_image(&src, KERNEL_RADIUS);
        for y in 0..32 {
            for x in 0..32 {
                let touched = out.texel(x, y).length_squared() > 0.0;
                let within = x <= r && y <= r;
                assert_eq!(
                    touched, within,
                    "texel ({x}, {y}) touched={touched} within={within}"
                );
            }
        }
    }

    #[test]
    fn corner_impulse_weight_reflects_edge_clamp() {
        // Clamp-to-edge makes the corner texel count (r + 1) times in each
        // direction pass, not once as wrap-around sampling would.
        let mut src = MomentImage::new(16, 16, Vec4::ZERO);
        src.set_texel(0, 0, Vec4::ONE);

        let r = 2u32;
        let width = (2 * r + 1) as f32;
        let h = blur_horizontal(&src, r);
        assert_vec4_near(h.texel(0, 0), Vec4::splat((r + 1) as f32 / width), 1e-6);
        assert_vec4_near(h.texel(r as i64, 0), Vec4::splat(1.0 / width), 1e-6);
        assert_vec4_near(h.texel(r as i64 + 1, 0), Vec4::ZERO, 1e-6);
    }

    #[test]
    fn separable_matches_full_kernel_in_interior() {
        // Interior texels (no clamping involved) must match a direct 2D box
        // convolution.
        let mut src = MomentImage::new(9, 9, Vec4::ZERO);
        src.set_texel(4, 4, Vec4::ONE);

        let r = 1u32;
        let out = blur_image(&src, r);
        let expected = 1.0 / 9.0;
        for y in 3..=5 {
            for x in 3..=5 {
                assert_vec4_near(out.texel(x, y), Vec4::splat(expected), 1e-6);
            }
        }
        assert_vec4_near(out.texel(2, 4), Vec4::ZERO, 1e-6);
    }
}
