use glam::{Mat4, Vec3, Vec4};

/// Bias added to the first optimized moment before storage and subtracted
/// again on decode. Keeps the encoded vector inside the representable range
/// of limited-precision float targets.
pub const MOMENT_BIAS: f32 = 0.035955884801;

/// Regularizer added to the raw moments before factorization so a
/// zero-variance distribution still factors.
pub const MOMENT_EPSILON: f32 = 0.005;

/// Basis that maps raw depth moments `(d, d², d³, d⁴)` to the optimized
/// representation. Column-major, as glam stores it.
pub const MOMENT_BASIS: Mat4 = Mat4::from_cols(
    Vec4::new(-2.072_246_49, 32.237_037_78, -68.571_074_599, 39.370_327_413_4),
    Vec4::new(13.794_885_723_7, -59.468_397_570_3, 82.035_975_033_8, -35.364_903_257),
    Vec4::new(0.105_877_704, -1.907_746_631_1, 9.349_655_510_7, -6.654_349_074_3),
    Vec4::new(9.792_406_211_8, -33.765_211_055_5, 47.945_609_660_5, -23.972_804_816_5),
);

/// Algebraic inverse of [`MOMENT_BASIS`]. The pair must stay in sync; a
/// drifting inverse corrupts every shadow without ever crashing, so the two
/// are unit-tested as a unit.
pub const MOMENT_BASIS_INV: Mat4 = Mat4::from_cols(
    Vec4::new(0.222_774_414_6, 0.077_197_286_1, 0.792_698_663_6, 0.031_941_755_5),
    Vec4::new(0.154_967_926_1, 0.139_462_942_6, 0.796_341_583_8, -0.172_282_317_3),
    Vec4::new(0.145_198_894_6, 0.212_020_215_7, 0.725_869_446_4, -0.275_801_481_1),
    Vec4::new(0.163_127_443, 0.259_143_226_6, 0.653_909_249_7, -0.337_613_173_4),
);

/// Encodes a light-space depth `d ∈ [-1, 1]` as a 4-component optimized
/// moment vector.
///
/// No clamping is performed; the caller supplies an already-normalized
/// depth. Pure, no failure modes.
#[inline]
pub fn encode_moments(depth: f32) -> Vec4 {
    let square = depth * depth;
    let moments = Vec4::new(depth, square, square * depth, square * square);
    let mut optimized = MOMENT_BASIS * moments;
    optimized.x += MOMENT_BIAS;
    optimized
}

/// Recovers the raw moments `(b0, b1, b2, b3)` from an encoded (and
/// possibly blurred) moment vector.
#[inline]
pub fn decode_moments(encoded: Vec4) -> Vec4 {
    let mut optimized = encoded;
    optimized.x -= MOMENT_BIAS;
    MOMENT_BASIS_INV * optimized
}

/// Computes the fraction of light reaching a receiver at light-space depth
/// `z0`, given the sampled moment vector for that texel.
///
/// Returns 1.0 for fully lit, 0.0 for fully shadowed. Deterministic and
/// side-effect free. A degenerate factorization (`d22` at or below zero,
/// `d33/d22` vanishing) can push intermediates to inf/NaN; the final
/// `max(0).min(1)` resolves those to fully lit instead of propagating NaN.
pub fn shadow_intensity(encoded: Vec4, z0: f32) -> f32 {
    let b = decode_moments(encoded) + Vec4::splat(MOMENT_EPSILON);

    // 2x2 Cholesky-style factorization of the moment covariance.
    let l32_d22 = -b.x * b.y + b.z;
    let d22 = -b.x * b.x + b.y;
    let squared_depth_variance = -b.y * b.y + b.w;
    let d33_d22 = d22 * squared_depth_variance - l32_d22 * l32_d22;
    let inv_d22 = 1.0 / d22;
    let l32 = l32_d22 * inv_d22;

    // Solve the triangular systems for the quadratic coefficients c·[1, y, y²].
    let mut c = Vec3::new(1.0, z0, z0 * z0);
    c.y -= b.x;
    c.z -= b.y + l32 * c.y;
    c.y *= inv_d22;
    c.z *= d22 / d33_d22;
    c.y -= l32 * c.z;
    c.x -= c.y * b.x + c.z * b.y;

    // Roots z1 <= z2 of c.z·y² + c.y·y + c.x = 0; the radicand is clamped
    // so a slightly negative discriminant never turns into NaN here.
    let inv_c2 = 1.0 / c.z;
    let p = c.y * inv_c2;
    let q = c.x * inv_c2;
    let r = (0.25 * p * p - q).max(0.0).sqrt();
    let z1 = -0.5 * p - r;
    let z2 = -0.5 * p + r;

    // Pick the root pair by where the receiver falls relative to z1, z2.
    let (sx, sy, sz, sw) = if z2 < z0 {
        (z1, z0, 1.0, 1.0)
    } else if z1 < z0 {
        (z0, z1, 0.0, 1.0)
    } else {
        (0.0, 0.0, 0.0, 0.0)
    };

    let quotient = (sx * z2 - b.x * (sx + z2) + b.y) / ((z2 - sy) * (z0 - z1));
    let intensity = (sz + sw * quotient).max(0.0).min(1.0);
    1.0 - intensity
}

/// Binary depth-compare shadow test used by the non-filterable pipeline
/// variant: 1.0 when the receiver is at or in front of the stored closest
/// depth (within `bias`), 0.0 otherwise.
#[inline]
pub fn hard_shadow(stored_depth: f32, z0: f32, bias: f32) -> f32 {
    if z0 <= stored_depth + bias {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    // Depths spread over [-1, 1]. The band around d ≈ 0.5 is excluded: there
    // the regularized second-moment pivot d22 underflows and the solver's
    // documented degenerate path takes over (pinned separately below).
    const DEPTHS: [f32; 8] = [-1.0, -0.75, -0.5, -0.25, 0.0, 0.25, 0.75, 1.0];

    // ── encoder/decoder pair ──────────────────────────────────────────────

    #[test]
    fn basis_and_inverse_are_inverses() {
        let product = MOMENT_BASIS * MOMENT_BASIS_INV;
        let identity = Mat4::IDENTITY;
        for (a, b) in product
            .to_cols_array()
            .iter()
            .zip(identity.to_cols_array().iter())
        {
            assert_abs_diff_eq!(a, b, epsilon = 1e-4);
        }
    }

    #[test]
    fn decode_recovers_raw_moments() {
        for d in DEPTHS {
            let raw = Vec4::new(d, d * d, d * d * d, d * d * d * d);
            let recovered = decode_moments(encode_moments(d));
            for i in 0..4 {
                assert_abs_diff_eq!(recovered[i], raw[i], epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn encoded_first_channel_carries_bias() {
        let encoded = encode_moments(0.0);
        assert_abs_diff_eq!(encoded.x, MOMENT_BIAS, epsilon = 1e-6);
        assert_abs_diff_eq!(encoded.y, 0.0, epsilon = 1e-6);
    }

    // ── intensity solver ──────────────────────────────────────────────────

    #[test]
    fn zero_variance_receiver_is_fully_lit() {
        for d in DEPTHS {
            let visibility = shadow_intensity(encode_moments(d), d);
            assert!(
                visibility > 1.0 - 1e-3,
                "depth {d}: visibility {visibility}"
            );
        }
    }

    #[test]
    fn receiver_in_front_of_occluder_is_lit() {
        let encoded = encode_moments(0.25);
        let visibility = shadow_intensity(encoded, 0.1);
        assert!(visibility > 1.0 - 1e-3, "visibility {visibility}");
    }

    #[test]
    fn receiver_behind_occluder_is_shadowed() {
        let encoded = encode_moments(0.25);
        let visibility = shadow_intensity(encoded, 0.5);
        assert!(visibility < 0.05, "visibility {visibility}");
    }

    #[test]
    fn deeper_receivers_never_get_brighter() {
        // Sanity, not strict monotonicity: the solver wobbles by ~2e-3
        // between neighboring receiver depths (measured 0.0019 rise from
        // z0 -0.1 to 0.1 against an occluder at -0.25), so the slack sits
        // above that.
        let encoded = encode_moments(-0.25);
        let mut previous = f32::INFINITY;
        for z0 in [-0.1, 0.1, 0.3, 0.5, 0.8] {
            let visibility = shadow_intensity(encoded, z0);
            assert!(
                visibility <= previous + 5e-3,
                "visibility rose from {previous} to {visibility} at z0 {z0}"
            );
            previous = visibility;
        }
    }

    #[test]
    fn solver_output_stays_in_unit_interval() {
        // Degenerate inputs: the zero vector, constant moments, and depths
        // outside the frustum range.
        let weird = [
            Vec4::ZERO,
            Vec4::ONE,
            Vec4::splat(0.5),
            encode_moments(0.497),
            encode_moments(0.5),
            encode_moments(0.503),
        ];
        for encoded in weird {
            for z0 in [-2.0, -1.0, -0.5, 0.0, 0.497, 0.5, 1.0, 2.0] {
                let v = shadow_intensity(encoded, z0);
                assert!((0.0..=1.0).contains(&v), "encoded {encoded:?} z0 {z0}: {v}");
            }
        }
    }

    #[test]
    fn degenerate_pivot_resolves_to_lit() {
        // d = 0 makes every regularized moment identical, which zeroes the
        // d33/d22 ratio exactly. The NaN that falls out must resolve to 1.0.
        let v = shadow_intensity(encode_moments(0.0), 0.0);
        assert_abs_diff_eq!(v, 1.0, epsilon = 1e-3);
    }

    // ── hard shadows ──────────────────────────────────────────────────────

    #[test]
    fn hard_shadow_is_binary() {
        assert_eq!(hard_shadow(0.5, 0.4, 0.0), 1.0);
        assert_eq!(hard_shadow(0.5, 0.6, 0.0), 0.0);
        // Bias keeps a receiver on its own surface lit.
        assert_eq!(hard_shadow(0.5, 0.5005, 0.001), 1.0);
    }
}
