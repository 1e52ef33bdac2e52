use glam::Vec4;

/// CPU-side image of one moment layer.
///
/// One of these mirrors a single slice of the GPU `Rgba16Float` array
/// target: written by the capture step, smoothed in place by the separable
/// filter, sampled by the shading step. Lifetime is one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct MomentImage {
    width: u32,
    height: u32,
    texels: Vec<Vec4>,
}

impl MomentImage {
    /// Creates a layer filled with `fill`.
    pub fn new(width: u32, height: u32, fill: Vec4) -> Self {
        Self {
            width,
            height,
            texels: vec![fill; (width as usize) * (height as usize)],
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Clamp-to-edge texel fetch. Coordinates outside the image read the
    /// nearest edge texel, never wrap.
    #[inline]
    pub fn texel(&self, x: i64, y: i64) -> Vec4 {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.texels[y * self.width as usize + x]
    }

    #[inline]
    pub fn set_texel(&mut self, x: u32, y: u32, value: Vec4) {
        debug_assert!(x < self.width && y < self.height);
        self.texels[(y * self.width + x) as usize] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_fetch_clamps_to_edge() {
        let mut img = MomentImage::new(4, 3, Vec4::ZERO);
        img.set_texel(0, 0, Vec4::ONE);
        img.set_texel(3, 2, Vec4::splat(2.0));

        assert_eq!(img.texel(-5, -5), Vec4::ONE);
        assert_eq!(img.texel(10, 10), Vec4::splat(2.0));
        assert_eq!(img.texel(-1, 2), img.texel(0, 2));
    }
}
