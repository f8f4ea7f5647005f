//! Bokeh composite: a 12-tap Poisson-disc gather driven by the packed
//! depth/blur target.

use glam::{Vec2, Vec3, Vec4};

use crate::dof::pack::{fract, unpack16};
use crate::software::Sampler2d;

/// Blur radius (pixels) below which a pixel is treated as in focus.
pub const IN_FOCUS_BLUR: f32 = 0.03;

/// Poisson-disc taps: `(x, y, bias weight)`.
pub const KERNEL: [[f32; 3]; 12] = [
    [-0.326212, -0.40581, 0.520_668_8],
    [-0.840144, -0.07358, 0.843_359_9],
    [-0.695914, 0.457137, 0.832_628_7],
    [-0.203345, 0.620716, 0.653_174_97],
    [0.96234, -0.194983, 0.981_894_4],
    [0.473434, -0.480026, 0.674_214_1],
    [0.519456, 0.767022, 0.926_367_8],
    [0.185461, -0.893124, 0.912_176_7],
    [0.507431, 0.064425, 0.511_504_45],
    [0.89642, 0.412458, 0.986_757_5],
    [-0.32194, -0.932615, 0.986_618_5],
    [-0.791559, -0.59771, 0.991_878_5],
];

const LUMA: Vec3 = Vec3::new(0.299, 0.587, 0.114);

/// Uniforms for the bokeh composite.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BokehUniforms {
    /// Source texture size in pixels.
    pub resolution: [f32; 2],
    pub f_stop: f32,
    pub max_blur: f32,
    /// Far plane the depth channel was normalized against.
    pub z_far: f32,
    pub vign_out: f32,
    pub vign_in: f32,
    /// F-stops until the vignette fades.
    pub vign_fade: f32,
    /// Luminance above which highlights are boosted.
    pub threshold: f32,
    pub gain: f32,
    /// Bokeh edge bias.
    pub bias: f32,
    /// Chromatic fringing, in blur-scaled texels.
    pub fringe: f32,
    /// Dither amount.
    pub noise_amount: f32,
    pub vignetting: u32,
    /// Pseudo-random dither instead of the ordered pattern.
    pub noise: u32,
    /// Let far taps bleed over nearer pixels.
    pub color_bleed: u32,
}

impl Default for BokehUniforms {
    fn default() -> Self {
        Self {
            resolution: [1.0, 1.0],
            f_stop: 5.6,
            max_blur: 10.0,
            z_far: 100.0,
            vign_out: 1.3,
            vign_in: 0.0,
            vign_fade: 22.0,
            threshold: 0.0,
            gain: 0.0,
            bias: 1.0,
            fringe: 0.0,
            noise_amount: 0.00001,
            vignetting: 0,
            noise: 1,
            color_bleed: 0,
        }
    }
}

impl BokehUniforms {
    fn texel(&self) -> Vec2 {
        Vec2::new(
            1.0 / self.resolution[0].max(1.0),
            1.0 / self.resolution[1].max(1.0),
        )
    }

    /// Samples one tap with chromatic fringing and highlight boost.
    fn tap_color(&self, color: &dyn Sampler2d, coords: Vec2, blur: f32) -> Vec3 {
        let spread = self.texel() * self.fringe * blur;
        let col = Vec3::new(
            color.sample(coords + Vec2::new(0.0, 1.0) * spread).x,
            color.sample(coords + Vec2::new(-0.866, -0.5) * spread).y,
            color.sample(coords + Vec2::new(0.866, -0.5) * spread).z,
        );
        let lum = col.dot(LUMA);
        let thresh = ((lum - self.threshold) * self.gain).max(0.0);
        col + col * (thresh * blur / self.max_blur)
    }

    /// Dither offset in `[-1, 1]²`: an ordered pattern, or hash noise.
    fn dither(&self, uv: Vec2) -> Vec2 {
        if self.noise != 0 {
            let hash = |seed: Vec2| {
                fract((uv.dot(seed)).sin() * 43758.5453).clamp(0.0, 1.0) * 2.0 - 1.0
            };
            let seed = Vec2::new(12.9898, 78.233);
            return Vec2::new(hash(seed), hash(seed * 2.0));
        }
        let s = fract(1.0 - uv.x * (self.resolution[0] / 2.0));
        let t = fract(uv.y * (self.resolution[1] / 2.0));
        Vec2::new(
            (s * 0.25 + t * 0.75) * 2.0 - 1.0,
            (s * 0.75 + t * 0.25) * 2.0 - 1.0,
        )
    }

    fn vignette(&self, uv: Vec2) -> f32 {
        let dist = uv.distance(Vec2::splat(0.5));
        let fade = self.f_stop / self.vign_fade;
        smoothstep(self.vign_out + fade, self.vign_in + fade, dist).clamp(0.0, 1.0)
    }
}

/// Shader-style Hermite step; tolerates `edge0 > edge1`.
pub(crate) fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn depth_and_blur(texel: Vec4) -> (f32, f32) {
    (unpack16([texel.x, texel.y]), unpack16([texel.z, texel.w]))
}

/// CPU reference of the bokeh composite for one pixel.
///
/// `color` is the sharp scene; `depth_blur` the packed capture. The packed
/// target is read with nearest filtering since interpolating split channels
/// corrupts them.
pub fn bokeh_pixel(
    uv: Vec2,
    color: &dyn Sampler2d,
    depth_blur: &dyn Sampler2d,
    uniforms: &BokehUniforms,
) -> Vec4 {
    let (depth, blur) = depth_and_blur(depth_blur.sample_nearest(uv));
    let depth = depth * uniforms.z_far;
    let blur = blur * uniforms.max_blur;

    let noise = uniforms.dither(uv) * uniforms.noise_amount * blur;
    let scale = uniforms.texel() * blur + noise;

    let mut col = color.sample(uv).truncate();

    if blur > IN_FOCUS_BLUR {
        let mut total = 1.0;
        for [x, y, weight] in KERNEL {
            let tap_coord = uv + scale * Vec2::new(x, y);
            let (tap_depth, tap_blur) = depth_and_blur(depth_blur.sample_nearest(tap_coord));
            let tap_depth = tap_depth * uniforms.z_far;
            let bias_mix = 1.0 + (weight - 0.5) * uniforms.bias;
            let mut tap_color = uniforms.tap_color(color, tap_coord, blur) * bias_mix;
            if tap_depth < depth && uniforms.color_bleed == 0 {
                tap_color *= tap_blur;
                total += tap_blur * bias_mix;
            } else {
                total += bias_mix;
            }
            col += tap_color;
        }
        col /= total;
    }

    if uniforms.vignetting != 0 {
        col *= uniforms.vignette(uv);
    }

    col.extend(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dof::pack::pack16;
    use approx::assert_relative_eq;

    struct Solid(Vec4);

    impl Sampler2d for Solid {
        fn sample(&self, _uv: Vec2) -> Vec4 {
            self.0
        }

        fn sample_nearest(&self, _uv: Vec2) -> Vec4 {
            self.0
        }
    }

    /// Left half black, right half white.
    struct Edge;

    impl Sampler2d for Edge {
        fn sample(&self, uv: Vec2) -> Vec4 {
            if uv.x < 0.5 {
                Vec4::new(0.0, 0.0, 0.0, 1.0)
            } else {
                Vec4::ONE
            }
        }

        fn sample_nearest(&self, uv: Vec2) -> Vec4 {
            self.sample(uv)
        }
    }

    fn packed(depth: f32, blur: f32) -> Solid {
        let [r, g] = pack16(depth);
        let [b, a] = pack16(blur);
        Solid(Vec4::new(r, g, b, a))
    }

    #[test]
    fn in_focus_pixel_passes_through() {
        let uniforms = BokehUniforms::default();
        let out = bokeh_pixel(Vec2::splat(0.5), &Edge, &packed(0.5, 0.0), &uniforms);
        assert_eq!(out, Vec4::ONE);
    }

    #[test]
    fn uniform_color_is_preserved_under_blur() {
        let uniforms = BokehUniforms {
            resolution: [64.0, 64.0],
            ..BokehUniforms::default()
        };
        let color = Solid(Vec4::new(0.2, 0.4, 0.6, 1.0));
        let out = bokeh_pixel(Vec2::splat(0.5), &color, &packed(0.5, 1.0), &uniforms);
        assert_relative_eq!(out.x, 0.2, epsilon = 1e-5);
        assert_relative_eq!(out.y, 0.4, epsilon = 1e-5);
        assert_relative_eq!(out.z, 0.6, epsilon = 1e-5);
        assert_eq!(out.w, 1.0);
    }

    #[test]
    fn blurred_edge_mixes_both_sides() {
        let uniforms = BokehUniforms {
            resolution: [32.0, 32.0],
            noise: 0,
            ..BokehUniforms::default()
        };
        let out = bokeh_pixel(Vec2::new(0.49, 0.5), &Edge, &packed(0.5, 1.0), &uniforms);
        assert!(out.x > 0.0 && out.x < 1.0, "edge not blurred: {out}");
    }

    #[test]
    fn vignette_darkens_corners_only() {
        let uniforms = BokehUniforms {
            vignetting: 1,
            vign_out: 0.6,
            vign_in: 0.2,
            ..BokehUniforms::default()
        };
        let color = Solid(Vec4::ONE);
        let depth = packed(0.5, 0.0);
        let center = bokeh_pixel(Vec2::splat(0.5), &color, &depth, &uniforms);
        let corner = bokeh_pixel(Vec2::ZERO, &color, &depth, &uniforms);
        assert_relative_eq!(center.x, 1.0);
        assert!(corner.x < center.x);
    }

    #[test]
    fn highlight_gain_brightens_blurred_highlights() {
        let base = BokehUniforms {
            resolution: [64.0, 64.0],
            ..BokehUniforms::default()
        };
        let boosted = BokehUniforms {
            threshold: 0.5,
            gain: 2.0,
            ..base
        };
        let color = Solid(Vec4::new(0.9, 0.9, 0.9, 1.0));
        let depth = packed(0.5, 1.0);
        let plain = bokeh_pixel(Vec2::splat(0.5), &color, &depth, &base);
        let bright = bokeh_pixel(Vec2::splat(0.5), &color, &depth, &boosted);
        assert!(bright.x > plain.x);
    }

    #[test]
    fn smoothstep_handles_reversed_edges() {
        assert_relative_eq!(smoothstep(1.0, 0.0, 0.0), 1.0);
        assert_relative_eq!(smoothstep(1.0, 0.0, 1.0), 0.0);
        assert_relative_eq!(smoothstep(1.0, 0.0, 0.5), 0.5);
    }

    /// Horizontal ramp: every channel holds `uv.x`.
    struct Ramp;

    impl Sampler2d for Ramp {
        fn sample(&self, uv: Vec2) -> Vec4 {
            Vec4::new(uv.x, uv.x, uv.x, 1.0)
        }

        fn sample_nearest(&self, uv: Vec2) -> Vec4 {
            self.sample(uv)
        }
    }

    /// A small disc at the center, and something else everywhere else.
    struct Spot {
        inside: Vec4,
        outside: Vec4,
    }

    impl Sampler2d for Spot {
        fn sample(&self, uv: Vec2) -> Vec4 {
            if uv.distance(Vec2::splat(0.5)) < 0.02 {
                self.inside
            } else {
                self.outside
            }
        }

        fn sample_nearest(&self, uv: Vec2) -> Vec4 {
            self.sample(uv)
        }
    }

    fn packed_texel(depth: f32, blur: f32) -> Vec4 {
        packed(depth, blur).0
    }

    /// A blurred far pixel ringed by a sharp, nearer, black foreground.
    fn far_spot_behind_foreground() -> (Spot, Spot) {
        let color = Spot {
            inside: Vec4::ONE,
            outside: Vec4::new(0.0, 0.0, 0.0, 1.0),
        };
        let depth = Spot {
            inside: packed_texel(0.9, 1.0),
            outside: packed_texel(0.1, 0.0),
        };
        (color, depth)
    }

    #[test]
    fn sharp_nearer_taps_do_not_bleed_into_background() {
        let uniforms = BokehUniforms {
            resolution: [64.0, 64.0],
            noise_amount: 0.0,
            ..BokehUniforms::default()
        };
        let (color, depth) = far_spot_behind_foreground();
        let out = bokeh_pixel(Vec2::splat(0.5), &color, &depth, &uniforms);
        assert_relative_eq!(out.x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn color_bleed_lets_nearer_taps_through() {
        let uniforms = BokehUniforms {
            resolution: [64.0, 64.0],
            noise_amount: 0.0,
            color_bleed: 1,
            ..BokehUniforms::default()
        };
        let (color, depth) = far_spot_behind_foreground();
        let out = bokeh_pixel(Vec2::splat(0.5), &color, &depth, &uniforms);
        assert!(out.x < 0.5, "foreground did not bleed: {out}");
    }

    #[test]
    fn fringe_splits_channels() {
        let plain = BokehUniforms {
            resolution: [64.0, 64.0],
            ..BokehUniforms::default()
        };
        let fringed = BokehUniforms { fringe: 1.0, ..plain };
        let at = Vec2::splat(0.5);

        let flat = plain.tap_color(&Ramp, at, 10.0);
        assert_eq!(flat.x, flat.y);
        assert_eq!(flat.y, flat.z);

        // Red is offset vertically only; green left, blue right.
        let split = fringed.tap_color(&Ramp, at, 10.0);
        assert_relative_eq!(split.x, 0.5, epsilon = 1e-6);
        assert!(split.y < split.x);
        assert!(split.z > split.x);
    }
}
