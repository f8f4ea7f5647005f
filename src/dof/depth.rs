//! Depth and circle-of-confusion capture.

use crate::dof::pack::pack16;
use crate::error::PassError;

/// Circle-of-confusion diameter in millimetres (35mm film).
pub const CIRCLE_OF_CONFUSION: f32 = 0.03;

/// Uniforms for the depth/blur scene material.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DepthBlurUniforms {
    pub far_plane: f32,
    /// Distance to the plane in focus, metres.
    pub focal_distance: f32,
    /// Lens focal length, millimetres.
    pub focal_length: f32,
    pub f_stop: f32,
    /// Blur radius in pixels at which the blur channel saturates.
    pub max_blur: f32,
    pub _padding: [f32; 3],
}

impl Default for DepthBlurUniforms {
    fn default() -> Self {
        Self {
            far_plane: 100.0,
            focal_distance: 5.0,
            focal_length: 85.0,
            f_stop: 5.6,
            max_blur: 10.0,
            _padding: [0.0; 3],
        }
    }
}

impl DepthBlurUniforms {
    pub fn validate(&self) -> Result<(), PassError> {
        for (field, value) in [
            ("focalDistance", self.focal_distance),
            ("focalLength", self.focal_length),
            ("fStop", self.f_stop),
            ("maxBlur", self.max_blur),
            ("farPlane", self.far_plane),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PassError::invalid(field, format!("must be positive, got {value}")));
            }
        }
        if self.focal_distance * 1000.0 <= self.focal_length {
            return Err(PassError::invalid(
                "focalDistance",
                "focal plane must lie beyond the focal length",
            ));
        }
        Ok(())
    }

    /// Thin-lens blur radius for a surface at `depth` metres, clamped to
    /// `[0, max_blur]`.
    pub fn circle_of_confusion(&self, depth: f32) -> f32 {
        let f = self.focal_length;
        let focal_plane = self.focal_distance * 1000.0;
        let depth_mm = depth * 1000.0;

        let a = depth_mm * f / (depth_mm - f);
        let b = focal_plane * f / (focal_plane - f);
        let c = (focal_plane - f) / (focal_plane * self.f_stop * CIRCLE_OF_CONFUSION);
        let blur = (a - b).abs() * c;
        if blur.is_finite() {
            blur.clamp(0.0, self.max_blur)
        } else {
            self.max_blur
        }
    }

    /// The packed texel for a surface at linear view depth `view_depth`:
    /// `depth / far` in RG, `blur / max_blur` in BA.
    pub fn texel(&self, view_depth: f32) -> [f32; 4] {
        let depth = view_depth.min(self.far_plane).max(0.0);
        let [r, g] = pack16(depth / self.far_plane);
        let [b, a] = pack16(self.circle_of_confusion(depth) / self.max_blur);
        [r, g, b, a]
    }

    /// The texel for pixels no geometry covers: a surface at the far plane.
    pub fn background_texel(&self) -> [f32; 4] {
        self.texel(self.far_plane)
    }
}
