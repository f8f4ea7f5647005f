use glam::{Vec2, Vec4};
use serde::{Deserialize, Serialize};

use crate::error::PassError;
use crate::executor::{Composite, RenderExecutor};
use crate::params::{ParamSpec, PassArgs};
use crate::pass::{Frame, PassKind, PassState, PostPass};
use crate::software::Sampler2d;
use crate::stereo::StereoRig;
use crate::target::{TargetId, ViewportSize};

/// Supersampling factor applied to each eye target to compensate for the
/// resolution lost to barrel distortion.
pub const DISTORTION_COMPENSATION: f32 = 1.8;

const DEFAULT_FOV: f32 = 100.0;
const DEFAULT_EYE_OFFSET: f32 = 0.4;

const BOOST_3D: ParamSpec = ParamSpec::float("boost3D", 0.1, 4.0, 1.0);

static PARAMETERS: [ParamSpec; 1] = [BOOST_3D];

/// Optical description of a head-mounted display.
///
/// Field names follow the JSON layout HMD runtimes report:
///
/// ```json
/// {
///   "distortionK": [1.0, 0.22, 0.24, 0.0],
///   "chromAbParameter": [0.996, -0.004, 1.014, 0.0],
///   "lensSeparationDistance": 0.0635,
///   "hScreenSize": 0.14976,
///   "FOV": 110.0,
///   "interpupillaryDistance": 0.064,
///   "hResolution": 1280,
///   "vResolution": 800
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HmdConfig {
    /// Radial distortion polynomial coefficients `k0..k3`.
    pub distortion_k: [f32; 4],
    /// Red `(scale, r² scale)` then blue `(scale, r² scale)`.
    pub chrom_ab_parameter: [f32; 4],
    /// Meters between lens centers.
    pub lens_separation_distance: f32,
    /// Physical screen width in meters.
    pub h_screen_size: f32,
    /// Vertical field of view per eye, degrees.
    #[serde(alias = "FOV")]
    pub field_of_view: f32,
    /// Meters between the wearer's pupils.
    pub interpupillary_distance: f32,
    pub h_resolution: u32,
    pub v_resolution: u32,
}

impl Default for HmdConfig {
    fn default() -> Self {
        Self::dk1()
    }
}

impl HmdConfig {
    /// First-generation development kit values.
    pub fn dk1() -> Self {
        Self {
            distortion_k: [1.0, 0.22, 0.24, 0.0],
            chrom_ab_parameter: [0.996, -0.004, 1.014, 0.0],
            lens_separation_distance: 0.0635,
            h_screen_size: 0.14976,
            field_of_view: 110.0,
            interpupillary_distance: 0.064,
            h_resolution: 1280,
            v_resolution: 800,
        }
    }

    /// Parses and validates a JSON device record.
    pub fn from_json(source: &str) -> Result<Self, PassError> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects physically meaningless values.
    pub fn validate(&self) -> Result<(), PassError> {
        positive("hScreenSize", self.h_screen_size)?;
        positive("lensSeparationDistance", self.lens_separation_distance)?;
        positive("interpupillaryDistance", self.interpupillary_distance)?;
        positive("fieldOfView", self.field_of_view)?;
        if self.field_of_view >= 180.0 {
            return Err(PassError::invalid("fieldOfView", "must be below 180 degrees"));
        }
        if self.h_resolution == 0 || self.v_resolution == 0 {
            return Err(PassError::invalid("resolution", "must be non-zero"));
        }
        if !self.distortion_k.iter().all(|k| k.is_finite()) {
            return Err(PassError::invalid("distortionK", "coefficients must be finite"));
        }
        if !self.chrom_ab_parameter.iter().all(|k| k.is_finite()) {
            return Err(PassError::invalid(
                "chromAbParameter",
                "coefficients must be finite",
            ));
        }
        let scale = self.distortion_scale();
        if !scale.is_finite() || scale.abs() < f32::EPSILON {
            return Err(PassError::invalid(
                "distortionK",
                "distortion at the screen edge must be non-zero",
            ));
        }
        Ok(())
    }

    /// Horizontal offset of the lens center from the eye-image center, in
    /// normalized eye coordinates.
    pub fn lens_center_offset(&self) -> [f32; 2] {
        [
            self.lens_separation_distance / self.h_screen_size - 0.5,
            0.0,
        ]
    }

    /// Radius of the screen edge in lens space.
    pub fn edge_radius(&self) -> f32 {
        -1.0 - 4.0 * (self.h_screen_size / 4.0 - self.lens_separation_distance / 2.0)
            / self.h_screen_size
    }

    /// Distortion polynomial evaluated at the screen edge.
    pub fn distortion_scale(&self) -> f32 {
        let r2 = self.edge_radius().powi(2);
        let k = self.distortion_k;
        k[0] + k[1] * r2 + k[2] * r2 * r2 + k[3] * r2 * r2 * r2
    }

    pub fn resolution(&self) -> ViewportSize {
        ViewportSize::new(self.h_resolution, self.v_resolution)
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), PassError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PassError::invalid(field, format!("must be positive, got {value}")))
    }
}

/// Uniforms for the lens-correction composite.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LensUniforms {
    pub distortion: [f32; 4],
    pub aberration: [f32; 4],
    pub lens_center_offset: [f32; 2],
    /// Maps eye coordinates to a square lens space.
    pub scale_in: [f32; 2],
    /// Maps distorted lens space back to eye coordinates.
    pub scale: [f32; 2],
    pub _padding: [f32; 2],
}

impl Default for LensUniforms {
    fn default() -> Self {
        Self {
            distortion: [1.0, 0.22, 0.24, 0.0],
            aberration: [0.996, -0.004, 1.014, 0.0],
            lens_center_offset: [0.0, 0.0],
            scale_in: [1.0, 1.0],
            scale: [0.8, 0.8],
            _padding: [0.0; 2],
        }
    }
}

/// Barrel-distorts an eye-local texture coordinate.
///
/// `ab` is the per-channel aberration pair `(scale, r² scale)`; `(1, 0)` gives
/// the uncorrected (green) channel.
pub fn distort(coord: Vec2, ab: Vec2, uniforms: &LensUniforms) -> Vec2 {
    let center = Vec2::from(uniforms.lens_center_offset);
    let lens = ((coord * 2.0 - 1.0) - center) * Vec2::from(uniforms.scale_in);
    let r_sq = lens.length_squared();
    let r = Vec4::new(1.0, r_sq, r_sq * r_sq, r_sq * r_sq * r_sq);
    let factor = ab.dot(Vec2::new(r.x, r.y)) * Vec4::from(uniforms.distortion).dot(r);
    let distorted = lens * factor;
    ((distorted * Vec2::from(uniforms.scale) + center) + 1.0) / 2.0
}

/// CPU reference of the lens composite for one pixel of the side-by-side
/// output. Returns `None` where the blue channel falls outside the eye image,
/// leaving the destination pixel as it was cleared.
pub fn lens_pixel(
    uv: Vec2,
    left: &dyn Sampler2d,
    right: &dyn Sampler2d,
    uniforms: &LensUniforms,
) -> Option<Vec4> {
    let right_eye = uv.x > 0.5;
    let mut coord = uv;
    if right_eye {
        coord.x = 1.0 - coord.x;
    }
    coord.x *= 2.0;

    let ab = uniforms.aberration;
    let mut blue = distort(coord, Vec2::new(ab[2], ab[3]), uniforms);
    if blue != blue.clamp(Vec2::ZERO, Vec2::ONE) {
        return None;
    }
    let mut red = distort(coord, Vec2::new(ab[0], ab[1]), uniforms);
    let mut green = distort(coord, Vec2::new(1.0, 0.0), uniforms);

    let eye = if right_eye {
        red.x = 1.0 - red.x;
        green.x = 1.0 - green.x;
        blue.x = 1.0 - blue.x;
        right
    } else {
        left
    };

    Some(Vec4::new(
        eye.sample(red).x,
        eye.sample(green).y,
        eye.sample(blue).z,
        1.0,
    ))
}

/// Side-by-side stereo with lens distortion correction for head-mounted
/// displays.
///
/// Each eye renders with a square frustum into a supersampled target, then the
/// composite pre-distorts both images so the headset's lenses undistort them.
/// Call [`apply_device`](Self::apply_device) with the headset's optics;
/// until then development-kit defaults are used.
///
/// # Parameters
///
/// * `boost3D` - Multiplier on the interpupillary distance (0.1 to 4)
pub struct LensPass {
    state: PassState,
    rig: StereoRig,
    uniforms: LensUniforms,
    /// Vertical field of view in degrees.
    fov: f32,
    boost: f32,
    interpupillary_distance: Option<f32>,
}

impl LensPass {
    pub fn new(args: &PassArgs) -> Result<Self, PassError> {
        let mut pass = Self {
            state: PassState::new(true),
            rig: StereoRig::with_scale(
                DEFAULT_EYE_OFFSET,
                [0.5 * DISTORTION_COMPENSATION, DISTORTION_COMPENSATION],
            ),
            uniforms: LensUniforms::default(),
            fov: DEFAULT_FOV,
            boost: 1.0,
            interpupillary_distance: None,
        };
        pass.setup(args)?;
        Ok(pass)
    }

    /// Derives uniforms, field of view and eye offset from `config`, then
    /// resizes the eye targets to the device resolution.
    ///
    /// The chain's viewport still wins: once the pass is switched into a
    /// sized chain, its eye targets are reallocated at the chain size.
    pub fn apply_device(
        &mut self,
        exec: &mut dyn RenderExecutor,
        config: &HmdConfig,
    ) -> Result<(), PassError> {
        config.validate()?;

        let scale = 1.0 / config.distortion_scale();
        self.uniforms.distortion = config.distortion_k;
        self.uniforms.aberration = config.chrom_ab_parameter;
        self.uniforms.lens_center_offset = config.lens_center_offset();
        self.uniforms.scale = [scale, scale];
        self.fov = config.field_of_view;
        self.interpupillary_distance = Some(config.interpupillary_distance);
        self.rig.eye_offset = config.interpupillary_distance * self.boost;

        log::info!(
            "lens pass configured: {}x{}, fov {:.1}, eye offset {:.4}, scale {:.4}",
            config.h_resolution,
            config.v_resolution,
            self.fov,
            self.rig.eye_offset,
            scale
        );
        self.update_size(exec, config.resolution())
    }

    pub fn uniforms(&self) -> &LensUniforms {
        &self.uniforms
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn eye_offset(&self) -> f32 {
        self.rig.eye_offset
    }

    pub fn rig(&self) -> &StereoRig {
        &self.rig
    }
}

impl PostPass for LensPass {
    fn kind(&self) -> PassKind {
        PassKind::LensStereo
    }

    fn state(&self) -> &PassState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PassState {
        &mut self.state
    }

    fn render(
        &mut self,
        exec: &mut dyn RenderExecutor,
        frame: &Frame<'_>,
        write: TargetId,
        _read: TargetId,
    ) -> Result<(), PassError> {
        let Some((left, right)) =
            self.rig
                .render_eyes(exec, frame, Some((self.fov, 1.0)), self.state.clear)?
        else {
            return Ok(());
        };
        exec.render_composite(
            &Composite::Lens {
                left,
                right,
                uniforms: self.uniforms,
            },
            self.state.destination(write),
            self.state.clear,
        )
    }

    fn update_size(
        &mut self,
        exec: &mut dyn RenderExecutor,
        size: ViewportSize,
    ) -> Result<(), PassError> {
        // Each eye covers half the width.
        self.uniforms.scale_in = [size.width as f32 * 0.5 / size.height.max(1) as f32, 1.0];
        self.rig.update_size(exec, size)?;
        Ok(())
    }

    fn destroy(&mut self, exec: &mut dyn RenderExecutor) {
        self.rig.release(exec);
    }

    fn setup(&mut self, args: &PassArgs) -> Result<(), PassError> {
        self.boost = args.float(&BOOST_3D)?;
        if let Some(ipd) = self.interpupillary_distance {
            self.rig.eye_offset = ipd * self.boost;
        }
        Ok(())
    }

    fn cleanup(&mut self) {
        self.boost = 1.0;
        if let Some(ipd) = self.interpupillary_distance {
            self.rig.eye_offset = ipd;
        }
    }

    fn parameters(&self) -> &'static [ParamSpec] {
        &PARAMETERS
    }
}
