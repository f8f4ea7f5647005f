use glam::{Vec2, Vec4};

use crate::error::PassError;
use crate::executor::{Composite, RenderExecutor};
use crate::params::{ParamSpec, PassArgs};
use crate::pass::{Frame, PassKind, PassState, PostPass};
use crate::software::Sampler2d;
use crate::stereo::StereoRig;
use crate::target::{TargetId, ViewportSize};

const EYE_DISTANCE: ParamSpec = ParamSpec::float("eyeDistance", 0.0, 0.4, 0.1);
const SCREEN_DISTANCE: ParamSpec = ParamSpec::float("screenDistance", 0.0, 100.0, 15.0);
const LEFT_COLOR: ParamSpec = ParamSpec::color("leftColor", [1.0, 1.0, 0.0]);
const RIGHT_COLOR: ParamSpec = ParamSpec::color("rightColor", [0.0, 0.0, 1.0]);

static PARAMETERS: [ParamSpec; 4] = [EYE_DISTANCE, SCREEN_DISTANCE, LEFT_COLOR, RIGHT_COLOR];

/// Uniforms for the anaglyph composite.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct AnaglyphUniforms {
    /// Tint for the left eye, alpha fixed at 1.
    pub left_color: [f32; 4],
    pub right_color: [f32; 4],
    /// Destination size in pixels.
    pub resolution: [f32; 2],
    /// Horizontal shift of each eye, in pixels.
    pub screen_offset: f32,
    pub _padding: f32,
}

impl AnaglyphUniforms {
    fn new(left: [f32; 3], right: [f32; 3], screen_offset: f32) -> Self {
        Self {
            left_color: [left[0], left[1], left[2], 1.0],
            right_color: [right[0], right[1], right[2], 1.0],
            resolution: [1.0, 1.0],
            screen_offset,
            _padding: 0.0,
        }
    }
}

/// CPU reference of the anaglyph composite for one pixel.
///
/// The left eye is sampled `screen_offset` pixels to the right of `uv`, the
/// right eye the same distance to the left. Each is multiplied by its tint
/// (alpha included) and the two are summed.
pub fn anaglyph_pixel(
    uv: Vec2,
    left: &dyn Sampler2d,
    right: &dyn Sampler2d,
    uniforms: &AnaglyphUniforms,
) -> Vec4 {
    let shift = uniforms.screen_offset / uniforms.resolution[0].max(1.0);
    let mut coord = uv;
    coord.x += shift;
    let mut color = left.sample(coord) * Vec4::from(uniforms.left_color);
    coord.x -= shift * 2.0;
    color += right.sample(coord) * Vec4::from(uniforms.right_color);
    color
}

/// Red/cyan style anaglyph stereo.
///
/// Renders the scene from two horizontally displaced cameras and merges the
/// eyes into one image with per-eye color tints, for viewing through colored
/// glasses.
///
/// # Parameters
///
/// * `eyeDistance` - Distance between the eyes in world units (0 to 0.4)
/// * `screenDistance` - Total horizontal image separation in pixels (0 to 100)
/// * `leftColor` / `rightColor` - Per-eye tints
pub struct AnaglyphPass {
    state: PassState,
    rig: StereoRig,
    uniforms: AnaglyphUniforms,
}

impl AnaglyphPass {
    /// Creates the pass and applies `args`.
    pub fn new(args: &PassArgs) -> Result<Self, PassError> {
        let mut pass = Self {
            state: PassState::new(true),
            rig: StereoRig::new(0.0),
            uniforms: AnaglyphUniforms::new([1.0; 3], [1.0; 3], 0.0),
        };
        pass.setup(args)?;
        Ok(pass)
    }

    pub fn eye_offset(&self) -> f32 {
        self.rig.eye_offset
    }

    pub fn uniforms(&self) -> &AnaglyphUniforms {
        &self.uniforms
    }

    pub fn rig(&self) -> &StereoRig {
        &self.rig
    }
}

impl PostPass for AnaglyphPass {
    fn kind(&self) -> PassKind {
        PassKind::AnaglyphStereo
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
        let Some((left, right)) = self.rig.render_eyes(exec, frame, None, self.state.clear)? else {
            return Ok(());
        };
        self.uniforms.resolution = [frame.viewport.width as f32, frame.viewport.height as f32];
        exec.render_composite(
            &Composite::Anaglyph {
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
        self.rig.update_size(exec, size)?;
        Ok(())
    }

    fn destroy(&mut self, exec: &mut dyn RenderExecutor) {
        self.rig.release(exec);
    }

    fn setup(&mut self, args: &PassArgs) -> Result<(), PassError> {
        let eye_distance = args.float(&EYE_DISTANCE)?;
        let screen_distance = args.float(&SCREEN_DISTANCE)?;
        self.rig.eye_offset = eye_distance / 2.0;
        self.uniforms = AnaglyphUniforms::new(
            args.vec3(&LEFT_COLOR)?,
            args.vec3(&RIGHT_COLOR)?,
            screen_distance / 2.0,
        );
        Ok(())
    }

    fn cleanup(&mut self) {
        // Back to schema defaults.
        if let Err(err) = self.setup(&PassArgs::new()) {
            log::warn!("anaglyph cleanup failed to restore defaults: {err}");
        }
    }

    fn parameters(&self) -> &'static [ParamSpec] {
        &PARAMETERS
    }
}
