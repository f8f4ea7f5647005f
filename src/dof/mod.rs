//! Depth of field.
//!
//! The pass captures the scene twice: once with a material writing packed
//! linear depth and thin-lens blur radius, once normally. A full-screen bokeh
//! composite then gathers blurred color from the sharp capture, weighting taps
//! by depth so in-focus foreground edges do not smear.

mod bokeh;
mod depth;
mod pack;

pub use bokeh::{BokehUniforms, IN_FOCUS_BLUR, KERNEL, bokeh_pixel};
pub use depth::{CIRCLE_OF_CONFUSION, DepthBlurUniforms};
pub use pack::{pack16, quantize, unpack16};

use crate::error::PassError;
use crate::executor::{Composite, Destination, RenderExecutor, SceneDraw, SceneMaterial};
use crate::params::{ParamSpec, PassArgs};
use crate::pass::{Frame, PassKind, PassState, PostPass};
use crate::target::{OwnedTargets, TargetId, ViewportSize};

const TARGET_LABELS: &[&str] = &["DOF Depth Blur", "DOF Color"];

const FOCAL_DISTANCE: ParamSpec = ParamSpec::float("focalDistance", 0.1, 100.0, 5.0);
const FOCAL_LENGTH: ParamSpec = ParamSpec::float("focalLength", 10.0, 300.0, 85.0);
const F_STOP: ParamSpec = ParamSpec::float("fStop", 1.0, 22.0, 5.6);
const MAX_BLUR: ParamSpec = ParamSpec::float("maxBlur", 0.5, 20.0, 10.0);
const VIGNETTING: ParamSpec = ParamSpec::toggle("vignetting", false);
const FRINGE: ParamSpec = ParamSpec::float("fringe", 0.0, 5.0, 0.0);
const NOISE: ParamSpec = ParamSpec::toggle("noise", true);
const COLOR_BLEED: ParamSpec = ParamSpec::toggle("colorBleed", false);
const THRESHOLD: ParamSpec = ParamSpec::float("threshold", 0.0, 1.0, 0.0);
const GAIN: ParamSpec = ParamSpec::float("gain", 0.0, 10.0, 0.0);
const VIGN_OUT: ParamSpec = ParamSpec::float("vignOut", 0.0, 2.0, 1.3);
const VIGN_IN: ParamSpec = ParamSpec::float("vignIn", 0.0, 2.0, 0.0);
const VIGN_FADE: ParamSpec = ParamSpec::float("vignFade", 1.0, 50.0, 22.0);

static PARAMETERS: [ParamSpec; 13] = [
    FOCAL_DISTANCE,
    FOCAL_LENGTH,
    F_STOP,
    MAX_BLUR,
    VIGNETTING,
    FRINGE,
    NOISE,
    COLOR_BLEED,
    THRESHOLD,
    GAIN,
    VIGN_OUT,
    VIGN_IN,
    VIGN_FADE,
];

/// Depth-of-field with bokeh.
///
/// # Parameters
///
/// * `focalDistance` - Distance to the focal plane in metres
/// * `focalLength` - Lens focal length in millimetres
/// * `fStop` - Aperture; smaller values blur more
/// * `maxBlur` - Blur radius cap in pixels
/// * `vignetting`, `fringe`, `noise`, `colorBleed`, `threshold`, `gain` -
///   Bokeh styling
/// * `vignOut`, `vignIn`, `vignFade` - Vignette radii and the f-stop at
///   which it fades out
pub struct DofPass {
    state: PassState,
    targets: OwnedTargets,
    depth: DepthBlurUniforms,
    bokeh: BokehUniforms,
}

impl DofPass {
    pub fn new(args: &PassArgs) -> Result<Self, PassError> {
        let mut pass = Self {
            state: PassState::new(true),
            targets: OwnedTargets::new(TARGET_LABELS),
            depth: DepthBlurUniforms::default(),
            bokeh: BokehUniforms::default(),
        };
        pass.setup(args)?;
        Ok(pass)
    }

    pub fn depth_uniforms(&self) -> &DepthBlurUniforms {
        &self.depth
    }

    pub fn bokeh_uniforms(&self) -> &BokehUniforms {
        &self.bokeh
    }

    /// Depth/blur and color targets, if allocated.
    pub fn targets(&self) -> Option<(TargetId, TargetId)> {
        self.targets.pair()
    }
}

impl PostPass for DofPass {
    fn kind(&self) -> PassKind {
        PassKind::DepthOfField
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
        let Some(camera) = frame.active_camera() else {
            log::trace!("depth of field skipped: no active camera");
            return Ok(());
        };
        let (depth_target, color_target) = self.targets.pair().ok_or_else(|| {
            PassError::ChainStateInconsistent("depth of field rendered without targets".into())
        })?;

        self.depth.far_plane = camera.far;
        self.bokeh.z_far = camera.far;
        if let Some(extent) = self.targets.extent() {
            self.bokeh.resolution = [extent.width as f32, extent.height as f32];
        }

        exec.render_scene(&SceneDraw {
            draw_list: frame.draw_list,
            camera,
            lights: frame.lights,
            dest: Destination::Target(depth_target),
            clear: self.state.clear,
            material: SceneMaterial::DepthBlur(self.depth),
        })?;
        exec.render_scene(&SceneDraw {
            draw_list: frame.draw_list,
            camera,
            lights: frame.lights,
            dest: Destination::Target(color_target),
            clear: self.state.clear,
            material: SceneMaterial::Standard,
        })?;

        exec.render_composite(
            &Composite::Bokeh {
                color: color_target,
                depth_blur: depth_target,
                uniforms: self.bokeh,
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
        self.targets.ensure_size(exec, size)?;
        Ok(())
    }

    fn destroy(&mut self, exec: &mut dyn RenderExecutor) {
        self.targets.release(exec);
    }

    fn setup(&mut self, args: &PassArgs) -> Result<(), PassError> {
        let depth = DepthBlurUniforms {
            focal_distance: args.float(&FOCAL_DISTANCE)?,
            focal_length: args.float(&FOCAL_LENGTH)?,
            f_stop: args.float(&F_STOP)?,
            max_blur: args.float(&MAX_BLUR)?,
            ..self.depth
        };
        depth.validate()?;

        self.bokeh = BokehUniforms {
            f_stop: depth.f_stop,
            max_blur: depth.max_blur,
            vignetting: args.flag(&VIGNETTING)? as u32,
            fringe: args.float(&FRINGE)?,
            noise: args.flag(&NOISE)? as u32,
            color_bleed: args.flag(&COLOR_BLEED)? as u32,
            threshold: args.float(&THRESHOLD)?,
            gain: args.float(&GAIN)?,
            vign_out: args.float(&VIGN_OUT)?,
            vign_in: args.float(&VIGN_IN)?,
            vign_fade: args.float(&VIGN_FADE)?,
            ..self.bokeh
        };
        self.depth = depth;
        Ok(())
    }

    fn cleanup(&mut self) {
        if let Err(err) = self.setup(&PassArgs::new()) {
            log::warn!("depth of field cleanup failed to restore defaults: {err}");
        }
    }

    fn parameters(&self) -> &'static [ParamSpec] {
        &PARAMETERS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::draw_list::DrawList;
    use crate::params::ParamValue;
    use crate::testing::RecordingExecutor;

    #[test]
    fn defaults_match_schema() {
        let pass = DofPass::new(&PassArgs::new()).unwrap();
        assert_eq!(pass.depth_uniforms().focal_distance, 5.0);
        assert_eq!(pass.depth_uniforms().focal_length, 85.0);
        assert_eq!(pass.bokeh_uniforms().f_stop, 5.6);
        assert_eq!(pass.bokeh_uniforms().noise, 1);
        assert_eq!(pass.parameters().len(), 13);
    }

    #[test]
    fn invalid_optics_are_rejected() {
        let args = PassArgs::new().with("focalLength", ParamValue::Float(0.0));
        assert!(matches!(
            DofPass::new(&args),
            Err(PassError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn failed_setup_keeps_previous_values() {
        let mut pass =
            DofPass::new(&PassArgs::new().with("fStop", ParamValue::Float(2.0))).unwrap();
        let bad = PassArgs::new().with("focalDistance", ParamValue::Float(0.01));
        assert!(pass.setup(&bad).is_err());
        assert_eq!(pass.depth_uniforms().f_stop, 2.0);
    }

    #[test]
    fn render_captures_depth_then_color_then_composites() {
        let mut exec = RecordingExecutor::default();
        let write = exec.create_target("w", ViewportSize::new(32, 16)).unwrap();
        let mut pass = DofPass::new(&PassArgs::new()).unwrap();
        pass.update_size(&mut exec, ViewportSize::new(32, 16)).unwrap();
        let list = DrawList::new();
        let camera = Camera::new().with_clip(0.1, 50.0);
        let frame = Frame::new(&list, &[], ViewportSize::new(32, 16)).with_camera(&camera);

        pass.render(&mut exec, &frame, write, write).unwrap();

        let (depth_target, color_target) = pass.targets().unwrap();
        assert_eq!(exec.scenes.len(), 2);
        assert_eq!(exec.scenes[0].dest, Destination::Target(depth_target));
        match exec.scenes[0].material {
            SceneMaterial::DepthBlur(uniforms) => assert_eq!(uniforms.far_plane, 50.0),
            other => panic!("unexpected material {other:?}"),
        }
        assert_eq!(exec.scenes[1].dest, Destination::Target(color_target));
        match exec.composites[0].0 {
            Composite::Bokeh { uniforms, .. } => {
                assert_eq!(uniforms.z_far, 50.0);
                assert_eq!(uniforms.resolution, [32.0, 16.0]);
            }
            other => panic!("unexpected composite {other:?}"),
        }
    }

    #[test]
    fn resize_is_idempotent_and_destroy_is_repeatable() {
        let mut exec = RecordingExecutor::default();
        let mut pass = DofPass::new(&PassArgs::new()).unwrap();
        pass.update_size(&mut exec, ViewportSize::new(8, 8)).unwrap();
        pass.update_size(&mut exec, ViewportSize::new(8, 8)).unwrap();
        assert_eq!(exec.created.len(), 2);

        pass.destroy(&mut exec);
        pass.destroy(&mut exec);
        assert_eq!(exec.live_targets(), 0);
        assert_eq!(exec.destroyed.len(), 2);
    }
}
