//! Dual-camera stereo rendering.
//!
//! Both stereo passes share one algorithm: copy the scene camera into a working
//! camera, displace it along its left axis for the left eye, then back past the
//! origin by the same distance for the right eye, rendering each eye into its
//! own offscreen target. The passes differ only in how the two eye images are
//! composited:
//!
//! - [`AnaglyphPass`] tints and horizontally offsets the eyes, then sums them
//! - [`LensPass`] places the eyes side by side with barrel distortion and
//!   per-channel chromatic aberration correction for a head-mounted display

mod anaglyph;
mod lens;

pub use anaglyph::{AnaglyphPass, AnaglyphUniforms, anaglyph_pixel};
pub use lens::{HmdConfig, LensPass, LensUniforms, distort, lens_pixel};

use glam::Vec3;

use crate::camera::Camera;
use crate::error::PassError;
use crate::executor::{Destination, RenderExecutor, SceneDraw, SceneMaterial};
use crate::pass::Frame;
use crate::target::{OwnedTargets, TargetId, ViewportSize};

const EYE_LABELS: &[&str] = &["Stereo Left Eye", "Stereo Right Eye"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Eye {
    Left,
    Right,
}

/// Moves `camera` into each eye position in turn and calls `draw` once per eye.
///
/// The offset is computed once from the camera's left axis, applied, then
/// doubled in place and subtracted, so the right eye lands at
/// `original - left * eye_offset`. On return `offset` holds the doubled vector
/// and `camera` sits at the right eye.
pub fn place_eyes<F>(
    camera: &mut Camera,
    offset: &mut Vec3,
    eye_offset: f32,
    mut draw: F,
) -> Result<(), PassError>
where
    F: FnMut(Eye, &Camera) -> Result<(), PassError>,
{
    *offset = camera.left() * eye_offset;
    camera.position += *offset;
    draw(Eye::Left, camera)?;

    *offset *= 2.0;
    camera.position -= *offset;
    draw(Eye::Right, camera)
}

/// Working camera, offset vector and eye targets shared by the stereo passes.
pub struct StereoRig {
    camera: Camera,
    offset: Vec3,
    targets: OwnedTargets,
    /// Half the distance between the eyes, in world units.
    pub eye_offset: f32,
}

impl StereoRig {
    pub fn new(eye_offset: f32) -> Self {
        Self::with_scale(eye_offset, [1.0, 1.0])
    }

    /// A rig whose eye targets are `scale` times the viewport size.
    pub fn with_scale(eye_offset: f32, scale: [f32; 2]) -> Self {
        Self {
            camera: Camera::default(),
            offset: Vec3::ZERO,
            targets: OwnedTargets::with_scale(EYE_LABELS, scale),
            eye_offset,
        }
    }

    pub fn update_size(
        &mut self,
        exec: &mut dyn RenderExecutor,
        size: ViewportSize,
    ) -> Result<bool, PassError> {
        self.targets.ensure_size(exec, size)
    }

    pub fn release(&mut self, exec: &mut dyn RenderExecutor) {
        self.targets.release(exec);
    }

    /// Left and right eye targets, if allocated.
    pub fn eye_targets(&self) -> Option<(TargetId, TargetId)> {
        self.targets.pair()
    }

    pub fn eye_extent(&self) -> Option<ViewportSize> {
        self.targets.extent()
    }

    /// The working camera as left after the last render (at the right eye).
    pub fn working_camera(&self) -> &Camera {
        &self.camera
    }

    /// Renders both eyes.
    ///
    /// `frustum` optionally overrides the working camera's field of view
    /// (degrees) and aspect. Returns `Ok(None)` when the frame has no camera.
    pub fn render_eyes(
        &mut self,
        exec: &mut dyn RenderExecutor,
        frame: &Frame<'_>,
        frustum: Option<(f32, f32)>,
        clear: bool,
    ) -> Result<Option<(TargetId, TargetId)>, PassError> {
        let Some(source) = frame.active_camera() else {
            log::trace!("stereo render skipped: no active camera");
            return Ok(None);
        };
        let (left, right) = self.eye_targets().ok_or_else(|| {
            PassError::ChainStateInconsistent("stereo pass rendered without eye targets".into())
        })?;

        self.camera = *source;
        if let Some((fov, aspect)) = frustum {
            self.camera.set_frustum_perspective(fov, aspect);
        }

        place_eyes(
            &mut self.camera,
            &mut self.offset,
            self.eye_offset,
            |eye, camera| {
                let target = match eye {
                    Eye::Left => left,
                    Eye::Right => right,
                };
                exec.render_scene(&SceneDraw {
                    draw_list: frame.draw_list,
                    camera,
                    lights: frame.lights,
                    dest: Destination::Target(target),
                    clear,
                    material: SceneMaterial::Standard,
                })
            },
        )?;

        Ok(Some((left, right)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw_list::DrawList;
    use crate::testing::RecordingExecutor;
    use approx::assert_relative_eq;

    #[test]
    fn eyes_are_symmetric_about_the_camera() {
        // Facing +Z with +Y up puts the left axis on +X.
        let mut camera = Camera::new().at(0.0, 0.0, 0.0).facing(Vec3::Z);
        let mut offset = Vec3::ZERO;
        let mut positions = Vec::new();

        place_eyes(&mut camera, &mut offset, 0.1, |eye, cam| {
            positions.push((eye, cam.position));
            Ok(())
        })
        .unwrap();

        assert_eq!(positions[0].0, Eye::Left);
        assert_relative_eq!(positions[0].1.x, 0.1);
        assert_eq!(positions[1].0, Eye::Right);
        assert_relative_eq!(positions[1].1.x, -0.1);
        assert_relative_eq!(offset.x, 0.2);
    }

    #[test]
    fn render_eyes_leaves_source_camera_untouched() {
        let mut exec = RecordingExecutor::default();
        let mut rig = StereoRig::new(0.5);
        rig.update_size(&mut exec, ViewportSize::new(8, 8)).unwrap();

        let list = DrawList::new();
        let camera = Camera::new().at(0.0, 1.0, 0.0);
        let frame = Frame::new(&list, &[], ViewportSize::new(8, 8)).with_camera(&camera);
        let (left, right) = rig
            .render_eyes(&mut exec, &frame, None, true)
            .unwrap()
            .unwrap();

        assert_eq!(camera.position, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(exec.scenes.len(), 2);
        assert_eq!(exec.scenes[0].dest, Destination::Target(left));
        assert_eq!(exec.scenes[1].dest, Destination::Target(right));
        // Default camera faces -Z, so its left axis is -X.
        assert_relative_eq!(exec.scenes[0].camera.position.x, -0.5);
        assert_relative_eq!(exec.scenes[1].camera.position.x, 0.5);
    }

    #[test]
    fn frustum_override_applies_to_both_eyes() {
        let mut exec = RecordingExecutor::default();
        let mut rig = StereoRig::new(0.1);
        rig.update_size(&mut exec, ViewportSize::new(8, 8)).unwrap();
        let list = DrawList::new();
        let camera = Camera::new();
        let frame = Frame::new(&list, &[], ViewportSize::new(8, 8)).with_camera(&camera);

        rig.render_eyes(&mut exec, &frame, Some((100.0, 1.0)), true)
            .unwrap();

        for scene in &exec.scenes {
            assert_relative_eq!(scene.camera.fov, 100f32.to_radians());
            assert_eq!(scene.camera.aspect, Some(1.0));
        }
    }

    #[test]
    fn missing_camera_renders_nothing() {
        let mut exec = RecordingExecutor::default();
        let mut rig = StereoRig::new(0.1);
        rig.update_size(&mut exec, ViewportSize::new(8, 8)).unwrap();
        let list = DrawList::new();
        let frame = Frame::new(&list, &[], ViewportSize::new(8, 8));

        assert_eq!(rig.render_eyes(&mut exec, &frame, None, true).unwrap(), None);
        assert!(exec.scenes.is_empty());
    }

    #[test]
    fn rendering_after_release_fails() {
        let mut exec = RecordingExecutor::default();
        let mut rig = StereoRig::new(0.1);
        rig.update_size(&mut exec, ViewportSize::new(8, 8)).unwrap();
        rig.release(&mut exec);
        let list = DrawList::new();
        let camera = Camera::new();
        let frame = Frame::new(&list, &[], ViewportSize::new(8, 8)).with_camera(&camera);

        assert!(matches!(
            rig.render_eyes(&mut exec, &frame, None, true),
            Err(PassError::ChainStateInconsistent(_))
        ));
    }
}
