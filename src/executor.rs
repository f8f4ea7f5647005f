//! The draw-call executor seam.
//!
//! Passes describe *what* to draw; a [`RenderExecutor`] decides *how*. Two
//! executors ship with the crate: [`WgpuExecutor`](crate::WgpuExecutor) for the
//! GPU and [`SoftwareExecutor`](crate::SoftwareExecutor), a CPU reference used
//! for headless rendering and tests. Both implement every material below.

use crate::camera::Camera;
use crate::dof::{BokehUniforms, DepthBlurUniforms};
use crate::draw_list::{DrawList, Light};
use crate::error::PassError;
use crate::stereo::{AnaglyphUniforms, LensUniforms};
use crate::target::{TargetId, ViewportSize};

/// Where a draw lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Destination {
    /// The presentable surface (or the software executor's screen image).
    Screen,
    Target(TargetId),
}

/// Material used when drawing the scene itself.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SceneMaterial {
    /// Lit base color.
    Standard,
    /// Packed linear depth (RG) and circle-of-confusion radius (BA).
    DepthBlur(DepthBlurUniforms),
}

/// A full-screen compositing material and the targets it samples.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Composite {
    Anaglyph {
        left: TargetId,
        right: TargetId,
        uniforms: AnaglyphUniforms,
    },
    Lens {
        left: TargetId,
        right: TargetId,
        uniforms: LensUniforms,
    },
    Bokeh {
        color: TargetId,
        depth_blur: TargetId,
        uniforms: BokehUniforms,
    },
    Copy {
        source: TargetId,
    },
}

impl Composite {
    /// Every target this composite samples from.
    pub fn inputs(&self) -> Vec<TargetId> {
        match *self {
            Composite::Anaglyph { left, right, .. } | Composite::Lens { left, right, .. } => {
                vec![left, right]
            }
            Composite::Bokeh {
                color, depth_blur, ..
            } => vec![color, depth_blur],
            Composite::Copy { source } => vec![source],
        }
    }
}

/// One scene draw request.
#[derive(Clone, Copy, Debug)]
pub struct SceneDraw<'a> {
    pub draw_list: &'a DrawList,
    pub camera: &'a Camera,
    pub lights: &'a [Light],
    pub dest: Destination,
    /// Clear the destination before drawing. When false the draw composites
    /// over whatever the destination already holds.
    pub clear: bool,
    pub material: SceneMaterial,
}

/// Performs draws on behalf of passes.
///
/// Target handles are only meaningful to the executor that minted them.
/// Passing a destroyed or foreign handle yields [`PassError::UnknownTarget`].
pub trait RenderExecutor {
    /// Allocates an offscreen target. Zero-sized requests fail with
    /// [`PassError::TargetAllocation`].
    fn create_target(&mut self, label: &str, size: ViewportSize) -> Result<TargetId, PassError>;

    /// Frees a target. Freeing an unknown handle is an error; callers that want
    /// idempotence track ownership themselves (see [`OwnedTargets`](crate::OwnedTargets)).
    fn destroy_target(&mut self, id: TargetId) -> Result<(), PassError>;

    /// Draws the draw list from `camera` into `draw.dest`.
    fn render_scene(&mut self, draw: &SceneDraw<'_>) -> Result<(), PassError>;

    /// Draws a full-screen quad with `composite` into `dest`.
    fn render_composite(
        &mut self,
        composite: &Composite,
        dest: Destination,
        clear: bool,
    ) -> Result<(), PassError>;

    /// Size of the screen destination.
    fn screen_size(&self) -> ViewportSize;
}
