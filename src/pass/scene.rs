use crate::error::PassError;
use crate::executor::{RenderExecutor, SceneDraw, SceneMaterial};
use crate::pass::{Frame, PassKind, PassState, PostPass};
use crate::target::{TargetId, ViewportSize};

/// Renders the host's draw list with the standard material.
///
/// This is the head of a default chain. Stereo and depth-of-field passes
/// replace it when switched in, since they render the scene themselves.
pub struct ScenePass {
    state: PassState,
}

impl ScenePass {
    pub fn new() -> Self {
        Self {
            state: PassState::new(true),
        }
    }
}

impl Default for ScenePass {
    fn default() -> Self {
        Self::new()
    }
}

impl PostPass for ScenePass {
    fn kind(&self) -> PassKind {
        PassKind::Scene
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
            log::trace!("scene pass skipped: no active camera");
            return Ok(());
        };
        exec.render_scene(&SceneDraw {
            draw_list: frame.draw_list,
            camera,
            lights: frame.lights,
            dest: self.state.destination(write),
            clear: self.state.clear,
            material: SceneMaterial::Standard,
        })
    }

    fn update_size(
        &mut self,
        _exec: &mut dyn RenderExecutor,
        _size: ViewportSize,
    ) -> Result<(), PassError> {
        Ok(())
    }

    fn destroy(&mut self, _exec: &mut dyn RenderExecutor) {}
}
