use crate::error::PassError;
use crate::executor::{Composite, RenderExecutor};
use crate::pass::{Frame, PassKind, PassState, PostPass};
use crate::target::{TargetId, ViewportSize};

/// Copies the chain's read buffer to its destination.
///
/// The tail of a default chain; it presents whatever the earlier stages
/// produced. Copying needs no camera, so it runs even on frames where
/// camera-driven passes skip.
pub struct CopyPass {
    state: PassState,
}

impl CopyPass {
    pub fn new() -> Self {
        Self {
            state: PassState::new(true),
        }
    }

    /// A copy pass that writes straight to the screen.
    pub fn to_screen() -> Self {
        let mut pass = Self::new();
        pass.state.render_to_screen = true;
        pass
    }
}

impl Default for CopyPass {
    fn default() -> Self {
        Self::new()
    }
}

impl PostPass for CopyPass {
    fn kind(&self) -> PassKind {
        PassKind::Copy
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
        _frame: &Frame<'_>,
        write: TargetId,
        read: TargetId,
    ) -> Result<(), PassError> {
        exec.render_composite(
            &Composite::Copy { source: read },
            self.state.destination(write),
            self.state.clear,
        )
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
