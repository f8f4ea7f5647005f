//! The pass capability contract shared by every effect stage.

mod copy;
mod scene;

pub use copy::CopyPass;
pub use scene::ScenePass;

use std::sync::atomic::{AtomicU64, Ordering};

use crate::camera::Camera;
use crate::draw_list::{DrawList, Light};
use crate::error::PassError;
use crate::executor::{Destination, RenderExecutor};
use crate::params::{ParamSpec, PassArgs};
use crate::target::{TargetId, ViewportSize};

/// Process-unique identity of a pass instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(u64);

impl PassId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        PassId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Static variant tag of a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PassKind {
    Scene,
    Copy,
    DepthOfField,
    AnaglyphStereo,
    LensStereo,
}

/// Flags every pass carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassState {
    pub id: PassId,
    /// Disabled passes are skipped by the chain.
    pub enabled: bool,
    /// Clear destinations before drawing.
    pub clear: bool,
    /// Write to the screen instead of the chain's write buffer.
    pub render_to_screen: bool,
    /// The chain swaps its read and write buffers after this pass runs.
    pub needs_swap: bool,
}

impl PassState {
    pub fn new(needs_swap: bool) -> Self {
        Self {
            id: PassId::next(),
            enabled: true,
            clear: true,
            render_to_screen: false,
            needs_swap,
        }
    }

    /// The destination this pass writes to, given the chain's write buffer.
    pub fn destination(&self, write: TargetId) -> Destination {
        if self.render_to_screen {
            Destination::Screen
        } else {
            Destination::Target(write)
        }
    }
}

/// Everything the host lends a chain for one frame.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    pub draw_list: &'a DrawList,
    pub lights: &'a [Light],
    /// Camera passed explicitly for this frame.
    pub camera: Option<&'a Camera>,
    /// The host's current main camera, used when no explicit camera is given.
    pub main_camera: Option<&'a Camera>,
    pub viewport: ViewportSize,
}

impl<'a> Frame<'a> {
    pub fn new(draw_list: &'a DrawList, lights: &'a [Light], viewport: ViewportSize) -> Self {
        Self {
            draw_list,
            lights,
            camera: None,
            main_camera: None,
            viewport,
        }
    }

    pub fn with_camera(mut self, camera: &'a Camera) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn with_main_camera(mut self, camera: &'a Camera) -> Self {
        self.main_camera = Some(camera);
        self
    }

    /// The explicit camera, or else the host's main camera.
    pub fn active_camera(&self) -> Option<&'a Camera> {
        self.camera.or(self.main_camera)
    }
}

/// A single effect stage in a [`PassChain`](crate::PassChain).
///
/// # Lifecycle
///
/// 1. Construction sizes any owned targets lazily; the owning chain (or the
///    switcher) calls `update_size` before the first render.
/// 2. `render` runs once per frame, in chain order.
/// 3. `destroy` releases every owned target. It may be called any number of
///    times.
///
/// Implementations must never mutate the host's draw list or camera.
pub trait PostPass {
    fn kind(&self) -> PassKind;

    fn state(&self) -> &PassState;

    fn state_mut(&mut self) -> &mut PassState;

    /// Draws this pass.
    ///
    /// # Arguments
    ///
    /// * `exec` - Executor performing the draws
    /// * `frame` - Draw list, lights and cameras lent by the host
    /// * `write` - Chain buffer to write to when not rendering to screen
    /// * `read` - Chain buffer holding the previous stage's output
    ///
    /// When the frame has no active camera this is a silent no-op.
    fn render(
        &mut self,
        exec: &mut dyn RenderExecutor,
        frame: &Frame<'_>,
        write: TargetId,
        read: TargetId,
    ) -> Result<(), PassError>;

    /// Resizes owned targets. Unchanged sizes recreate nothing.
    fn update_size(
        &mut self,
        exec: &mut dyn RenderExecutor,
        size: ViewportSize,
    ) -> Result<(), PassError>;

    /// Releases owned targets.
    fn destroy(&mut self, exec: &mut dyn RenderExecutor);

    /// Applies configuration. Keys missing from `args` take schema defaults.
    fn setup(&mut self, _args: &PassArgs) -> Result<(), PassError> {
        Ok(())
    }

    /// Reverts configuration applied by `setup`.
    fn cleanup(&mut self) {}

    /// The parameter schema this pass accepts.
    fn parameters(&self) -> &'static [ParamSpec] {
        &[]
    }

    fn id(&self) -> PassId {
        self.state().id
    }
}
