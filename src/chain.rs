//! Ordered pass chains and the host-side registry of chains.
//!
//! A [`PassChain`] runs its passes front to back once per frame. It owns two
//! ping-pong buffers: each pass reads the previous stage's output from the
//! read buffer and writes into the write buffer, and the chain swaps the two
//! after every pass that asks for it.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::PassError;
use crate::executor::{Destination, RenderExecutor, SceneDraw, SceneMaterial};
use crate::pass::{CopyPass, Frame, PassId, PostPass, ScenePass};
use crate::target::{OwnedTargets, ViewportSize};

const BUFFER_LABELS: &[&str] = &["Chain Read Buffer", "Chain Write Buffer"];

/// Process-unique identity of a chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChainId(u64);

impl ChainId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ChainId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// An ordered, mutable sequence of passes plus the viewport size it was last
/// sized for.
pub struct PassChain {
    id: ChainId,
    passes: Vec<Box<dyn PostPass>>,
    size: Option<ViewportSize>,
    buffers: OwnedTargets,
}

impl PassChain {
    /// An empty chain.
    pub fn new() -> Self {
        Self {
            id: ChainId::next(),
            passes: Vec::new(),
            size: None,
            buffers: OwnedTargets::new(BUFFER_LABELS),
        }
    }

    /// Scene render followed by a copy to the screen.
    pub fn with_default_passes() -> Self {
        let mut chain = Self::new();
        chain.push(Box::new(ScenePass::new()));
        chain.push(Box::new(CopyPass::to_screen()));
        chain
    }

    pub fn id(&self) -> ChainId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// The viewport size the chain was last sized for.
    pub fn size(&self) -> Option<ViewportSize> {
        self.size
    }

    pub fn push(&mut self, pass: Box<dyn PostPass>) {
        self.passes.push(pass);
    }

    /// Inserts at `index`, clamped to the chain length.
    pub fn insert(&mut self, index: usize, pass: Box<dyn PostPass>) {
        let index = index.min(self.passes.len());
        self.passes.insert(index, pass);
    }

    pub fn head(&self) -> Option<&dyn PostPass> {
        self.passes.first().map(|pass| pass.as_ref())
    }

    pub fn head_id(&self) -> Option<PassId> {
        self.passes.first().map(|pass| pass.id())
    }

    pub fn remove_head(&mut self) -> Option<Box<dyn PostPass>> {
        if self.passes.is_empty() {
            None
        } else {
            Some(self.passes.remove(0))
        }
    }

    /// Removes the pass with `id`, wherever it sits.
    pub fn remove(&mut self, id: PassId) -> Option<Box<dyn PostPass>> {
        let index = self.passes.iter().position(|pass| pass.id() == id)?;
        Some(self.passes.remove(index))
    }

    pub fn get_mut(&mut self, id: PassId) -> Option<&mut (dyn PostPass + 'static)> {
        self.passes
            .iter_mut()
            .find(|pass| pass.id() == id)
            .map(|pass| pass.as_mut())
    }

    /// Pass identities in execution order.
    pub fn pass_ids(&self) -> Vec<PassId> {
        self.passes.iter().map(|pass| pass.id()).collect()
    }

    pub fn passes(&self) -> impl Iterator<Item = &dyn PostPass> {
        self.passes.iter().map(|pass| pass.as_ref())
    }

    /// Resizes the chain buffers and every pass. Repeating the current size
    /// does nothing; empty sizes are ignored.
    pub fn set_size(
        &mut self,
        exec: &mut dyn RenderExecutor,
        size: ViewportSize,
    ) -> Result<(), PassError> {
        if size.is_empty() {
            log::debug!("ignoring empty chain size {}x{}", size.width, size.height);
            return Ok(());
        }
        if self.size == Some(size) {
            return Ok(());
        }

        self.buffers.ensure_size(exec, size)?;
        for pass in &mut self.passes {
            pass.update_size(exec, size)?;
        }
        self.size = Some(size);
        log::debug!(
            "chain {:?} resized to {}x{} ({} passes)",
            self.id,
            size.width,
            size.height,
            self.passes.len()
        );
        Ok(())
    }

    /// Runs every enabled pass in order.
    pub fn render(
        &mut self,
        exec: &mut dyn RenderExecutor,
        frame: &Frame<'_>,
    ) -> Result<(), PassError> {
        if frame.viewport.is_empty() {
            return Ok(());
        }
        self.set_size(exec, frame.viewport)?;

        let (mut read, mut write) = self.buffers.pair().ok_or_else(|| {
            PassError::ChainStateInconsistent("chain rendered after destroy".into())
        })?;

        for pass in self.passes.iter_mut().filter(|pass| pass.state().enabled) {
            pass.render(exec, frame, write, read)?;
            if pass.state().needs_swap {
                std::mem::swap(&mut read, &mut write);
            }
        }
        Ok(())
    }

    /// Destroys every pass and the chain buffers. Safe to repeat.
    pub fn destroy(&mut self, exec: &mut dyn RenderExecutor) {
        for pass in &mut self.passes {
            pass.destroy(exec);
        }
        self.buffers.release(exec);
        self.size = None;
    }
}

impl Default for PassChain {
    fn default() -> Self {
        Self::new()
    }
}

/// The host's registered chains. The first chain is the active one.
#[derive(Default)]
pub struct ChainRegistry {
    chains: Vec<PassChain>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn active(&self) -> Option<&PassChain> {
        self.chains.first()
    }

    pub fn active_mut(&mut self) -> Option<&mut PassChain> {
        self.chains.first_mut()
    }

    pub fn register(&mut self, chain: PassChain) -> ChainId {
        let id = chain.id();
        log::debug!("registered chain {id:?}");
        self.chains.push(chain);
        id
    }

    /// Removes a chain without destroying it.
    pub fn deregister(&mut self, id: ChainId) -> Option<PassChain> {
        let index = self.chains.iter().position(|chain| chain.id() == id)?;
        log::debug!("deregistered chain {id:?}");
        Some(self.chains.remove(index))
    }

    pub fn get(&self, id: ChainId) -> Option<&PassChain> {
        self.chains.iter().find(|chain| chain.id() == id)
    }

    pub fn get_mut(&mut self, id: ChainId) -> Option<&mut PassChain> {
        self.chains.iter_mut().find(|chain| chain.id() == id)
    }

    /// Renders every chain in registration order. With no chains the draw
    /// list is drawn straight to the screen.
    pub fn render(
        &mut self,
        exec: &mut dyn RenderExecutor,
        frame: &Frame<'_>,
    ) -> Result<(), PassError> {
        if self.chains.is_empty() {
            let Some(camera) = frame.active_camera() else {
                log::trace!("frame skipped: no chains and no camera");
                return Ok(());
            };
            return exec.render_scene(&SceneDraw {
                draw_list: frame.draw_list,
                camera,
                lights: frame.lights,
                dest: Destination::Screen,
                clear: true,
                material: SceneMaterial::Standard,
            });
        }
        for chain in &mut self.chains {
            chain.render(exec, frame)?;
        }
        Ok(())
    }

    pub fn resize(
        &mut self,
        exec: &mut dyn RenderExecutor,
        size: ViewportSize,
    ) -> Result<(), PassError> {
        for chain in &mut self.chains {
            chain.set_size(exec, size)?;
        }
        Ok(())
    }

    /// Destroys and removes every chain.
    pub fn destroy_all(&mut self, exec: &mut dyn RenderExecutor) {
        for mut chain in self.chains.drain(..) {
            chain.destroy(exec);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::draw_list::DrawList;
    use crate::executor::Composite;
    use crate::testing::{MockPass, RecordingExecutor};

    #[test]
    fn default_chain_is_scene_then_copy() {
        let chain = PassChain::with_default_passes();
        let kinds: Vec<_> = chain.passes().map(|pass| pass.kind()).collect();
        assert_eq!(
            kinds,
            vec![crate::pass::PassKind::Scene, crate::pass::PassKind::Copy]
        );
        assert!(chain.passes().last().unwrap().state().render_to_screen);
    }

    #[test]
    fn set_size_is_idempotent() {
        let mut exec = RecordingExecutor::default();
        let mut chain = PassChain::new();
        chain.push(MockPass::boxed());

        chain.set_size(&mut exec, ViewportSize::new(16, 16)).unwrap();
        chain.set_size(&mut exec, ViewportSize::new(16, 16)).unwrap();

        // Two chain buffers and one mock target.
        assert_eq!(exec.created.len(), 3);
        assert_eq!(chain.size(), Some(ViewportSize::new(16, 16)));
    }

    #[test]
    fn render_ping_pongs_buffers() {
        let mut exec = RecordingExecutor::default();
        let mut chain = PassChain::with_default_passes();
        let list = DrawList::new();
        let camera = Camera::new();
        let frame = Frame::new(&list, &[], ViewportSize::new(8, 8)).with_camera(&camera);

        chain.render(&mut exec, &frame).unwrap();

        let scene_dest = exec.scenes[0].dest;
        let (composite, dest, _) = exec.composites[0];
        assert_eq!(dest, Destination::Screen);
        match (scene_dest, composite) {
            (Destination::Target(written), Composite::Copy { source }) => {
                assert_eq!(written, source)
            }
            other => panic!("unexpected draws {other:?}"),
        }
    }

    #[test]
    fn disabled_passes_are_skipped() {
        let mut exec = RecordingExecutor::default();
        let mut chain = PassChain::with_default_passes();
        let head = chain.head_id().unwrap();
        chain.get_mut(head).unwrap().state_mut().enabled = false;
        let list = DrawList::new();
        let camera = Camera::new();
        let frame = Frame::new(&list, &[], ViewportSize::new(8, 8)).with_camera(&camera);

        chain.render(&mut exec, &frame).unwrap();

        assert!(exec.scenes.is_empty());
        assert_eq!(exec.composites.len(), 1);
    }

    #[test]
    fn destroy_releases_everything_and_repeats_safely() {
        let mut exec = RecordingExecutor::default();
        let mut chain = PassChain::new();
        chain.push(MockPass::boxed());
        chain.set_size(&mut exec, ViewportSize::new(4, 4)).unwrap();

        chain.destroy(&mut exec);
        chain.destroy(&mut exec);

        assert_eq!(exec.live_targets(), 0);
        assert_eq!(exec.destroyed.len(), 3);
        assert_eq!(chain.size(), None);
    }

    #[test]
    fn remove_by_id_keeps_order() {
        let mut chain = PassChain::new();
        let a = MockPass::boxed();
        let b = MockPass::boxed();
        let c = MockPass::boxed();
        let (ida, idb, idc) = (a.id(), b.id(), c.id());
        chain.push(a);
        chain.push(b);
        chain.push(c);

        assert!(chain.remove(idb).is_some());
        assert_eq!(chain.pass_ids(), vec![ida, idc]);
        assert!(chain.remove(idb).is_none());
    }

    #[test]
    fn empty_registry_renders_scene_directly() {
        let mut exec = RecordingExecutor::default();
        let mut registry = ChainRegistry::new();
        let list = DrawList::new();
        let camera = Camera::new();
        let frame = Frame::new(&list, &[], ViewportSize::new(8, 8)).with_main_camera(&camera);

        registry.render(&mut exec, &frame).unwrap();

        assert_eq!(exec.scenes.len(), 1);
        assert_eq!(exec.scenes[0].dest, Destination::Screen);
    }

    #[test]
    fn registry_first_chain_is_active() {
        let mut registry = ChainRegistry::new();
        let first = registry.register(PassChain::new());
        let second = registry.register(PassChain::new());
        assert_eq!(registry.active().unwrap().id(), first);

        registry.deregister(first).unwrap();
        assert_eq!(registry.active().unwrap().id(), second);
    }

    #[test]
    fn destroy_all_empties_registry() {
        let mut exec = RecordingExecutor::default();
        let mut registry = ChainRegistry::new();
        registry.register(PassChain::with_default_passes());
        registry
            .resize(&mut exec, ViewportSize::new(8, 8))
            .unwrap();

        registry.destroy_all(&mut exec);

        assert!(registry.is_empty());
        assert_eq!(exec.live_targets(), 0);
    }
}
