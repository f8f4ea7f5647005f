//! Splicing a single effect into the active chain, and undoing it.
//!
//! ```ignore
//! let mut switcher = PassSwitcher::new();
//! let token = switcher.switch_pass(&mut registry, &mut exec, Box::new(pass))?;
//! // ... frames render with the effect at the head of the active chain ...
//! switcher.switch_back(&mut registry, &mut exec, token)?;
//! ```
//!
//! Switches nest: each `switch_pass` pushes a record and `switch_back` must
//! release the most recent outstanding one.

use crate::chain::{ChainId, ChainRegistry, PassChain};
use crate::error::PassError;
use crate::executor::RenderExecutor;
use crate::pass::{PassId, PostPass};

/// Proof of an outstanding switch. Hand it back to
/// [`PassSwitcher::switch_back`] to undo the switch.
#[must_use = "dropping a switch token leaves the effect in the chain until unwind_all"]
#[derive(Debug, PartialEq, Eq)]
pub struct SwitchToken {
    serial: u64,
}

struct SwitchRecord {
    serial: u64,
    chain: ChainId,
    added: PassId,
    /// The head pass this switch displaced, if it used an existing chain.
    original: Option<Box<dyn PostPass>>,
    created_chain: bool,
}

/// Caller-owned stack of switch records.
#[derive(Default)]
pub struct PassSwitcher {
    records: Vec<SwitchRecord>,
    next_serial: u64,
}

impl PassSwitcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of switches not yet switched back.
    pub fn outstanding(&self) -> usize {
        self.records.len()
    }

    /// Puts `pass` at the head of the active chain.
    ///
    /// With an active chain, its current head is taken out and kept for
    /// [`switch_back`](Self::switch_back), and `pass` renders into the
    /// chain's buffers. Without one, a new chain holding only `pass` is
    /// registered and `pass` renders to the screen. If the chain already has a
    /// size, `pass` is sized before it is inserted; a sizing failure leaves
    /// the chain untouched.
    pub fn switch_pass(
        &mut self,
        registry: &mut ChainRegistry,
        exec: &mut dyn RenderExecutor,
        mut pass: Box<dyn PostPass>,
    ) -> Result<SwitchToken, PassError> {
        let added = pass.id();
        let serial = self.next_serial;

        let record = match registry.active_mut() {
            Some(chain) => {
                pass.state_mut().render_to_screen = false;
                if let Some(size) = chain.size() {
                    if let Err(err) = pass.update_size(exec, size) {
                        pass.destroy(exec);
                        return Err(err);
                    }
                }
                let original = chain.remove_head();
                chain.insert(0, pass);
                log::debug!(
                    "switched {:?} into chain {:?}, displacing {:?}",
                    added,
                    chain.id(),
                    original.as_ref().map(|p| p.id())
                );
                SwitchRecord {
                    serial,
                    chain: chain.id(),
                    added,
                    original,
                    created_chain: false,
                }
            }
            None => {
                pass.state_mut().render_to_screen = true;
                let mut chain = PassChain::new();
                chain.push(pass);
                let chain = registry.register(chain);
                log::debug!("switched {added:?} into new chain {chain:?}");
                SwitchRecord {
                    serial,
                    chain,
                    added,
                    original: None,
                    created_chain: true,
                }
            }
        };

        self.records.push(record);
        self.next_serial += 1;
        Ok(SwitchToken { serial })
    }

    /// Undoes the switch `token` stands for.
    ///
    /// A switch that created its chain destroys and deregisters it. Otherwise
    /// the added pass is cleaned up, destroyed and removed, and the displaced
    /// head is put back.
    ///
    /// Fails with [`PassError::ChainStateInconsistent`], changing nothing,
    /// when `token` is not the most recent outstanding switch or when the
    /// chain no longer has the added pass at its head. If resizing the
    /// displaced head fails, that error is returned and the switch stays
    /// outstanding; [`unwind_all`](Self::unwind_all) can retry it.
    pub fn switch_back(
        &mut self,
        registry: &mut ChainRegistry,
        exec: &mut dyn RenderExecutor,
        token: SwitchToken,
    ) -> Result<(), PassError> {
        let Some(record) = self.records.last() else {
            return Err(PassError::ChainStateInconsistent(
                "no switch is outstanding".into(),
            ));
        };
        if record.serial != token.serial {
            return Err(PassError::ChainStateInconsistent(format!(
                "switch {} released while switch {} is more recent",
                token.serial, record.serial
            )));
        }
        self.undo_top(registry, exec)
    }

    /// Switches back every outstanding switch, most recent first.
    pub fn unwind_all(
        &mut self,
        registry: &mut ChainRegistry,
        exec: &mut dyn RenderExecutor,
    ) -> Result<usize, PassError> {
        let mut count = 0;
        while !self.records.is_empty() {
            self.undo_top(registry, exec)?;
            count += 1;
        }
        Ok(count)
    }

    fn undo_top(
        &mut self,
        registry: &mut ChainRegistry,
        exec: &mut dyn RenderExecutor,
    ) -> Result<(), PassError> {
        let Some(record) = self.records.last() else {
            return Ok(());
        };
        let (chain_id, added) = (record.chain, record.added);
        let chain = registry.get(chain_id).ok_or_else(|| {
            PassError::ChainStateInconsistent(format!("chain {chain_id:?} is no longer registered"))
        })?;
        if chain.head_id() != Some(added) {
            return Err(PassError::ChainStateInconsistent(format!(
                "chain {chain_id:?} head is {:?}, expected {added:?}",
                chain.head_id()
            )));
        }
        let size = chain.size();

        // The displaced pass missed any resizes while it was out. Size it
        // while the record is still outstanding so a failure changes nothing.
        if let (Some(size), Some(original)) = (
            size,
            self.records
                .last_mut()
                .and_then(|record| record.original.as_mut()),
        ) {
            original.update_size(exec, size)?;
        }

        let Some(record) = self.records.pop() else {
            return Ok(());
        };

        if record.created_chain {
            if let Some(mut chain) = registry.deregister(record.chain) {
                chain.destroy(exec);
            }
            log::debug!("switched back: destroyed chain {:?}", record.chain);
            return Ok(());
        }

        let Some(chain) = registry.get_mut(record.chain) else {
            return Ok(());
        };
        if let Some(mut added) = chain.remove_head() {
            added.cleanup();
            added.destroy(exec);
        }
        if let Some(original) = record.original {
            chain.insert(0, original);
        }
        log::debug!(
            "switched back: removed {:?} from chain {:?}",
            record.added,
            record.chain
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::PassArgs;
    use crate::pass::{CopyPass, ScenePass};
    use crate::stereo::AnaglyphPass;
    use crate::target::ViewportSize;
    use crate::testing::{MockPass, RecordingExecutor};

    #[test]
    fn switch_into_empty_registry_creates_chain() {
        let mut exec = RecordingExecutor::default();
        let mut registry = ChainRegistry::new();
        let mut switcher = PassSwitcher::new();
        let pass = MockPass::boxed();
        let id = pass.id();

        let token = switcher.switch_pass(&mut registry, &mut exec, pass).unwrap();

        let chain = registry.active().unwrap();
        assert_eq!(chain.pass_ids(), vec![id]);
        assert!(chain.head().unwrap().state().render_to_screen);

        switcher.switch_back(&mut registry, &mut exec, token).unwrap();
        assert!(registry.is_empty());
        assert_eq!(switcher.outstanding(), 0);
    }

    #[test]
    fn switch_and_back_restores_existing_chain() {
        let mut exec = RecordingExecutor::default();
        let mut registry = ChainRegistry::new();
        registry.register(PassChain::with_default_passes());
        registry.resize(&mut exec, ViewportSize::new(32, 32)).unwrap();
        let before = registry.active().unwrap().pass_ids();
        let mut switcher = PassSwitcher::new();

        let pass = MockPass::boxed();
        let id = pass.id();
        let token = switcher.switch_pass(&mut registry, &mut exec, pass).unwrap();

        let chain = registry.active().unwrap();
        assert_eq!(chain.pass_ids(), vec![id, before[1]]);
        assert!(!chain.head().unwrap().state().render_to_screen);
        // Sized immediately from the chain's known size.
        assert_eq!(exec.sizes.last(), Some(&ViewportSize::new(32, 32)));

        switcher.switch_back(&mut registry, &mut exec, token).unwrap();

        assert_eq!(registry.active().unwrap().pass_ids(), before);
        // Chain buffers are the only live targets left.
        assert_eq!(exec.live_targets(), 2);
    }

    #[test]
    fn nested_switches_unwind_in_order() {
        let mut exec = RecordingExecutor::default();
        let mut registry = ChainRegistry::new();
        let mut switcher = PassSwitcher::new();
        let a = MockPass::boxed();
        let b = MockPass::boxed();
        let (ida, idb) = (a.id(), b.id());

        let ta = switcher.switch_pass(&mut registry, &mut exec, a).unwrap();
        let tb = switcher.switch_pass(&mut registry, &mut exec, b).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.active().unwrap().pass_ids(), vec![idb]);
        assert!(!registry.active().unwrap().head().unwrap().state().render_to_screen);

        switcher.switch_back(&mut registry, &mut exec, tb).unwrap();
        assert_eq!(registry.active().unwrap().pass_ids(), vec![ida]);
        // A created the chain, so it still presents.
        assert!(registry.active().unwrap().head().unwrap().state().render_to_screen);

        switcher.switch_back(&mut registry, &mut exec, ta).unwrap();
        assert!(registry.is_empty());
        assert_eq!(exec.live_targets(), 0);
    }

    #[test]
    fn out_of_order_release_fails_without_changes() {
        let mut exec = RecordingExecutor::default();
        let mut registry = ChainRegistry::new();
        registry.register(PassChain::with_default_passes());
        let mut switcher = PassSwitcher::new();

        let ta = switcher
            .switch_pass(&mut registry, &mut exec, MockPass::boxed())
            .unwrap();
        let tb = switcher
            .switch_pass(&mut registry, &mut exec, MockPass::boxed())
            .unwrap();
        let during = registry.active().unwrap().pass_ids();

        let err = switcher.switch_back(&mut registry, &mut exec, ta).unwrap_err();
        assert!(matches!(err, PassError::ChainStateInconsistent(_)));
        assert_eq!(registry.active().unwrap().pass_ids(), during);
        assert_eq!(switcher.outstanding(), 2);

        switcher.switch_back(&mut registry, &mut exec, tb).unwrap();
        assert_eq!(switcher.unwind_all(&mut registry, &mut exec).unwrap(), 1);
        assert_eq!(registry.active().unwrap().len(), 2);
    }

    #[test]
    fn tampered_chain_is_detected() {
        let mut exec = RecordingExecutor::default();
        let mut registry = ChainRegistry::new();
        registry.register(PassChain::with_default_passes());
        let mut switcher = PassSwitcher::new();

        let token = switcher
            .switch_pass(&mut registry, &mut exec, MockPass::boxed())
            .unwrap();
        registry
            .active_mut()
            .unwrap()
            .insert(0, Box::new(ScenePass::new()));
        let during = registry.active().unwrap().pass_ids();

        assert!(matches!(
            switcher.switch_back(&mut registry, &mut exec, token),
            Err(PassError::ChainStateInconsistent(_))
        ));
        assert_eq!(registry.active().unwrap().pass_ids(), during);
    }

    #[test]
    fn added_pass_is_cleaned_up_and_destroyed() {
        let mut exec = RecordingExecutor::default();
        let mut registry = ChainRegistry::new();
        registry.register(PassChain::with_default_passes());
        registry.resize(&mut exec, ViewportSize::new(8, 8)).unwrap();
        let mut switcher = PassSwitcher::new();

        let token = switcher
            .switch_pass(&mut registry, &mut exec, MockPass::boxed())
            .unwrap();
        let mock_target = *exec.created.last().unwrap();
        assert!(exec.is_live(mock_target));

        switcher.switch_back(&mut registry, &mut exec, token).unwrap();
        assert!(!exec.is_live(mock_target));
    }

    #[test]
    fn failed_sizing_leaves_chain_untouched() {
        let mut exec = RecordingExecutor::default();
        let mut registry = ChainRegistry::new();
        registry.register(PassChain::with_default_passes());
        registry.resize(&mut exec, ViewportSize::new(8, 8)).unwrap();
        let before = registry.active().unwrap().pass_ids();
        let mut switcher = PassSwitcher::new();
        exec.fail_create_at = Some(exec.created.len());

        let result = switcher.switch_pass(&mut registry, &mut exec, MockPass::boxed());

        assert!(matches!(result, Err(PassError::TargetAllocation { .. })));
        assert_eq!(registry.active().unwrap().pass_ids(), before);
        assert_eq!(switcher.outstanding(), 0);
    }

    #[test]
    fn nested_switches_over_default_chain_restore_each_order() {
        let mut exec = RecordingExecutor::default();
        let mut registry = ChainRegistry::new();
        registry.register(PassChain::with_default_passes());
        registry.resize(&mut exec, ViewportSize::new(16, 16)).unwrap();
        let before = registry.active().unwrap().pass_ids();
        let scene_to_screen = registry.active().unwrap().head().unwrap().state().render_to_screen;
        let mut switcher = PassSwitcher::new();

        let a = MockPass::boxed();
        let b = MockPass::boxed();
        let (ida, idb) = (a.id(), b.id());
        let ta = switcher.switch_pass(&mut registry, &mut exec, a).unwrap();
        let with_a = registry.active().unwrap().pass_ids();
        assert_eq!(with_a, vec![ida, before[1]]);

        let tb = switcher.switch_pass(&mut registry, &mut exec, b).unwrap();
        assert_eq!(registry.active().unwrap().pass_ids(), vec![idb, before[1]]);

        switcher.switch_back(&mut registry, &mut exec, tb).unwrap();
        assert_eq!(registry.active().unwrap().pass_ids(), with_a);
        assert!(!registry.active().unwrap().head().unwrap().state().render_to_screen);

        switcher.switch_back(&mut registry, &mut exec, ta).unwrap();
        let chain = registry.active().unwrap();
        assert_eq!(chain.pass_ids(), before);
        assert_eq!(chain.head().unwrap().state().render_to_screen, scene_to_screen);
        assert_eq!(exec.live_targets(), 2);
    }

    #[test]
    fn failed_restore_keeps_switch_outstanding() {
        let mut exec = RecordingExecutor::default();
        let mut chain = PassChain::new();
        chain.push(Box::new(AnaglyphPass::new(&PassArgs::new()).unwrap()));
        chain.push(Box::new(CopyPass::to_screen()));
        let mut registry = ChainRegistry::new();
        registry.register(chain);
        registry.resize(&mut exec, ViewportSize::new(8, 8)).unwrap();
        let before = registry.active().unwrap().pass_ids();
        let mut switcher = PassSwitcher::new();

        let token = switcher
            .switch_pass(&mut registry, &mut exec, MockPass::boxed())
            .unwrap();
        registry.resize(&mut exec, ViewportSize::new(16, 16)).unwrap();
        let during = registry.active().unwrap().pass_ids();
        exec.fail_create_at = Some(exec.created.len());

        let result = switcher.switch_back(&mut registry, &mut exec, token);

        assert!(matches!(result, Err(PassError::TargetAllocation { .. })));
        assert_eq!(registry.active().unwrap().pass_ids(), during);
        assert_eq!(switcher.outstanding(), 1);

        assert_eq!(switcher.unwind_all(&mut registry, &mut exec).unwrap(), 1);
        let chain = registry.active().unwrap();
        assert_eq!(chain.pass_ids(), before);
        // Two chain buffers plus the anaglyph eyes, all at the new size.
        assert_eq!(exec.live_targets(), 4);
    }
}
