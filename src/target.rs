//! Offscreen target handles and per-pass target ownership.
//!
//! Targets are opaque handles minted by a [`RenderExecutor`]. A pass that needs
//! intermediate images keeps them in an [`OwnedTargets`] set, which enforces the
//! lifecycle rules every pass shares:
//!
//! - targets are sized from the viewport, optionally scaled by a fixed factor
//! - resizing to the size already held allocates nothing
//! - stale targets are destroyed before their replacements are created
//! - releasing is idempotent

use crate::error::PassError;
use crate::executor::RenderExecutor;

/// A viewport or target extent in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl ViewportSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height. Zero-height viewports report an aspect of 1.
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Scales each axis independently, rounding to the nearest pixel and never
    /// going below one pixel.
    pub fn scaled(&self, scale: [f32; 2]) -> Self {
        Self {
            width: ((self.width as f32 * scale[0]).round() as u32).max(1),
            height: ((self.height as f32 * scale[1]).round() as u32).max(1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Opaque handle to an offscreen target owned by an executor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub(crate) u64);

/// A fixed set of offscreen targets owned by one pass (or chain).
///
/// Every target in the set shares one extent: the requested viewport size
/// multiplied by `scale`. The set remembers the *requested* size so that
/// [`ensure_size`](Self::ensure_size) can tell a real resize from a repeat.
pub struct OwnedTargets {
    labels: &'static [&'static str],
    scale: [f32; 2],
    ids: Vec<TargetId>,
    requested: Option<ViewportSize>,
}

impl OwnedTargets {
    /// Creates an empty set. Nothing is allocated until the first resize.
    pub fn new(labels: &'static [&'static str]) -> Self {
        Self::with_scale(labels, [1.0, 1.0])
    }

    /// Creates an empty set whose targets are `scale` times the requested size.
    pub fn with_scale(labels: &'static [&'static str], scale: [f32; 2]) -> Self {
        Self {
            labels,
            scale,
            ids: Vec::with_capacity(labels.len()),
            requested: None,
        }
    }

    /// Makes sure the set holds targets for `size`.
    ///
    /// Returns `Ok(false)` without touching the executor when the set already
    /// holds targets for exactly this size. Otherwise every existing target is
    /// destroyed first, then the full set is recreated, and `Ok(true)` is
    /// returned.
    pub fn ensure_size(
        &mut self,
        exec: &mut dyn RenderExecutor,
        size: ViewportSize,
    ) -> Result<bool, PassError> {
        if self.requested == Some(size) && self.is_allocated() {
            return Ok(false);
        }

        self.release(exec);

        let extent = size.scaled(self.scale);
        for label in self.labels {
            match exec.create_target(label, extent) {
                Ok(id) => self.ids.push(id),
                Err(err) => {
                    // Leave nothing half-built behind.
                    self.release(exec);
                    return Err(err);
                }
            }
        }

        log::debug!(
            "allocated {} target(s) at {}x{} for viewport {}x{}",
            self.ids.len(),
            extent.width,
            extent.height,
            size.width,
            size.height
        );
        self.requested = Some(size);
        Ok(true)
    }

    /// Destroys every target in the set. Safe to call any number of times.
    pub fn release(&mut self, exec: &mut dyn RenderExecutor) {
        for id in self.ids.drain(..) {
            if let Err(err) = exec.destroy_target(id) {
                log::warn!("failed to destroy target {id:?}: {err}");
            }
        }
        self.requested = None;
    }

    /// Returns the target at `index` (in label order), if allocated.
    pub fn get(&self, index: usize) -> Option<TargetId> {
        self.ids.get(index).copied()
    }

    /// Returns the first two targets, the common case for paired captures.
    pub fn pair(&self) -> Option<(TargetId, TargetId)> {
        Some((self.get(0)?, self.get(1)?))
    }

    pub fn is_allocated(&self) -> bool {
        !self.labels.is_empty() && self.ids.len() == self.labels.len()
    }

    /// The viewport size the set was last allocated for.
    pub fn requested_size(&self) -> Option<ViewportSize> {
        self.requested
    }

    /// The actual pixel extent of each target, if allocated.
    pub fn extent(&self) -> Option<ViewportSize> {
        self.requested.map(|size| size.scaled(self.scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingExecutor;

    const LABELS: &[&str] = &["A", "B"];

    #[test]
    fn scaled_rounds_and_clamps() {
        let size = ViewportSize::new(1280, 800);
        assert_eq!(size.scaled([0.9, 1.8]), ViewportSize::new(1152, 1440));
        assert_eq!(
            ViewportSize::new(1, 1).scaled([0.1, 0.1]),
            ViewportSize::new(1, 1)
        );
    }

    #[test]
    fn ensure_size_is_idempotent() {
        let mut exec = RecordingExecutor::default();
        let mut targets = OwnedTargets::new(LABELS);

        assert!(targets.ensure_size(&mut exec, ViewportSize::new(64, 32)).unwrap());
        assert!(!targets.ensure_size(&mut exec, ViewportSize::new(64, 32)).unwrap());

        assert_eq!(exec.created.len(), 2);
        assert!(exec.destroyed.is_empty());
    }

    #[test]
    fn resize_destroys_before_creating() {
        let mut exec = RecordingExecutor::default();
        let mut targets = OwnedTargets::new(LABELS);
        targets
            .ensure_size(&mut exec, ViewportSize::new(64, 32))
            .unwrap();
        let old = targets.pair().unwrap();

        targets
            .ensure_size(&mut exec, ViewportSize::new(128, 64))
            .unwrap();

        assert_eq!(exec.destroyed, vec![old.0, old.1]);
        assert_eq!(exec.live_targets(), 2);
        // Destruction of the old pair was recorded before the new pair existed.
        let first_new = exec.created[2];
        assert!(exec.event_index_of_destroy(old.1) < exec.event_index_of_create(first_new));
    }

    #[test]
    fn release_is_idempotent() {
        let mut exec = RecordingExecutor::default();
        let mut targets = OwnedTargets::new(LABELS);
        targets
            .ensure_size(&mut exec, ViewportSize::new(8, 8))
            .unwrap();

        targets.release(&mut exec);
        targets.release(&mut exec);

        assert_eq!(exec.destroyed.len(), 2);
        assert!(!targets.is_allocated());
        assert_eq!(targets.requested_size(), None);
    }

    #[test]
    fn extent_applies_scale() {
        let mut exec = RecordingExecutor::default();
        let mut targets = OwnedTargets::with_scale(LABELS, [0.5, 2.0]);
        targets
            .ensure_size(&mut exec, ViewportSize::new(100, 50))
            .unwrap();
        assert_eq!(targets.extent(), Some(ViewportSize::new(50, 100)));
        assert_eq!(exec.sizes[0], ViewportSize::new(50, 100));
    }
}
