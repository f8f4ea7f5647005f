//! Test doubles: an executor that records every call, and a minimal pass.

use std::collections::BTreeMap;

use crate::camera::Camera;
use crate::error::PassError;
use crate::executor::{Composite, Destination, RenderExecutor, SceneDraw, SceneMaterial};
use crate::params::PassArgs;
use crate::pass::{Frame, PassKind, PassState, PostPass};
use crate::target::{OwnedTargets, TargetId, ViewportSize};

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Create(TargetId),
    Destroy(TargetId),
    Scene(Destination),
    Composite(Destination),
}

#[derive(Clone, Debug)]
pub struct RecordedScene {
    pub camera: Camera,
    pub dest: Destination,
    pub clear: bool,
    pub material: SceneMaterial,
}

/// Executor that validates handles and records every call.
#[derive(Debug)]
pub struct RecordingExecutor {
    next_id: u64,
    live: BTreeMap<TargetId, ViewportSize>,
    pub screen: ViewportSize,
    pub created: Vec<TargetId>,
    pub destroyed: Vec<TargetId>,
    pub sizes: Vec<ViewportSize>,
    pub labels: Vec<String>,
    pub events: Vec<Event>,
    pub scenes: Vec<RecordedScene>,
    pub composites: Vec<(Composite, Destination, bool)>,
    /// Fail the create call with this zero-based index.
    pub fail_create_at: Option<usize>,
}

impl Default for RecordingExecutor {
    fn default() -> Self {
        Self {
            next_id: 1,
            live: BTreeMap::new(),
            screen: ViewportSize::new(64, 64),
            created: Vec::new(),
            destroyed: Vec::new(),
            sizes: Vec::new(),
            labels: Vec::new(),
            events: Vec::new(),
            scenes: Vec::new(),
            composites: Vec::new(),
            fail_create_at: None,
        }
    }
}

impl RecordingExecutor {
    pub fn live_targets(&self) -> usize {
        self.live.len()
    }

    pub fn is_live(&self, id: TargetId) -> bool {
        self.live.contains_key(&id)
    }

    pub fn size_of(&self, id: TargetId) -> Option<ViewportSize> {
        self.live.get(&id).copied()
    }

    pub fn event_index_of_create(&self, id: TargetId) -> usize {
        self.position(&Event::Create(id))
    }

    pub fn event_index_of_destroy(&self, id: TargetId) -> usize {
        self.position(&Event::Destroy(id))
    }

    fn position(&self, event: &Event) -> usize {
        self.events
            .iter()
            .position(|e| e == event)
            .unwrap_or_else(|| panic!("event {event:?} was never recorded"))
    }

    fn check_dest(&self, dest: Destination) -> Result<(), PassError> {
        match dest {
            Destination::Screen => Ok(()),
            Destination::Target(id) if self.live.contains_key(&id) => Ok(()),
            Destination::Target(id) => Err(PassError::UnknownTarget(id)),
        }
    }
}

impl RenderExecutor for RecordingExecutor {
    fn create_target(&mut self, label: &str, size: ViewportSize) -> Result<TargetId, PassError> {
        if size.is_empty() || self.fail_create_at == Some(self.created.len()) {
            self.fail_create_at = None;
            return Err(PassError::TargetAllocation {
                label: label.to_string(),
                width: size.width,
                height: size.height,
            });
        }
        let id = TargetId(self.next_id);
        self.next_id += 1;
        self.live.insert(id, size);
        self.created.push(id);
        self.sizes.push(size);
        self.labels.push(label.to_string());
        self.events.push(Event::Create(id));
        Ok(id)
    }

    fn destroy_target(&mut self, id: TargetId) -> Result<(), PassError> {
        self.live.remove(&id).ok_or(PassError::UnknownTarget(id))?;
        self.destroyed.push(id);
        self.events.push(Event::Destroy(id));
        Ok(())
    }

    fn render_scene(&mut self, draw: &SceneDraw<'_>) -> Result<(), PassError> {
        self.check_dest(draw.dest)?;
        self.scenes.push(RecordedScene {
            camera: *draw.camera,
            dest: draw.dest,
            clear: draw.clear,
            material: draw.material,
        });
        self.events.push(Event::Scene(draw.dest));
        Ok(())
    }

    fn render_composite(
        &mut self,
        composite: &Composite,
        dest: Destination,
        clear: bool,
    ) -> Result<(), PassError> {
        self.check_dest(dest)?;
        for input in composite.inputs() {
            if !self.live.contains_key(&input) {
                return Err(PassError::UnknownTarget(input));
            }
        }
        self.composites.push((*composite, dest, clear));
        self.events.push(Event::Composite(dest));
        Ok(())
    }

    fn screen_size(&self) -> ViewportSize {
        self.screen
    }
}

const MOCK_LABELS: &[&str] = &["Mock Target"];

/// A pass owning one target that records how often it was driven.
pub struct MockPass {
    state: PassState,
    targets: OwnedTargets,
    pub renders: usize,
    pub resizes: usize,
    pub cleanups: usize,
}

impl MockPass {
    pub fn new() -> Self {
        Self {
            state: PassState::new(true),
            targets: OwnedTargets::new(MOCK_LABELS),
            renders: 0,
            resizes: 0,
            cleanups: 0,
        }
    }

    pub fn boxed() -> Box<dyn PostPass> {
        Box::new(Self::new())
    }

    pub fn target(&self) -> Option<TargetId> {
        self.targets.get(0)
    }
}

impl PostPass for MockPass {
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
        frame: &Frame<'_>,
        write: TargetId,
        read: TargetId,
    ) -> Result<(), PassError> {
        if frame.active_camera().is_none() {
            return Ok(());
        }
        self.renders += 1;
        exec.render_composite(
            &Composite::Copy { source: read },
            self.state.destination(write),
            self.state.clear,
        )
    }

    fn update_size(
        &mut self,
        exec: &mut dyn RenderExecutor,
        size: ViewportSize,
    ) -> Result<(), PassError> {
        if self.targets.ensure_size(exec, size)? {
            self.resizes += 1;
        }
        Ok(())
    }

    fn destroy(&mut self, exec: &mut dyn RenderExecutor) {
        self.targets.release(exec);
    }

    fn setup(&mut self, _args: &PassArgs) -> Result<(), PassError> {
        Ok(())
    }

    fn cleanup(&mut self) {
        self.cleanups += 1;
    }
}
