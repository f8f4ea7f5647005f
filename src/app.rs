//! Windowed demo: the demo scene on the GPU, with effects switched in and out
//! from the keyboard.
//!
//! | Key            | Action                                   |
//! |----------------|------------------------------------------|
//! | `1` `2` `3`    | switch in anaglyph, lens, depth of field |
//! | `Backspace`    | switch back the most recent effect       |
//! | `Escape`       | switch back every effect                 |
//! | Arrow keys     | orbit the camera                         |
//! | `=` / `-`      | zoom in / out                            |
//! | `Space`        | pause or resume the camera drift         |

use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::chain::{ChainRegistry, PassChain};
use crate::demo::{Effect, demo_lights, demo_scene};
use crate::draw_list::{DrawList, Light};
use crate::error::PassError;
use crate::gpu::GpuContext;
use crate::orbit_camera::OrbitCamera;
use crate::pass::Frame;
use crate::stereo::HmdConfig;
use crate::switcher::{PassSwitcher, SwitchToken};
use crate::wgpu_executor::WgpuExecutor;

const NUDGE: f32 = 0.05;
const ZOOM_STEP: f32 = 0.5;

/// Window and device settings for [`run`].
#[derive(Clone, Debug)]
pub struct DemoOptions {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Optics for the lens effect. Without one the lens pass keeps its defaults.
    pub hmd: Option<HmdConfig>,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            title: "lensfx".to_string(),
            width: 1280,
            height: 800,
            hmd: None,
        }
    }
}

impl DemoOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn hmd(mut self, hmd: HmdConfig) -> Self {
        self.hmd = Some(hmd);
        self
    }
}

/// Opens a window and runs the demo until it is closed.
///
/// # Errors
///
/// Window, surface and device creation failures, and any error a frame
/// render returns. Effect switches that fail are logged and skipped.
pub fn run(options: DemoOptions) -> Result<(), PassError> {
    let event_loop = EventLoop::new().map_err(|e| PassError::Window(e.to_string()))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = DemoApp {
        options,
        running: None,
        error: None,
    };
    event_loop
        .run_app(&mut app)
        .map_err(|e| PassError::Window(e.to_string()))?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct DemoApp {
    options: DemoOptions,
    running: Option<Running>,
    /// First fatal error; returned from [`run`] once the loop exits.
    error: Option<PassError>,
}

struct Running {
    window: Arc<Window>,
    exec: WgpuExecutor,
    registry: ChainRegistry,
    switcher: PassSwitcher,
    /// Outstanding switches, oldest first.
    active: Vec<(Effect, SwitchToken)>,
    hmd: Option<HmdConfig>,
    orbit: OrbitCamera,
    drifting: bool,
    draw_list: DrawList,
    lights: Vec<Light>,
    last_frame: Instant,
    base_title: String,
}

impl Running {
    fn start(event_loop: &ActiveEventLoop, options: &DemoOptions) -> Result<Self, PassError> {
        let attrs = WindowAttributes::default()
            .with_title(&options.title)
            .with_inner_size(winit::dpi::LogicalSize::new(options.width, options.height));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .map_err(|e| PassError::Window(e.to_string()))?,
        );

        let gpu = GpuContext::new(window.clone())?;
        let mut exec = WgpuExecutor::new(gpu);
        exec.clear_color = [0.05, 0.05, 0.08, 1.0];

        let mut registry = ChainRegistry::new();
        registry.register(PassChain::with_default_passes());

        Ok(Self {
            window,
            exec,
            registry,
            switcher: PassSwitcher::new(),
            active: Vec::new(),
            hmd: options.hmd.clone(),
            orbit: OrbitCamera::new().distance(7.0),
            drifting: true,
            draw_list: demo_scene(),
            lights: demo_lights(),
            last_frame: Instant::now(),
            base_title: options.title.clone(),
        })
    }

    fn push(&mut self, effect: Effect) -> Result<(), PassError> {
        let pass = effect.build(&mut self.exec, self.hmd.as_ref())?;
        let token = self
            .switcher
            .switch_pass(&mut self.registry, &mut self.exec, pass)?;
        self.active.push((effect, token));
        log::info!("switched in {}", effect.name());
        Ok(())
    }

    fn pop(&mut self) -> Result<(), PassError> {
        let Some((effect, token)) = self.active.pop() else {
            return Ok(());
        };
        self.switcher
            .switch_back(&mut self.registry, &mut self.exec, token)?;
        log::info!("switched back {}", effect.name());
        Ok(())
    }

    fn unwind(&mut self) -> Result<(), PassError> {
        let count = self
            .switcher
            .unwind_all(&mut self.registry, &mut self.exec)?;
        self.active.clear();
        if count > 0 {
            log::info!("switched back {count} effects");
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode) {
        let result = match key {
            KeyCode::Digit1 => self.push(Effect::Anaglyph),
            KeyCode::Digit2 => self.push(Effect::Lens),
            KeyCode::Digit3 => self.push(Effect::DepthOfField),
            KeyCode::Backspace => self.pop(),
            KeyCode::Escape => self.unwind(),
            _ => {
                self.steer(key);
                return;
            }
        };
        if let Err(err) = result {
            log::error!("{key:?}: {err}");
        }
        let effects: Vec<Effect> = self.active.iter().map(|(effect, _)| *effect).collect();
        self.window
            .set_title(&window_title(&self.base_title, &effects));
    }

    fn steer(&mut self, key: KeyCode) {
        match key {
            KeyCode::ArrowLeft => self.orbit.nudge(-NUDGE, 0.0),
            KeyCode::ArrowRight => self.orbit.nudge(NUDGE, 0.0),
            KeyCode::ArrowUp => self.orbit.nudge(0.0, NUDGE),
            KeyCode::ArrowDown => self.orbit.nudge(0.0, -NUDGE),
            KeyCode::Equal => self.orbit.zoom(ZOOM_STEP),
            KeyCode::Minus => self.orbit.zoom(-ZOOM_STEP),
            KeyCode::Space => self.drifting = !self.drifting,
            _ => {}
        }
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), PassError> {
        self.exec.resize(width, height);
        let size = self.exec.gpu().size();
        self.registry.resize(&mut self.exec, size)
    }

    fn redraw(&mut self) -> Result<(), PassError> {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        if self.drifting {
            self.orbit.advance(dt);
        }

        if !self.exec.begin_frame()? {
            return Ok(());
        }
        let camera = self.orbit.camera();
        let frame = Frame::new(&self.draw_list, &self.lights, self.exec.gpu().size())
            .with_main_camera(&camera);
        let result = self.registry.render(&mut self.exec, &frame);
        self.exec.end_frame();
        result
    }

    fn shutdown(&mut self) {
        if let Err(err) = self.unwind() {
            log::warn!("switching back on exit: {err}");
        }
        self.registry.destroy_all(&mut self.exec);
        log::debug!("{} targets left at exit", self.exec.live_targets());
    }
}

fn window_title(base: &str, effects: &[Effect]) -> String {
    if effects.is_empty() {
        return format!("{base} | none");
    }
    let names: Vec<&str> = effects.iter().map(|effect| effect.name()).collect();
    format!("{base} | {}", names.join(" > "))
}

impl DemoApp {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: PassError) {
        log::error!("{err}");
        self.error.get_or_insert(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for DemoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }
        match Running::start(event_loop, &self.options) {
            Ok(running) => {
                running
                    .window
                    .set_title(&window_title(&running.base_title, &[]));
                running.window.request_redraw();
                self.running = Some(running);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(running) = self.running.as_mut() else {
            return;
        };

        let result = match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
                Ok(())
            }
            WindowEvent::Resized(size) => running.resize(size.width, size.height),
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    if event.state == ElementState::Pressed && !event.repeat {
                        running.handle_key(key);
                    }
                }
                Ok(())
            }
            WindowEvent::RedrawRequested => {
                let result = running.redraw();
                running.window.request_redraw();
                result
            }
            _ => Ok(()),
        };

        if let Err(err) = result {
            self.fail(event_loop, err);
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(running) = self.running.as_mut() {
            running.shutdown();
        }
    }
}
