//! # lensfx
//!
//! **Stereo and depth-of-field post-processing over a switchable pass chain.**
//!
//! A [`PassChain`] runs an ordered list of [`PostPass`]es each frame,
//! ping-ponging between two offscreen buffers. Three effects plug into it:
//!
//! - [`AnaglyphPass`] renders the scene once per eye and mixes the two
//!   images into red/cyan (or any two-color) anaglyph stereo.
//! - [`LensPass`] renders side-by-side eyes and barrel-warps them for a
//!   head-mounted display, with per-channel chromatic aberration.
//! - [`DofPass`] renders scene depth and per-pixel blur into packed colors,
//!   then gathers a bokeh-style defocus from it.
//!
//! [`PassSwitcher`] temporarily puts one of those at the head of the active
//! chain and later restores what it displaced.
//!
//! Passes only talk to a [`RenderExecutor`]. [`WgpuExecutor`] draws on the
//! GPU; [`SoftwareExecutor`] runs the same materials on the CPU for
//! headless output and image tests.
//!
//! ## Quick Start
//!
//! ```no_run
//! use lensfx::*;
//!
//! fn main() -> Result<(), PassError> {
//!     let size = ViewportSize::new(320, 200);
//!     let mut exec = SoftwareExecutor::new(size);
//!     let mut registry = ChainRegistry::new();
//!     registry.register(PassChain::with_default_passes());
//!
//!     let scene = demo_scene();
//!     let lights = demo_lights();
//!     let camera = OrbitCamera::new().camera();
//!     let frame = Frame::new(&scene, &lights, size).with_main_camera(&camera);
//!
//!     let mut switcher = PassSwitcher::new();
//!     let pass = AnaglyphPass::new(&PassArgs::new())?;
//!     let token = switcher.switch_pass(&mut registry, &mut exec, Box::new(pass))?;
//!     registry.render(&mut exec, &frame)?;
//!     exec.screen().save_png("anaglyph.png")?;
//!
//!     switcher.switch_back(&mut registry, &mut exec, token)?;
//!     registry.destroy_all(&mut exec);
//!     Ok(())
//! }
//! ```

mod app;
mod camera;
mod chain;
mod demo;
pub mod dof;
mod draw_list;
mod error;
mod executor;
mod gpu;
mod headless;
mod mesh;
mod orbit_camera;
mod params;
mod pass;
pub mod software;
pub mod stereo;
mod switcher;
mod target;
mod wgpu_executor;

#[cfg(test)]
mod testing;

pub use app::{DemoOptions, run};
pub use camera::Camera;
pub use chain::{ChainId, ChainRegistry, PassChain};
pub use demo::{Effect, demo_lights, demo_scene, load_hmd};
pub use dof::{BokehUniforms, DepthBlurUniforms, DofPass};
pub use draw_list::{DrawList, Drawable, Light, Shape};
pub use error::PassError;
pub use executor::{Composite, Destination, RenderExecutor, SceneDraw, SceneMaterial};
pub use gpu::GpuContext;
pub use headless::{HEADLESS_SIZE, render_headless};
pub use mesh::{MeshData, Vertex3d};
pub use orbit_camera::OrbitCamera;
pub use params::{ControlHint, ParamSpec, ParamType, ParamValue, PassArgs};
pub use pass::{CopyPass, Frame, PassId, PassKind, PassState, PostPass, ScenePass};
pub use software::{Image, Sampler2d, SoftwareExecutor};
pub use stereo::{AnaglyphPass, AnaglyphUniforms, HmdConfig, LensPass, LensUniforms};
pub use switcher::{PassSwitcher, SwitchToken};
pub use target::{OwnedTargets, TargetId, ViewportSize};
pub use wgpu_executor::{TARGET_FORMAT, WgpuExecutor};

// Re-export glam types for convenience
pub use glam::{Mat4, Vec2, Vec3, Vec4};
