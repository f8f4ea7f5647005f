//! Offscreen rendering of every effect to PNG files.
//!
//! Runs the same switch sequence the windowed demo does, on the
//! [`SoftwareExecutor`], so it works on machines without a GPU.

use std::path::{Path, PathBuf};

use crate::chain::{ChainRegistry, PassChain};
use crate::demo::{Effect, demo_lights, demo_scene};
use crate::error::PassError;
use crate::orbit_camera::OrbitCamera;
use crate::pass::Frame;
use crate::software::SoftwareExecutor;
use crate::stereo::HmdConfig;
use crate::switcher::PassSwitcher;
use crate::target::ViewportSize;

pub const HEADLESS_SIZE: ViewportSize = ViewportSize::new(640, 400);

/// Renders the plain scene and then each effect into `dir`, one PNG each.
///
/// Returns the written paths in render order: `none.png` first, then one
/// file per [`Effect`] named after it.
pub fn render_headless(
    dir: &Path,
    hmd: Option<&HmdConfig>,
    size: ViewportSize,
) -> Result<Vec<PathBuf>, PassError> {
    let mut exec = SoftwareExecutor::new(size);
    let written = render_effects(&mut exec, dir, hmd, size)?;
    let stats = exec.stats();
    log::info!(
        "headless run done: {} images, {} scene draws, {} composites",
        written.len(),
        stats.scene_draws,
        stats.composite_draws
    );
    Ok(written)
}

fn render_effects(
    exec: &mut SoftwareExecutor,
    dir: &Path,
    hmd: Option<&HmdConfig>,
    size: ViewportSize,
) -> Result<Vec<PathBuf>, PassError> {
    std::fs::create_dir_all(dir)?;

    let draw_list = demo_scene();
    let lights = demo_lights();
    let camera = OrbitCamera::new().distance(7.0).camera();
    let frame = Frame::new(&draw_list, &lights, size).with_main_camera(&camera);

    let mut registry = ChainRegistry::new();
    registry.register(PassChain::with_default_passes());
    let mut switcher = PassSwitcher::new();

    let result = run_switches(exec, &mut registry, &mut switcher, &frame, dir, hmd);
    if result.is_err() {
        if let Err(err) = switcher.unwind_all(&mut registry, exec) {
            log::warn!("unwinding after a failed headless run: {err}");
        }
    }
    registry.destroy_all(exec);
    result
}

fn run_switches(
    exec: &mut SoftwareExecutor,
    registry: &mut ChainRegistry,
    switcher: &mut PassSwitcher,
    frame: &Frame<'_>,
    dir: &Path,
    hmd: Option<&HmdConfig>,
) -> Result<Vec<PathBuf>, PassError> {
    let mut written = Vec::with_capacity(Effect::ALL.len() + 1);

    registry.render(exec, frame)?;
    let path = dir.join("none.png");
    exec.screen().save_png(&path)?;
    written.push(path);

    for effect in Effect::ALL {
        let pass = effect.build(exec, hmd)?;
        let token = switcher.switch_pass(registry, exec, pass)?;
        registry.render(exec, frame)?;
        let path = dir.join(format!("{}.png", effect.name()));
        exec.screen().save_png(&path)?;
        written.push(path);
        switcher.switch_back(registry, exec, token)?;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("lensfx-{name}-{}", std::process::id()))
    }

    #[test]
    fn writes_one_image_per_effect_without_leaking() {
        let dir = scratch_dir("headless");
        let size = ViewportSize::new(48, 32);
        let mut exec = SoftwareExecutor::new(size);

        let written = render_effects(&mut exec, &dir, None, size).unwrap();

        let names: Vec<_> = written
            .iter()
            .filter_map(|p| p.file_name()?.to_str().map(str::to_owned))
            .collect();
        assert_eq!(names, ["none.png", "anaglyph.png", "lens.png", "dof.png"]);
        assert!(written.iter().all(|p| p.is_file()));
        assert_eq!(exec.stats().live_targets(), 0);

        let decoded = image::open(&written[0]).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (48, 32));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn hmd_lens_renders_at_screen_size() {
        let dir = scratch_dir("headless-hmd");
        let written = render_headless(&dir, Some(&HmdConfig::dk1()), ViewportSize::new(40, 25));
        let written = written.unwrap();
        let lens = image::open(&written[2]).unwrap();
        assert_eq!((lens.width(), lens.height()), (40, 25));
        std::fs::remove_dir_all(&dir).ok();
    }
}
