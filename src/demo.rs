//! Scene and effect presets shared by the windowed and headless demos.

use std::path::Path;

use glam::Vec3;

use crate::dof::DofPass;
use crate::draw_list::{DrawList, Drawable, Light};
use crate::error::PassError;
use crate::executor::RenderExecutor;
use crate::params::{ParamValue, PassArgs};
use crate::pass::PostPass;
use crate::stereo::{AnaglyphPass, HmdConfig, LensPass};

/// An effect the demos can switch in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    Anaglyph,
    Lens,
    DepthOfField,
}

impl Effect {
    pub const ALL: [Effect; 3] = [Effect::Anaglyph, Effect::Lens, Effect::DepthOfField];

    /// Short name, used for output file names and the window title.
    pub fn name(self) -> &'static str {
        match self {
            Effect::Anaglyph => "anaglyph",
            Effect::Lens => "lens",
            Effect::DepthOfField => "dof",
        }
    }

    /// Builds the pass. The lens pass takes its optics from `hmd` when given.
    pub fn build(
        self,
        exec: &mut dyn RenderExecutor,
        hmd: Option<&HmdConfig>,
    ) -> Result<Box<dyn PostPass>, PassError> {
        match self {
            Effect::Anaglyph => Ok(Box::new(AnaglyphPass::new(&PassArgs::new())?)),
            Effect::Lens => {
                let mut pass = LensPass::new(&PassArgs::new())?;
                if let Some(config) = hmd {
                    if let Err(err) = pass.apply_device(exec, config) {
                        pass.destroy(exec);
                        return Err(err);
                    }
                }
                Ok(Box::new(pass))
            }
            Effect::DepthOfField => {
                let args = PassArgs::new()
                    .with("focalDistance", ParamValue::Float(5.0))
                    .with("fStop", ParamValue::Float(2.8))
                    .with("vignetting", ParamValue::Bool(true));
                Ok(Box::new(DofPass::new(&args)?))
            }
        }
    }
}

/// A lit ball in front of a floor, flanked by a cube and a distant ball so
/// both stereo depth and defocus are visible.
pub fn demo_scene() -> DrawList {
    [
        Drawable::sphere(Vec3::ZERO, 1.0).color(0.9, 0.3, 0.25),
        Drawable::cuboid(Vec3::new(-2.5, -0.25, -1.5), Vec3::splat(0.75)).color(0.3, 0.8, 0.35),
        Drawable::sphere(Vec3::new(2.0, 0.5, -6.0), 1.5).color(0.3, 0.45, 0.9),
        Drawable::cuboid(Vec3::new(0.0, -1.25, -2.0), Vec3::new(8.0, 0.25, 8.0))
            .color(0.6, 0.6, 0.6),
    ]
    .into_iter()
    .collect()
}

pub fn demo_lights() -> Vec<Light> {
    vec![
        Light::directional(Vec3::new(0.5, 1.0, 0.8), [1.0, 0.97, 0.9], 0.9),
        Light::directional(Vec3::new(-1.0, 0.3, -0.5), [0.4, 0.5, 0.7], 0.4),
    ]
}

/// Reads and validates an HMD description from a JSON file.
pub fn load_hmd(path: &Path) -> Result<HmdConfig, PassError> {
    let source = std::fs::read_to_string(path)?;
    let config = HmdConfig::from_json(&source)?;
    log::info!("loaded HMD description from {}", path.display());
    Ok(config)
}
