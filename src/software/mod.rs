//! CPU reference executor.
//!
//! [`SoftwareExecutor`] renders draw lists by ray casting their analytic
//! shapes and runs every compositing material through the same per-pixel
//! functions the WGSL shaders mirror. It needs no GPU, which makes it the
//! executor for headless rendering and for image-level tests.

mod raster;
mod raycast;

pub use raster::{Image, Sampler2d};
pub use raycast::{Hit, intersect, nearest};

use std::collections::HashMap;

use glam::Vec4;

use crate::dof::bokeh_pixel;
use crate::draw_list::shade;
use crate::error::PassError;
use crate::executor::{Composite, Destination, RenderExecutor, SceneDraw, SceneMaterial};
use crate::stereo::{anaglyph_pixel, lens_pixel};
use crate::target::{TargetId, ViewportSize};

/// Allocation and draw counters, for leak checks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecutorStats {
    pub targets_created: usize,
    pub targets_destroyed: usize,
    pub scene_draws: usize,
    pub composite_draws: usize,
}

impl ExecutorStats {
    pub fn live_targets(&self) -> usize {
        self.targets_created - self.targets_destroyed
    }
}

pub struct SoftwareExecutor {
    screen: Image,
    targets: HashMap<TargetId, Image>,
    next_id: u64,
    stats: ExecutorStats,
    /// Color standard draws and composites clear to.
    pub clear_color: [f32; 4],
}

impl SoftwareExecutor {
    pub fn new(screen: ViewportSize) -> Self {
        let clear_color = [0.0, 0.0, 0.0, 1.0];
        Self {
            screen: Image::new(screen, clear_color),
            targets: HashMap::new(),
            next_id: 1,
            stats: ExecutorStats::default(),
            clear_color,
        }
    }

    pub fn screen(&self) -> &Image {
        &self.screen
    }

    pub fn target(&self, id: TargetId) -> Option<&Image> {
        self.targets.get(&id)
    }

    pub fn stats(&self) -> ExecutorStats {
        self.stats
    }

    /// Replaces the screen image with a cleared one of `size`.
    pub fn resize_screen(&mut self, size: ViewportSize) {
        self.screen = Image::new(size, self.clear_color);
    }

    fn take(&mut self, dest: Destination) -> Result<Image, PassError> {
        match dest {
            Destination::Screen => Ok(std::mem::replace(
                &mut self.screen,
                Image::new(ViewportSize::new(0, 0), [0.0; 4]),
            )),
            Destination::Target(id) => self
                .targets
                .remove(&id)
                .ok_or(PassError::UnknownTarget(id)),
        }
    }

    fn restore(&mut self, dest: Destination, image: Image) {
        match dest {
            Destination::Screen => self.screen = image,
            Destination::Target(id) => {
                self.targets.insert(id, image);
            }
        }
    }

    fn input(&self, id: TargetId) -> Result<&Image, PassError> {
        self.targets.get(&id).ok_or(PassError::UnknownTarget(id))
    }

    fn draw_scene(&self, draw: &SceneDraw<'_>, image: &mut Image) {
        let aspect = image.size().aspect();
        let camera = draw.camera;
        let background = match draw.material {
            SceneMaterial::Standard => self.clear_color,
            SceneMaterial::DepthBlur(uniforms) => uniforms.background_texel(),
        };
        if draw.clear {
            image.fill(background);
        }

        for y in 0..image.height() {
            for x in 0..image.width() {
                let (origin, dir) = camera.ray(image.uv(x, y), aspect);
                let Some((hit, drawable)) =
                    nearest(origin, dir, draw.draw_list.iter(), camera.near)
                else {
                    continue;
                };
                let depth = camera.view_depth(hit.point);
                if depth < camera.near || depth > camera.far {
                    continue;
                }
                let color = match draw.material {
                    SceneMaterial::Standard => {
                        Vec4::from(shade(drawable.color, hit.normal, draw.lights))
                    }
                    SceneMaterial::DepthBlur(uniforms) => Vec4::from(uniforms.texel(depth)),
                };
                image.put(x, y, color);
            }
        }
    }

    fn draw_composite(
        &self,
        composite: &Composite,
        image: &mut Image,
    ) -> Result<(), PassError> {
        match *composite {
            Composite::Anaglyph {
                left,
                right,
                uniforms,
            } => {
                let (left, right) = (self.input(left)?, self.input(right)?);
                for_each_pixel(image, |uv| {
                    Some(anaglyph_pixel(uv, left, right, &uniforms))
                });
            }
            Composite::Lens {
                left,
                right,
                uniforms,
            } => {
                let (left, right) = (self.input(left)?, self.input(right)?);
                for_each_pixel(image, |uv| lens_pixel(uv, left, right, &uniforms));
            }
            Composite::Bokeh {
                color,
                depth_blur,
                uniforms,
            } => {
                let (color, depth_blur) = (self.input(color)?, self.input(depth_blur)?);
                for_each_pixel(image, |uv| {
                    Some(bokeh_pixel(uv, color, depth_blur, &uniforms))
                });
            }
            Composite::Copy { source } => {
                let source = self.input(source)?;
                for_each_pixel(image, |uv| Some(source.sample(uv)));
            }
        }
        Ok(())
    }
}

fn for_each_pixel<F>(image: &mut Image, mut pixel: F)
where
    F: FnMut(glam::Vec2) -> Option<Vec4>,
{
    for y in 0..image.height() {
        for x in 0..image.width() {
            if let Some(color) = pixel(image.uv(x, y)) {
                image.put(x, y, color);
            }
        }
    }
}

impl RenderExecutor for SoftwareExecutor {
    fn create_target(&mut self, label: &str, size: ViewportSize) -> Result<TargetId, PassError> {
        if size.is_empty() {
            return Err(PassError::TargetAllocation {
                label: label.to_string(),
                width: size.width,
                height: size.height,
            });
        }
        let id = TargetId(self.next_id);
        self.next_id += 1;
        self.targets.insert(id, Image::new(size, self.clear_color));
        self.stats.targets_created += 1;
        log::trace!("created '{label}' {id:?} at {}x{}", size.width, size.height);
        Ok(id)
    }

    fn destroy_target(&mut self, id: TargetId) -> Result<(), PassError> {
        self.targets
            .remove(&id)
            .ok_or(PassError::UnknownTarget(id))?;
        self.stats.targets_destroyed += 1;
        Ok(())
    }

    fn render_scene(&mut self, draw: &SceneDraw<'_>) -> Result<(), PassError> {
        let mut image = self.take(draw.dest)?;
        self.draw_scene(draw, &mut image);
        self.restore(draw.dest, image);
        self.stats.scene_draws += 1;
        Ok(())
    }

    fn render_composite(
        &mut self,
        composite: &Composite,
        dest: Destination,
        clear: bool,
    ) -> Result<(), PassError> {
        if let Destination::Target(id) = dest {
            if composite.inputs().contains(&id) {
                return Err(PassError::ChainStateInconsistent(format!(
                    "composite samples its own destination {id:?}"
                )));
            }
        }
        let mut image = self.take(dest)?;
        if clear {
            image.fill(self.clear_color);
        }
        let result = self.draw_composite(composite, &mut image);
        self.restore(dest, image);
        self.stats.composite_draws += 1;
        result
    }

    fn screen_size(&self) -> ViewportSize {
        self.screen.size()
    }
}
