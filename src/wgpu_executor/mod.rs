//! GPU executor built on wgpu.
//!
//! [`WgpuExecutor`] owns the [`GpuContext`], the offscreen targets passes
//! allocate, and the pipelines for the scene and composite materials. Each
//! executor call records into its own command encoder and submits straight
//! away, so draws land in the order the chain issues them.
//!
//! Drawing to [`Destination::Screen`] needs a frame in flight:
//!
//! ```ignore
//! if executor.begin_frame()? {
//!     registry.render(&mut executor, &frame)?;
//!     executor.end_frame();
//! }
//! ```

mod composite;
mod scene_renderer;
mod shaders;

use std::collections::HashMap;

use crate::error::PassError;
use crate::executor::{Composite, Destination, RenderExecutor, SceneDraw};
use crate::gpu::GpuContext;
use crate::target::{TargetId, ViewportSize};

use composite::CompositeRenderer;
use scene_renderer::SceneRenderer;

/// Format of every offscreen target. Packed depth/blur channels need exact
/// 8-bit storage, so targets are linear.
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

struct OffscreenTarget {
    // Destroyed explicitly on release.
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: ViewportSize,
}

struct FrameInFlight {
    surface: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

pub struct WgpuExecutor {
    gpu: GpuContext,
    targets: HashMap<TargetId, OffscreenTarget>,
    next_id: u64,
    scene: SceneRenderer,
    composite: CompositeRenderer,
    frame: Option<FrameInFlight>,
    /// Color standard draws and composites clear to.
    pub clear_color: [f32; 4],
}

impl WgpuExecutor {
    pub fn new(gpu: GpuContext) -> Self {
        let scene = SceneRenderer::new(&gpu.device);
        let composite = CompositeRenderer::new(&gpu.device);
        Self {
            gpu,
            targets: HashMap::new(),
            next_id: 1,
            scene,
            composite,
            frame: None,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    /// Resizes the surface and drops depth buffers no live target uses.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
        let mut keep: Vec<ViewportSize> = self.targets.values().map(|t| t.size).collect();
        keep.push(self.gpu.size());
        self.scene.retain_depth(&keep);
    }

    /// Number of offscreen targets currently allocated.
    pub fn live_targets(&self) -> usize {
        self.targets.len()
    }

    /// Acquires the next surface texture.
    ///
    /// Returns `Ok(false)` when the frame should be skipped: the surface was
    /// lost or outdated (it is reconfigured for the next attempt) or timed out.
    pub fn begin_frame(&mut self) -> Result<bool, PassError> {
        if self.frame.is_some() {
            return Ok(true);
        }
        match self.gpu.surface.get_current_texture() {
            Ok(surface) => {
                let view = surface
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                self.frame = Some(FrameInFlight { surface, view });
                Ok(true)
            }
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost or outdated, reconfiguring");
                self.gpu.reconfigure();
                Ok(false)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface acquire timed out, skipping frame");
                Ok(false)
            }
            Err(e) => Err(PassError::Gpu(format!("surface acquire failed: {e}"))),
        }
    }

    /// Presents the frame acquired by [`begin_frame`](Self::begin_frame).
    pub fn end_frame(&mut self) {
        if let Some(frame) = self.frame.take() {
            frame.surface.present();
        }
    }

    fn submit(&self, encoder: wgpu::CommandEncoder) {
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
    }

    fn encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }
}

/// Resolves a destination to its view, format and extent.
fn resolve<'a>(
    targets: &'a HashMap<TargetId, OffscreenTarget>,
    frame: &'a Option<FrameInFlight>,
    gpu: &GpuContext,
    dest: Destination,
) -> Result<(&'a wgpu::TextureView, wgpu::TextureFormat, ViewportSize), PassError> {
    match dest {
        Destination::Screen => frame
            .as_ref()
            .map(|f| (&f.view, gpu.config.format, gpu.size()))
            .ok_or_else(|| PassError::Gpu("screen draw without a frame in flight".into())),
        Destination::Target(id) => targets
            .get(&id)
            .map(|t| (&t.view, TARGET_FORMAT, t.size))
            .ok_or(PassError::UnknownTarget(id)),
    }
}

fn input_view(
    targets: &HashMap<TargetId, OffscreenTarget>,
    id: TargetId,
) -> Result<&wgpu::TextureView, PassError> {
    targets
        .get(&id)
        .map(|t| &t.view)
        .ok_or(PassError::UnknownTarget(id))
}

impl RenderExecutor for WgpuExecutor {
    fn create_target(&mut self, label: &str, size: ViewportSize) -> Result<TargetId, PassError> {
        let max = self.gpu.device.limits().max_texture_dimension_2d;
        if size.is_empty() || size.width > max || size.height > max {
            return Err(PassError::TargetAllocation {
                label: label.to_string(),
                width: size.width,
                height: size.height,
            });
        }

        let texture = self.gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let id = TargetId(self.next_id);
        self.next_id += 1;
        self.targets.insert(
            id,
            OffscreenTarget {
                texture,
                view,
                size,
            },
        );
        log::debug!("created '{label}' {id:?} at {}x{}", size.width, size.height);
        Ok(id)
    }

    fn destroy_target(&mut self, id: TargetId) -> Result<(), PassError> {
        let target = self
            .targets
            .remove(&id)
            .ok_or(PassError::UnknownTarget(id))?;
        target.texture.destroy();
        log::debug!("destroyed {id:?}");
        Ok(())
    }

    fn render_scene(&mut self, draw: &SceneDraw<'_>) -> Result<(), PassError> {
        let mut encoder = self.encoder("Scene Encoder");
        let (view, format, size) = resolve(&self.targets, &self.frame, &self.gpu, draw.dest)?;
        self.scene.record(
            &self.gpu.device,
            &mut encoder,
            draw,
            view,
            format,
            size,
            self.clear_color,
        );
        self.submit(encoder);
        Ok(())
    }

    fn render_composite(
        &mut self,
        composite: &Composite,
        dest: Destination,
        clear: bool,
    ) -> Result<(), PassError> {
        let inputs = composite.inputs();
        if let Destination::Target(id) = dest {
            if inputs.contains(&id) {
                return Err(PassError::ChainStateInconsistent(format!(
                    "composite samples its own destination {id:?}"
                )));
            }
        }

        let first = inputs
            .first()
            .copied()
            .ok_or_else(|| PassError::Gpu("composite without inputs".into()))?;
        let second = inputs.get(1).copied().unwrap_or(first);

        let mut encoder = self.encoder("Composite Encoder");
        let views = [
            input_view(&self.targets, first)?,
            input_view(&self.targets, second)?,
        ];
        let (view, format, _) = resolve(&self.targets, &self.frame, &self.gpu, dest)?;
        let [r, g, b, a] = self.clear_color;
        let clear = clear.then_some(wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        });
        self.composite.record(
            &self.gpu.device,
            &mut encoder,
            composite,
            views,
            view,
            format,
            clear,
        );
        self.submit(encoder);
        Ok(())
    }

    fn screen_size(&self) -> ViewportSize {
        self.gpu.size()
    }
}
