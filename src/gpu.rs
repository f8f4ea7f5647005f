//! Device, queue and window surface.
//!
//! [`GpuContext`] wraps the wgpu boilerplate needed before anything can be
//! drawn: instance creation, adapter selection, device/queue creation and
//! surface configuration. [`WgpuExecutor`](crate::WgpuExecutor) owns one.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # fn demo(window: Arc<winit::window::Window>) -> Result<(), lensfx::PassError> {
//! let mut gpu = lensfx::GpuContext::new(window)?;
//! gpu.resize(1280, 800);
//! assert_eq!(gpu.width(), 1280);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use winit::window::Window;

use crate::error::PassError;
use crate::target::ViewportSize;

/// Core GPU context holding wgpu resources.
///
/// All fields are public so executors and demos can reach the wgpu API
/// directly.
pub struct GpuContext {
    /// The surface for presenting rendered frames to the window.
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// Current surface configuration (format, size, present mode).
    pub config: wgpu::SurfaceConfiguration,
}

impl GpuContext {
    /// Creates a context presenting to `window`.
    ///
    /// Picks an sRGB surface format when the adapter offers one and presents
    /// with vsync (`Fifo`).
    ///
    /// # Errors
    ///
    /// [`PassError::Gpu`] if the surface cannot be created, no adapter is
    /// compatible with it, or device creation fails.
    pub fn new(window: Arc<Window>) -> Result<Self, PassError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .map_err(|e| PassError::Gpu(format!("surface creation failed: {e}")))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|e| PassError::Gpu(format!("no suitable adapter: {e}")))?;

        let info = adapter.get_info();
        log::info!("using adapter '{}' ({:?})", info.name, info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Lensfx Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
            experimental_features: Default::default(),
        }))
        .map_err(|e| PassError::Gpu(format!("device request failed: {e}")))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| PassError::Gpu("surface reports no formats".into()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        log::debug!(
            "surface configured {}x{} as {:?}",
            config.width,
            config.height,
            config.format
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
        })
    }

    /// Resize the surface. Zero-sized dimensions (minimized windows) are
    /// ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Reapplies the current configuration after the surface was lost.
    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }

    pub fn width(&self) -> u32 {
        self.config.width
    }

    pub fn height(&self) -> u32 {
        self.config.height
    }

    pub fn size(&self) -> ViewportSize {
        ViewportSize::new(self.config.width, self.config.height)
    }
}
