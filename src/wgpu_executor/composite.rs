//! Full-screen compositing materials.
//!
//! All composites share one bind group layout:
//!
//! | Binding | Resource                          |
//! |---------|-----------------------------------|
//! | 0       | material uniforms                 |
//! | 1       | first input (left eye, color)     |
//! | 2       | second input (right eye, depth)   |
//! | 3       | linear clamp sampler              |
//! | 4       | nearest clamp sampler             |
//!
//! Single-input materials bind their input twice.

use std::collections::HashMap;

use crate::executor::Composite;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum CompositeKind {
    Anaglyph,
    Lens,
    Bokeh,
    Copy,
}

impl CompositeKind {
    pub(crate) fn of(composite: &Composite) -> Self {
        match composite {
            Composite::Anaglyph { .. } => CompositeKind::Anaglyph,
            Composite::Lens { .. } => CompositeKind::Lens,
            Composite::Bokeh { .. } => CompositeKind::Bokeh,
            Composite::Copy { .. } => CompositeKind::Copy,
        }
    }

    fn label(self) -> &'static str {
        match self {
            CompositeKind::Anaglyph => "Anaglyph",
            CompositeKind::Lens => "Lens",
            CompositeKind::Bokeh => "Bokeh",
            CompositeKind::Copy => "Copy",
        }
    }

    fn source(self) -> String {
        match self {
            CompositeKind::Anaglyph => super::shaders::anaglyph(),
            CompositeKind::Lens => super::shaders::lens(),
            CompositeKind::Bokeh => super::shaders::bokeh(),
            CompositeKind::Copy => super::shaders::copy(),
        }
    }
}

/// Uniform block contents for `composite`. Copy has no uniforms of its own
/// but the layout still expects a buffer.
pub(crate) fn uniform_bytes(composite: &Composite) -> Vec<u8> {
    match composite {
        Composite::Anaglyph { uniforms, .. } => bytemuck::bytes_of(uniforms).to_vec(),
        Composite::Lens { uniforms, .. } => bytemuck::bytes_of(uniforms).to_vec(),
        Composite::Bokeh { uniforms, .. } => bytemuck::bytes_of(uniforms).to_vec(),
        Composite::Copy { .. } => vec![0; 16],
    }
}

pub(crate) struct CompositeRenderer {
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    modules: HashMap<CompositeKind, wgpu::ShaderModule>,
    pipelines: HashMap<(CompositeKind, wgpu::TextureFormat), wgpu::RenderPipeline>,
    linear_sampler: wgpu::Sampler,
    nearest_sampler: wgpu::Sampler,
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn clamp_sampler(device: &wgpu::Device, label: &str, filter: wgpu::FilterMode) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

impl CompositeRenderer {
    pub(crate) fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Composite Bind Group Layout"),
            entries: &[
                // Uniforms
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                texture_entry(1),
                texture_entry(2),
                sampler_entry(3),
                sampler_entry(4),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Composite Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let modules = [
            CompositeKind::Anaglyph,
            CompositeKind::Lens,
            CompositeKind::Bokeh,
            CompositeKind::Copy,
        ]
        .into_iter()
        .map(|kind| {
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(kind.label()),
                source: wgpu::ShaderSource::Wgsl(kind.source().into()),
            });
            (kind, module)
        })
        .collect();

        Self {
            bind_group_layout,
            pipeline_layout,
            modules,
            pipelines: HashMap::new(),
            linear_sampler: clamp_sampler(device, "Composite Linear Sampler", wgpu::FilterMode::Linear),
            nearest_sampler: clamp_sampler(
                device,
                "Composite Nearest Sampler",
                wgpu::FilterMode::Nearest,
            ),
        }
    }

    fn ensure_pipeline(
        &mut self,
        device: &wgpu::Device,
        kind: CompositeKind,
        format: wgpu::TextureFormat,
    ) {
        let Some(module) = self.modules.get(&kind) else {
            return;
        };
        let layout = &self.pipeline_layout;
        self.pipelines.entry((kind, format)).or_insert_with(|| {
            log::debug!("building {} pipeline for {format:?}", kind.label());
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(kind.label()),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some("vs"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some("fs"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        });
    }

    /// Records `composite` drawing into `view`.
    ///
    /// # Arguments
    ///
    /// * `inputs` - Views of the composite's input targets, in [`Composite::inputs`] order
    /// * `clear` - Clear to `background` first; otherwise discarded pixels keep their contents
    pub(crate) fn record(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        composite: &Composite,
        inputs: [&wgpu::TextureView; 2],
        view: &wgpu::TextureView,
        format: wgpu::TextureFormat,
        clear: Option<wgpu::Color>,
    ) {
        use wgpu::util::DeviceExt;

        let kind = CompositeKind::of(composite);
        self.ensure_pipeline(device, kind, format);
        let Some(pipeline) = self.pipelines.get(&(kind, format)) else {
            return;
        };

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Composite Uniforms"),
            contents: &uniform_bytes(composite),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Composite Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(inputs[0]),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(inputs[1]),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.linear_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&self.nearest_sampler),
                },
            ],
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(kind.label()),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: clear.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}
