//! Draw-list rendering with depth testing.
//!
//! Every drawable is a unit sphere or cube scaled and translated into place.
//! One uniform block per drawable carries the camera, model transform, lights
//! and material, so a whole draw list records into a single render pass.

use std::collections::HashMap;

use glam::{Mat4, Vec3};

use crate::draw_list::{AMBIENT, Drawable, MAX_LIGHTS, Shape};
use crate::dof::DepthBlurUniforms;
use crate::executor::{SceneDraw, SceneMaterial};
use crate::mesh::{GpuMesh, MeshData, Vertex3d};
use crate::target::ViewportSize;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Per-drawable uniforms, laid out to match `Draw` in the scene shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct DrawUniforms {
    view_proj: [[f32; 4]; 4],
    view: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    /// Inverse transpose of `model`, for non-uniformly scaled cuboids.
    normal_matrix: [[f32; 4]; 4],
    color: [f32; 4],
    light_directions: [[f32; 4]; MAX_LIGHTS],
    /// Light color premultiplied by intensity.
    light_colors: [[f32; 4]; MAX_LIGHTS],
    light_count: u32,
    material: u32,
    ambient: f32,
    _padding: f32,
    depth_blur: DepthBlurUniforms,
}

impl DrawUniforms {
    pub(crate) fn new(draw: &SceneDraw<'_>, drawable: &Drawable, target_aspect: f32) -> Self {
        let view = draw.camera.view_matrix();
        let proj = draw.camera.projection_matrix(target_aspect);
        let model = Mat4::from_scale_rotation_translation(
            drawable.mesh_scale(),
            glam::Quat::IDENTITY,
            drawable.position,
        );

        let mut light_directions = [[0.0; 4]; MAX_LIGHTS];
        let mut light_colors = [[0.0; 4]; MAX_LIGHTS];
        for (i, light) in draw.lights.iter().take(MAX_LIGHTS).enumerate() {
            light_directions[i] = light.direction.extend(0.0).to_array();
            let color = Vec3::from(light.color) * light.intensity;
            light_colors[i] = color.extend(1.0).to_array();
        }

        let (material, depth_blur) = match draw.material {
            SceneMaterial::Standard => (0, DepthBlurUniforms::default()),
            SceneMaterial::DepthBlur(uniforms) => (1, uniforms),
        };

        Self {
            view_proj: (proj * view).to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            normal_matrix: model.inverse().transpose().to_cols_array_2d(),
            color: drawable.color,
            light_directions,
            light_colors,
            light_count: draw.lights.len().min(MAX_LIGHTS) as u32,
            material,
            ambient: AMBIENT,
            _padding: 0.0,
            depth_blur,
        }
    }
}

/// Clear color for a scene draw: the executor's background for lit draws, the
/// far-plane texel for depth capture.
pub(crate) fn clear_color(material: SceneMaterial, standard: [f32; 4]) -> wgpu::Color {
    let [r, g, b, a] = match material {
        SceneMaterial::Standard => standard,
        SceneMaterial::DepthBlur(uniforms) => uniforms.background_texel(),
    };
    wgpu::Color {
        r: r as f64,
        g: g as f64,
        b: b as f64,
        a: a as f64,
    }
}

pub(crate) struct SceneRenderer {
    shader: wgpu::ShaderModule,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<wgpu::TextureFormat, wgpu::RenderPipeline>,
    sphere: GpuMesh,
    cube: GpuMesh,
    depth: HashMap<ViewportSize, wgpu::TextureView>,
}

impl SceneRenderer {
    pub(crate) fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(super::shaders::SCENE_SHADER.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        Self {
            shader,
            bind_group_layout,
            pipeline_layout,
            pipelines: HashMap::new(),
            sphere: GpuMesh::upload(device, &MeshData::sphere(32, 16), "Unit Sphere"),
            cube: GpuMesh::upload(device, &MeshData::cube(), "Unit Cube"),
            depth: HashMap::new(),
        }
    }

    fn pipeline(
        &mut self,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
    ) -> &wgpu::RenderPipeline {
        self.pipelines.entry(format).or_insert_with(|| {
            log::debug!("building scene pipeline for {format:?}");
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Scene Pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &self.shader,
                    entry_point: Some("vs"),
                    buffers: &[Vertex3d::LAYOUT],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &self.shader,
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
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })
    }

    /// Depth buffers are cached per extent; eye targets and the screen
    /// alternate every frame.
    fn ensure_depth(&mut self, device: &wgpu::Device, size: ViewportSize) {
        self.depth.entry(size).or_insert_with(|| {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("Scene Depth Texture"),
                size: wgpu::Extent3d {
                    width: size.width,
                    height: size.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            });
            texture.create_view(&wgpu::TextureViewDescriptor::default())
        });
    }

    /// Drops cached depth buffers not matching any of `keep`.
    pub(crate) fn retain_depth(&mut self, keep: &[ViewportSize]) {
        self.depth.retain(|size, _| keep.contains(size));
    }

    /// Records one scene draw into `encoder`.
    ///
    /// # Arguments
    ///
    /// * `view` / `format` / `size` - The color attachment being drawn into
    /// * `background` - Clear color used for standard draws when `draw.clear` is set
    pub(crate) fn record(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        draw: &SceneDraw<'_>,
        view: &wgpu::TextureView,
        format: wgpu::TextureFormat,
        size: ViewportSize,
        background: [f32; 4],
    ) {
        use wgpu::util::DeviceExt;

        self.ensure_depth(device, size);
        self.pipeline(device, format);

        let bind_groups: Vec<(wgpu::BindGroup, Shape)> = draw
            .draw_list
            .iter()
            .map(|drawable| {
                let uniforms = DrawUniforms::new(draw, drawable, size.aspect());
                let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Draw Uniforms"),
                    contents: bytemuck::bytes_of(&uniforms),
                    usage: wgpu::BufferUsages::UNIFORM,
                });
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Draw Bind Group"),
                    layout: &self.bind_group_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    }],
                });
                (bind_group, drawable.shape)
            })
            .collect();

        let load = if draw.clear {
            wgpu::LoadOp::Clear(clear_color(draw.material, background))
        } else {
            wgpu::LoadOp::Load
        };

        let (Some(pipeline), Some(depth_view)) =
            (self.pipelines.get(&format), self.depth.get(&size))
        else {
            return;
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(pipeline);
        for (bind_group, shape) in &bind_groups {
            let mesh = match shape {
                Shape::Sphere { .. } => &self.sphere,
                Shape::Cuboid { .. } => &self.cube,
            };
            pass.set_bind_group(0, bind_group, &[]);
            pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }
}
