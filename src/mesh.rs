//! Unit meshes for the GPU executor.
//!
//! Draw-list shapes are analytic; on the GPU each one is drawn as a
//! tessellated unit mesh scaled by [`Drawable::mesh_scale`](crate::Drawable::mesh_scale).
//!
//! # Vertex Layout
//!
//! | Attribute | Format    | Offset | Shader Location |
//! |-----------|-----------|--------|-----------------|
//! | position  | Float32x3 | 0      | 0               |
//! | normal    | Float32x3 | 12     | 1               |

/// A vertex with position and normal, 24 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3d {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex3d {
    /// The wgpu vertex buffer layout for this vertex type.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex3d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // normal
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
        ],
    };

    pub fn new(position: [f32; 3], normal: [f32; 3]) -> Self {
        Self { position, normal }
    }
}

/// CPU-side geometry, before upload.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex3d>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Unit cube centered at the origin, spanning -0.5 to 0.5 on every axis.
    ///
    /// Each face has its own four vertices so normals stay flat.
    pub fn cube() -> Self {
        #[rustfmt::skip]
        let vertices = vec![
            // Front face (Z+)
            Vertex3d::new([-0.5, -0.5,  0.5], [ 0.0,  0.0,  1.0]),
            Vertex3d::new([ 0.5, -0.5,  0.5], [ 0.0,  0.0,  1.0]),
            Vertex3d::new([ 0.5,  0.5,  0.5], [ 0.0,  0.0,  1.0]),
            Vertex3d::new([-0.5,  0.5,  0.5], [ 0.0,  0.0,  1.0]),
            // Back face (Z-)
            Vertex3d::new([ 0.5, -0.5, -0.5], [ 0.0,  0.0, -1.0]),
            Vertex3d::new([-0.5, -0.5, -0.5], [ 0.0,  0.0, -1.0]),
            Vertex3d::new([-0.5,  0.5, -0.5], [ 0.0,  0.0, -1.0]),
            Vertex3d::new([ 0.5,  0.5, -0.5], [ 0.0,  0.0, -1.0]),
            // Top face (Y+)
            Vertex3d::new([-0.5,  0.5,  0.5], [ 0.0,  1.0,  0.0]),
            Vertex3d::new([ 0.5,  0.5,  0.5], [ 0.0,  1.0,  0.0]),
            Vertex3d::new([ 0.5,  0.5, -0.5], [ 0.0,  1.0,  0.0]),
            Vertex3d::new([-0.5,  0.5, -0.5], [ 0.0,  1.0,  0.0]),
            // Bottom face (Y-)
            Vertex3d::new([-0.5, -0.5, -0.5], [ 0.0, -1.0,  0.0]),
            Vertex3d::new([ 0.5, -0.5, -0.5], [ 0.0, -1.0,  0.0]),
            Vertex3d::new([ 0.5, -0.5,  0.5], [ 0.0, -1.0,  0.0]),
            Vertex3d::new([-0.5, -0.5,  0.5], [ 0.0, -1.0,  0.0]),
            // Right face (X+)
            Vertex3d::new([ 0.5, -0.5,  0.5], [ 1.0,  0.0,  0.0]),
            Vertex3d::new([ 0.5, -0.5, -0.5], [ 1.0,  0.0,  0.0]),
            Vertex3d::new([ 0.5,  0.5, -0.5], [ 1.0,  0.0,  0.0]),
            Vertex3d::new([ 0.5,  0.5,  0.5], [ 1.0,  0.0,  0.0]),
            // Left face (X-)
            Vertex3d::new([-0.5, -0.5, -0.5], [-1.0,  0.0,  0.0]),
            Vertex3d::new([-0.5, -0.5,  0.5], [-1.0,  0.0,  0.0]),
            Vertex3d::new([-0.5,  0.5,  0.5], [-1.0,  0.0,  0.0]),
            Vertex3d::new([-0.5,  0.5, -0.5], [-1.0,  0.0,  0.0]),
        ];

        let indices = (0..6u32)
            .flat_map(|face| [0, 1, 2, 2, 3, 0].map(|i| face * 4 + i))
            .collect();

        Self { vertices, indices }
    }

    /// Latitude/longitude sphere of radius 0.5.
    ///
    /// Produces `(segments + 1) * (rings + 1)` vertices and
    /// `segments * rings * 2` triangles.
    pub fn sphere(segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);
        let mut vertices = Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);
        let mut indices = Vec::with_capacity((segments * rings * 6) as usize);

        for ring in 0..=rings {
            let phi = std::f32::consts::PI * ring as f32 / rings as f32;
            let y = phi.cos();
            let ring_radius = phi.sin();

            for seg in 0..=segments {
                let theta = std::f32::consts::TAU * seg as f32 / segments as f32;
                let x = ring_radius * theta.cos();
                let z = ring_radius * theta.sin();
                vertices.push(Vertex3d::new([x * 0.5, y * 0.5, z * 0.5], [x, y, z]));
            }
        }

        for ring in 0..rings {
            for seg in 0..segments {
                let current = ring * (segments + 1) + seg;
                let next = current + segments + 1;
                indices.extend_from_slice(&[current, next, current + 1]);
                indices.extend_from_slice(&[current + 1, next, next + 1]);
            }
        }

        Self { vertices, indices }
    }
}

/// Geometry uploaded to vertex and index buffers.
#[derive(Debug)]
pub struct GpuMesh {
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) index_buffer: wgpu::Buffer,
    pub(crate) index_count: u32,
}

impl GpuMesh {
    pub fn upload(device: &wgpu::Device, data: &MeshData, label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertex Buffer")),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Index Buffer")),
            contents: bytemuck::cast_slice(&data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: data.indices.len() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn vertex_is_24_bytes() {
        assert_eq!(std::mem::size_of::<Vertex3d>(), 24);
    }

    #[test]
    fn cube_has_flat_faces() {
        let cube = MeshData::cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        assert!(cube.indices.iter().all(|&i| (i as usize) < cube.vertices.len()));
        for v in &cube.vertices {
            let n = glam::Vec3::from(v.normal);
            let p = glam::Vec3::from(v.position);
            // The normal axis coordinate sits on the face plane.
            assert_relative_eq!(p.dot(n), 0.5);
        }
    }

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let sphere = MeshData::sphere(16, 8);
        assert_eq!(sphere.vertices.len(), 17 * 9);
        assert_eq!(sphere.indices.len(), 16 * 8 * 6);
        for v in &sphere.vertices {
            assert_relative_eq!(glam::Vec3::from(v.position).length(), 0.5, epsilon = 1e-5);
        }
    }

    #[test]
    fn degenerate_tessellation_is_raised() {
        let sphere = MeshData::sphere(0, 0);
        assert_eq!(sphere.vertices.len(), 4 * 3);
    }
}
