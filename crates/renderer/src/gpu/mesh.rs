use bytemuck::{Pod, Zeroable};
use image::RgbaImage;
use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::scene::MeshNode;

use super::uniforms::MeshUniforms;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Interleaves positions, normals and UVs; a missing normal falls back to +Y
/// and a missing UV to the origin.
pub(crate) fn interleave(node: &MeshNode) -> Vec<Vertex> {
    let geometry = &node.geometry;
    geometry
        .positions
        .iter()
        .enumerate()
        .map(|(index, position)| {
            let normal = geometry.normals.get(index).copied().unwrap_or(glam::Vec3::Y);
            let uv = geometry.uvs.get(index).copied().unwrap_or(glam::Vec2::ZERO);
            Vertex {
                position: position.to_array(),
                normal: normal.to_array(),
                uv: uv.to_array(),
            }
        })
        .collect()
}

/// Uploads a decoded base colour map.
pub(crate) fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    image: &RgbaImage,
) -> wgpu::TextureView {
    let (width, height) = image.dimensions();
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            // Same gamma-space handling as palette colours.
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        image.as_raw(),
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

/// GPU copy of one scene-graph mesh plus its per-mesh uniform block.
pub(crate) struct GpuMesh {
    /// Index of the source node in the displayed scene graph.
    pub node: usize,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl GpuMesh {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        node_index: usize,
        node: &MeshNode,
        texture: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) -> Option<Self> {
        let vertex_count = node.geometry.positions.len() as u32;
        // Out-of-range indices would trip validation; such meshes are skipped.
        if node.geometry.is_empty()
            || node
                .geometry
                .indices
                .iter()
                .any(|index| *index >= vertex_count)
        {
            tracing::warn!(mesh = %node.name, "skipping mesh with invalid geometry");
            return None;
        }

        let vertices = interleave(node);
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh indices"),
            contents: bytemuck::cast_slice(&node.geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mesh uniforms"),
            size: std::mem::size_of::<MeshUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("mesh bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(texture),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        Some(Self {
            node: node_index,
            vertex_buffer,
            index_buffer,
            index_count: node.geometry.indices.len() as u32,
            uniform_buffer,
            bind_group,
        })
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};

    use super::*;
    use crate::scene::{ColorableSurface, Geometry, Surface};
    use crate::types::Rgb;

    #[test]
    fn interleave_pairs_positions_with_normals_and_uvs() {
        let mut geometry = Geometry::default();
        geometry.push_triangle(Vec3::ZERO, Vec3::X, Vec3::Y);
        geometry.normals.truncate(2);
        geometry.uvs = vec![glam::Vec2::new(0.25, 0.75)];
        let node = MeshNode {
            name: "tri".into(),
            geometry,
            transform: Mat4::IDENTITY,
            surface: Surface::Colorable(ColorableSurface {
                color: Rgb::WHITE,
                shininess: 30.0,
            }),
            texture: None,
        };
        let vertices = interleave(&node);
        assert_eq!(vertices.len(), 3);
        assert_eq!(vertices[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(vertices[0].normal, [0.0, 0.0, 1.0]);
        assert_eq!(vertices[2].normal, [0.0, 1.0, 0.0]);
        assert_eq!(vertices[0].uv, [0.25, 0.75]);
        assert_eq!(vertices[2].uv, [0.0, 0.0]);
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
    }
}
