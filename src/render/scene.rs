use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};

use crate::config::*;
use crate::track::TrackCurve;

use super::gpu::{
    create_index_buffer, create_uniform_buffer, create_vertex_buffer, uniform_bind_group_layout,
};

pub const CAR_COLOR: [f32; 4] = [0.85, 0.2, 0.2, 1.0];
pub const LATERAL_OBSTACLE_COLOR: [f32; 4] = [0.686, 0.533, 0.6, 1.0];
pub const VERTICAL_OBSTACLE_COLOR: [f32; 4] = [1.0, 0.42, 0.42, 1.0];
pub const TRACK_COLOR: [f32; 4] = [0.25, 0.25, 0.25, 1.0];
pub const START_MARKER_COLOR: [f32; 4] = [0.2, 0.8, 0.3, 1.0];
pub const FINISH_MARKER_COLOR: [f32; 4] = [0.9, 0.15, 0.15, 1.0];

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    pub const ATTRIBS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3
    ];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct ModelUniform {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

/// Unit cube centered at the origin, scaled per draw through the model matrix.
pub fn generate_unit_box() -> (Vec<Vertex>, Vec<u32>) {
    let h = 0.5;
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        (
            [0.0, 0.0, 1.0],
            [[-h, -h, h], [h, -h, h], [h, h, h], [-h, h, h]],
        ),
        (
            [0.0, 0.0, -1.0],
            [[h, -h, -h], [-h, -h, -h], [-h, h, -h], [h, h, -h]],
        ),
        (
            [-1.0, 0.0, 0.0],
            [[-h, -h, -h], [-h, -h, h], [-h, h, h], [-h, h, -h]],
        ),
        (
            [1.0, 0.0, 0.0],
            [[h, -h, h], [h, -h, -h], [h, h, -h], [h, h, h]],
        ),
        (
            [0.0, 1.0, 0.0],
            [[-h, h, h], [h, h, h], [h, h, -h], [-h, h, -h]],
        ),
        (
            [0.0, -1.0, 0.0],
            [[-h, -h, -h], [h, -h, -h], [h, -h, h], [-h, -h, h]],
        ),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, positions) in faces {
        let base = vertices.len() as u32;
        for position in positions {
            vertices.push(Vertex { position, normal });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (vertices, indices)
}

/// Model matrix for a box body: bake the full extents into the unit cube.
pub fn box_model(position: Vec3, rotation: Quat, half_extents: [f32; 3]) -> Mat4 {
    let scale = Vec3::new(
        half_extents[0] * 2.0,
        half_extents[1] * 2.0,
        half_extents[2] * 2.0,
    );
    Mat4::from_scale_rotation_translation(scale, rotation, position)
}

struct StaticMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    bind_group: wgpu::BindGroup,
}

/// Draws the whole scene with one flat-shaded colored pipeline: the static
/// track ribbon and start/finish markers, then a pooled set of dynamic boxes
/// for the car and obstacles.
pub struct SceneRenderer {
    pipeline: wgpu::RenderPipeline,
    uniform_layout: wgpu::BindGroupLayout,
    statics: Vec<StaticMesh>,
    box_vertex_buffer: wgpu::Buffer,
    box_index_buffer: wgpu::Buffer,
    box_index_count: u32,
    uniform_pool: Vec<(wgpu::Buffer, wgpu::BindGroup)>,
}

impl SceneRenderer {
    pub fn new(
        device: &wgpu::Device,
        camera_layout: &wgpu::BindGroupLayout,
        surface_format: wgpu::TextureFormat,
        curve: &TrackCurve,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("scene.wgsl").into()),
        });

        let uniform_layout = uniform_bind_group_layout(device, "Model Uniform Layout");

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[camera_layout, &uniform_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
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
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let mut statics = Vec::new();
        let mut add_static = |vertices: &[Vertex], indices: &[u32], color: [f32; 4], label: &str| {
            let uniform = ModelUniform {
                model: Mat4::IDENTITY.to_cols_array_2d(),
                color,
            };
            let buffer = create_uniform_buffer(device, &uniform, label);
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            });
            statics.push(StaticMesh {
                vertex_buffer: create_vertex_buffer(device, vertices, label),
                index_buffer: create_index_buffer(device, indices, label),
                index_count: indices.len() as u32,
                bind_group,
            });
        };

        let (ribbon, ribbon_indices) = curve.ribbon_mesh();
        let ribbon_vertices: Vec<Vertex> = ribbon
            .iter()
            .map(|(position, normal)| Vertex {
                position: position.to_array(),
                normal: normal.to_array(),
            })
            .collect();
        add_static(&ribbon_vertices, &ribbon_indices, TRACK_COLOR, "Track Ribbon");

        // Thin bars across the road surface at both ends of the course.
        let (box_vertices, box_indices) = generate_unit_box();
        for (t, color, label) in [
            (0.0, START_MARKER_COLOR, "Start Marker"),
            (1.0, FINISH_MARKER_COLOR, "Finish Marker"),
        ] {
            let anchor = curve.point(t);
            let yaw = {
                let tangent = curve.tangent(t);
                (-tangent.z).atan2(tangent.x)
            };
            let model = box_model(
                Vec3::new(anchor.x, anchor.y + TRACK_HALF_THICKNESS + 0.02, anchor.z),
                Quat::from_rotation_y(yaw),
                [0.1, 0.02, TRACK_HALF_WIDTH],
            );
            let marker_vertices: Vec<Vertex> = box_vertices
                .iter()
                .map(|v| {
                    let p = model.transform_point3(Vec3::from(v.position));
                    let n = model.transform_vector3(Vec3::from(v.normal)).normalize();
                    Vertex {
                        position: p.to_array(),
                        normal: n.to_array(),
                    }
                })
                .collect();
            add_static(&marker_vertices, &box_indices, color, label);
        }

        let box_vertex_buffer = create_vertex_buffer(device, &box_vertices, "Box Vertex Buffer");
        let box_index_buffer = create_index_buffer(device, &box_indices, "Box Index Buffer");

        Self {
            pipeline,
            uniform_layout,
            statics,
            box_vertex_buffer,
            box_index_buffer,
            box_index_count: box_indices.len() as u32,
            uniform_pool: Vec::new(),
        }
    }

    fn ensure_pool_size(&mut self, device: &wgpu::Device, count: usize) {
        while self.uniform_pool.len() < count {
            let uniform = ModelUniform {
                model: Mat4::IDENTITY.to_cols_array_2d(),
                color: [1.0, 1.0, 1.0, 1.0],
            };
            let buffer = create_uniform_buffer(device, &uniform, "Box Uniform Buffer");
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Box Bind Group"),
                layout: &self.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            });
            self.uniform_pool.push((buffer, bind_group));
        }
    }

    pub fn render<'a>(
        &'a mut self,
        pass: &mut wgpu::RenderPass<'a>,
        queue: &wgpu::Queue,
        device: &wgpu::Device,
        camera_bind_group: &'a wgpu::BindGroup,
        boxes: &[(Mat4, [f32; 4])],
    ) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, camera_bind_group, &[]);

        for mesh in &self.statics {
            pass.set_bind_group(1, &mesh.bind_group, &[]);
            pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }

        if boxes.is_empty() {
            return;
        }
        self.ensure_pool_size(device, boxes.len());

        pass.set_vertex_buffer(0, self.box_vertex_buffer.slice(..));
        pass.set_index_buffer(self.box_index_buffer.slice(..), wgpu::IndexFormat::Uint32);

        for (i, (model, color)) in boxes.iter().enumerate() {
            let uniform = ModelUniform {
                model: model.to_cols_array_2d(),
                color: *color,
            };
            let (buffer, bind_group) = &self.uniform_pool[i];
            queue.write_buffer(buffer, 0, bytemuck::cast_slice(&[uniform]));
            pass.set_bind_group(1, bind_group, &[]);
            pass.draw_indexed(0..self.box_index_count, 0, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_box_has_six_quad_faces() {
        let (vertices, indices) = generate_unit_box();
        assert_eq!(vertices.len(), 24);
        assert_eq!(indices.len(), 36);
        for v in &vertices {
            for c in v.position {
                assert!(c.abs() <= 0.5 + 1e-6);
            }
        }
    }

    #[test]
    fn box_model_scales_the_unit_cube_to_full_extents() {
        let model = box_model(Vec3::new(1.0, 2.0, 3.0), Quat::IDENTITY, CAR_HALF_EXTENTS);
        let corner = model.transform_point3(Vec3::splat(0.5));
        assert!((corner.x - (1.0 + CAR_HALF_EXTENTS[0])).abs() < 1e-5);
        assert!((corner.y - (2.0 + CAR_HALF_EXTENTS[1])).abs() < 1e-5);
        assert!((corner.z - (3.0 + CAR_HALF_EXTENTS[2])).abs() < 1e-5);
    }
}
