use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use super::gpu::{camera_bind_group_layout, create_uniform_buffer};

const FOV_Y_DEGREES: f32 = 60.0;
const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 1000.0;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct CameraUniform {
    view_proj: [[f32; 4]; 4],
}

/// Combined matrix for the scene pass: the game's fixed perspective over the
/// chase camera's view.
pub fn view_projection(view: Mat4, aspect: f32) -> Mat4 {
    Mat4::perspective_rh(FOV_Y_DEGREES.to_radians(), aspect, Z_NEAR, Z_FAR) * view
}

/// GPU side of the camera: a single view-projection uniform, rewritten once
/// per frame from the chase view and the current surface aspect.
pub struct CameraState {
    uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl CameraState {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform = CameraUniform {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
        };
        let uniform_buffer = create_uniform_buffer(device, &uniform, "Camera Uniform");

        let layout = camera_bind_group_layout(device);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Self {
            uniform_buffer,
            bind_group,
        }
    }

    pub fn upload(&self, queue: &wgpu::Queue, view: Mat4, aspect: f32) {
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::cast_slice(&[CameraUniform {
                view_proj: view_projection(view, aspect).to_cols_array_2d(),
            }]),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec3, Vec4};

    #[test]
    fn point_ahead_of_the_camera_lands_in_clip_space() {
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y);
        let clip = view_projection(view, 16.0 / 9.0) * Vec4::new(0.0, 0.0, -10.0, 1.0);
        assert!(clip.w > 0.0);
        let ndc_z = clip.z / clip.w;
        assert!((0.0..=1.0).contains(&ndc_z), "ndc z = {ndc_z}");
    }

    #[test]
    fn point_behind_the_camera_is_culled() {
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y);
        let clip = view_projection(view, 1.0) * Vec4::new(0.0, 0.0, 10.0, 1.0);
        assert!(clip.w < 0.0);
    }
}
