use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use winit::window::Window;

pub mod camera;
pub mod gpu;
pub mod scene;

use camera::CameraState;
use gpu::{camera_bind_group_layout, create_depth_texture};
use scene::{
    box_model, SceneRenderer, CAR_COLOR, LATERAL_OBSTACLE_COLOR, VERTICAL_OBSTACLE_COLOR,
};

use crate::config::*;
use crate::obstacles::ObstacleKind;
use crate::physics::Pose;
use crate::track::TrackCurve;

/// Everything the renderer needs for one frame, computed by the game loop.
pub struct FrameScene {
    pub view: Mat4,
    pub car: Option<Pose>,
    pub obstacles: Vec<(Vec3, ObstacleKind)>,
}

pub struct RenderContext {
    pub window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderInitError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter found: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}

impl RenderContext {
    pub async fn new(window: Arc<Window>) -> Result<Self, RenderInitError> {
        let (width, height) = {
            let size = window.inner_size();
            (size.width.max(1), size.height.max(1))
        };

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default())
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
        })
    }
}

pub struct Renderer {
    pub ctx: RenderContext,
    camera: CameraState,
    depth_view: wgpu::TextureView,
    scene: SceneRenderer,
}

impl Renderer {
    pub async fn new(window: Arc<Window>, curve: &TrackCurve) -> Result<Self, RenderInitError> {
        let ctx = RenderContext::new(window).await?;

        let camera_layout = camera_bind_group_layout(&ctx.device);
        let camera = CameraState::new(&ctx.device);
        let (_, depth_view) =
            create_depth_texture(&ctx.device, ctx.config.width, ctx.config.height);

        let scene = SceneRenderer::new(&ctx.device, &camera_layout, ctx.config.format, curve);

        Ok(Self {
            ctx,
            camera,
            depth_view,
            scene,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.ctx.config.width = width;
            self.ctx.config.height = height;
            self.ctx
                .surface
                .configure(&self.ctx.device, &self.ctx.config);

            let (_, depth_view) = create_depth_texture(&self.ctx.device, width, height);
            self.depth_view = depth_view;
        }
    }

    pub fn render_frame(&mut self, frame: &FrameScene) -> Result<(), wgpu::SurfaceError> {
        let aspect = self.ctx.config.width as f32 / self.ctx.config.height as f32;
        self.camera.upload(&self.ctx.queue, frame.view, aspect);

        let mut boxes: Vec<(Mat4, [f32; 4])> = Vec::with_capacity(1 + frame.obstacles.len());
        if let Some(pose) = &frame.car {
            boxes.push((
                box_model(pose.position, pose.rotation, CAR_HALF_EXTENTS),
                CAR_COLOR,
            ));
        }
        for (position, kind) in &frame.obstacles {
            let (half, color) = match kind {
                ObstacleKind::Lateral => (LATERAL_OBSTACLE_HALF, LATERAL_OBSTACLE_COLOR),
                ObstacleKind::Vertical => (VERTICAL_OBSTACLE_HALF, VERTICAL_OBSTACLE_COLOR),
            };
            boxes.push((box_model(*position, Quat::IDENTITY, half), color));
        }

        let output = self.ctx.surface.get_current_texture()?;
        let swapchain_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &swapchain_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.5,
                            g: 0.7,
                            b: 0.9,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            self.scene.render(
                &mut pass,
                &self.ctx.queue,
                &self.ctx.device,
                &self.camera.bind_group,
                &boxes,
            );
        }

        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    pub fn request_redraw(&self) {
        self.ctx.window.request_redraw();
    }
}
