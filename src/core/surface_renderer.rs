use anyhow::{anyhow, bail, Result};
use std::sync::{Arc, Weak};
use wgpu::{BindGroup, BindGroupLayout, Device, RenderPipeline, Sampler, Surface, SurfaceConfiguration, Texture};
use winit::window::Window;

use super::frame::Bitmap;
use super::geometry::fit_centered;
use super::gpu_context::GpuContext;
use crate::traits::Painter;

/// Texture holding the bitmap currently on screen
struct FrameTexture {
    texture: Texture,
    bind_group: BindGroup,
    width: u32,
    height: u32,
    /// Bitmap last uploaded, to skip re-uploading on every tick
    source: Weak<Bitmap>,
}

/// Paints bitmaps into a window surface
///
/// Each new bitmap is uploaded into an RGBA texture, then drawn with a
/// fullscreen triangle clipped to a viewport that fits the bitmap into the
/// window (aspect ratio kept, centered, black bars around it).
pub struct SurfaceRenderer {
    gpu: GpuContext,
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,
    render_pipeline: RenderPipeline,
    bind_group_layout: BindGroupLayout,
    sampler: Sampler,
    frame: Option<FrameTexture>,
    margin: f32,
    minimized: bool,
}

impl SurfaceRenderer {
    /// Create a renderer drawing into `window`
    pub fn new(window: Arc<Window>, margin: f32) -> Result<Self> {
        let size = window.inner_size();
        let (gpu, surface, adapter) = GpuContext::for_window(window)?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| anyhow!("window surface reports no supported formats"))?;

        let surface_config = SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(gpu.device(), &surface_config);

        let bind_group_layout = Self::create_bind_group_layout(gpu.device());
        let render_pipeline =
            Self::create_render_pipeline(gpu.device(), &bind_group_layout, surface_format);
        let sampler = Self::create_sampler(gpu.device());

        Ok(Self {
            gpu,
            surface,
            surface_config,
            render_pipeline,
            bind_group_layout,
            sampler,
            frame: None,
            margin,
            minimized: size.width == 0 || size.height == 0,
        })
    }

    /// Current surface dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    /// Upload `bitmap` unless it is already the one in the frame texture
    fn upload(&mut self, bitmap: &Arc<Bitmap>) -> Result<()> {
        if let Some(frame) = &self.frame {
            if frame.source.ptr_eq(&Arc::downgrade(bitmap)) {
                return Ok(());
            }
        }

        let (width, height) = bitmap.dimensions();
        let max = self.gpu.device().limits().max_texture_dimension_2d;
        if width > max || height > max {
            bail!("bitmap {width}x{height} exceeds the device texture limit of {max}");
        }

        let frame = match self.frame.take() {
            Some(frame) if frame.width == width && frame.height == height => frame,
            _ => self.create_frame_texture(width, height),
        };

        self.gpu.queue().write_texture(
            frame.texture.as_image_copy(),
            bitmap.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        self.frame = Some(FrameTexture {
            source: Arc::downgrade(bitmap),
            ..frame
        });
        Ok(())
    }

    fn create_frame_texture(&self, width: u32, height: u32) -> FrameTexture {
        let texture = self.gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("Viewer Frame Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = self.gpu.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Viewer Frame Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        FrameTexture {
            texture,
            bind_group,
            width,
            height,
            source: Weak::new(),
        }
    }

    fn create_bind_group_layout(device: &Device) -> BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Viewer Frame Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        })
    }

    fn create_render_pipeline(
        device: &Device,
        bind_group_layout: &BindGroupLayout,
        surface_format: wgpu::TextureFormat,
    ) -> RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Viewer Display Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../display.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Viewer Pipeline Layout"),
            bind_group_layouts: &[bind_group_layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Viewer Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
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
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    fn create_sampler(device: &Device) -> Sampler {
        device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Viewer Frame Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        })
    }
}

impl Painter for SurfaceRenderer {
    fn paint(&mut self, bitmap: &Arc<Bitmap>) -> Result<()> {
        if self.minimized {
            return Ok(());
        }

        self.upload(bitmap)?;

        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                // picked up again on the next tick
                self.surface.configure(self.gpu.device(), &self.surface_config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => return Ok(()),
            Err(err) => bail!("failed to acquire surface texture: {err}"),
        };
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let placement = fit_centered(bitmap.dimensions(), self.dimensions(), self.margin);

        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Viewer Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Viewer Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(frame) = &self.frame {
                if placement.width >= 1.0 && placement.height >= 1.0 {
                    render_pass.set_viewport(
                        placement.x,
                        placement.y,
                        placement.width,
                        placement.height,
                        0.0,
                        1.0,
                    );
                    render_pass.set_pipeline(&self.render_pipeline);
                    render_pass.set_bind_group(0, &frame.bind_group, &[]);
                    render_pass.draw(0..3, 0..1); // Fullscreen triangle
                }
            }
        }

        self.gpu.queue().submit(Some(encoder.finish()));
        surface_texture.present();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.minimized = width == 0 || height == 0;
        if self.minimized {
            return;
        }

        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(self.gpu.device(), &self.surface_config);
    }
}
