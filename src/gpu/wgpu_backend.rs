//! [`GpuBackend`] over wgpu and a winit window surface.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use winit::window::Window;

use crate::config::RenderConfig;
use crate::error::GpuError;
use crate::geometry::{PixelRect, PixelSize};

use super::backend::{DrawCall, GpuBackend, PresentParams};
use super::frame_signal::FrameSignal;
use super::pipeline::{
    UNIFORM_SIZE, create_atlas_bind_group_layout, create_text_pipeline_checked,
    create_uniform_bind_group_layout, uniform_bytes,
};
use super::quad_writer::QUAD_STRIDE;
use super::state::GpuState;

/// Slice length for polling the device while waiting on the frame signal.
const LATENCY_POLL_SLICE: Duration = Duration::from_millis(1);

/// Glyph atlas texture and the bind group sampling it.
pub struct WgpuAtlas {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

pub struct WgpuVertexBuffer {
    buffer: wgpu::Buffer,
}

/// wgpu device, window surface and text pipeline.
pub struct WgpuBackend {
    gpu: GpuState,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    vsync: bool,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    atlas_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    background: wgpu::Color,
    /// Rendered but not yet presented surface image.
    pending: Option<wgpu::SurfaceTexture>,
    frame_signal: Arc<FrameSignal>,
    device_lost: Arc<AtomicBool>,
    started: Instant,
}

impl WgpuBackend {
    pub fn new(window: &Arc<Window>, render: &RenderConfig) -> Result<Self, GpuError> {
        let (gpu, surface) = GpuState::new(window)?;
        let size = window.inner_size();
        let vsync = render.present.vsync;
        let config = gpu.surface_config(size.width, size.height, vsync);
        surface.configure(&gpu.device, &config);

        let device = &gpu.device;
        let uniform_layout = create_uniform_bind_group_layout(device);
        let atlas_layout = create_atlas_bind_group_layout(device);
        let custom = render.custom_shader_source();
        let pipeline = create_text_pipeline_checked(
            device,
            gpu.surface_format,
            &uniform_layout,
            &atlas_layout,
            custom.as_deref(),
        )?;

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("uniform_buffer"),
            size: UNIFORM_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("glyph_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            // Quads map 1:1 to atlas texels.
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let device_lost = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&device_lost);
        device.set_device_lost_callback(move |reason, msg| {
            log::error!("gpu: device lost ({reason:?}): {msg}");
            flag.store(true, Ordering::Release);
        });

        let [r, g, b, a] = render.present.background_rgba();
        let background = wgpu::Color {
            r: f64::from(r),
            g: f64::from(g),
            b: f64::from(b),
            a: f64::from(a),
        };

        Ok(Self {
            gpu,
            surface,
            config,
            vsync,
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            atlas_layout,
            sampler,
            background,
            pending: None,
            frame_signal: Arc::new(FrameSignal::new(true)),
            device_lost,
            started: Instant::now(),
        })
    }

    pub fn adapter_name(&self) -> &str {
        self.gpu.adapter_name()
    }

    fn acquire(&mut self) -> Result<wgpu::SurfaceTexture, GpuError> {
        match self.surface.get_current_texture() {
            Ok(frame) => Ok(frame),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.gpu.device, &self.config);
                Err(GpuError::SurfaceLost)
            }
            Err(wgpu::SurfaceError::Timeout) => Err(GpuError::Timeout),
            Err(wgpu::SurfaceError::OutOfMemory) => Err(GpuError::OutOfMemory),
            Err(e) => Err(GpuError::Backend(e.to_string())),
        }
    }

    /// Clear the next surface image and draw `call`'s quads into it. The
    /// image is kept in `pending` until presented.
    fn render(&mut self, call: &DrawCall<'_, WgpuAtlas, WgpuVertexBuffer>) -> Result<(), GpuError> {
        if self.device_lost.load(Ordering::Acquire) {
            return Err(GpuError::DeviceLost);
        }
        // A frame rendered but never presented is dropped here.
        self.pending = None;
        let frame = self.acquire()?;

        let uniforms = uniform_bytes(
            call.viewport.width.max(1) as f32,
            call.viewport.height.max(1) as f32,
            self.started.elapsed().as_secs_f32(),
        );
        self.gpu.queue.write_buffer(&self.uniform_buffer, 0, &uniforms);

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("text_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.background),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            if call.quad_count > 0 {
                rpass.set_viewport(
                    0.0,
                    0.0,
                    self.config.width as f32,
                    self.config.height as f32,
                    0.0,
                    1.0,
                );
                rpass.set_pipeline(&self.pipeline);
                rpass.set_bind_group(0, &self.uniform_bind_group, &[]);
                rpass.set_bind_group(1, &call.atlas.bind_group, &[]);
                rpass.set_vertex_buffer(0, call.vertices.buffer.slice(..));
                rpass.draw(0..4, 0..call.quad_count);
            }
        }
        self.gpu.queue.submit(std::iter::once(encoder.finish()));

        let signal = Arc::clone(&self.frame_signal);
        self.gpu
            .queue
            .on_submitted_work_done(move || signal.signal());

        self.pending = Some(frame);
        Ok(())
    }
}

impl GpuBackend for WgpuBackend {
    type Atlas = WgpuAtlas;
    type VertexBuffer = WgpuVertexBuffer;

    fn create_atlas(&mut self, size: u32) -> Result<WgpuAtlas, GpuError> {
        let device = &self.gpu.device;
        let max = device.limits().max_texture_dimension_2d;
        if size > max {
            return Err(GpuError::Backend(format!(
                "atlas size {size} exceeds device limit {max}"
            )));
        }
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("glyph_atlas"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("atlas_bind_group"),
            layout: &self.atlas_layout,
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
        log::debug!("gpu: created {size}x{size} glyph atlas");
        Ok(WgpuAtlas {
            texture,
            bind_group,
        })
    }

    fn upload_atlas_region(
        &mut self,
        atlas: &WgpuAtlas,
        rect: PixelRect,
        pixels: &[u8],
    ) -> Result<(), GpuError> {
        let (w, h) = (rect.width(), rect.height());
        if w == 0 || h == 0 {
            return Ok(());
        }
        if pixels.len() < (w * h) as usize {
            return Err(GpuError::Backend(format!(
                "atlas upload of {w}x{h} got {} bytes",
                pixels.len()
            )));
        }
        self.gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &atlas.texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: rect.left as u32,
                    y: rect.top as u32,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(w),
                rows_per_image: Some(h),
            },
            wgpu::Extent3d {
                width: w,
                height: h,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn create_vertex_buffer(&mut self, capacity: u64) -> Result<WgpuVertexBuffer, GpuError> {
        let buffer = self.gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("glyph_quads"),
            size: capacity.max(QUAD_STRIDE),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok(WgpuVertexBuffer { buffer })
    }

    fn vertex_buffer_capacity(&self, buffer: &WgpuVertexBuffer) -> u64 {
        buffer.buffer.size()
    }

    fn write_vertices(&mut self, buffer: &WgpuVertexBuffer, bytes: &[u8]) -> Result<(), GpuError> {
        if bytes.len() as u64 > buffer.buffer.size() {
            return Err(GpuError::Backend("vertex data exceeds buffer".to_owned()));
        }
        if !bytes.is_empty() {
            self.gpu.queue.write_buffer(&buffer.buffer, 0, bytes);
        }
        Ok(())
    }

    fn draw(&mut self, call: DrawCall<'_, WgpuAtlas, WgpuVertexBuffer>) -> Result<(), GpuError> {
        self.render(&call)
    }

    fn present(&mut self, params: &PresentParams) -> Result<(), GpuError> {
        let Some(frame) = self.pending.take() else {
            return Ok(());
        };
        // Swapchain presents are whole-frame; the partial region is informational.
        match params {
            PresentParams::Full => log::trace!("gpu: present full"),
            PresentParams::Partial { dirty, scroll } => {
                log::trace!("gpu: present dirty={dirty:?} scroll={scroll:?}");
            }
        }
        frame.present();
        Ok(())
    }

    fn resize(&mut self, size: PixelSize) -> Result<(), GpuError> {
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }
        self.pending = None;
        self.config = self.gpu.surface_config(size.width, size.height, self.vsync);
        self.surface.configure(&self.gpu.device, &self.config);
        log::debug!("gpu: surface resized to {}x{}", size.width, size.height);
        Ok(())
    }

    fn wait_for_frame_latency(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            // Completion callbacks only fire while the device is polled.
            let _ = self.gpu.device.poll(wgpu::PollType::Poll);
            if self.frame_signal.try_take() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            if self.frame_signal.wait(LATENCY_POLL_SLICE.min(deadline - now)) {
                return true;
            }
        }
    }

    fn is_adapter_current(&self) -> bool {
        !self.device_lost.load(Ordering::Acquire)
    }
}
