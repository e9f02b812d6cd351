//! GPU device, adapter, queue, and surface bring-up.

use std::sync::Arc;

use winit::window::Window;

use crate::error::GpuError;

/// Device-level wgpu state plus the window surface it was chosen for.
pub struct GpuState {
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,
    /// The native surface format (used for surface configuration).
    pub(crate) surface_format: wgpu::TextureFormat,
    pub(crate) surface_alpha_mode: wgpu::CompositeAlphaMode,
    adapter_name: String,
}

impl GpuState {
    /// Initialize GPU: create instance, surface, adapter, device, queue.
    ///
    /// Prefers the primary backends (Vulkan, DX12, Metal), falling back to
    /// secondary ones (GL).
    pub fn new(window: &Arc<Window>) -> Result<(Self, wgpu::Surface<'static>), GpuError> {
        if let Some(state) = Self::try_init(window, wgpu::Backends::PRIMARY) {
            return Ok(state);
        }
        log::warn!("gpu: no primary backend available, trying secondary backends");
        Self::try_init(window, wgpu::Backends::SECONDARY).ok_or_else(|| {
            GpuError::Backend("failed to initialize GPU with any backend".to_owned())
        })
    }

    fn try_init(
        window: &Arc<Window>,
        backends: wgpu::Backends,
    ) -> Option<(Self, wgpu::Surface<'static>)> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone()).ok()?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|e| log::warn!("gpu: no adapter for {backends:?}: {e}"))
        .ok()?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("oriterm_atlas"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            ..Default::default()
        }))
        .map_err(|e| log::warn!("gpu: device request failed: {e}"))
        .ok()?;

        let caps = surface.get_capabilities(&adapter);
        // Non-sRGB format: cell colors are already sRGB, avoid double gamma.
        let surface_format = caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()?;
        let surface_alpha_mode = caps.alpha_modes.first().copied()?;

        let info = adapter.get_info();
        log::info!(
            "gpu init: adapter={}, backend={:?}, format={surface_format:?}, alpha={surface_alpha_mode:?}",
            info.name,
            info.backend,
        );

        Some((
            Self {
                device,
                queue,
                surface_format,
                surface_alpha_mode,
                adapter_name: info.name,
            },
            surface,
        ))
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// Surface configuration for a `width` × `height` surface.
    pub fn surface_config(&self, width: u32, height: u32, vsync: bool) -> wgpu::SurfaceConfiguration {
        wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: self.surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: if vsync {
                wgpu::PresentMode::Fifo
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode: self.surface_alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        }
    }
}
