//! Core GPU context and device management.
//!
//! [`GpuContext`] holds the wgpu resources every pass needs: device, queue,
//! surface and surface configuration. It is created once per window and
//! passed by reference to all rendering code.
//!
//! Scene rendering happens in [`GpuContext::HDR_FORMAT`] offscreen targets;
//! only the final post-process node writes the surface format.

use std::sync::Arc;
use winit::window::Window;

/// Errors that can occur while bringing up the GPU.
#[derive(Debug)]
pub enum GpuError {
    /// The window could not back a presentation surface.
    Surface(wgpu::CreateSurfaceError),
    /// No adapter can render to the surface.
    Adapter(wgpu::RequestAdapterError),
    /// The adapter refused to open a device.
    Device(wgpu::RequestDeviceError),
    /// The surface reports no usable texture format.
    NoSurfaceFormat,
}

impl std::fmt::Display for GpuError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuError::Surface(e) => write!(f, "could not create surface: {}", e),
            GpuError::Adapter(e) => write!(f, "no suitable GPU adapter: {}", e),
            GpuError::Device(e) => write!(f, "could not create device: {}", e),
            GpuError::NoSurfaceFormat => write!(f, "surface supports no texture formats"),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::Surface(e) => Some(e),
            GpuError::Adapter(e) => Some(e),
            GpuError::Device(e) => Some(e),
            GpuError::NoSurfaceFormat => None,
        }
    }
}

/// Core GPU context holding wgpu resources.
///
/// All fields are public to allow direct access to wgpu APIs when needed.
pub struct GpuContext {
    /// The surface for presenting rendered frames to the window.
    pub surface: wgpu::Surface<'static>,
    /// The logical GPU device for creating resources and pipelines.
    pub device: wgpu::Device,
    /// The command queue for submitting work to the GPU.
    pub queue: wgpu::Queue,
    /// Current surface configuration (format, size, present mode).
    pub config: wgpu::SurfaceConfiguration,
}

impl GpuContext {
    /// Format of every offscreen scene and bloom target.
    pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

    /// Create a new GPU context from a winit window.
    ///
    /// Picks the primary backend, an sRGB surface format when one is offered,
    /// and Fifo presentation.
    pub fn new(window: Arc<Window>) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window).map_err(GpuError::Surface)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(GpuError::Adapter)?;

        log::info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Tinsel Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
            experimental_features: Default::default(),
        }))
        .map_err(GpuError::Device)?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(GpuError::NoSurfaceFormat)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            surface,
            device,
            queue,
            config,
        })
    }

    /// Resize the surface to new dimensions.
    ///
    /// Zero-sized dimensions (a minimized window) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Reapplies the current configuration after the surface was lost.
    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Returns the current surface width in pixels.
    pub fn width(&self) -> u32 {
        self.config.width
    }

    /// Returns the current surface height in pixels.
    pub fn height(&self) -> u32 {
        self.config.height
    }

    /// Returns the current aspect ratio (width / height).
    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height as f32
    }
}
