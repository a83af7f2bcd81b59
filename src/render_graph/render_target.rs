//! Off-screen HDR textures passed between passes.

use crate::gpu::GpuContext;

/// An HDR texture that one pass draws into and the next one samples.
///
/// Always [`GpuContext::HDR_FORMAT`], so the scene can go above 1.0 until
/// the finish pass tone maps it.
pub struct RenderTarget {
    pub view: wgpu::TextureView,
    size: (u32, u32),
    _texture: wgpu::Texture,
}

impl RenderTarget {
    /// A target the size of the window.
    pub fn new(gpu: &GpuContext, label: &str) -> Self {
        Self::with_size(gpu, label, gpu.width(), gpu.height())
    }

    /// A target of the given size. Zero sizes become 1.
    pub fn with_size(gpu: &GpuContext, label: &str, width: u32, height: u32) -> Self {
        let size = nonzero_size(width, height);
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: GpuContext::HDR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        Self {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            size,
            _texture: texture,
        }
    }

    /// Recreate the texture if the window no longer matches it.
    pub fn follow_window(&mut self, gpu: &GpuContext, label: &str) {
        if self.size != nonzero_size(gpu.width(), gpu.height()) {
            *self = Self::new(gpu, label);
        }
    }
}

/// A minimized window reports 0x0, which no texture can have.
fn nonzero_size(width: u32, height: u32) -> (u32, u32) {
    (width.max(1), height.max(1))
}
