//! The pass interface and the per-frame state handed to each pass.

use crate::camera::Camera;
use crate::gpu::GpuContext;

/// Everything a pass may touch while recording one frame.
pub struct RenderContext<'a> {
    pub gpu: &'a GpuContext,
    /// Shared by every pass; submitted once after the overlay.
    pub encoder: &'a mut wgpu::CommandEncoder,
    /// Seconds since startup.
    pub time: f32,
    pub camera: &'a Camera,
}

/// One pass of the frame.
///
/// A pass draws into `target`. Every pass but the first also gets the image
/// the previous pass produced as `input`; the scene pass ignores it, while
/// bloom and finish cannot work without it.
pub trait RenderNode {
    fn execute(
        &self,
        ctx: &mut RenderContext,
        target: &wgpu::TextureView,
        input: Option<&wgpu::TextureView>,
    );

    /// Runs before any pass records, so window-sized resources can follow a resize.
    fn prepare(&mut self, _gpu: &GpuContext) {}
}
