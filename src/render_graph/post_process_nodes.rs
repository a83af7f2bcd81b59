//! Post-processing render nodes: bloom, then the final tone-mapped image.

use crate::config::{BloomConfig, VignetteConfig};
use crate::gpu::GpuContext;
use crate::post_process::{BloomPass, FinishPass};
use crate::render_graph::{RenderContext, RenderNode};

/// Adds bloom to the HDR image from the previous pass. The result is still
/// HDR and needs a [`FinishNode`] after it.
pub struct BloomNode {
    pass: BloomPass,
}

impl BloomNode {
    pub fn new(gpu: &GpuContext, config: &BloomConfig) -> Self {
        Self {
            pass: BloomPass::new(gpu, config),
        }
    }
}

impl RenderNode for BloomNode {
    fn execute(
        &self,
        ctx: &mut RenderContext,
        target: &wgpu::TextureView,
        input: Option<&wgpu::TextureView>,
    ) {
        let Some(input_view) = input else {
            log::warn!("BloomNode has no input from a previous pass, skipping");
            return;
        };
        self.pass.render(ctx.gpu, ctx.encoder, input_view, target);
    }

    fn prepare(&mut self, gpu: &GpuContext) {
        self.pass.ensure_size(gpu);
    }
}

/// Vignettes and tone maps the previous pass onto the surface.
pub struct FinishNode {
    pass: FinishPass,
}

impl FinishNode {
    pub fn new(gpu: &GpuContext, vignette: &VignetteConfig) -> Self {
        Self {
            pass: FinishPass::new(gpu, vignette),
        }
    }
}

impl RenderNode for FinishNode {
    fn execute(
        &self,
        ctx: &mut RenderContext,
        target: &wgpu::TextureView,
        input: Option<&wgpu::TextureView>,
    ) {
        let Some(input_view) = input else {
            log::warn!("FinishNode has no input from a previous pass, skipping");
            return;
        };
        self.pass.render(ctx.gpu, ctx.encoder, input_view, target);
    }
}
