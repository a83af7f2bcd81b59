//! Runs the passes of a frame in order and hands the overlay the final image.

use crate::camera::Camera;
use crate::gpu::GpuContext;
use crate::render_graph::{RenderContext, RenderNode, RenderTarget};

const SCRATCH_LABELS: [&str; 2] = ["Scratch Target 0", "Scratch Target 1"];

/// Collects passes for a [`RenderGraph`].
///
/// ```ignore
/// let graph = RenderGraph::builder()
///     .node(mesh_node)
///     .node(BloomNode::new(&gpu, &config.bloom))
///     .node(FinishNode::new(&gpu, &config.vignette))
///     .build(&gpu);
/// ```
#[derive(Default)]
pub struct RenderGraphBuilder {
    nodes: Vec<Box<dyn RenderNode>>,
}

impl RenderGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pass. It reads what the pass before it wrote.
    pub fn node<N: RenderNode + 'static>(mut self, node: N) -> Self {
        self.nodes.push(Box::new(node));
        self
    }

    pub fn build(self, gpu: &GpuContext) -> RenderGraph {
        RenderGraph {
            nodes: self.nodes,
            scratch: SCRATCH_LABELS.map(|label| RenderTarget::new(gpu, label)),
        }
    }
}

/// A fixed chain of passes ending on the window surface.
///
/// Passes in the middle of the chain alternate between two window-sized
/// scratch targets, so no pass samples the texture it is drawing into:
///
/// ```text
/// scene -> scratch 0 -> bloom -> scratch 1 -> finish -> surface -> overlay
/// ```
pub struct RenderGraph {
    nodes: Vec<Box<dyn RenderNode>>,
    scratch: [RenderTarget; 2],
}

/// Where a pass writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Output {
    Scratch(usize),
    Surface,
}

/// The last of `len` passes draws to the surface, the rest take turns on
/// the scratch targets.
fn output_of(index: usize, len: usize) -> Output {
    if index + 1 >= len {
        Output::Surface
    } else {
        Output::Scratch(index % 2)
    }
}

impl RenderGraph {
    pub fn builder() -> RenderGraphBuilder {
        RenderGraphBuilder::new()
    }

    /// Record and present one frame, then let `overlay` draw on top of it.
    ///
    /// The overlay pass loads the finished image instead of clearing it.
    ///
    /// # Errors
    ///
    /// Returns the surface error when no frame could be acquired. Nothing is
    /// recorded in that case.
    pub fn render<F>(
        &mut self,
        gpu: &GpuContext,
        time: f32,
        camera: &Camera,
        overlay: F,
    ) -> Result<(), wgpu::SurfaceError>
    where
        F: FnOnce(&GpuContext, &mut wgpu::RenderPass),
    {
        for node in &mut self.nodes {
            node.prepare(gpu);
        }
        for (target, label) in self.scratch.iter_mut().zip(SCRATCH_LABELS) {
            target.follow_window(gpu, label);
        }

        let frame = gpu.surface.get_current_texture()?;
        let surface = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let mut ctx = RenderContext {
            gpu,
            encoder: &mut encoder,
            time,
            camera,
        };
        let mut previous = None;
        for (index, node) in self.nodes.iter().enumerate() {
            let target = match output_of(index, self.nodes.len()) {
                Output::Scratch(slot) => &self.scratch[slot].view,
                Output::Surface => &surface,
            };
            node.execute(&mut ctx, target, previous);
            previous = Some(target);
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Overlay Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &surface,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        overlay(gpu, &mut pass);
        drop(pass);

        gpu.queue.submit([encoder.finish()]);
        frame.present();
        Ok(())
    }
}
