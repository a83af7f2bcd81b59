//! Instanced mesh rendering fed from shared batch storage.

use std::cell::RefCell;
use std::rc::Rc;

use crate::ecs::{BatchId, MeshId};
use crate::gpu::GpuContext;
use crate::lighting::Lighting;
use crate::material::Material;
use crate::mesh::{InstanceRaw, Mesh};
use crate::mesh_pass::{InstanceBatch, MeshPass};
use crate::render_graph::{RenderContext, RenderNode};

/// Shared storage for meshes and the instance batches drawn from them.
///
/// `MeshQueue` is wrapped in `Rc<RefCell<>>` and shared between the render
/// graph's [`MeshNode`] and the application, which uploads fresh instance
/// data into it every frame.
///
/// # Usage Pattern
///
/// ```ignore
/// // Setup: register meshes, then one batch per group
/// let queue = Rc::new(RefCell::new(MeshQueue::new()));
/// let leaf = queue.borrow_mut().add_mesh(Mesh::from_geometry(&gpu, &geometry));
/// let node = MeshNode::new(&gpu, Rc::clone(&queue), Lighting::default());
/// let leaves = node.add_batch(&gpu, leaf, &palette::leaf_light(), 2750);
///
/// // Each frame: upload the latest transforms
/// queue.borrow_mut().upload(&gpu, leaves, transforms.as_slice());
/// graph.render(&gpu, time, &camera, |_, _| {})?;
/// ```
#[derive(Default)]
pub struct MeshQueue {
    /// Registered meshes, indexed by the values returned from [`add_mesh`](Self::add_mesh).
    pub meshes: Vec<Mesh>,
    /// Instance batches, indexed by [`BatchId`].
    pub batches: Vec<InstanceBatch>,
}

impl MeshQueue {
    /// Creates a new empty mesh queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a mesh and returns a type-safe handle for later use.
    ///
    /// Meshes are stored permanently until the queue is dropped.
    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        let idx = self.meshes.len();
        self.meshes.push(mesh);
        MeshId(idx)
    }

    /// Stores a batch created by a [`MeshPass`].
    pub fn add_batch(&mut self, batch: InstanceBatch) -> BatchId {
        let idx = self.batches.len();
        self.batches.push(batch);
        BatchId(idx)
    }

    pub fn batch(&self, id: BatchId) -> Option<&InstanceBatch> {
        self.batches.get(id.0)
    }

    /// Replaces a batch's instances and sets how many are drawn.
    ///
    /// Instances past the batch capacity are dropped. Unknown ids are ignored.
    pub fn upload(&mut self, gpu: &GpuContext, id: BatchId, instances: &[InstanceRaw]) {
        let Some(batch) = self.batches.get_mut(id.0) else {
            log::warn!("upload to unknown batch {}", id.0);
            return;
        };

        let count = instances.len().min(batch.capacity as usize);
        if count < instances.len() {
            log::debug!(
                "batch {} holds {} instances, dropping {}",
                id.0,
                batch.capacity,
                instances.len() - count
            );
        }
        if count > 0 {
            gpu.queue.write_buffer(
                &batch.instances,
                0,
                bytemuck::cast_slice(&instances[..count]),
            );
        }
        batch.count = count as u32;
    }

    /// Total instances drawn per frame across every batch.
    pub fn instance_count(&self) -> u32 {
        self.batches.iter().map(|b| b.count).sum()
    }
}

/// Render node for instanced 3D meshes with depth testing.
///
/// `MeshNode` draws every batch in its associated [`MeshQueue`] into the HDR
/// scene target. It is meant to be the first node of the graph: it ignores
/// any input and clears the target to the fog color, so distant particles
/// fade into the background seamlessly.
///
/// # Example
///
/// ```ignore
/// let queue = Rc::new(RefCell::new(MeshQueue::new()));
/// let node = MeshNode::new(&gpu, Rc::clone(&queue), Lighting::default());
///
/// let graph = RenderGraph::builder()
///     .node(node)                                  // Scene into HDR target
///     .node(BloomNode::new(&gpu, bloom_config))    // Glow
///     .node(FinishNode::new(&gpu, vignette))       // Tonemap to screen
///     .build(&gpu);
/// ```
pub struct MeshNode {
    /// The mesh rendering pass with pipelines and depth buffer.
    pub pass: MeshPass,
    /// Shared queue containing meshes and batches.
    pub queue: Rc<RefCell<MeshQueue>>,
    /// Lights and fog applied to every lit batch.
    pub lighting: Lighting,
    clear_color: wgpu::Color,
}

impl MeshNode {
    /// Creates a new mesh render node that clears to the fog color.
    pub fn new(gpu: &GpuContext, queue: Rc<RefCell<MeshQueue>>, lighting: Lighting) -> Self {
        let [r, g, b, _] = lighting.fog.color.to_linear();
        Self {
            pass: MeshPass::new(gpu),
            queue,
            lighting,
            clear_color: wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: 1.0,
            },
        }
    }

    /// Creates a batch of up to `capacity` instances of `mesh` and stores it
    /// in the shared queue.
    pub fn add_batch(
        &self,
        gpu: &GpuContext,
        mesh: MeshId,
        material: &Material,
        capacity: usize,
    ) -> BatchId {
        let batch = self.pass.create_batch(gpu, mesh.0, material, capacity);
        self.queue.borrow_mut().add_batch(batch)
    }
}

impl RenderNode for MeshNode {
    fn execute(
        &self,
        ctx: &mut RenderContext,
        target: &wgpu::TextureView,
        _input: Option<&wgpu::TextureView>,
    ) {
        let queue = self.queue.borrow();
        let uniforms = self
            .lighting
            .uniforms(ctx.camera, ctx.gpu.aspect(), ctx.time);

        let mut render_pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Mesh Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.pass.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        self.pass.render(
            ctx.gpu,
            &mut render_pass,
            &uniforms,
            &queue.meshes,
            &queue.batches,
        );
    }

    fn prepare(&mut self, gpu: &GpuContext) {
        self.pass.ensure_depth_size(gpu);
    }
}
