//! Instanced 3D mesh rendering with depth testing.
//!
//! This module provides the [`MeshPass`] render pass, which draws every
//! [`InstanceBatch`] in one render pass: one indexed, instanced draw per
//! batch. It renders into the HDR scene target so bright surfaces can feed
//! the bloom that follows.
//!
//! # Architecture
//!
//! The mesh pass uses two bind groups:
//! - **Group 0**: Scene uniforms (view-projection, camera, time, lights, fog)
//! - **Group 1**: Material uniforms, one bind group per batch
//!
//! and two vertex buffers:
//! - **Slot 0**: [`Vertex3d`] per vertex
//! - **Slot 1**: [`InstanceRaw`] per instance
//!
//! # Draw Order
//!
//! Batches are drawn grouped by [`BlendMode`] in [`BlendMode::DRAW_ORDER`]:
//! opaque surfaces first with depth writes, then translucent and additive
//! surfaces that test against that depth without writing it.
//!
//! # Depth Buffer
//!
//! The mesh pass maintains its own depth buffer that follows the surface
//! size. Call [`MeshPass::ensure_depth_size`] before rendering if the window
//! may have been resized.

use crate::gpu::GpuContext;
use crate::lighting::SceneUniforms;
use crate::material::{BlendMode, Material, MaterialUniforms};
use crate::mesh::{InstanceRaw, Mesh, Vertex3d};

use wgpu::util::DeviceExt;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Instances that share one mesh and one material.
///
/// The instance buffer is sized once for `capacity` instances. Each frame the
/// owner uploads fresh model matrices with [`MeshQueue::upload`], which also
/// sets how many of them are drawn.
///
/// [`MeshQueue::upload`]: crate::render_graph::MeshQueue::upload
pub struct InstanceBatch {
    pub(crate) mesh: usize,
    pub(crate) instances: wgpu::Buffer,
    pub(crate) capacity: u32,
    pub(crate) count: u32,
    pub(crate) blend: BlendMode,
    material_bind_group: wgpu::BindGroup,
    // Keeps the material uniforms alive for the bind group
    _material_buffer: wgpu::Buffer,
}

/// Draws instanced batches into the HDR scene target.
///
/// `MeshPass` owns the three pipelines (one per [`BlendMode`]), the scene
/// uniform buffer and the depth texture. Material bind groups are created
/// through [`create_batch`](Self::create_batch) and live with their batch.
///
/// # Pipeline Configuration
///
/// - Back-face culling enabled (counter-clockwise front faces)
/// - Depth compare Less against a 32-bit float depth buffer
/// - Premultiplied-alpha output from the fragment shader
pub struct MeshPass {
    pipelines: [wgpu::RenderPipeline; 3],
    scene_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    material_layout: wgpu::BindGroupLayout,
    /// The depth texture used for depth testing.
    pub(crate) depth_texture: wgpu::Texture,
    /// View into the depth texture for render pass attachment.
    pub(crate) depth_view: wgpu::TextureView,
    depth_size: (u32, u32),
}

impl MeshPass {
    /// Creates the mesh pipelines, the scene uniform buffer and a depth
    /// buffer sized to the current surface.
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/mesh.wgsl").into()),
        });

        // Scene uniform buffer (group 0)
        let scene_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Uniforms"),
            size: std::mem::size_of::<SceneUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let scene_layout = uniform_layout(device, "Scene Bind Group Layout");
        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Bind Group"),
            layout: &scene_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_buffer.as_entire_binding(),
            }],
        });

        // Material uniforms (group 1), bound per batch
        let material_layout = uniform_layout(device, "Material Bind Group Layout");

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&scene_layout, &material_layout],
            push_constant_ranges: &[],
        });

        let pipelines = BlendMode::DRAW_ORDER
            .map(|blend| Self::create_pipeline(device, &pipeline_layout, &shader, blend));

        let (depth_texture, depth_view) = Self::create_depth_texture(gpu);

        Self {
            pipelines,
            scene_buffer,
            scene_bind_group,
            material_layout,
            depth_texture,
            depth_view,
            depth_size: (gpu.width(), gpu.height()),
        }
    }

    fn create_pipeline(
        device: &wgpu::Device,
        layout: &wgpu::PipelineLayout,
        shader: &wgpu::ShaderModule,
        blend: BlendMode,
    ) -> wgpu::RenderPipeline {
        let label = match blend {
            BlendMode::Opaque => "Mesh Pipeline (opaque)",
            BlendMode::Translucent => "Mesh Pipeline (translucent)",
            BlendMode::Additive => "Mesh Pipeline (additive)",
        };

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs"),
                buffers: &[Vertex3d::LAYOUT, InstanceRaw::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: GpuContext::HDR_FORMAT,
                    blend: Some(blend.blend_state()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: blend.writes_depth(),
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    fn create_depth_texture(gpu: &GpuContext) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: gpu.width(),
                height: gpu.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    /// Recreates the depth buffer if the surface size changed.
    pub fn ensure_depth_size(&mut self, gpu: &GpuContext) {
        if self.depth_size != (gpu.width(), gpu.height()) {
            let (texture, view) = Self::create_depth_texture(gpu);
            self.depth_texture = texture;
            self.depth_view = view;
            self.depth_size = (gpu.width(), gpu.height());
        }
    }

    /// Allocates an instance buffer for `capacity` instances of `mesh` and
    /// uploads `material` once.
    pub fn create_batch(
        &self,
        gpu: &GpuContext,
        mesh: usize,
        material: &Material,
        capacity: usize,
    ) -> InstanceBatch {
        let device = &gpu.device;
        let capacity = u32::try_from(capacity).unwrap_or(u32::MAX);

        // A zero-sized vertex buffer cannot be bound, so keep room for one
        let instances = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance Buffer"),
            size: std::mem::size_of::<InstanceRaw>() as u64 * capacity.max(1) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniforms: MaterialUniforms = material.uniforms();
        let material_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Material Uniforms"),
            contents: bytemuck::cast_slice(&[uniforms]),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let material_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material Bind Group"),
            layout: &self.material_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: material_buffer.as_entire_binding(),
            }],
        });

        InstanceBatch {
            mesh,
            instances,
            capacity,
            count: 0,
            blend: material.blend,
            material_bind_group,
            _material_buffer: material_buffer,
        }
    }

    /// Draws every non-empty batch, grouped by blend mode.
    ///
    /// The scene uniforms are written once here, before any draw is recorded.
    /// Batches pointing at an unknown mesh are skipped.
    pub fn render(
        &self,
        gpu: &GpuContext,
        render_pass: &mut wgpu::RenderPass,
        scene: &SceneUniforms,
        meshes: &[Mesh],
        batches: &[InstanceBatch],
    ) {
        gpu.queue
            .write_buffer(&self.scene_buffer, 0, bytemuck::cast_slice(&[*scene]));

        render_pass.set_bind_group(0, &self.scene_bind_group, &[]);

        for (pipeline, blend) in self.pipelines.iter().zip(BlendMode::DRAW_ORDER) {
            let mut bound = false;
            for batch in batches.iter().filter(|b| b.blend == blend && b.count > 0) {
                let Some(mesh) = meshes.get(batch.mesh) else {
                    continue;
                };
                if !bound {
                    render_pass.set_pipeline(pipeline);
                    bound = true;
                }
                render_pass.set_bind_group(1, &batch.material_bind_group, &[]);
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_vertex_buffer(1, batch.instances.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.index_count, 0, 0..batch.count);
            }
        }
    }
}

fn uniform_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}
