//! Screen-space passes that turn the HDR scene into the final image.
//!
//! - [`BloomPass`]: bright-pass into a mip chain, blurred down and back up,
//!   added onto the scene
//! - [`FinishPass`]: vignette, ACES filmic tone mapping and sRGB encoding

use wgpu::util::DeviceExt;

use crate::config::{BloomConfig, VignetteConfig};
use crate::gpu::GpuContext;
use crate::render_graph::RenderTarget;

/// Deepest mip chain the bloom builds.
pub const MAX_BLOOM_LEVELS: u32 = 8;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BloomUniforms {
    pub threshold: f32,
    pub smoothing: f32,
    pub intensity: f32,
    pub _padding: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FinishUniforms {
    pub offset: f32,
    pub darkness: f32,
    pub exposure: f32,
    /// 1.0 when the shader must encode sRGB itself.
    pub encode_srgb: f32,
}

/// Mip-chain bloom.
///
/// Pixels whose luminance clears `threshold` are copied into the first mip at
/// half resolution, then each level is downsampled with a 13-tap filter. On
/// the way back up every level is blended with the tent-filtered level below
/// it, weighted by `radius`. The result is added onto the scene scaled by
/// `intensity`.
pub struct BloomPass {
    prefilter: wgpu::RenderPipeline,
    downsample: wgpu::RenderPipeline,
    upsample: wgpu::RenderPipeline,
    composite: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    sample_layout: wgpu::BindGroupLayout,
    composite_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    mips: Vec<RenderTarget>,
    levels: u32,
    radius: f32,
    size: (u32, u32),
}

impl BloomPass {
    pub fn new(gpu: &GpuContext, config: &BloomConfig) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Bloom Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/bloom.wgsl").into()),
        });

        // Constant for the lifetime of the pass, so written once
        let uniforms = BloomUniforms {
            threshold: config.threshold,
            smoothing: config.smoothing.max(1e-4),
            intensity: config.intensity,
            _padding: 0.0,
        };
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Bloom Uniforms"),
            contents: bytemuck::cast_slice(&[uniforms]),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let sampler = linear_sampler(device, "Bloom Sampler");
        let sample_layout = texture_layout(device, "Bloom Bind Group Layout", false);
        let composite_layout = texture_layout(device, "Bloom Composite Bind Group Layout", true);

        let sample_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Bloom Pipeline Layout"),
            bind_group_layouts: &[&sample_layout],
            push_constant_ranges: &[],
        });
        let composite_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Bloom Composite Pipeline Layout"),
                bind_group_layouts: &[&composite_layout],
                push_constant_ranges: &[],
            });

        let hdr = GpuContext::HDR_FORMAT;
        let replace = wgpu::BlendState::REPLACE;
        // dst = src * radius + dst * (1 - radius), radius set per pass
        let mix = wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::Constant,
            dst_factor: wgpu::BlendFactor::OneMinusConstant,
            operation: wgpu::BlendOperation::Add,
        };
        let mix = wgpu::BlendState {
            color: mix,
            alpha: mix,
        };

        let prefilter = fullscreen_pipeline(
            device,
            &sample_pipeline_layout,
            &shader,
            "fs_prefilter",
            hdr,
            replace,
        );
        let downsample = fullscreen_pipeline(
            device,
            &sample_pipeline_layout,
            &shader,
            "fs_downsample",
            hdr,
            replace,
        );
        let upsample = fullscreen_pipeline(
            device,
            &sample_pipeline_layout,
            &shader,
            "fs_upsample",
            hdr,
            mix,
        );
        let composite = fullscreen_pipeline(
            device,
            &composite_pipeline_layout,
            &shader,
            "fs_composite",
            hdr,
            replace,
        );

        let levels = config.levels.clamp(1, MAX_BLOOM_LEVELS);
        if levels != config.levels {
            log::warn!(
                "bloom levels {} out of range, using {}",
                config.levels,
                levels
            );
        }

        let size = (gpu.width(), gpu.height());
        Self {
            prefilter,
            downsample,
            upsample,
            composite,
            uniform_buffer,
            sample_layout,
            composite_layout,
            sampler,
            mips: create_mips(gpu, size, levels),
            levels,
            radius: config.radius.clamp(0.0, 1.0),
            size,
        }
    }

    /// Rebuilds the mip chain if the surface size changed.
    pub fn ensure_size(&mut self, gpu: &GpuContext) {
        let size = (gpu.width(), gpu.height());
        if self.size != size {
            self.mips = create_mips(gpu, size, self.levels);
            self.size = size;
        }
    }

    fn sample_group(&self, gpu: &GpuContext, view: &wgpu::TextureView) -> wgpu::BindGroup {
        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Bloom Bind Group"),
            layout: &self.sample_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    /// Records the whole bloom chain, writing `input + bloom` into `target`.
    pub fn render(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        input: &wgpu::TextureView,
        target: &wgpu::TextureView,
    ) {
        let Some(first) = self.mips.first() else {
            return;
        };

        // Bright-pass into the first mip
        let group = self.sample_group(gpu, input);
        fullscreen_pass(
            encoder,
            "Bloom Prefilter",
            &first.view,
            wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            &self.prefilter,
            &group,
            None,
        );

        // Down the chain
        for pair in self.mips.windows(2) {
            let group = self.sample_group(gpu, &pair[0].view);
            fullscreen_pass(
                encoder,
                "Bloom Downsample",
                &pair[1].view,
                wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                &self.downsample,
                &group,
                None,
            );
        }

        // Back up, blending each level into the one above it
        for pair in self.mips.windows(2).rev() {
            let group = self.sample_group(gpu, &pair[1].view);
            fullscreen_pass(
                encoder,
                "Bloom Upsample",
                &pair[0].view,
                wgpu::LoadOp::Load,
                &self.upsample,
                &group,
                Some(self.radius as f64),
            );
        }

        let composite_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Bloom Composite Bind Group"),
            layout: &self.composite_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(input),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&first.view),
                },
            ],
        });
        fullscreen_pass(
            encoder,
            "Bloom Composite",
            target,
            wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            &self.composite,
            &composite_group,
            None,
        );
    }
}

/// Vignette, tone mapping and output encoding, rendered to the surface.
pub struct FinishPass {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

impl FinishPass {
    pub fn new(gpu: &GpuContext, vignette: &VignetteConfig) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Finish Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/finish.wgsl").into()),
        });

        let encode_srgb = !gpu.config.format.is_srgb();
        if encode_srgb {
            log::debug!(
                "surface format {:?} is linear, encoding sRGB in the shader",
                gpu.config.format
            );
        }

        let uniforms = FinishUniforms {
            offset: vignette.offset,
            darkness: vignette.darkness,
            exposure: 1.0,
            encode_srgb: if encode_srgb { 1.0 } else { 0.0 },
        };
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Finish Uniforms"),
            contents: bytemuck::cast_slice(&[uniforms]),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let sampler = linear_sampler(device, "Finish Sampler");
        let bind_group_layout = texture_layout(device, "Finish Bind Group Layout", false);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Finish Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = fullscreen_pipeline(
            device,
            &pipeline_layout,
            &shader,
            "fs",
            gpu.config.format,
            wgpu::BlendState::REPLACE,
        );

        Self {
            pipeline,
            uniform_buffer,
            bind_group_layout,
            sampler,
        }
    }

    pub fn render(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        input: &wgpu::TextureView,
        target: &wgpu::TextureView,
    ) {
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Finish Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(input),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        fullscreen_pass(
            encoder,
            "Finish Pass",
            target,
            wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            &self.pipeline,
            &bind_group,
            None,
        );
    }
}

/// Sizes of each bloom mip for a `width` x `height` surface. The first level
/// is half resolution; no level is smaller than 1x1.
pub fn mip_sizes(width: u32, height: u32, levels: u32) -> Vec<(u32, u32)> {
    (1..=levels)
        .map(|level| ((width >> level).max(1), (height >> level).max(1)))
        .collect()
}

fn create_mips(gpu: &GpuContext, size: (u32, u32), levels: u32) -> Vec<RenderTarget> {
    mip_sizes(size.0, size.1, levels)
        .into_iter()
        .map(|(w, h)| RenderTarget::with_size(gpu, "Bloom Mip", w, h))
        .collect()
}

fn linear_sampler(device: &wgpu::Device, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

/// Uniforms at binding 0, a texture at 1, a sampler at 2 and, for the bloom
/// composite, a second texture at 3.
fn texture_layout(device: &wgpu::Device, label: &str, second_texture: bool) -> wgpu::BindGroupLayout {
    let texture = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    };

    let mut entries = vec![
        wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        },
        texture(1),
        wgpu::BindGroupLayoutEntry {
            binding: 2,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        },
    ];
    if second_texture {
        entries.push(texture(3));
    }

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &entries,
    })
}

fn fullscreen_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    entry_point: &str,
    format: wgpu::TextureFormat,
    blend: wgpu::BlendState,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(entry_point),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(entry_point),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(blend),
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

fn fullscreen_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    load: wgpu::LoadOp<wgpu::Color>,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
    blend_constant: Option<f64>,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    if let Some(c) = blend_constant {
        pass.set_blend_constant(wgpu::Color { r: c, g: c, b: c, a: c });
    }
    pass.draw(0..3, 0..1);
}

#[cfg(test)]
mod tests {
    use glam::{Mat3, Vec2, Vec3};

    use super::*;

    // CPU copies of the curves in `bloom.wgsl` and `finish.wgsl`

    /// Rec. 709 luminance.
    fn luminance(color: Vec3) -> f32 {
        color.dot(Vec3::new(0.2126, 0.7152, 0.0722))
    }

    /// How much of a pixel the bloom bright-pass keeps.
    fn bright_pass(color: Vec3, threshold: f32, smoothing: f32) -> f32 {
        hermite(threshold, threshold + smoothing.max(1e-4), luminance(color))
    }

    /// Brightness multiplier of the vignette at `uv` in `[0, 1]^2`.
    ///
    /// The edges run backwards: full brightness near the center, fading to
    /// black toward the corners.
    fn vignette(uv: Vec2, offset: f32, darkness: f32) -> f32 {
        let d = uv.distance(Vec2::splat(0.5)) * (darkness + offset);
        hermite(0.8, offset * 0.799, d)
    }

    /// The fitted ACES filmic curve, mapping linear HDR color into `[0, 1]`.
    fn aces_filmic(color: Vec3, exposure: f32) -> Vec3 {
        let input = Mat3::from_cols(
            Vec3::new(0.59719, 0.07600, 0.02840),
            Vec3::new(0.35458, 0.90834, 0.13383),
            Vec3::new(0.04823, 0.01566, 0.83777),
        );
        let output = Mat3::from_cols(
            Vec3::new(1.60475, -0.10208, -0.00327),
            Vec3::new(-0.53108, 1.10813, -0.07276),
            Vec3::new(-0.07367, -0.00605, 1.07602),
        );
        let v = input * (color * exposure / 0.6);
        let a = v * (v + 0.0245786) - 0.000090537;
        let b = v * (0.983729 * v + 0.4329510) + 0.238081;
        (output * (a / b)).clamp(Vec3::ZERO, Vec3::ONE)
    }

    fn hermite(edge0: f32, edge1: f32, x: f32) -> f32 {
        let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
        t * t * (3.0 - 2.0 * t)
    }

    #[test]
    fn mips_halve_down_to_one_pixel() {
        assert_eq!(
            mip_sizes(1280, 720, 5),
            vec![(640, 360), (320, 180), (160, 90), (80, 45), (40, 22)]
        );
        assert_eq!(mip_sizes(8, 3, 4), vec![(4, 1), (2, 1), (1, 1), (1, 1)]);
        assert!(mip_sizes(800, 600, 0).is_empty());
    }

    #[test]
    fn bright_pass_keeps_only_glowing_pixels() {
        let config = BloomConfig::default();
        assert_eq!(bright_pass(Vec3::splat(0.9), config.threshold, config.smoothing), 0.0);
        assert_eq!(bright_pass(Vec3::splat(2.0), config.threshold, config.smoothing), 1.0);
        let edge = bright_pass(Vec3::splat(1.21), config.threshold, config.smoothing);
        assert!(edge > 0.0 && edge < 1.0);
    }

    #[test]
    fn vignette_darkens_corners_only() {
        let config = VignetteConfig::default();
        assert_eq!(vignette(Vec2::splat(0.5), config.offset, config.darkness), 1.0);
        assert_eq!(vignette(Vec2::ZERO, config.offset, config.darkness), 0.0);
        let mid = vignette(Vec2::new(0.5, 0.9), config.offset, config.darkness);
        let far = vignette(Vec2::new(0.5, 1.0), config.offset, config.darkness);
        assert!(mid > far);
    }

    #[test]
    fn aces_maps_hdr_into_unit_range() {
        let black = aces_filmic(Vec3::ZERO, 1.0);
        assert!(black.max_element() < 1e-3);

        let mut last = 0.0;
        for step in 1..40 {
            let v = aces_filmic(Vec3::splat(step as f32 * 0.5), 1.0).x;
            assert!(v >= last && v <= 1.0);
            last = v;
        }
        assert!(last > 0.95);
    }
}
