//! Window-space drawing for the overlay: stadium-shaped pills and text.
//!
//! Everything queued in a frame goes into one vertex buffer and is drawn in
//! the order it was queued, so a pill queued before its label ends up under
//! it. Shapes and glyphs share a pipeline; shapes sample a white texel where
//! glyphs sample their font atlas.

use std::f32::consts::{FRAC_PI_2, PI};
use std::ops::Range;

use glam::Vec2;
use wgpu::util::DeviceExt;

use crate::assets::{Assets, FontId};
use crate::color::Color;
use crate::gpu::GpuContext;

/// Upper bound on vertices per frame. The overlay uses well under a tenth.
const MAX_VERTICES: usize = 8192;

/// Segments in each half-circle end of a pill.
const CAP_SEGMENTS: usize = 12;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex2d {
    /// Window pixels, origin top left.
    position: [f32; 2],
    uv: [f32; 2],
    /// Already encoded for the surface.
    color: [f32; 4],
}

impl Vertex2d {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Float32x4];

    const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex2d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &Self::ATTRIBUTES,
    };

    fn solid(position: Vec2, color: [f32; 4]) -> Self {
        Self {
            position: position.into(),
            uv: [0.5, 0.5],
            color,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ScreenUniforms {
    size: [f32; 2],
    _pad: [f32; 2],
}

/// What a run of triangles takes its coverage from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Coverage {
    Solid,
    Glyphs(FontId),
}

/// Consecutive vertices drawn with the same coverage texture.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Run {
    coverage: Coverage,
    vertices: Range<u32>,
}

/// Triangles queued this frame, in painter's order.
#[derive(Default)]
struct DrawList {
    vertices: Vec<Vertex2d>,
    runs: Vec<Run>,
    linear_output: bool,
}

impl DrawList {
    fn clear(&mut self) {
        self.vertices.clear();
        self.runs.clear();
    }

    fn color(&self, color: Color) -> [f32; 4] {
        surface_color(color, self.linear_output)
    }

    /// Queue triangles, or drop all of them if they would not fit.
    fn push(&mut self, coverage: Coverage, triangles: &[Vertex2d]) {
        let start = self.vertices.len();
        if triangles.is_empty() {
            return;
        }
        if start + triangles.len() > MAX_VERTICES {
            log::debug!("overlay vertex budget spent, dropping {} vertices", triangles.len());
            return;
        }
        self.vertices.extend_from_slice(triangles);
        let end = self.vertices.len() as u32;
        match self.runs.last_mut() {
            Some(run) if run.coverage == coverage => run.vertices.end = end,
            _ => self.runs.push(Run {
                coverage,
                vertices: start as u32..end,
            }),
        }
    }

    fn pill(&mut self, origin: Vec2, size: Vec2, color: Color) {
        let c = self.color(color);
        let center = origin + size * 0.5;
        let outline = stadium(origin, size, 0.0);
        let triangles: Vec<_> = ring_pairs(&outline)
            .flat_map(|(a, b)| [center, a, b])
            .map(|p| Vertex2d::solid(p, c))
            .collect();
        self.push(Coverage::Solid, &triangles);
    }

    /// A band `width` pixels wide just inside the edge of a pill.
    fn pill_border(&mut self, origin: Vec2, size: Vec2, width: f32, color: Color) {
        let c = self.color(color);
        let outer = stadium(origin, size, 0.0);
        let inner = stadium(origin, size, width);
        let triangles: Vec<_> = ring_pairs(&outer)
            .zip(ring_pairs(&inner))
            .flat_map(|((o0, o1), (i0, i1))| [o0, o1, i0, o1, i1, i0])
            .map(|p| Vertex2d::solid(p, c))
            .collect();
        self.push(Coverage::Solid, &triangles);
    }
}

/// Outline of the stadium filling `size` at `origin`, pulled in by `inset`.
///
/// Runs clockwise on screen from the top of the right end, so consecutive
/// points (wrapping around) bound the shape.
fn stadium(origin: Vec2, size: Vec2, inset: f32) -> Vec<Vec2> {
    let half = size.min_element() * 0.5;
    let radius = (half - inset).max(0.0);
    let mid = origin.y + size.y * 0.5;
    let ends = [
        (Vec2::new(origin.x + size.x - half, mid), -FRAC_PI_2),
        (Vec2::new(origin.x + half, mid), FRAC_PI_2),
    ];
    ends.into_iter()
        .flat_map(|(center, start)| {
            (0..=CAP_SEGMENTS).map(move |i| {
                let angle = start + PI * i as f32 / CAP_SEGMENTS as f32;
                center + radius * Vec2::new(angle.cos(), angle.sin())
            })
        })
        .collect()
}

/// Each point with its successor, the last one paired with the first.
fn ring_pairs(points: &[Vec2]) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
    points
        .iter()
        .copied()
        .zip(points.iter().copied().cycle().skip(1))
}

/// Converts an sRGB color for a surface that does (`linear_output`) or does
/// not encode to sRGB on write.
fn surface_color(color: Color, linear_output: bool) -> [f32; 4] {
    if linear_output {
        color.to_linear()
    } else {
        [color.r, color.g, color.b, color.a]
    }
}

/// Draws the overlay's pills and text straight onto the surface.
///
/// Fonts are bound once, at creation, from everything `assets` has loaded
/// by then. Coordinates are physical pixels with the origin at the top left.
pub struct Draw2d {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    screen_buffer: wgpu::Buffer,
    screen_bind_group: wgpu::BindGroup,
    solid_bind_group: wgpu::BindGroup,
    /// Indexed by [`FontId`].
    font_bind_groups: Vec<wgpu::BindGroup>,
    list: DrawList,
}

impl Draw2d {
    pub fn new(gpu: &GpuContext, assets: &Assets) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Overlay Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/draw2d.wgsl").into()),
        });

        let screen_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Overlay Screen Uniforms"),
            size: std::mem::size_of::<ScreenUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let screen_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Overlay Screen Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let screen_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Overlay Screen Bind Group"),
            layout: &screen_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: screen_buffer.as_entire_binding(),
            }],
        });

        let coverage_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Overlay Coverage Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let coverage_group = |label: &str, view: &wgpu::TextureView, sampler: &wgpu::Sampler| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &coverage_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            })
        };

        let texel = device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some("Overlay Solid Texel"),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::R8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &[u8::MAX],
        );
        let texel_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Overlay Solid Sampler"),
            ..Default::default()
        });
        let solid_bind_group = coverage_group(
            "Overlay Solid Bind Group",
            &texel.create_view(&wgpu::TextureViewDescriptor::default()),
            &texel_sampler,
        );
        let font_bind_groups = assets
            .fonts
            .iter()
            .map(|font| coverage_group("Overlay Font Bind Group", &font.view, &font.sampler))
            .collect();

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Overlay Pipeline Layout"),
            bind_group_layouts: &[&screen_layout, &coverage_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Overlay Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[Vertex2d::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Overlay Vertices"),
            size: (MAX_VERTICES * std::mem::size_of::<Vertex2d>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            pipeline,
            vertex_buffer,
            screen_buffer,
            screen_bind_group,
            solid_bind_group,
            font_bind_groups,
            list: DrawList {
                linear_output: gpu.config.format.is_srgb(),
                ..DrawList::default()
            },
        }
    }

    /// Forget everything queued last frame.
    pub fn clear(&mut self) {
        self.list.clear();
    }

    /// A rectangle with half-circle ends.
    pub fn pill(&mut self, origin: Vec2, size: Vec2, color: Color) {
        self.list.pill(origin, size, color);
    }

    /// The outline of [`pill`](Self::pill), `width` pixels thick, drawn inside the shape.
    pub fn pill_border(&mut self, origin: Vec2, size: Vec2, width: f32, color: Color) {
        self.list.pill_border(origin, size, width, color);
    }

    /// One line of text with its top edge at `origin.y`.
    pub fn text(&mut self, assets: &Assets, font: FontId, origin: Vec2, text: &str, color: Color) {
        self.text_gradient(assets, font, origin, text, color, color);
    }

    /// Like [`text`](Self::text), with the color shifting glyph by glyph from
    /// `from` on the first character to `to` on the last.
    pub fn text_gradient(
        &mut self,
        assets: &Assets,
        font: FontId,
        origin: Vec2,
        text: &str,
        from: Color,
        to: Color,
    ) {
        let Some(atlas) = assets.font(font) else {
            return;
        };

        let baseline = origin.y + atlas.size();
        let steps = text.chars().count().saturating_sub(1).max(1) as f32;
        let mut pen = origin.x;
        let mut triangles = Vec::with_capacity(text.len() * 6);

        for (i, ch) in text.chars().enumerate() {
            let Some(glyph) = atlas.glyph(ch) else {
                pen += atlas.size() * 0.5;
                continue;
            };
            if glyph.width > 0 && glyph.height > 0 {
                let size = Vec2::new(glyph.width as f32, glyph.height as f32);
                // offset_y runs from the baseline up to the glyph's bottom edge
                let min = Vec2::new(pen + glyph.offset_x, baseline - glyph.offset_y - size.y);
                let max = min + size;
                let [u, v, du, dv] = glyph.uv;
                let color = self.list.color(from.lerp(to, i as f32 / steps));
                let corner = |p: Vec2, uv: [f32; 2]| Vertex2d {
                    position: p.into(),
                    uv,
                    color,
                };
                let (top_right, bottom_left) = (Vec2::new(max.x, min.y), Vec2::new(min.x, max.y));
                triangles.extend([
                    corner(min, [u, v]),
                    corner(top_right, [u + du, v]),
                    corner(bottom_left, [u, v + dv]),
                    corner(top_right, [u + du, v]),
                    corner(max, [u + du, v + dv]),
                    corner(bottom_left, [u, v + dv]),
                ]);
            }
            pen += glyph.advance;
        }

        self.list.push(Coverage::Glyphs(font), &triangles);
    }

    /// Upload this frame's triangles and draw them into `pass`.
    pub fn render(&self, gpu: &GpuContext, pass: &mut wgpu::RenderPass) {
        if self.list.runs.is_empty() {
            return;
        }

        let screen = ScreenUniforms {
            size: [gpu.width() as f32, gpu.height() as f32],
            _pad: [0.0; 2],
        };
        gpu.queue
            .write_buffer(&self.screen_buffer, 0, bytemuck::bytes_of(&screen));
        gpu.queue.write_buffer(
            &self.vertex_buffer,
            0,
            bytemuck::cast_slice(&self.list.vertices),
        );

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.screen_bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        for run in &self.list.runs {
            let bind_group = match run.coverage {
                Coverage::Solid => &self.solid_bind_group,
                Coverage::Glyphs(font) => match self.font_bind_groups.get(font.0) {
                    Some(group) => group,
                    None => continue,
                },
            };
            pass.set_bind_group(1, bind_group, &[]);
            pass.draw(run.vertices.clone(), 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: Vec2 = Vec2::new(100.0, 600.0);
    const SIZE: Vec2 = Vec2::new(300.0, 40.0);

    #[test]
    fn colors_follow_the_surface_encoding() {
        let pink = Color::hex(0xF9A8D4);
        assert_eq!(surface_color(pink, false), [pink.r, pink.g, pink.b, 1.0]);
        let linear = surface_color(pink, true);
        assert!(linear[1] < pink.g);
        assert_eq!(linear[3], 1.0);
    }

    #[test]
    fn stadium_touches_every_side_of_its_box() {
        let outline = stadium(ORIGIN, SIZE, 0.0);
        assert_eq!(outline.len(), 2 * (CAP_SEGMENTS + 1));

        let min = outline.iter().copied().fold(Vec2::INFINITY, Vec2::min);
        let max = outline.iter().copied().fold(Vec2::NEG_INFINITY, Vec2::max);
        assert!(min.abs_diff_eq(ORIGIN, 1e-3));
        assert!(max.abs_diff_eq(ORIGIN + SIZE, 1e-3));
        // Starts at the top of the right end
        assert!(outline[0].abs_diff_eq(Vec2::new(380.0, 600.0), 1e-3));
    }

    #[test]
    fn inset_stadium_keeps_an_even_margin() {
        let inner = stadium(ORIGIN, SIZE, 2.0);
        let min = inner.iter().copied().fold(Vec2::INFINITY, Vec2::min);
        let max = inner.iter().copied().fold(Vec2::NEG_INFINITY, Vec2::max);
        assert!(min.abs_diff_eq(ORIGIN + 2.0, 1e-3));
        assert!(max.abs_diff_eq(ORIGIN + SIZE - 2.0, 1e-3));
    }

    #[test]
    fn pill_is_one_fan_of_solid_triangles() {
        let mut list = DrawList::default();
        list.pill(ORIGIN, SIZE, Color::BLACK.with_alpha(0.2));
        let points = 2 * (CAP_SEGMENTS + 1);
        assert_eq!(list.vertices.len(), points * 3);
        assert_eq!(
            list.runs,
            [Run {
                coverage: Coverage::Solid,
                vertices: 0..(points * 3) as u32,
            }]
        );
        for v in &list.vertices {
            assert_eq!(v.color, [0.0, 0.0, 0.0, 0.2]);
            let p = Vec2::from(v.position);
            assert!(p.cmpge(ORIGIN - 1e-3).all() && p.cmple(ORIGIN + SIZE + 1e-3).all());
        }
    }

    #[test]
    fn runs_keep_painter_order() {
        let font = FontId(0);
        let mut list = DrawList::default();
        list.pill_border(ORIGIN, SIZE, 1.0, Color::WHITE);
        list.pill(ORIGIN, SIZE, Color::BLACK);
        list.push(Coverage::Glyphs(font), &[Vertex2d::solid(Vec2::ZERO, [1.0; 4]); 6]);
        list.pill(ORIGIN, SIZE, Color::BLACK);

        let coverages: Vec<_> = list.runs.iter().map(|r| r.coverage).collect();
        assert_eq!(
            coverages,
            [Coverage::Solid, Coverage::Glyphs(font), Coverage::Solid]
        );
        // Border and fill merged; runs tile the buffer without gaps
        let mut next = 0;
        for run in &list.runs {
            assert_eq!(run.vertices.start, next);
            next = run.vertices.end;
        }
        assert_eq!(next as usize, list.vertices.len());

        list.clear();
        assert!(list.runs.is_empty() && list.vertices.is_empty());
    }

    #[test]
    fn full_list_drops_whole_shapes() {
        let mut list = DrawList::default();
        let pill_vertices = 2 * (CAP_SEGMENTS + 1) * 3;
        for _ in 0..=MAX_VERTICES / pill_vertices {
            list.pill(ORIGIN, SIZE, Color::WHITE);
        }
        assert_eq!(list.vertices.len(), MAX_VERTICES / pill_vertices * pill_vertices);
        assert_eq!(list.runs.len(), 1);
        assert_eq!(list.runs[0].vertices.end as usize, list.vertices.len());
    }
}
