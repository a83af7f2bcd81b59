use crate::gpu::GpuContext;
use fontdue::{Font, FontSettings};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Common locations of a sans-serif TTF on Linux, macOS and Windows.
pub const FONT_SEARCH_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
    "C:\\Windows\\Fonts\\segoeui.ttf",
];

/// Errors that can occur while loading a font.
#[derive(Debug)]
pub enum FontError {
    /// The font file could not be read.
    Io(PathBuf, std::io::Error),
    /// The bytes are not a font fontdue understands.
    Parse(&'static str),
    /// None of the searched paths held a font.
    NotFound,
}

impl std::fmt::Display for FontError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FontError::Io(path, e) => write!(f, "failed to read font {}: {}", path.display(), e),
            FontError::Parse(msg) => write!(f, "failed to parse font: {}", msg),
            FontError::NotFound => write!(f, "no usable system font found"),
        }
    }
}

impl std::error::Error for FontError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FontError::Io(_, e) => Some(e),
            _ => None,
        }
    }
}

/// Opaque identifier for a loaded font.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FontId(pub(crate) usize);

/// Information about a single glyph in the font atlas.
#[derive(Clone, Copy, Debug)]
pub struct GlyphInfo {
    /// UV coordinates in the atlas (x, y, width, height) normalized to [0, 1].
    pub uv: [f32; 4],
    /// Size of the glyph in pixels.
    pub width: u32,
    pub height: u32,
    /// Offset from the cursor position to where the glyph should be drawn.
    pub offset_x: f32,
    pub offset_y: f32,
    /// How far to advance the cursor after this glyph.
    pub advance: f32,
}

/// Where each glyph landed in a packed atlas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtlasLayout {
    pub width: u32,
    pub height: u32,
    /// Top-left corner of each glyph, in input order.
    pub origins: Vec<(u32, u32)>,
}

/// Packs glyph rectangles into rows, starting from a 512x512 atlas and
/// doubling the smaller side until everything fits.
pub fn pack_glyphs(sizes: &[(u32, u32)], padding: u32) -> AtlasLayout {
    let mut width = 512u32;
    let mut height = 512u32;

    loop {
        let mut origins = Vec::with_capacity(sizes.len());
        let mut x = padding;
        let mut y = padding;
        let mut row_height = 0u32;
        let mut fits = true;

        for &(w, h) in sizes {
            if x + w + padding > width {
                x = padding;
                y += row_height + padding;
                row_height = 0;
            }
            if y + h + padding > height || w + 2 * padding > width {
                fits = false;
                break;
            }
            origins.push((x, y));
            x += w + padding;
            row_height = row_height.max(h);
        }

        if fits {
            return AtlasLayout {
                width,
                height,
                origins,
            };
        }

        // Double the smaller dimension
        if width <= height {
            width *= 2;
        } else {
            height *= 2;
        }
    }
}

/// A font atlas containing pre-rasterized printable ASCII glyphs.
pub struct FontAtlas {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    glyphs: HashMap<char, GlyphInfo>,
    size: f32,
    line_height: f32,
}

impl FontAtlas {
    /// Create a new font atlas from TTF/OTF data.
    pub fn new(gpu: &GpuContext, font_data: &[u8], size: f32) -> Result<Self, FontError> {
        let font = Font::from_bytes(font_data, FontSettings::default()).map_err(FontError::Parse)?;

        // Characters to pre-rasterize
        let rasterized: Vec<(char, fontdue::Metrics, Vec<u8>)> = (32u8..=126u8)
            .map(|c| {
                let c = c as char;
                let (metrics, bitmap) = font.rasterize(c, size);
                (c, metrics, bitmap)
            })
            .collect();

        let sizes: Vec<(u32, u32)> = rasterized
            .iter()
            .map(|(_, m, _)| (m.width as u32, m.height as u32))
            .collect();
        let layout = pack_glyphs(&sizes, 1);
        let (atlas_width, atlas_height) = (layout.width, layout.height);

        // Create atlas bitmap
        let mut atlas_data = vec![0u8; (atlas_width * atlas_height) as usize];
        let mut glyphs = HashMap::new();

        for ((c, metrics, bitmap), &(x, y)) in rasterized.iter().zip(&layout.origins) {
            let glyph_w = metrics.width as u32;
            let glyph_h = metrics.height as u32;

            for gy in 0..glyph_h {
                let src = (gy * glyph_w) as usize;
                let dst = ((y + gy) * atlas_width + x) as usize;
                atlas_data[dst..dst + glyph_w as usize]
                    .copy_from_slice(&bitmap[src..src + glyph_w as usize]);
            }

            glyphs.insert(
                *c,
                GlyphInfo {
                    uv: [
                        x as f32 / atlas_width as f32,
                        y as f32 / atlas_height as f32,
                        glyph_w as f32 / atlas_width as f32,
                        glyph_h as f32 / atlas_height as f32,
                    ],
                    width: glyph_w,
                    height: glyph_h,
                    offset_x: metrics.xmin as f32,
                    offset_y: metrics.ymin as f32,
                    advance: metrics.advance_width,
                },
            );
        }

        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Font Atlas"),
            size: wgpu::Extent3d {
                width: atlas_width,
                height: atlas_height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &atlas_data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(atlas_width),
                rows_per_image: Some(atlas_height),
            },
            wgpu::Extent3d {
                width: atlas_width,
                height: atlas_height,
                depth_or_array_layers: 1,
            },
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Font Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        // Calculate line height from font metrics
        let line_height = font
            .horizontal_line_metrics(size)
            .map(|m| m.new_line_size)
            .unwrap_or(size * 1.2);

        Ok(Self {
            texture,
            view,
            sampler,
            glyphs,
            size,
            line_height,
        })
    }

    /// Get glyph info for a character.
    pub fn glyph(&self, c: char) -> Option<&GlyphInfo> {
        self.glyphs.get(&c)
    }

    /// Get the font size this atlas was created with.
    pub fn size(&self) -> f32 {
        self.size
    }

    /// Get the line height for this font.
    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    /// Measure the width of a string.
    pub fn measure(&self, text: &str) -> f32 {
        text.chars()
            .map(|c| {
                self.glyphs
                    .get(&c)
                    .map(|g| g.advance)
                    .unwrap_or(self.size * 0.5)
            })
            .sum()
    }
}

/// Loaded fonts, each rasterized at one size.
#[derive(Default)]
pub struct Assets {
    pub(crate) fonts: Vec<Arc<FontAtlas>>,
}

impl Assets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a font from a file path.
    pub fn load_font(
        &mut self,
        gpu: &GpuContext,
        path: impl AsRef<Path>,
        size: f32,
    ) -> Result<FontId, FontError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| FontError::Io(path.to_path_buf(), e))?;
        self.load_font_bytes(gpu, &data, size)
    }

    /// Load a font from raw TTF/OTF bytes.
    pub fn load_font_bytes(
        &mut self,
        gpu: &GpuContext,
        data: &[u8],
        size: f32,
    ) -> Result<FontId, FontError> {
        let atlas = FontAtlas::new(gpu, data, size)?;
        let id = FontId(self.fonts.len());
        self.fonts.push(Arc::new(atlas));
        Ok(id)
    }

    /// Load the first readable font from [`FONT_SEARCH_PATHS`].
    pub fn system_font(&mut self, gpu: &GpuContext, size: f32) -> Result<FontId, FontError> {
        for path in FONT_SEARCH_PATHS {
            let path = Path::new(path);
            if !path.is_file() {
                continue;
            }
            match self.load_font(gpu, path, size) {
                Ok(id) => {
                    log::info!("overlay font: {}", path.display());
                    return Ok(id);
                }
                Err(e) => log::debug!("skipping font: {e}"),
            }
        }
        Err(FontError::NotFound)
    }

    /// Get a font atlas by ID.
    pub fn font(&self, id: FontId) -> Option<Arc<FontAtlas>> {
        self.fonts.get(id.0).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_glyph_sets_fit_the_default_atlas() {
        let layout = pack_glyphs(&[(10, 12), (8, 12), (0, 0), (14, 16)], 1);
        assert_eq!((layout.width, layout.height), (512, 512));
        assert_eq!(layout.origins, vec![(1, 1), (12, 1), (21, 1), (22, 1)]);
    }

    #[test]
    fn rows_wrap_and_atlas_grows() {
        let glyphs = vec![(100, 100); 30];
        let layout = pack_glyphs(&glyphs, 1);
        assert_eq!(layout.origins.len(), 30);
        assert!(layout.width * layout.height > 512 * 512);
        // No two glyphs overlap
        for (i, a) in layout.origins.iter().enumerate() {
            for b in &layout.origins[i + 1..] {
                let apart = a.0 + 100 <= b.0 || b.0 + 100 <= a.0 || a.1 + 100 <= b.1 || b.1 + 100 <= a.1;
                assert!(apart, "{a:?} overlaps {b:?}");
            }
            assert!(a.0 + 100 < layout.width && a.1 + 100 < layout.height);
        }
    }

    #[test]
    fn font_errors_explain_themselves() {
        assert_eq!(FontError::NotFound.to_string(), "no usable system font found");
        let err = FontError::Parse("bad table");
        assert!(err.to_string().contains("bad table"));
    }
}
