//! Surface descriptions for instanced batches.
//!
//! A [`Material`] is fixed for the lifetime of a batch; its
//! [`MaterialUniforms`] are uploaded once when the batch is created.

use crate::color::Color;

/// How a batch's fragments combine with what is already in the target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Writes depth and replaces color.
    #[default]
    Opaque,
    /// Alpha-blended over earlier batches without writing depth.
    Translucent,
    /// Added on top of earlier batches without writing depth.
    Additive,
}

impl BlendMode {
    /// Every mode, in the order batches of each mode are drawn.
    pub const DRAW_ORDER: [BlendMode; 3] = [
        BlendMode::Opaque,
        BlendMode::Translucent,
        BlendMode::Additive,
    ];

    pub fn writes_depth(self) -> bool {
        self == BlendMode::Opaque
    }

    pub(crate) fn blend_state(self) -> wgpu::BlendState {
        match self {
            BlendMode::Opaque => wgpu::BlendState::REPLACE,
            BlendMode::Translucent => wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
            BlendMode::Additive => wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::Zero,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            },
        }
    }
}

/// A lit or unlit surface.
///
/// Lit surfaces use a simple metal/roughness model against the scene
/// [`Lighting`](crate::lighting::Lighting). Emission is added after lighting
/// and may exceed 1.0, which is what makes a surface bloom.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub color: Color,
    pub emissive: Color,
    pub emissive_intensity: f32,
    pub roughness: f32,
    pub metalness: f32,
    /// Fraction of light that passes through; drives opacity and the glass sheen.
    pub transmission: f32,
    /// Strength of the thin-film rim tint.
    pub iridescence: f32,
    /// Skip lighting and output `color` (times `emissive_intensity`) directly.
    pub unlit: bool,
    /// Whether distance fog applies.
    pub fog: bool,
    pub blend: BlendMode,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            emissive: Color::BLACK,
            emissive_intensity: 1.0,
            roughness: 1.0,
            metalness: 0.0,
            transmission: 0.0,
            iridescence: 0.0,
            unlit: false,
            fog: true,
            blend: BlendMode::Opaque,
        }
    }
}

impl Material {
    /// A lit surface with the given base color.
    pub fn standard(color: Color) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    /// A surface that ignores lights and fog.
    ///
    /// `intensity` multiplies the color so it can push past the bloom threshold.
    pub fn unlit(color: Color, intensity: f32) -> Self {
        Self {
            color,
            emissive_intensity: intensity,
            unlit: true,
            fog: false,
            ..Self::default()
        }
    }

    pub fn roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness.clamp(0.0, 1.0);
        self
    }

    pub fn metalness(mut self, metalness: f32) -> Self {
        self.metalness = metalness.clamp(0.0, 1.0);
        self
    }

    pub fn emissive(mut self, emissive: Color, intensity: f32) -> Self {
        self.emissive = emissive;
        self.emissive_intensity = intensity;
        self
    }

    /// Glass-like see-through surface; switches the batch to translucent blending.
    pub fn transmission(mut self, transmission: f32) -> Self {
        self.transmission = transmission.clamp(0.0, 1.0);
        if self.transmission > 0.0 && self.blend == BlendMode::Opaque {
            self.blend = BlendMode::Translucent;
        }
        self
    }

    pub fn iridescence(mut self, iridescence: f32) -> Self {
        self.iridescence = iridescence.max(0.0);
        self
    }

    pub fn opacity(mut self, opacity: f32) -> Self {
        self.color = self.color.with_alpha(opacity.clamp(0.0, 1.0));
        self
    }

    pub fn blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    pub fn uniforms(&self) -> MaterialUniforms {
        let flags = (self.unlit as u32) | ((self.fog as u32) << 1);
        let emission = if self.unlit {
            [0.0; 3]
        } else {
            self.emissive.to_linear_scaled(self.emissive_intensity)
        };
        let color = self.color.to_linear();
        let intensity = if self.unlit {
            self.emissive_intensity
        } else {
            1.0
        };
        MaterialUniforms {
            color: [
                color[0] * intensity,
                color[1] * intensity,
                color[2] * intensity,
                color[3],
            ],
            emissive: [emission[0], emission[1], emission[2], self.iridescence],
            surface: [self.roughness, self.metalness, self.transmission, 0.0],
            flags: [flags, 0, 0, 0],
        }
    }
}

/// Material data as laid out in `mesh.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniforms {
    /// Linear base color; alpha is opacity.
    pub color: [f32; 4],
    /// Linear emission in rgb, iridescence in w.
    pub emissive: [f32; 4],
    /// Roughness, metalness, transmission.
    pub surface: [f32; 4],
    /// Bit 0: unlit. Bit 1: fogged.
    pub flags: [u32; 4],
}

/// The looks used by the scene.
pub mod palette {
    use super::{BlendMode, Material};
    use crate::color::Color;

    pub fn leaf_light() -> Material {
        Material::standard(Color::hex(0xFFB7C5))
            .roughness(0.6)
            .metalness(0.4)
    }

    pub fn leaf_dark() -> Material {
        Material::standard(Color::hex(0xFF69B4))
            .roughness(0.7)
            .metalness(0.3)
    }

    pub fn glass_ornament() -> Material {
        Material::standard(Color::WHITE)
            .roughness(0.1)
            .metalness(0.1)
            .transmission(0.6)
            .iridescence(1.0)
            .emissive(Color::hex(0x220022), 0.2)
    }

    pub fn ribbon() -> Material {
        Material::standard(Color::WHITE)
            .roughness(0.2)
            .emissive(Color::hex(0xAAAACC), 0.8)
    }

    pub fn snow() -> Material {
        Material::standard(Color::WHITE)
            .roughness(0.1)
            .metalness(0.9)
            .emissive(Color::hex(0xE0F7FA), 0.6)
    }

    pub fn star() -> Material {
        Material {
            fog: false,
            ..Material::standard(Color::WHITE)
                .roughness(0.1)
                .metalness(0.8)
                .emissive(Color::hex(0xFFCCFF), 2.0)
        }
    }

    /// The white-hot center of the star, bright enough to always bloom.
    pub fn star_core() -> Material {
        Material::unlit(Color::WHITE, 2.0)
    }

    pub fn sparkle(color: Color, opacity: f32) -> Material {
        Material::unlit(color, 3.0)
            .opacity(opacity)
            .blend(BlendMode::Additive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniforms_are_four_vec4s() {
        assert_eq!(std::mem::size_of::<MaterialUniforms>(), 64);
    }

    #[test]
    fn transmission_switches_to_translucent() {
        let glass = palette::glass_ornament();
        assert_eq!(glass.blend, BlendMode::Translucent);
        assert!(!glass.blend.writes_depth());
        assert_eq!(palette::leaf_light().blend, BlendMode::Opaque);
    }

    #[test]
    fn unlit_scales_color_and_skips_fog() {
        let core = palette::star_core().uniforms();
        assert_eq!(core.flags[0], 0b01);
        for channel in &core.color[..3] {
            assert!((channel - 2.0).abs() < 1e-4);
        }
        assert_eq!(core.color[3], 1.0);
        assert_eq!(core.emissive[..3], [0.0, 0.0, 0.0]);

        let leaf = palette::leaf_dark().uniforms();
        assert_eq!(leaf.flags[0], 0b10);
        assert_eq!(leaf.surface[0], 0.7);
    }

    #[test]
    fn ribbon_emits() {
        let ribbon = palette::ribbon().uniforms();
        assert!(ribbon.emissive[0] > 0.0 && ribbon.emissive[2] > ribbon.emissive[0]);
    }
}
