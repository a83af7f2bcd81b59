//! RGBA colors for materials, lights and the overlay.
//!
//! Colors are authored in sRGB (the way design tools and CSS hex codes express
//! them) and converted to linear space when handed to the GPU, since every
//! shader in the crate does its lighting math in linear space and writes to an
//! sRGB surface.

/// An sRGB color with straight (non-premultiplied) alpha.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Builds an opaque color from a `0xRRGGBB` literal.
    ///
    /// ```
    /// use tinsel::Color;
    ///
    /// let pink = Color::hex(0xFF69B4);
    /// assert_eq!(pink.r, 1.0);
    /// ```
    pub const fn hex(rgb: u32) -> Self {
        let r = ((rgb >> 16) & 0xFF) as f32 / 255.0;
        let g = ((rgb >> 8) & 0xFF) as f32 / 255.0;
        let b = (rgb & 0xFF) as f32 / 255.0;
        Self::rgb(r, g, b)
    }

    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    /// Returns the same color with a different alpha.
    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Component-wise interpolation in sRGB space.
    pub fn lerp(self, other: Color, t: f32) -> Self {
        Self {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    /// Converts RGB to linear space; alpha is passed through.
    pub fn to_linear(self) -> [f32; 4] {
        [
            srgb_to_linear(self.r),
            srgb_to_linear(self.g),
            srgb_to_linear(self.b),
            self.a,
        ]
    }

    /// Linear RGB scaled by `intensity`, as used for emissive and light colors.
    pub fn to_linear_scaled(self, intensity: f32) -> [f32; 3] {
        let [r, g, b, _] = self.to_linear();
        [r * intensity, g * intensity, b * intensity]
    }

    pub fn to_wgpu(self) -> wgpu::Color {
        let [r, g, b, a] = self.to_linear();
        wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        }
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_unpacks_channels() {
        let c = Color::hex(0xFFB7C5);
        assert_eq!(c.r, 1.0);
        assert!((c.g - 183.0 / 255.0).abs() < 1e-6);
        assert!((c.b - 197.0 / 255.0).abs() < 1e-6);
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn linear_conversion_keeps_endpoints() {
        assert_eq!(Color::BLACK.to_linear(), [0.0, 0.0, 0.0, 1.0]);
        let white = Color::WHITE.to_linear();
        for channel in &white[..3] {
            assert!((channel - 1.0).abs() < 1e-5);
        }
        // Mid grey is darker in linear space
        let grey = Color::rgb(0.5, 0.5, 0.5).to_linear();
        assert!(grey[0] < 0.25 && grey[0] > 0.2);
    }

    #[test]
    fn lerp_hits_both_ends() {
        let a = Color::hex(0xF9A8D4);
        let b = Color::hex(0xC084FC);
        assert_eq!(a.lerp(b, 0.0), a);
        let end = a.lerp(b, 1.0);
        assert!((end.r - b.r).abs() < 1e-6);
        assert!((end.b - b.b).abs() < 1e-6);
    }
}
