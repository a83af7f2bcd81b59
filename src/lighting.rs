//! Scene lights, fog, and the per-frame uniforms that carry them.
//!
//! The shading math lives in `shaders/mesh.wgsl`; this side only packs the
//! lights into [`SceneUniforms`].

use glam::Vec3;

use crate::camera::Camera;
use crate::color::Color;
use crate::config::FogConfig;

/// Most point lights the mesh shader reads.
pub const MAX_POINT_LIGHTS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Color,
    pub intensity: f32,
    /// Range at which the light fades to nothing.
    pub distance: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpotLight {
    pub position: Vec3,
    pub target: Vec3,
    pub color: Color,
    pub intensity: f32,
    /// Half-angle of the cone in radians.
    pub angle: f32,
    /// Fraction of the cone over which the edge softens.
    pub penumbra: f32,
}

/// Sky and ground colors blended by surface normal, standing in for an
/// environment map.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hemisphere {
    pub sky: Color,
    pub ground: Color,
    pub intensity: f32,
}

/// Every light in the scene, plus fog.
#[derive(Clone, Debug, PartialEq)]
pub struct Lighting {
    pub ambient: Color,
    pub ambient_intensity: f32,
    pub hemisphere: Hemisphere,
    pub spot: SpotLight,
    pub points: Vec<PointLight>,
    pub fog: FogConfig,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            ambient: Color::hex(0x4A0E2E),
            ambient_intensity: 0.5,
            hemisphere: Hemisphere {
                sky: Color::hex(0xBFC8E0),
                ground: Color::hex(0x3A2A30),
                intensity: 0.35,
            },
            spot: SpotLight {
                position: Vec3::new(20.0, 50.0, 20.0),
                target: Vec3::ZERO,
                color: Color::hex(0xFFCCE6),
                intensity: 2.0,
                angle: 0.3,
                penumbra: 1.0,
            },
            points: vec![
                PointLight {
                    position: Vec3::new(-10.0, 0.0, -20.0),
                    color: Color::hex(0xD600FF),
                    intensity: 5.0,
                    distance: 40.0,
                },
                PointLight {
                    position: Vec3::new(10.0, 10.0, -10.0),
                    color: Color::hex(0x00FFFF),
                    intensity: 3.0,
                    distance: 40.0,
                },
            ],
            fog: FogConfig::default(),
        }
    }
}

impl Lighting {
    pub fn with_fog(mut self, fog: FogConfig) -> Self {
        self.fog = fog;
        self
    }

    /// Packs lights, fog and the camera for one frame.
    pub fn uniforms(&self, camera: &Camera, aspect: f32, time: f32) -> SceneUniforms {
        let vec4 = |v: Vec3, w: f32| [v.x, v.y, v.z, w];
        let rgb = |c: [f32; 3], w: f32| [c[0], c[1], c[2], w];

        if self.points.len() > MAX_POINT_LIGHTS {
            log::debug!(
                "{} point lights configured, shading only the first {}",
                self.points.len(),
                MAX_POINT_LIGHTS
            );
        }

        let mut point_position = [[0.0; 4]; MAX_POINT_LIGHTS];
        let mut point_color = [[0.0; 4]; MAX_POINT_LIGHTS];
        let point_count = self.points.len().min(MAX_POINT_LIGHTS);
        for (i, light) in self.points.iter().take(MAX_POINT_LIGHTS).enumerate() {
            point_position[i] = vec4(light.position, light.distance);
            point_color[i] = rgb(light.color.to_linear_scaled(light.intensity), 0.0);
        }

        let spot = &self.spot;
        let direction = (spot.target - spot.position).normalize_or(Vec3::NEG_Y);
        let (cos_outer, cos_inner) = spot_cone(spot.angle, spot.penumbra);

        SceneUniforms {
            view_proj: camera.view_projection(aspect).to_cols_array_2d(),
            camera_position: vec4(camera.position, time),
            ambient: rgb(self.ambient.to_linear_scaled(self.ambient_intensity), 0.0),
            sky: rgb(
                self.hemisphere
                    .sky
                    .to_linear_scaled(self.hemisphere.intensity),
                0.0,
            ),
            ground: rgb(
                self.hemisphere
                    .ground
                    .to_linear_scaled(self.hemisphere.intensity),
                0.0,
            ),
            spot_position: vec4(spot.position, 0.0),
            spot_direction: vec4(direction, cos_outer),
            spot_color: rgb(spot.color.to_linear_scaled(spot.intensity), cos_inner),
            point_position,
            point_color,
            fog: rgb(
                {
                    let [r, g, b, _] = self.fog.color.to_linear();
                    [r, g, b]
                },
                self.fog.density,
            ),
            counts: [point_count as u32, 0, 0, 0],
        }
    }
}

/// Cosines of the outer and inner cone edges of a spot light.
pub fn spot_cone(angle: f32, penumbra: f32) -> (f32, f32) {
    let outer = angle.cos();
    let inner = (angle * (1.0 - penumbra.clamp(0.0, 1.0))).cos();
    (outer, inner)
}

/// Frame-wide data as laid out in `mesh.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneUniforms {
    pub view_proj: [[f32; 4]; 4],
    /// Camera position in xyz, elapsed time in w.
    pub camera_position: [f32; 4],
    pub ambient: [f32; 4],
    pub sky: [f32; 4],
    pub ground: [f32; 4],
    pub spot_position: [f32; 4],
    /// Unit direction in xyz, cosine of the outer edge in w.
    pub spot_direction: [f32; 4],
    /// Radiance in rgb, cosine of the inner edge in w.
    pub spot_color: [f32; 4],
    /// Position in xyz, range in w.
    pub point_position: [[f32; 4]; MAX_POINT_LIGHTS],
    pub point_color: [[f32; 4]; MAX_POINT_LIGHTS],
    /// Linear fog color in rgb, density in w.
    pub fog: [f32; 4],
    /// Number of point lights in x.
    pub counts: [u32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    // CPU copies of the falloff terms in `mesh.wgsl`

    /// How much of a spot light reaches a direction `cos_theta` off its axis.
    fn spot_falloff(cos_theta: f32, cos_outer: f32, cos_inner: f32) -> f32 {
        smoothstep(cos_outer, cos_inner, cos_theta)
    }

    /// Linear fade to zero at `range`.
    fn range_falloff(distance: f32, range: f32) -> f32 {
        if range <= 0.0 {
            return 1.0;
        }
        (1.0 - distance / range).clamp(0.0, 1.0)
    }

    /// Fraction of fog color mixed in at `distance`, exponential-squared.
    fn fog_factor(distance: f32, density: f32) -> f32 {
        let d = density * distance;
        (1.0 - (-d * d).exp()).clamp(0.0, 1.0)
    }

    fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
        if edge0 == edge1 {
            return if x < edge0 { 0.0 } else { 1.0 };
        }
        let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
        t * t * (3.0 - 2.0 * t)
    }

    #[test]
    fn fog_grows_with_distance() {
        assert_eq!(fog_factor(0.0, 0.02), 0.0);
        let near = fog_factor(10.0, 0.02);
        let far = fog_factor(60.0, 0.02);
        assert!(near < far);
        assert!((near - (1.0 - (-0.04f32).exp())).abs() < 1e-6);
        assert!(fog_factor(1e6, 0.02) <= 1.0);
    }

    #[test]
    fn full_penumbra_softens_from_the_axis() {
        let (outer, inner) = spot_cone(0.3, 1.0);
        assert_eq!(inner, 1.0);
        assert!((outer - 0.3f32.cos()).abs() < 1e-6);
        assert_eq!(spot_falloff(1.0, outer, inner), 1.0);
        assert_eq!(spot_falloff(0.5, outer, inner), 0.0);
        let halfway = spot_falloff(0.15f32.cos(), outer, inner);
        assert!(halfway > 0.0 && halfway < 1.0);
    }

    #[test]
    fn hard_spot_has_a_sharp_edge() {
        let (outer, inner) = spot_cone(0.3, 0.0);
        assert_eq!(outer, inner);
        assert_eq!(spot_falloff(0.29f32.cos(), outer, inner), 1.0);
        assert_eq!(spot_falloff(0.31f32.cos(), outer, inner), 0.0);
    }

    #[test]
    fn point_lights_fade_out_at_range() {
        assert_eq!(range_falloff(0.0, 40.0), 1.0);
        assert_eq!(range_falloff(20.0, 40.0), 0.5);
        assert_eq!(range_falloff(50.0, 40.0), 0.0);
        assert_eq!(range_falloff(50.0, 0.0), 1.0);
    }

    #[test]
    fn uniforms_pack_lights_and_fog() {
        let lighting = Lighting::default();
        let camera = Camera::new().at(Vec3::new(0.0, 0.0, 35.0)).looking_at(Vec3::ZERO);
        let u = lighting.uniforms(&camera, 16.0 / 9.0, 2.5);

        assert_eq!(u.counts[0], 2);
        assert_eq!(u.camera_position, [0.0, 0.0, 35.0, 2.5]);
        assert_eq!(u.point_position[0], [-10.0, 0.0, -20.0, 40.0]);
        assert_eq!(u.point_position[2], [0.0; 4]);
        assert_eq!(u.fog[3], 0.02);
        // Spot points from (20, 50, 20) toward the origin
        assert!(u.spot_direction[1] < 0.0);
        assert_eq!(std::mem::size_of::<SceneUniforms>() % 16, 0);
    }

    #[test]
    fn fog_override_compares_by_value() {
        let fog = FogConfig {
            color: Color::hex(0x102030),
            density: 0.05,
        };
        let a = Lighting::default().with_fog(fog);
        let b = Lighting::default().with_fog(fog);
        assert_eq!(a, b);
        assert_ne!(a, Lighting::default());
    }
}
