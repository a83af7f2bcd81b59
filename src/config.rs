//! Scene constants.
//!
//! Everything the scene needs to know about sizes, counts, rates and looks is
//! gathered here. The values are fixed at startup; the defaults reproduce the
//! reference scene. Each struct follows the builder style of [`AppConfig`]
//! so a caller can tweak a handful of values without spelling out the rest.
//!
//! [`AppConfig`]: crate::AppConfig

use std::ops::Range;

use glam::Vec3;

use crate::color::Color;

/// Top-level configuration for [`Scene`](crate::Scene).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneConfig {
    pub tree: TreeConfig,
    pub explosion: ExplosionConfig,
    pub snow: SnowConfig,
    pub star: StarConfig,
    pub camera: CameraConfig,
    pub bloom: BloomConfig,
    pub vignette: VignetteConfig,
    pub fog: FogConfig,
    /// Seed for procedural placement. `None` draws a fresh seed from the OS.
    pub seed: Option<u64>,
}

impl SceneConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the placement seed so every run builds the same tree.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn tree(mut self, tree: TreeConfig) -> Self {
        self.tree = tree;
        self
    }

    pub fn snow(mut self, snow: SnowConfig) -> Self {
        self.snow = snow;
        self
    }
}

/// Shape and population of the tree.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeConfig {
    /// Height of the cone in world units.
    pub height: f32,
    /// Radius of the cone at its base.
    pub base_radius: f32,
    /// Total leaves, split evenly between the light and dark leaf groups.
    pub leaf_count: usize,
    /// Total ornaments, split evenly between cubes and icosahedra.
    pub ornament_count: usize,
    pub ribbon_count: usize,
    /// Full turns the ribbon makes from base to tip.
    pub ribbon_loops: f32,
    /// Extra radius that keeps the ribbon just outside the leaves.
    pub ribbon_radius_offset: f32,
    /// Radial offset range that pushes ornaments onto the leaf surface.
    pub ornament_offset: Range<f32>,
    /// Where the tree (and the star above it) sits in the world.
    pub origin: Vec3,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            height: 18.0,
            base_radius: 7.0,
            leaf_count: 5500,
            ornament_count: 800,
            ribbon_count: 1200,
            ribbon_loops: 3.5,
            ribbon_radius_offset: 0.8,
            ornament_offset: -0.2..0.5,
            origin: Vec3::new(0.0, -8.0, 0.0),
        }
    }
}

impl TreeConfig {
    pub fn counts(mut self, leaves: usize, ornaments: usize, ribbon: usize) -> Self {
        self.leaf_count = leaves;
        self.ornament_count = ornaments;
        self.ribbon_count = ribbon;
        self
    }
}

/// The burst cloud and the interpolation that travels to and from it.
#[derive(Clone, Debug, PartialEq)]
pub struct ExplosionConfig {
    pub inner_radius: f32,
    pub outer_radius: f32,
    /// Exponential approach rate `k` in `current += (target - current) * k * dt`.
    pub rate: f32,
    /// Self-rotation of every particle, in radians per second.
    pub spin_rate: f32,
    /// Random per-particle scale multiplier range.
    pub scale_jitter: Range<f32>,
}

impl Default for ExplosionConfig {
    fn default() -> Self {
        Self {
            inner_radius: 10.0,
            outer_radius: 40.0,
            rate: 3.5,
            spin_rate: 0.1,
            scale_jitter: 0.5..1.5,
        }
    }
}

/// Falling snow.
#[derive(Clone, Debug, PartialEq)]
pub struct SnowConfig {
    pub count: usize,
    /// Width and depth of the snow volume, centered on the origin.
    pub range_xz: f32,
    /// Height of the initial snow volume.
    pub range_y: f32,
    /// Vertical center of the initial snow volume.
    pub center_y: f32,
    /// Flakes below this height respawn.
    pub floor: f32,
    /// Height respawned flakes start from.
    pub spawn_height: f32,
    pub fall_speed: Range<f32>,
    /// Multiplier on every flake's fall speed.
    pub fall_scale: f32,
    /// Horizontal drift added per step.
    pub sway_amplitude: f32,
    pub scale: Range<f32>,
    /// Upper bound of the random sway phase.
    pub phase_range: f32,
    /// Radius of a single flake mesh.
    pub flake_radius: f32,
}

impl Default for SnowConfig {
    fn default() -> Self {
        Self {
            count: 2000,
            range_xz: 70.0,
            range_y: 60.0,
            center_y: 10.0,
            floor: -20.0,
            spawn_height: 35.0,
            fall_speed: 0.5..1.5,
            fall_scale: 1.5,
            sway_amplitude: 0.05,
            scale: 0.5..1.3,
            phase_range: 100.0,
            flake_radius: 0.08,
        }
    }
}

/// The star on top of the tree and its sparkles.
#[derive(Clone, Debug, PartialEq)]
pub struct StarConfig {
    /// Height above the tree origin while the tree is assembled.
    pub rest_height: f32,
    /// Height above the tree origin while the tree is exploded.
    pub launch_height: f32,
    pub rate: f32,
    /// Yaw spin in radians per second.
    pub spin_rate: f32,
    pub tilt_frequency: f32,
    pub tilt_amplitude: f32,
    pub points: u32,
    pub outer_radius: f32,
    pub inner_radius: f32,
    pub depth: f32,
    pub bevel: f32,
    pub core_radius: f32,
    pub hover: HoverConfig,
    pub sparkles: Vec<SparkleConfig>,
}

impl Default for StarConfig {
    fn default() -> Self {
        Self {
            rest_height: 18.5,
            launch_height: 30.0,
            rate: 2.0,
            spin_rate: 1.0,
            tilt_frequency: 2.0,
            tilt_amplitude: 0.1,
            points: 5,
            outer_radius: 1.2,
            inner_radius: 0.5,
            depth: 0.2,
            bevel: 0.1,
            core_radius: 0.5,
            hover: HoverConfig::default(),
            sparkles: vec![
                SparkleConfig {
                    count: 50,
                    scale: 4.0,
                    size: 4.0,
                    speed: 0.4,
                    opacity: 0.8,
                    color: Color::hex(0xFFD700),
                },
                SparkleConfig {
                    count: 30,
                    scale: 3.0,
                    size: 2.0,
                    speed: 1.0,
                    opacity: 0.5,
                    color: Color::hex(0xFF69B4),
                },
            ],
        }
    }
}

/// Gentle bobbing applied to the star mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HoverConfig {
    pub speed: f32,
    pub rotation_intensity: f32,
    pub float_intensity: f32,
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            speed: 2.0,
            rotation_intensity: 0.5,
            float_intensity: 0.5,
        }
    }
}

/// One cloud of sparkles around the star.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SparkleConfig {
    pub count: usize,
    /// Edge length of the cube the sparkles live in.
    pub scale: f32,
    /// Apparent size; one unit is roughly two hundredths of a world unit.
    pub size: f32,
    pub speed: f32,
    pub opacity: f32,
    pub color: Color,
}

/// Orbit camera placement and limits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraConfig {
    pub distance: f32,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Auto-rotate speed in OrbitControls units (2.0 is one orbit per 30 s).
    pub auto_rotate_speed: f32,
    /// Largest allowed angle between the view direction and straight up.
    pub max_polar_angle: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            distance: 35.0,
            fov: 45.0,
            near: 0.1,
            far: 200.0,
            min_distance: 10.0,
            max_distance: 60.0,
            auto_rotate_speed: 0.5,
            max_polar_angle: std::f32::consts::PI / 1.5,
        }
    }
}

/// Mip-chain bloom.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BloomConfig {
    /// Luminance above which pixels start to glow.
    pub threshold: f32,
    pub smoothing: f32,
    pub intensity: f32,
    /// Blend between a mip level and the blurrier level below it.
    pub radius: f32,
    pub levels: u32,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            threshold: 1.2,
            smoothing: 0.025,
            intensity: 1.5,
            radius: 0.6,
            levels: 5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VignetteConfig {
    pub offset: f32,
    pub darkness: f32,
}

impl Default for VignetteConfig {
    fn default() -> Self {
        Self {
            offset: 0.1,
            darkness: 1.1,
        }
    }
}

/// Exponential-squared distance fog, which doubles as the clear color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FogConfig {
    pub color: Color,
    pub density: f32,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            color: Color::hex(0x050103),
            density: 0.02,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_split_evenly() {
        let tree = TreeConfig::default();
        assert_eq!(tree.leaf_count % 2, 0);
        assert_eq!(tree.ornament_count % 2, 0);
    }

    #[test]
    fn snow_respawn_is_above_floor() {
        let snow = SnowConfig::default();
        assert!(snow.spawn_height > snow.floor);
        assert!(snow.fall_speed.start > 0.0);
    }

    #[test]
    fn builder_overrides_counts_and_seed() {
        let config = SceneConfig::new()
            .seed(7)
            .tree(TreeConfig::default().counts(10, 4, 6));
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.tree.leaf_count, 10);
        assert_eq!(config.tree.ribbon_count, 6);
        // Untouched sections keep their defaults
        assert_eq!(config.snow.count, SnowConfig::default().count);
    }
}
