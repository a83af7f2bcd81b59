//! Procedural homes for particles.
//!
//! Each generator maps an index (and, for the random ones, a few draws from
//! the supplied [`Rng`]) to a point. The tree shapes are cones with their base
//! on `y = 0` and their tip at `y = height`; the burst cloud is a spherical
//! shell around the origin.

use std::f32::consts::TAU;
use std::ops::Range;

use glam::Vec3;
use rand::Rng;

/// Cone that every tree layout is carved from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeShape {
    pub height: f32,
    pub base_radius: f32,
}

impl TreeShape {
    pub fn new(height: f32, base_radius: f32) -> Self {
        Self {
            height,
            base_radius,
        }
    }

    /// Radius of the cone at height `y`, tapering linearly to zero at the tip.
    #[inline]
    pub fn radius_at(&self, y: f32) -> f32 {
        self.base_radius * (1.0 - y / self.height)
    }
}

/// Spherical shell the tree bursts into.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shell {
    pub inner: f32,
    pub outer: f32,
}

impl Shell {
    pub fn new(inner: f32, outer: f32) -> Self {
        Self { inner, outer }
    }
}

/// How one group of particles is arranged on the tree.
#[derive(Clone, Debug, PartialEq)]
pub enum TreeLayout {
    /// Filled cone, denser toward the trunk.
    Volume,
    /// Near the cone surface, pushed out by a random offset.
    Surface { offset: Range<f32> },
    /// A ribbon winding from the base to the tip. Fully deterministic.
    Spiral { loops: f32, radius_offset: f32 },
}

impl TreeLayout {
    /// Home position of particle `index` out of `count`.
    pub fn position<R: Rng + ?Sized>(
        &self,
        shape: &TreeShape,
        index: usize,
        count: usize,
        rng: &mut R,
    ) -> Vec3 {
        match self {
            TreeLayout::Volume => tree_volume(shape, rng),
            TreeLayout::Surface { offset } => tree_surface(shape, offset, rng),
            TreeLayout::Spiral {
                loops,
                radius_offset,
            } => spiral(shape, index, count, *loops, *radius_offset),
        }
    }
}

/// Uniform draw from `range`. Never panics on an empty or inverted range.
#[inline]
pub(crate) fn random_in<R: Rng + ?Sized>(rng: &mut R, range: &Range<f32>) -> f32 {
    range.start + rng.random::<f32>() * (range.end - range.start)
}

#[inline]
fn cylindrical(radius: f32, theta: f32, y: f32) -> Vec3 {
    Vec3::new(radius * theta.cos(), y, radius * theta.sin())
}

/// A point inside the cone.
///
/// The radius is uniform in `[0, R(y)]` rather than uniform over the disc's
/// area, so leaves crowd toward the trunk. That look is intended.
pub fn tree_volume<R: Rng + ?Sized>(shape: &TreeShape, rng: &mut R) -> Vec3 {
    let y = rng.random::<f32>() * shape.height;
    let r = rng.random::<f32>() * shape.radius_at(y);
    let theta = rng.random::<f32>() * TAU;
    cylindrical(r, theta, y)
}

/// A point on (or just off) the cone's surface.
pub fn tree_surface<R: Rng + ?Sized>(
    shape: &TreeShape,
    offset: &Range<f32>,
    rng: &mut R,
) -> Vec3 {
    let y = rng.random::<f32>() * shape.height;
    let r = shape.radius_at(y) + random_in(rng, offset);
    let theta = rng.random::<f32>() * TAU;
    cylindrical(r, theta, y)
}

/// Point `index` of a `count`-point spiral around the cone.
///
/// Pure in `(index, count)`: the same inputs always give the same bits.
pub fn spiral(
    shape: &TreeShape,
    index: usize,
    count: usize,
    loops: f32,
    radius_offset: f32,
) -> Vec3 {
    let t = if count == 0 {
        0.0
    } else {
        index as f32 / count as f32
    };
    let y = t * shape.height;
    let radius = shape.base_radius * (1.0 - t) + radius_offset;
    let theta = t * TAU * loops;
    cylindrical(radius, theta, y)
}

/// A point in the burst shell.
///
/// `phi = acos(2u - 1)` keeps the directions uniform over the sphere; drawing
/// `phi` uniformly would bunch points at the poles.
pub fn explode_target<R: Rng + ?Sized>(shell: &Shell, rng: &mut R) -> Vec3 {
    let theta = rng.random::<f32>() * TAU;
    let phi = (2.0 * rng.random::<f32>() - 1.0).clamp(-1.0, 1.0).acos();
    let r = random_in(rng, &(shell.inner..shell.outer));
    Vec3::new(
        r * phi.sin() * theta.cos(),
        r * phi.sin() * theta.sin(),
        r * phi.cos(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn shape() -> TreeShape {
        TreeShape::new(18.0, 7.0)
    }

    #[test]
    fn volume_points_stay_inside_cone() {
        let mut rng = StdRng::seed_from_u64(1);
        let shape = shape();
        for _ in 0..5000 {
            let p = tree_volume(&shape, &mut rng);
            assert!((0.0..=shape.height).contains(&p.y));
            let radial = (p.x * p.x + p.z * p.z).sqrt();
            assert!(radial <= shape.radius_at(p.y) + 1e-4);
        }
    }

    #[test]
    fn surface_points_hug_the_cone() {
        let mut rng = StdRng::seed_from_u64(2);
        let shape = shape();
        let offset = -0.2..0.5;
        for _ in 0..2000 {
            let p = tree_surface(&shape, &offset, &mut rng);
            let radial = (p.x * p.x + p.z * p.z).sqrt();
            let gap = radial - shape.radius_at(p.y);
            // A negative radius flips through the axis, so compare magnitudes near the tip
            assert!(gap.abs() <= 0.5 + 1e-4 || radial <= 0.2 + 1e-4);
        }
    }

    #[test]
    fn spiral_is_deterministic() {
        let shape = shape();
        for i in [0, 1, 17, 599, 1199] {
            let a = spiral(&shape, i, 1200, 3.5, 0.8);
            let b = spiral(&shape, i, 1200, 3.5, 0.8);
            assert_eq!(a.to_array().map(f32::to_bits), b.to_array().map(f32::to_bits));
        }
    }

    #[test]
    fn spiral_starts_at_base_and_climbs() {
        let shape = shape();
        let first = spiral(&shape, 0, 100, 3.5, 0.8);
        assert!(first.abs_diff_eq(Vec3::new(7.8, 0.0, 0.0), 1e-5));
        let mid = spiral(&shape, 50, 100, 3.5, 0.8);
        assert!((mid.y - 9.0).abs() < 1e-5);
        assert!(spiral(&shape, 99, 100, 3.5, 0.8).y > mid.y);
    }

    #[test]
    fn spiral_with_no_points_does_not_divide_by_zero() {
        let p = spiral(&shape(), 0, 0, 3.5, 0.8);
        assert!(p.is_finite());
    }

    #[test]
    fn explode_targets_fill_the_shell() {
        let mut rng = StdRng::seed_from_u64(3);
        let shell = Shell::new(10.0, 40.0);
        for _ in 0..2000 {
            let r = explode_target(&shell, &mut rng).length();
            assert!(r >= 10.0 - 1e-3 && r <= 40.0 + 1e-3);
        }
    }

    #[test]
    fn explode_directions_have_no_pole_clustering() {
        // For a uniform sphere, cos(acos(z / r)) is uniform on [-1, 1].
        let mut rng = StdRng::seed_from_u64(4);
        let shell = Shell::new(10.0, 40.0);
        let samples = 40_000;
        let mut bins = [0usize; 10];
        for _ in 0..samples {
            let p = explode_target(&shell, &mut rng);
            let polar = (p.z / p.length()).clamp(-1.0, 1.0).acos();
            let u = (polar.cos() + 1.0) * 0.5;
            let bin = ((u * bins.len() as f32) as usize).min(bins.len() - 1);
            bins[bin] += 1;
        }
        let expected = samples as f32 / bins.len() as f32;
        for count in bins {
            let deviation = (count as f32 - expected).abs() / expected;
            assert!(deviation < 0.1, "bin count {count} vs {expected}");
        }
    }

    #[test]
    fn layout_dispatches_to_generators() {
        let mut rng = StdRng::seed_from_u64(5);
        let shape = shape();
        let spiral_layout = TreeLayout::Spiral {
            loops: 3.5,
            radius_offset: 0.8,
        };
        assert_eq!(
            spiral_layout.position(&shape, 3, 10, &mut rng),
            spiral(&shape, 3, 10, 3.5, 0.8)
        );
        let p = TreeLayout::Volume.position(&shape, 0, 1, &mut rng);
        assert!(p.y <= shape.height);
    }
}
