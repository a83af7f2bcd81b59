use std::f32::consts::PI;
use std::ops::Range;

use glam::Vec3;
use rand::Rng;

use super::generators::{Shell, TreeLayout, TreeShape, explode_target, random_in};
use super::{AnimationState, TransformBuffer, approach, sanitize_dt};
use crate::mesh::{Transform, euler_xyz};

/// How fast particles travel between homes and how fast they spin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Motion {
    /// Exponential approach rate, per second.
    pub rate: f32,
    /// Self-rotation about X and Y, in radians per second.
    pub spin_rate: f32,
}

impl Default for Motion {
    fn default() -> Self {
        Self {
            rate: 3.5,
            spin_rate: 0.1,
        }
    }
}

/// Recipe for one group of tree particles.
#[derive(Clone, Debug)]
pub struct GroupSpec {
    pub count: usize,
    pub layout: TreeLayout,
    /// Base size of every particle before random jitter.
    pub scale_factor: f32,
}

/// The immutable attributes of one particle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleSeed {
    pub tree_target: Vec3,
    pub explode_target: Vec3,
    pub base_rotation: Vec3,
    pub scale: f32,
}

/// A fixed-size batch of particles sharing one mesh and one material.
///
/// Each particle eases toward its tree home or its burst home depending on the
/// [`AnimationState`] it is advanced with. The per-particle arrays are
/// parallel: index `i` in each one describes the same particle. They are
/// allocated once and never resized.
#[derive(Clone, Debug)]
pub struct InstanceGroup {
    tree_targets: Vec<Vec3>,
    explode_targets: Vec<Vec3>,
    base_rotations: Vec<Vec3>,
    scales: Vec<f32>,
    current: Vec<Vec3>,
    motion: Motion,
    /// World offset added to every particle when building transforms.
    origin: Vec3,
    scratch: Transform,
    transforms: TransformBuffer,
}

impl InstanceGroup {
    /// Builds a group from explicit particle attributes.
    ///
    /// Every particle starts at its tree home.
    pub fn from_seeds(seeds: &[ParticleSeed], motion: Motion) -> Self {
        let count = seeds.len();
        let mut group = Self {
            tree_targets: Vec::with_capacity(count),
            explode_targets: Vec::with_capacity(count),
            base_rotations: Vec::with_capacity(count),
            scales: Vec::with_capacity(count),
            current: Vec::with_capacity(count),
            motion,
            origin: Vec3::ZERO,
            scratch: Transform::new(),
            transforms: TransformBuffer::new(count),
        };
        for seed in seeds {
            group.tree_targets.push(seed.tree_target);
            group.explode_targets.push(seed.explode_target);
            group.base_rotations.push(seed.base_rotation);
            group.scales.push(seed.scale);
            group.current.push(seed.tree_target);
        }
        group
    }

    /// Lays out `spec.count` particles on the tree and scatters their burst homes
    /// through `shell`.
    pub fn generate<R: Rng + ?Sized>(
        spec: &GroupSpec,
        shape: &TreeShape,
        shell: &Shell,
        scale_jitter: &Range<f32>,
        motion: Motion,
        rng: &mut R,
    ) -> Self {
        let seeds: Vec<ParticleSeed> = (0..spec.count)
            .map(|i| ParticleSeed {
                tree_target: spec.layout.position(shape, i, spec.count, rng),
                explode_target: explode_target(shell, rng),
                base_rotation: Vec3::new(
                    rng.random::<f32>() * PI,
                    rng.random::<f32>() * PI,
                    rng.random::<f32>() * PI,
                ),
                scale: random_in(rng, scale_jitter) * spec.scale_factor,
            })
            .collect();
        Self::from_seeds(&seeds, motion)
    }

    /// Places the whole group at `origin` in the world.
    pub fn with_origin(mut self, origin: Vec3) -> Self {
        self.origin = origin;
        self
    }

    pub fn count(&self) -> usize {
        self.current.len()
    }

    pub fn motion(&self) -> Motion {
        self.motion
    }

    /// Current local-space positions, one per particle.
    pub fn current(&self) -> &[Vec3] {
        &self.current
    }

    pub fn tree_targets(&self) -> &[Vec3] {
        &self.tree_targets
    }

    pub fn explode_targets(&self) -> &[Vec3] {
        &self.explode_targets
    }

    /// Where particle `index` is heading in `state`.
    pub fn target(&self, index: usize, state: AnimationState) -> Vec3 {
        state.select(self.tree_targets[index], self.explode_targets[index])
    }

    pub fn transforms(&self) -> &TransformBuffer {
        &self.transforms
    }

    pub fn transforms_mut(&mut self) -> &mut TransformBuffer {
        &mut self.transforms
    }

    /// Moves every particle one step toward its `state` home and rewrites the
    /// transform buffer.
    ///
    /// `dt` is the frame delta and `time` the total elapsed time, both in
    /// seconds. Invalid deltas are treated as zero.
    pub fn advance(&mut self, dt: f32, time: f32, state: AnimationState) {
        let dt = sanitize_dt(dt);
        let spin = time * self.motion.spin_rate;

        for i in 0..self.current.len() {
            let target = state.select(self.tree_targets[i], self.explode_targets[i]);
            self.current[i] = approach(self.current[i], target, self.motion.rate, dt);

            let base = self.base_rotations[i];
            self.scratch.position = self.origin + self.current[i];
            self.scratch.rotation = euler_xyz(Vec3::new(base.x + spin, base.y + spin, base.z));
            self.scratch.scale = Vec3::splat(self.scales[i]);
            self.transforms.set(i, &self.scratch.matrix());
        }

        self.transforms.mark_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn seed(tree: Vec3, explode: Vec3) -> ParticleSeed {
        ParticleSeed {
            tree_target: tree,
            explode_target: explode,
            base_rotation: Vec3::ZERO,
            scale: 1.0,
        }
    }

    fn generated(count: usize) -> InstanceGroup {
        let mut rng = StdRng::seed_from_u64(11);
        InstanceGroup::generate(
            &GroupSpec {
                count,
                layout: TreeLayout::Volume,
                scale_factor: 0.25,
            },
            &TreeShape::new(18.0, 7.0),
            &Shell::new(10.0, 40.0),
            &(0.5..1.5),
            Motion::default(),
            &mut rng,
        )
    }

    #[test]
    fn particles_start_at_tree_home() {
        let group = generated(64);
        assert_eq!(group.count(), 64);
        assert_eq!(group.current(), group.tree_targets());
        assert_eq!(group.transforms().len(), 64);
        for (i, &scale) in group.scales.iter().enumerate() {
            assert!((0.125..=0.375).contains(&scale), "particle {i} scale {scale}");
        }
    }

    #[test]
    fn zero_dt_moves_nothing_in_either_state() {
        let mut group = generated(32);
        let before = group.current().to_vec();
        group.advance(0.0, 1.0, AnimationState::Explode);
        assert_eq!(group.current(), &before[..]);
        group.advance(0.0, 2.0, AnimationState::Tree);
        assert_eq!(group.current(), &before[..]);
    }

    #[test]
    fn invalid_dt_is_ignored() {
        let mut group = generated(8);
        let before = group.current().to_vec();
        group.advance(f32::NAN, 0.0, AnimationState::Explode);
        group.advance(-0.5, 0.0, AnimationState::Explode);
        group.advance(f32::INFINITY, 0.0, AnimationState::Explode);
        assert_eq!(group.current(), &before[..]);
        assert!(group.current().iter().all(|p| p.is_finite()));
    }

    #[test]
    fn converges_monotonically_toward_tree() {
        let mut group = generated(16);
        for _ in 0..30 {
            group.advance(0.05, 0.0, AnimationState::Explode);
        }
        let mut last: Vec<f32> = (0..group.count())
            .map(|i| (group.current()[i] - group.tree_targets()[i]).length())
            .collect();
        for _ in 0..60 {
            group.advance(1.0 / 60.0, 0.0, AnimationState::Tree);
            for (i, prev) in last.iter_mut().enumerate() {
                let d = (group.current()[i] - group.tree_targets()[i]).length();
                assert!(d <= *prev, "particle {i} moved away: {d} > {prev}");
                *prev = d;
            }
        }
    }

    #[test]
    fn unit_step_lands_exactly_on_target() {
        let seeds = vec![seed(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)); 4];
        let mut group = InstanceGroup::from_seeds(
            &seeds,
            Motion {
                rate: 1.0,
                spin_rate: 0.0,
            },
        );
        group.advance(1.0, 0.0, AnimationState::Explode);
        for p in group.current() {
            assert_eq!(p.x, 10.0);
        }
    }

    #[test]
    fn toggling_twice_restores_targets_but_not_position() {
        let mut group = generated(4);
        let mut state = AnimationState::Tree;
        let original: Vec<Vec3> = (0..4).map(|i| group.target(i, state)).collect();

        state.toggle();
        group.advance(0.1, 0.1, state);
        state.toggle();
        group.advance(0.1, 0.2, state);

        let restored: Vec<Vec3> = (0..4).map(|i| group.target(i, state)).collect();
        assert_eq!(original, restored);
        assert_ne!(group.current(), group.tree_targets());
    }

    #[test]
    fn advance_writes_one_transform_per_particle() {
        let seeds = vec![ParticleSeed {
            tree_target: Vec3::new(1.0, 2.0, 3.0),
            explode_target: Vec3::ZERO,
            base_rotation: Vec3::new(0.0, 0.0, 0.5),
            scale: 2.0,
        }];
        let mut group = InstanceGroup::from_seeds(
            &seeds,
            Motion {
                rate: 3.5,
                spin_rate: 0.1,
            },
        )
        .with_origin(Vec3::new(0.0, -8.0, 0.0));
        assert!(group.transforms_mut().take_dirty());

        group.advance(0.0, 10.0, AnimationState::Tree);
        assert!(group.transforms().is_dirty());

        let expected = Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            euler_xyz(Vec3::new(1.0, 1.0, 0.5)),
            Vec3::new(1.0, -6.0, 3.0),
        );
        let actual = group.transforms().matrix(0).unwrap();
        assert!(actual.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn empty_group_does_no_work() {
        let mut group = generated(0);
        group.advance(0.016, 1.0, AnimationState::Explode);
        assert_eq!(group.count(), 0);
        assert!(group.transforms().is_empty());
    }
}
