use glam::Vec3;
use rand::Rng;

use super::generators::random_in;
use super::{TransformBuffer, sanitize_dt};
use crate::config::SnowConfig;
use crate::mesh::{Transform, euler_xyz};

/// One flake. Only the position changes after creation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SnowParticle {
    pub position: Vec3,
    fall_speed: f32,
    phase: f32,
    scale: f32,
}

impl SnowParticle {
    pub fn new(position: Vec3, fall_speed: f32, phase: f32, scale: f32) -> Self {
        Self {
            position,
            fall_speed,
            phase,
            scale,
        }
    }

    pub fn fall_speed(&self) -> f32 {
        self.fall_speed
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }
}

/// Snow that falls forever.
///
/// Flakes drift down and sway sideways; one that drops below the floor is
/// moved back up to the spawn height at a fresh horizontal spot. Its speed
/// and sway phase come along unchanged. The number of flakes never changes.
#[derive(Clone, Debug)]
pub struct SnowField {
    particles: Vec<SnowParticle>,
    config: SnowConfig,
    scratch: Transform,
    transforms: TransformBuffer,
}

impl SnowField {
    /// Scatters `config.count` flakes through the initial snow volume.
    pub fn generate<R: Rng + ?Sized>(config: &SnowConfig, rng: &mut R) -> Self {
        let particles = (0..config.count)
            .map(|_| {
                let x = (rng.random::<f32>() - 0.5) * config.range_xz;
                let y = (rng.random::<f32>() - 0.5) * config.range_y + config.center_y;
                let z = (rng.random::<f32>() - 0.5) * config.range_xz;
                SnowParticle::new(
                    Vec3::new(x, y, z),
                    random_in(rng, &config.fall_speed),
                    rng.random::<f32>() * config.phase_range,
                    random_in(rng, &config.scale),
                )
            })
            .collect();
        Self::from_particles(particles, config.clone())
    }

    pub fn from_particles(particles: Vec<SnowParticle>, config: SnowConfig) -> Self {
        let count = particles.len();
        Self {
            particles,
            config,
            scratch: Transform::new(),
            transforms: TransformBuffer::new(count),
        }
    }

    pub fn particles(&self) -> &[SnowParticle] {
        &self.particles
    }

    pub fn count(&self) -> usize {
        self.particles.len()
    }

    pub fn transforms(&self) -> &TransformBuffer {
        &self.transforms
    }

    pub fn transforms_mut(&mut self) -> &mut TransformBuffer {
        &mut self.transforms
    }

    /// Advances every flake by one step.
    ///
    /// The sway is a per-step nudge, independent of `dt`. `rng` is only drawn
    /// from when a flake respawns.
    pub fn advance<R: Rng + ?Sized>(&mut self, dt: f32, time: f32, rng: &mut R) {
        let dt = sanitize_dt(dt);
        let cfg = &self.config;

        for (i, p) in self.particles.iter_mut().enumerate() {
            p.position.y -= p.fall_speed * dt * cfg.fall_scale;
            p.position.x += (time * 0.5 + p.phase).sin() * cfg.sway_amplitude;
            p.position.z += (time * 0.3 + p.phase).cos() * cfg.sway_amplitude;

            if p.position.y < cfg.floor {
                p.position.y = cfg.spawn_height;
                p.position.x = (rng.random::<f32>() - 0.5) * cfg.range_xz;
                p.position.z = (rng.random::<f32>() - 0.5) * cfg.range_xz;
            }

            self.scratch.position = p.position;
            self.scratch.rotation =
                euler_xyz(Vec3::new(time * 0.2 + p.phase, time * 0.1 + p.phase, 0.0));
            self.scratch.scale = Vec3::splat(p.scale);
            self.transforms.set(i, &self.scratch.matrix());
        }

        self.transforms.mark_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn config(count: usize) -> SnowConfig {
        SnowConfig {
            count,
            ..SnowConfig::default()
        }
    }

    #[test]
    fn initial_flakes_fill_the_volume() {
        let mut rng = StdRng::seed_from_u64(21);
        let cfg = config(500);
        let field = SnowField::generate(&cfg, &mut rng);
        assert_eq!(field.count(), 500);
        for p in field.particles() {
            assert!(p.position.x.abs() <= cfg.range_xz / 2.0);
            assert!(p.position.z.abs() <= cfg.range_xz / 2.0);
            assert!(p.position.y >= -20.0 && p.position.y <= 40.0);
            assert!(cfg.fall_speed.contains(&p.fall_speed()));
            assert!(p.phase() >= 0.0 && p.phase() < cfg.phase_range);
        }
    }

    #[test]
    fn flakes_fall_by_speed_times_scale() {
        let cfg = config(1);
        let mut field =
            SnowField::from_particles(vec![SnowParticle::new(Vec3::ZERO, 1.0, 0.0, 1.0)], cfg);
        let mut rng = StdRng::seed_from_u64(0);
        field.advance(0.5, 0.0, &mut rng);
        let p = field.particles()[0];
        assert!((p.position.y + 0.75).abs() < 1e-6);
        // sin(0) sway on x, cos(0) sway on z
        assert!(p.position.x.abs() < 1e-6);
        assert!((p.position.z - 0.05).abs() < 1e-6);
    }

    #[test]
    fn crossing_the_floor_respawns_at_spawn_height() {
        let cfg = config(1);
        let flake = SnowParticle::new(Vec3::new(3.0, -19.9, -4.0), 1.2, 42.0, 0.7);
        let mut field = SnowField::from_particles(vec![flake], cfg.clone());
        let mut rng = StdRng::seed_from_u64(5);

        field.advance(0.1, 1.0, &mut rng);
        let after = field.particles()[0];
        assert_eq!(after.position.y, cfg.spawn_height);
        assert!(after.position.x.abs() <= cfg.range_xz / 2.0);
        assert_eq!(after.fall_speed(), 1.2);
        assert_eq!(after.phase(), 42.0);
        assert_eq!(after.scale(), 0.7);
        assert_eq!(field.count(), 1);
    }

    #[test]
    fn zero_dt_still_sways_but_does_not_fall() {
        let cfg = config(1);
        let mut field = SnowField::from_particles(
            vec![SnowParticle::new(Vec3::new(0.0, 5.0, 0.0), 1.0, 1.0, 1.0)],
            cfg,
        );
        let mut rng = StdRng::seed_from_u64(0);
        field.advance(0.0, 0.0, &mut rng);
        let p = field.particles()[0];
        assert_eq!(p.position.y, 5.0);
        assert!(p.position.x != 0.0);
    }

    #[test]
    fn long_runs_keep_count_and_bounds() {
        let mut rng = StdRng::seed_from_u64(8);
        let cfg = config(200);
        let mut field = SnowField::generate(&cfg, &mut rng);
        for frame in 0..2000 {
            field.advance(1.0 / 30.0, frame as f32 / 30.0, &mut rng);
        }
        assert_eq!(field.count(), 200);
        assert_eq!(field.transforms().len(), 200);
        for p in field.particles() {
            assert!(p.position.y >= cfg.floor && p.position.y <= cfg.spawn_height);
        }
    }
}
