use glam::{Mat4, Quat, Vec3};
use rand::Rng;

use super::{AnimationState, TransformBuffer, approach, sanitize_dt};
use crate::config::{HoverConfig, SparkleConfig, StarConfig};
use crate::mesh::euler_xyz;

/// Slow bob and wobble layered on top of the star's own motion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hover {
    pub speed: f32,
    pub rotation_intensity: f32,
    pub float_intensity: f32,
    /// Time offset so two hovering things never move in lockstep.
    pub offset: f32,
}

impl Hover {
    pub fn new(config: &HoverConfig, offset: f32) -> Self {
        Self {
            speed: config.speed,
            rotation_intensity: config.rotation_intensity,
            float_intensity: config.float_intensity,
            offset,
        }
    }

    /// Vertical lift and Euler wobble at `time`.
    pub fn pose(&self, time: f32) -> (f32, Vec3) {
        let phase = (self.offset + time) / 4.0 * self.speed;
        let (sin, cos) = phase.sin_cos();
        let wobble = Vec3::new(cos / 8.0, sin / 8.0, sin / 20.0) * self.rotation_intensity;
        let lift = sin / 10.0 * self.float_intensity;
        (lift, wobble)
    }

    pub fn matrix(&self, time: f32) -> Mat4 {
        let (lift, wobble) = self.pose(time);
        Mat4::from_rotation_translation(euler_xyz(wobble), Vec3::new(0.0, lift, 0.0))
    }
}

/// A small cloud of twinkling points that drift around an anchor frame.
#[derive(Clone, Debug)]
pub struct SparkleEmitter {
    homes: Vec<Vec3>,
    speed: f32,
    size: f32,
    noise: f32,
    transforms: TransformBuffer,
}

impl SparkleEmitter {
    /// Largest distance a sparkle strays from its home along any axis.
    pub const DRIFT: f32 = 0.2;

    /// World size of one unit of [`SparkleConfig::size`].
    const SIZE_UNIT: f32 = 0.02;

    pub fn generate<R: Rng + ?Sized>(config: &SparkleConfig, rng: &mut R) -> Self {
        let homes = (0..config.count)
            .map(|_| {
                Vec3::new(
                    (rng.random::<f32>() - 0.5) * config.scale,
                    (rng.random::<f32>() - 0.5) * config.scale,
                    (rng.random::<f32>() - 0.5) * config.scale,
                )
            })
            .collect::<Vec<_>>();
        let count = homes.len();
        Self {
            homes,
            speed: config.speed,
            size: config.size,
            noise: 1.0,
            transforms: TransformBuffer::new(count),
        }
    }

    pub fn count(&self) -> usize {
        self.homes.len()
    }

    pub fn homes(&self) -> &[Vec3] {
        &self.homes
    }

    /// Local position of sparkle `index` at `time`.
    pub fn position(&self, index: usize, time: f32) -> Vec3 {
        let home = self.homes[index];
        let phase = time * self.speed + home.x * self.noise * 100.0;
        home + Vec3::new(phase.cos(), phase.sin(), phase.cos()) * Self::DRIFT
    }

    pub fn transforms(&self) -> &TransformBuffer {
        &self.transforms
    }

    pub fn transforms_mut(&mut self) -> &mut TransformBuffer {
        &mut self.transforms
    }

    /// Rewrites every sparkle relative to `frame`.
    pub fn advance(&mut self, time: f32, frame: &Mat4) {
        let base = self.size * Self::SIZE_UNIT;
        for i in 0..self.homes.len() {
            let local = self.position(i, time);
            // Each sparkle pulses on its own beat
            let twinkle = 0.75 + 0.25 * (time * 3.0 + self.homes[i].y * 50.0).sin();
            let matrix = *frame
                * Mat4::from_scale_rotation_translation(
                    Vec3::splat(base * twinkle),
                    Quat::IDENTITY,
                    local,
                );
            self.transforms.set(i, &matrix);
        }
        self.transforms.mark_dirty();
    }
}

/// The star above the tree.
///
/// A single object that obeys the same approach law as the tree particles:
/// it rests at the tip while the tree stands and launches upward while it is
/// burst. Independent of the state it spins about Y and rocks about Z.
#[derive(Clone, Debug)]
pub struct TopMarker {
    position: Vec3,
    rest: Vec3,
    launch: Vec3,
    rate: f32,
    spin_rate: f32,
    tilt_frequency: f32,
    tilt_amplitude: f32,
    core_scale: f32,
    origin: Vec3,
    hover: Hover,
    frame: Mat4,
    star: TransformBuffer,
    core: TransformBuffer,
    sparkles: Vec<SparkleEmitter>,
}

impl TopMarker {
    pub fn new<R: Rng + ?Sized>(config: &StarConfig, rng: &mut R) -> Self {
        let hover = Hover::new(&config.hover, rng.random::<f32>() * 10_000.0);
        let sparkles = config
            .sparkles
            .iter()
            .map(|s| SparkleEmitter::generate(s, rng))
            .collect();
        Self {
            position: Vec3::ZERO,
            rest: Vec3::new(0.0, config.rest_height, 0.0),
            launch: Vec3::new(0.0, config.launch_height, 0.0),
            rate: config.rate,
            spin_rate: config.spin_rate,
            tilt_frequency: config.tilt_frequency,
            tilt_amplitude: config.tilt_amplitude,
            core_scale: config.core_radius,
            origin: Vec3::ZERO,
            hover,
            frame: Mat4::IDENTITY,
            star: TransformBuffer::new(1),
            core: TransformBuffer::new(1),
            sparkles,
        }
    }

    pub fn with_origin(mut self, origin: Vec3) -> Self {
        self.origin = origin;
        self
    }

    /// Position relative to the tree origin.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn target(&self, state: AnimationState) -> Vec3 {
        state.select(self.rest, self.launch)
    }

    /// Spin about Y and tilt about Z at `time`.
    pub fn orientation(&self, time: f32) -> Vec3 {
        Vec3::new(
            0.0,
            time * self.spin_rate,
            (time * self.tilt_frequency).sin() * self.tilt_amplitude,
        )
    }

    /// World frame of the star group, before hover.
    pub fn frame(&self) -> Mat4 {
        self.frame
    }

    pub fn star_transforms(&self) -> &TransformBuffer {
        &self.star
    }

    pub fn star_transforms_mut(&mut self) -> &mut TransformBuffer {
        &mut self.star
    }

    pub fn core_transforms(&self) -> &TransformBuffer {
        &self.core
    }

    pub fn core_transforms_mut(&mut self) -> &mut TransformBuffer {
        &mut self.core
    }

    pub fn sparkles(&self) -> &[SparkleEmitter] {
        &self.sparkles
    }

    pub fn sparkles_mut(&mut self) -> &mut [SparkleEmitter] {
        &mut self.sparkles
    }

    pub fn advance(&mut self, dt: f32, time: f32, state: AnimationState) {
        let dt = sanitize_dt(dt);
        self.position = approach(self.position, self.target(state), self.rate, dt);

        self.frame = Mat4::from_rotation_translation(
            euler_xyz(self.orientation(time)),
            self.origin + self.position,
        );
        let hovered = self.frame * self.hover.matrix(time);

        self.star.set(0, &hovered);
        self.star.mark_dirty();
        self.core
            .set(0, &(hovered * Mat4::from_scale(Vec3::splat(self.core_scale))));
        self.core.mark_dirty();

        let frame = self.frame;
        for emitter in &mut self.sparkles {
            emitter.advance(time, &frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn marker() -> TopMarker {
        let mut rng = StdRng::seed_from_u64(99);
        TopMarker::new(&StarConfig::default(), &mut rng)
    }

    #[test]
    fn climbs_to_rest_then_launches() {
        let mut star = marker();
        for _ in 0..600 {
            star.advance(1.0 / 60.0, 0.0, AnimationState::Tree);
        }
        assert!((star.position().y - 18.5).abs() < 0.01);

        let mut last = star.position().y;
        for _ in 0..600 {
            star.advance(1.0 / 60.0, 0.0, AnimationState::Explode);
            assert!(star.position().y >= last);
            last = star.position().y;
        }
        assert!((star.position().y - 30.0).abs() < 0.01);
    }

    #[test]
    fn orientation_ignores_state() {
        let star = marker();
        let o = star.orientation(std::f32::consts::FRAC_PI_4);
        assert_eq!(o.x, 0.0);
        assert!((o.y - std::f32::consts::FRAC_PI_4).abs() < 1e-6);
        assert!((o.z - (std::f32::consts::FRAC_PI_2).sin() * 0.1).abs() < 1e-6);
    }

    #[test]
    fn zero_dt_keeps_position() {
        let mut star = marker();
        star.advance(0.0, 3.0, AnimationState::Explode);
        assert_eq!(star.position(), Vec3::ZERO);
        assert!(star.star_transforms().is_dirty());
    }

    #[test]
    fn hover_stays_small() {
        let hover = Hover::new(&HoverConfig::default(), 12.0);
        for step in 0..200 {
            let (lift, wobble) = hover.pose(step as f32 * 0.1);
            assert!(lift.abs() <= 0.05 + 1e-6);
            assert!(wobble.x.abs() <= 0.0625 + 1e-6);
            assert!(wobble.z.abs() <= 0.025 + 1e-6);
        }
    }

    #[test]
    fn sparkles_stay_near_home() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = StarConfig::default().sparkles[0];
        let emitter = SparkleEmitter::generate(&config, &mut rng);
        assert_eq!(emitter.count(), 50);
        for i in 0..emitter.count() {
            let home = emitter.homes()[i];
            assert!(home.abs().max_element() <= config.scale / 2.0);
            for t in [0.0, 1.3, 7.9] {
                let drift = emitter.position(i, t) - home;
                assert!(drift.abs().max_element() <= SparkleEmitter::DRIFT + 1e-5);
            }
        }
    }

    #[test]
    fn sparkles_follow_the_star() {
        let mut star = marker().with_origin(Vec3::new(0.0, -8.0, 0.0));
        for _ in 0..300 {
            star.advance(0.05, 0.0, AnimationState::Tree);
        }
        let anchor = star.frame().w_axis.truncate();
        for emitter in star.sparkles() {
            for i in 0..emitter.count() {
                let world = emitter.transforms().matrix(i).unwrap().w_axis.truncate();
                assert!((world - anchor).length() < 4.0);
            }
        }
    }
}
