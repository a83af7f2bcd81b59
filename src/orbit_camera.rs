use std::f32::consts::{FRAC_PI_2, TAU};

use glam::Vec3;
use winit::event::MouseButton;

use crate::camera::Camera;
use crate::config::CameraConfig;
use crate::input::Input;

/// Keeps the camera off the exact pole, where `up` and `forward` coincide.
const POLE_EPSILON: f32 = 0.01;

/// A damped camera controller that orbits around a target point.
///
/// Dragging with the left button spins it, the wheel zooms it. When nobody
/// is dragging it slowly turns on its own. There is no panning.
///
/// # Example
/// ```ignore
/// let mut orbit = OrbitCamera::new()
///     .distance(35.0)
///     .distance_limits(10.0, 60.0)
///     .auto_rotate(0.5);
///
/// // In frame loop:
/// orbit.update(&input, dt);
/// let camera = orbit.camera();
/// ```
#[derive(Clone, Debug)]
pub struct OrbitCamera {
    /// Point the camera orbits around.
    pub target: Vec3,
    /// Distance from target.
    pub distance: f32,
    /// Horizontal angle in radians, measured from +Z toward +X.
    pub azimuth: f32,
    /// Vertical angle in radians above the horizon.
    pub elevation: f32,
    /// Field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Radians of rotation per pixel of drag.
    pub sensitivity: f32,
    /// Zoom factor base per wheel line.
    pub zoom_sensitivity: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_elevation: f32,
    pub max_elevation: f32,
    /// Idle rotation in radians per second.
    pub auto_rotate_speed: f32,
    /// Fraction of the spin velocity lost per 60 Hz frame.
    pub damping: f32,
    velocity: (f32, f32),
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 5.0,
            azimuth: 0.0,
            elevation: 0.0,
            fov: std::f32::consts::FRAC_PI_4,
            near: 0.1,
            far: 1000.0,
            sensitivity: TAU / 1000.0,
            zoom_sensitivity: 0.95,
            min_distance: 0.5,
            max_distance: 100.0,
            min_elevation: -FRAC_PI_2 + POLE_EPSILON,
            max_elevation: FRAC_PI_2 - POLE_EPSILON,
            auto_rotate_speed: 0.0,
            damping: 0.05,
            velocity: (0.0, 0.0),
        }
    }
}

impl OrbitCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Camera placed and limited as `config` describes, looking at the origin.
    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new()
            .fov(config.fov)
            .clip(config.near, config.far)
            .distance_limits(config.min_distance, config.max_distance)
            .distance(config.distance)
            .max_polar_angle(config.max_polar_angle)
            .auto_rotate(config.auto_rotate_speed)
    }

    /// Set the distance from target.
    pub fn distance(mut self, distance: f32) -> Self {
        self.distance = distance.clamp(self.min_distance, self.max_distance);
        self
    }

    /// Set the field of view in degrees.
    pub fn fov(mut self, fov_degrees: f32) -> Self {
        self.fov = fov_degrees.to_radians();
        self
    }

    pub fn clip(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    /// Set distance limits.
    pub fn distance_limits(mut self, min: f32, max: f32) -> Self {
        self.min_distance = min;
        self.max_distance = max;
        self.distance = self.distance.clamp(min, max);
        self
    }

    /// Limit how far below straight up the camera may look from, as a polar
    /// angle measured from +Y. `PI / 2` keeps the camera above the horizon.
    pub fn max_polar_angle(mut self, polar: f32) -> Self {
        self.min_elevation = (FRAC_PI_2 - polar).max(-FRAC_PI_2 + POLE_EPSILON);
        self.elevation = self.elevation.clamp(self.min_elevation, self.max_elevation);
        self
    }

    /// Idle spin in OrbitControls units, where 2.0 is one turn every 30 seconds.
    pub fn auto_rotate(mut self, speed: f32) -> Self {
        self.auto_rotate_speed = TAU / 60.0 * speed;
        self
    }

    /// Update the camera based on input and delta time.
    pub fn update(&mut self, input: &Input, dt: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        if input.mouse_down(MouseButton::Left) {
            let delta = input.mouse_delta();
            self.velocity.0 -= delta.x * self.sensitivity;
            self.velocity.1 += delta.y * self.sensitivity;
        } else {
            self.azimuth -= self.auto_rotate_speed * dt;
        }

        self.azimuth = (self.azimuth + self.velocity.0).rem_euclid(TAU);
        self.elevation =
            (self.elevation + self.velocity.1).clamp(self.min_elevation, self.max_elevation);

        let keep = (1.0 - self.damping).clamp(0.0, 1.0).powf(dt * 60.0);
        self.velocity.0 *= keep;
        self.velocity.1 *= keep;

        let scroll = input.scroll_delta();
        if scroll.y != 0.0 {
            self.distance *= self.zoom_sensitivity.powf(scroll.y);
        }
        self.distance = self.distance.clamp(self.min_distance, self.max_distance);
    }

    /// Get the current camera state.
    pub fn camera(&self) -> Camera {
        // Spherical to Cartesian conversion
        let offset = Vec3::new(
            self.distance * self.elevation.cos() * self.azimuth.sin(),
            self.distance * self.elevation.sin(),
            self.distance * self.elevation.cos() * self.azimuth.cos(),
        );

        let position = self.target + offset;

        Camera {
            position,
            forward: (self.target - position).normalize_or(Vec3::NEG_Z),
            up: Vec3::Y,
            fov: self.fov,
            near: self.near,
            far: self.far,
        }
    }
}
