use glam::{Mat4, Vec3};

/// A perspective camera for 3D scenes.
///
/// Provides position, orientation, field of view and clip planes.
/// Produced each frame by [`OrbitCamera::camera`](crate::OrbitCamera::camera).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            forward: Vec3::NEG_Z,
            up: Vec3::Y,
            fov: std::f32::consts::FRAC_PI_2,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn looking_at(mut self, target: Vec3) -> Self {
        self.forward = (target - self.position).normalize_or(Vec3::NEG_Z);
        self
    }

    pub fn with_fov(mut self, fov_degrees: f32) -> Self {
        self.fov = fov_degrees.to_radians();
        self
    }

    pub fn with_clip(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward, self.up)
    }

    /// Right-handed perspective with a `0..1` depth range.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect.max(1e-4), self.near, self.far)
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_down_forward() {
        let camera = Camera::new()
            .at(Vec3::new(0.0, 0.0, 35.0))
            .looking_at(Vec3::ZERO)
            .with_fov(45.0)
            .with_clip(0.1, 200.0);
        let clip = camera.view_projection(1.0) * Vec3::ZERO.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
        assert!(camera.forward.cross(camera.up).abs_diff_eq(Vec3::X, 1e-6));
    }
}
