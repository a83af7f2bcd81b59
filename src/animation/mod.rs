//! Per-frame particle animation.
//!
//! Every animator in this module is a plain value advanced with an explicit
//! `(dt, time, state)` triple; none of them read clocks or shared state on
//! their own. The results land in [`TransformBuffer`]s that the renderer
//! uploads as instance data.
//!
//! - [`generators`]: where particles live in the tree and in the burst cloud
//! - [`InstanceGroup`]: N particles easing between their two homes
//! - [`SnowField`]: endlessly falling flakes
//! - [`TopMarker`]: the star, its hover wobble and its sparkles

pub mod generators;
mod instance_group;
mod snow;
mod state;
mod top_marker;
mod transform_buffer;

pub use instance_group::{GroupSpec, InstanceGroup, Motion, ParticleSeed};
pub use snow::{SnowField, SnowParticle};
pub use state::AnimationState;
pub use top_marker::{Hover, SparkleEmitter, TopMarker};
pub use transform_buffer::TransformBuffer;

use glam::Vec3;

/// Turns a raw frame delta into one that is safe to integrate.
///
/// Negative and non-finite deltas become zero. A NaN that slipped into the
/// decay update would stick to the particle forever.
pub fn sanitize_dt(dt: f32) -> f32 {
    if dt.is_finite() && dt > 0.0 {
        dt
    } else {
        if dt != 0.0 {
            log::debug!("discarding invalid frame delta {dt}");
        }
        0.0
    }
}

/// One step of exponential approach: `current + (target - current) * rate * dt`.
///
/// `rate * dt == 1` lands exactly on the target; larger products overshoot.
#[inline]
pub fn approach(current: Vec3, target: Vec3, rate: f32, dt: f32) -> Vec3 {
    current + (target - current) * (rate * dt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_rejects_bad_deltas() {
        assert_eq!(sanitize_dt(0.016), 0.016);
        assert_eq!(sanitize_dt(0.0), 0.0);
        assert_eq!(sanitize_dt(-1.0), 0.0);
        assert_eq!(sanitize_dt(f32::NAN), 0.0);
        assert_eq!(sanitize_dt(f32::INFINITY), 0.0);
    }

    #[test]
    fn full_step_lands_on_target() {
        let next = approach(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), 1.0, 1.0);
        assert_eq!(next, Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn half_step_covers_half_the_gap() {
        let next = approach(Vec3::splat(2.0), Vec3::splat(4.0), 2.0, 0.25);
        assert_eq!(next, Vec3::splat(3.0));
    }
}
