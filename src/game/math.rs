//! Small numeric helpers shared by the locomotion, look and patrol controllers.
//!
//! Angles exchanged with hosts are in degrees. Yaw follows the convention
//! where a yaw of 0° faces +Z and positive yaw turns +Z towards +X, so
//! `yaw = atan2(dir.x, dir.z)`.

use nalgebra::{UnitQuaternion, Vector3};

use super::constants::locomotion as loco_consts;

/// Wraps `t` into `[0, length)`.
pub fn repeat(t: f32, length: f32) -> f32 {
    t.rem_euclid(length)
}

/// Shortest signed difference `target - current` in degrees, in `(-180, 180]`.
pub fn delta_angle(current: f32, target: f32) -> f32 {
    let delta = repeat(target - current, 360.0);
    if delta > 180.0 {
        delta - 360.0
    } else {
        delta
    }
}

/// Critically damped spring towards `target`.
///
/// `velocity` is the filter state and must be carried between calls. The
/// output never passes `target`: when an overshoot would occur the result is
/// clamped onto the target and the velocity is adjusted to match.
pub fn smooth_damp(current: f32, target: f32, velocity: &mut f32, smooth_time: f32, dt: f32) -> f32 {
    let smooth_time = smooth_time.max(loco_consts::MIN_SMOOTH_TIME);
    if dt <= 0.0 {
        return current;
    }
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * decay;
    let mut output = target + (change + temp) * decay;

    if (target - current > 0.0) == (output > target) {
        output = target;
        *velocity = (output - target) / dt;
    }
    output
}

/// [`smooth_damp`] over angles in degrees, taking the shortest way round.
pub fn smooth_damp_angle(
    current: f32,
    target: f32,
    velocity: &mut f32,
    smooth_time: f32,
    dt: f32,
) -> f32 {
    let unwrapped_target = current + delta_angle(current, target);
    smooth_damp(current, unwrapped_target, velocity, smooth_time, dt)
}

/// Moves `current` towards `target` by at most `max_delta` without overshooting.
pub fn move_towards(current: Vector3<f32>, target: Vector3<f32>, max_delta: f32) -> Vector3<f32> {
    let to_target = target - current;
    let distance = to_target.norm();
    if distance <= max_delta || distance <= f32::EPSILON {
        target
    } else {
        current + to_target / distance * max_delta
    }
}

/// Yaw-only rotation for `yaw_deg`.
pub fn yaw_rotation(yaw_deg: f32) -> UnitQuaternion<f32> {
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw_deg.to_radians())
}

/// Heading in degrees of a horizontal direction, `None` for degenerate vectors.
pub fn yaw_from_direction(direction: Vector3<f32>) -> Option<f32> {
    let flat = Vector3::new(direction.x, 0.0, direction.z);
    if flat.norm_squared() < loco_consts::DIRECTION_EPSILON_SQ {
        return None;
    }
    Some(flat.x.atan2(flat.z).to_degrees())
}

/// Yaw of a rotation in degrees, wrapped to `[0, 360)`.
pub fn yaw_of(rotation: &UnitQuaternion<f32>) -> f32 {
    let forward = rotation * Vector3::z();
    let yaw = forward.x.atan2(forward.z).to_degrees();
    repeat(yaw, 360.0)
}

/// Projects `v` onto the horizontal plane and normalizes it.
pub fn flatten(v: Vector3<f32>) -> Option<Vector3<f32>> {
    let flat = Vector3::new(v.x, 0.0, v.z);
    if flat.norm_squared() < loco_consts::DIRECTION_EPSILON_SQ {
        None
    } else {
        Some(flat.normalize())
    }
}

/// World-space steering basis taken from the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBasis {
    pub forward: Vector3<f32>,
    pub right: Vector3<f32>,
}

impl CameraBasis {
    pub fn new(forward: Vector3<f32>, right: Vector3<f32>) -> Self {
        Self { forward, right }
    }

    /// Basis of a camera with the given world rotation.
    pub fn from_rotation(rotation: &UnitQuaternion<f32>) -> Self {
        Self {
            forward: rotation * Vector3::z(),
            right: rotation * Vector3::x(),
        }
    }
}
