use nalgebra::Vector3;

use super::constants::locomotion as loco_consts;
use super::math::{flatten, repeat, smooth_damp_angle, yaw_from_direction, CameraBasis};

/// Static tuning for a walking character.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocomotionParams {
    pub walk_speed: f32,
    pub turn_smooth_time: f32,
    pub jump_height: f32,
    /// Either sign is accepted; the magnitude always pulls downward.
    pub gravity: f32,
    pub rest_velocity: f32,
}

impl Default for LocomotionParams {
    fn default() -> Self {
        Self {
            walk_speed: loco_consts::DEFAULT_WALK_SPEED,
            turn_smooth_time: loco_consts::DEFAULT_TURN_SMOOTH_TIME,
            jump_height: loco_consts::DEFAULT_JUMP_HEIGHT,
            gravity: super::constants::physics::DEFAULT_GRAVITY,
            rest_velocity: loco_consts::GROUND_REST_VELOCITY,
        }
    }
}

impl LocomotionParams {
    /// Gravity with its sign forced negative.
    pub fn gravity(&self) -> f32 {
        -self.gravity.abs()
    }

    /// Launch speed that reaches `jump_height` under `gravity`.
    pub fn jump_impulse(&self) -> f32 {
        (2.0 * self.gravity.abs() * self.jump_height.max(0.0)).sqrt()
    }
}

/// Mutable per-character integration state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocomotionState {
    /// Yaw in degrees, `[0, 360)`.
    pub heading: f32,
    /// Heading filter velocity (degrees/second).
    pub heading_velocity: f32,
    /// Signed vertical speed, negative is falling.
    pub vertical_velocity: f32,
}

/// Inputs sampled for one tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocomotionInput {
    pub strafe: f32,
    pub forward: f32,
    pub jump: bool,
    pub grounded: bool,
    pub camera: Option<CameraBasis>,
}

/// Per-tick movement plan for the motor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocomotionStep {
    pub heading: f32,
    pub horizontal_velocity: Vector3<f32>,
    /// Horizontal velocity plus vertical velocity, ready for the motor.
    pub velocity: Vector3<f32>,
    pub jumped: bool,
}

/// World-space move direction for the given axes, `None` inside the dead-zone.
pub fn move_direction(strafe: f32, forward: f32, camera: Option<&CameraBasis>) -> Option<Vector3<f32>> {
    let input = Vector3::new(strafe.clamp(-1.0, 1.0), 0.0, forward.clamp(-1.0, 1.0));
    if input.norm() < loco_consts::INPUT_DEAD_ZONE {
        return None;
    }

    let steering = camera.and_then(|basis| {
        let cam_forward = flatten(basis.forward)?;
        let cam_right = flatten(basis.right)?;
        Some(cam_forward * input.z + cam_right * input.x)
    });
    let raw = steering.unwrap_or(input);
    if raw.norm_squared() < loco_consts::DIRECTION_EPSILON_SQ {
        return None;
    }
    Some(raw.normalize())
}

/// Advances heading and vertical velocity by one tick and builds the velocity
/// to hand to the motor.
pub fn step(
    state: &mut LocomotionState,
    params: &LocomotionParams,
    input: &LocomotionInput,
    dt: f32,
) -> LocomotionStep {
    let direction = move_direction(input.strafe, input.forward, input.camera.as_ref());

    let horizontal_velocity = match direction {
        Some(dir) => {
            if let Some(target) = yaw_from_direction(dir) {
                let heading = smooth_damp_angle(
                    state.heading,
                    target,
                    &mut state.heading_velocity,
                    params.turn_smooth_time,
                    dt,
                );
                state.heading = repeat(heading, 360.0);
            }
            dir * params.walk_speed
        }
        None => Vector3::zeros(),
    };

    let jumped = integrate_vertical(state, params, input.grounded, input.jump, dt);

    LocomotionStep {
        heading: state.heading,
        horizontal_velocity,
        velocity: Vector3::new(horizontal_velocity.x, state.vertical_velocity, horizontal_velocity.z),
        jumped,
    }
}

/// Applies rest bias, jump impulse and gravity. Returns true when a jump fired.
fn integrate_vertical(
    state: &mut LocomotionState,
    params: &LocomotionParams,
    grounded: bool,
    jump: bool,
    dt: f32,
) -> bool {
    if grounded && state.vertical_velocity <= 0.0 {
        state.vertical_velocity = params.rest_velocity;
    }

    if grounded && jump {
        state.vertical_velocity = params.jump_impulse();
        return true;
    }

    // Still rising off the ground counts as airborne so the probe's reach
    // can't hold the impulse constant.
    if !grounded || state.vertical_velocity > 0.0 {
        state.vertical_velocity += params.gravity() * dt;
    }
    false
}
