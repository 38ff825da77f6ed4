//! Mouse look: clamped pitch on the camera, free yaw on the followed body.

use nalgebra::{UnitQuaternion, Vector3};

use super::constants::look as look_consts;
use super::math::{yaw_of, yaw_rotation};
use super::scene::Transform;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookParams {
    pub horizontal_sensitivity: f32,
    pub vertical_sensitivity: f32,
    pub max_look_up: f32,
    pub max_look_down: f32,
}

impl Default for LookParams {
    fn default() -> Self {
        Self {
            horizontal_sensitivity: look_consts::DEFAULT_HORIZONTAL_SENSITIVITY,
            vertical_sensitivity: look_consts::DEFAULT_VERTICAL_SENSITIVITY,
            max_look_up: look_consts::DEFAULT_MAX_LOOK_UP,
            max_look_down: look_consts::DEFAULT_MAX_LOOK_DOWN,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LookController {
    pub params: LookParams,
    pitch: f32,
}

impl LookController {
    pub fn new(params: LookParams) -> Self {
        Self { params, pitch: 0.0 }
    }

    /// Accumulated pitch in degrees.
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Applies one tick of mouse movement.
    ///
    /// Pitch goes on `camera_local` and is clamped to
    /// `[max_look_down, max_look_up]`. Yaw goes on `followed` when present,
    /// otherwise on the camera itself. Returns the yaw applied in degrees.
    pub fn step(
        &mut self,
        mouse_delta: [f32; 2],
        dt: f32,
        camera_local: &mut Transform,
        followed: Option<&mut Transform>,
    ) -> f32 {
        let yaw = mouse_delta[0] * self.params.horizontal_sensitivity * dt;
        let pitch_delta = mouse_delta[1] * self.params.vertical_sensitivity * dt;

        self.pitch -= pitch_delta;
        let (low, high) = if self.params.max_look_down <= self.params.max_look_up {
            (self.params.max_look_down, self.params.max_look_up)
        } else {
            (self.params.max_look_up, self.params.max_look_down)
        };
        self.pitch = self.pitch.clamp(low, high);

        match followed {
            Some(body) => {
                body.rotation = yaw_rotation(yaw) * body.rotation;
                camera_local.rotation = self.pitch_rotation();
            }
            None => {
                let camera_yaw = yaw_of(&camera_local.rotation) + yaw;
                camera_local.rotation = yaw_rotation(camera_yaw) * self.pitch_rotation();
            }
        }
        yaw
    }

    pub fn pitch_rotation(&self) -> UnitQuaternion<f32> {
        UnitQuaternion::from_axis_angle(&Vector3::x_axis(), self.pitch.to_radians())
    }
}

impl Default for LookController {
    fn default() -> Self {
        Self::new(LookParams::default())
    }
}
