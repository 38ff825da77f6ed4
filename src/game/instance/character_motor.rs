use nalgebra::Vector3;

use super::super::locomotion::LocomotionState;
use super::super::physics::{CollisionFlags, PhysicsWorld};
use super::super::scene::ObjectId;

/// Applies a velocity to a kinematic character for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterMotor {
    /// Vertical velocity restored after landing on something
    pub rest_velocity: f32,
}

impl CharacterMotor {
    pub fn new(rest_velocity: f32) -> Self {
        Self { rest_velocity }
    }

    /// Sweeps the character by `velocity * dt` and reports which sides touched.
    ///
    /// A below contact while still falling pins the vertical velocity back to
    /// the rest value so the next tick starts from contact, not from the
    /// accumulated fall speed. Returns `None` when `id` has no character body.
    pub fn drive(
        &self,
        physics: &mut PhysicsWorld,
        id: ObjectId,
        state: &mut LocomotionState,
        velocity: Vector3<f32>,
        dt: f32,
    ) -> Option<CollisionFlags> {
        let movement = physics.move_character(id, velocity * dt, dt)?;
        if movement.flags.below && state.vertical_velocity < 0.0 {
            state.vertical_velocity = self.rest_velocity;
        }
        Some(movement.flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::locomotion::GROUND_REST_VELOCITY;
    use crate::game::physics::LAYER_DEFAULT;

    #[test]
    fn test_landing_reclamps_fall_speed() {
        let mut physics = PhysicsWorld::new();
        physics.add_static_box(
            ObjectId(100),
            Vector3::new(0.0, -0.5, 0.0),
            Vector3::new(20.0, 0.5, 20.0),
            LAYER_DEFAULT,
        );
        let id = ObjectId(1);
        physics.add_character(id, Vector3::new(0.0, 1.05, 0.0), 0.5, 2.0);
        physics.update_queries();

        let motor = CharacterMotor::new(GROUND_REST_VELOCITY);
        let mut state = LocomotionState {
            vertical_velocity: -8.0,
            ..Default::default()
        };
        let flags = motor
            .drive(&mut physics, id, &mut state, Vector3::new(0.0, -8.0, 0.0), 0.1)
            .unwrap();
        assert!(flags.below);
        assert_eq!(state.vertical_velocity, GROUND_REST_VELOCITY);
        let y = physics.get_character_position(id).unwrap().y;
        assert!(y > 0.9, "capsule must stop on the floor, y={y}");
    }

    #[test]
    fn test_free_fall_keeps_velocity() {
        let mut physics = PhysicsWorld::new();
        let id = ObjectId(1);
        physics.add_character(id, Vector3::new(0.0, 10.0, 0.0), 0.5, 2.0);
        physics.update_queries();

        let motor = CharacterMotor::new(GROUND_REST_VELOCITY);
        let mut state = LocomotionState {
            vertical_velocity: -3.0,
            ..Default::default()
        };
        let flags = motor
            .drive(&mut physics, id, &mut state, Vector3::new(0.0, -3.0, 0.0), 0.1)
            .unwrap();
        assert!(flags.none());
        assert_eq!(state.vertical_velocity, -3.0);
    }

    #[test]
    fn test_unknown_character() {
        let mut physics = PhysicsWorld::new();
        let mut state = LocomotionState::default();
        let motor = CharacterMotor::new(GROUND_REST_VELOCITY);
        assert!(motor
            .drive(&mut physics, ObjectId(5), &mut state, Vector3::zeros(), 0.1)
            .is_none());
    }
}
